//! Single-byte brute force

use crate::ast::Expr;
use crate::error::Timeout;
use crate::eval::Evaluator;
use crate::state::PhaseState;

use super::Solver;

impl<E: Evaluator> Solver<E> {
    /// Enumerate all 256 values of the only byte the branch touches.
    /// Exhaustion is a local unsat: no other phase can reach further on a
    /// one-byte domain.
    pub(crate) fn phase_byte_brute_force(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        if self.config.skip_brute_force {
            return Ok(PhaseState::Inconclusive);
        }

        let indexes = self.mutable_indexes(branch);
        let [index] = indexes.as_slice() else {
            return Ok(PhaseState::Inconclusive);
        };
        let index = *index;

        let saved = self.tmp_input[index];
        for value in 0..=0xffu64 {
            self.tmp_input[index] = value;
            if !self.index_in_range(index) {
                continue;
            }
            match self.check_candidate(branch, pi) {
                Ok(true) => return Ok(PhaseState::Sat),
                Ok(false) => {}
                Err(t) => {
                    self.tmp_input[index] = saved;
                    return Err(t);
                }
            }
        }

        self.tmp_input[index] = saved;
        Ok(PhaseState::Unsat)
    }
}
