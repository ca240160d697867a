//! Reuse phase: try every auxiliary test case as-is

use crate::ast::Expr;
use crate::error::Timeout;
use crate::eval::Evaluator;
use crate::state::PhaseState;

use super::Solver;

impl<E: Evaluator> Solver<E> {
    /// Evaluate the query in every auxiliary seed before mutating
    /// anything. Linear in the number of registered test cases.
    pub(crate) fn phase_reuse(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        if self.config.skip_reuse || self.testcases.len() < 2 {
            return Ok(PhaseState::Inconclusive);
        }

        let saved = self.snapshot_input();
        for tc_index in 1..self.testcases.len() {
            let values = &self.testcases[tc_index].values;
            let shared = values.len().min(self.tmp_input.len());
            self.tmp_input[..shared].copy_from_slice(&values[..shared]);

            if self.check_candidate(branch, pi)? {
                return Ok(PhaseState::Sat);
            }
        }

        self.restore_input(&saved);
        Ok(PhaseState::Inconclusive)
    }
}
