//! The phase cascade
//!
//! Strategies run in a fixed order from cheap syntactic rewrites to random
//! mutation. The first satisfying phase short-circuits; a local unsat stops
//! the cascade because the phase exhausted everything later phases could
//! reach; a timeout unwinds through `?`.

use tracing::debug;

use crate::ast::Expr;
use crate::error::Timeout;
use crate::eval::Evaluator;
use crate::state::{Phase, PhaseState};

use super::Solver;

type PhaseFn<E> = fn(&mut Solver<E>, &Expr, &Expr) -> Result<PhaseState, Timeout>;

impl<E: Evaluator> Solver<E> {
    /// Run the full cascade against one branch condition.
    pub(crate) fn cascade(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        self.eval_digests.clear();

        let phases: [(Phase, PhaseFn<E>); 10] = [
            (Phase::Reuse, Self::phase_reuse),
            (Phase::InputToState, Self::phase_input_to_state),
            (Phase::SimpleMath, Self::phase_simple_math),
            (Phase::RangeBruteForce, Self::phase_range_brute_force),
            (Phase::RangeBruteForceOpt, Self::phase_range_brute_force_opt),
            (Phase::InputToStateExtended, Self::phase_input_to_state_extended),
            (Phase::ByteBruteForce, Self::phase_byte_brute_force),
            (Phase::GradientDescent, Self::phase_gradient),
            (Phase::Deterministic, Self::phase_deterministic),
            (Phase::Havoc, Self::phase_havoc),
        ];

        for (phase, run) in phases {
            match run(self, pi, branch)? {
                PhaseState::Sat => {
                    debug!(%phase, "phase satisfied the query");
                    self.stats.record_sat(phase);
                    return Ok(PhaseState::Sat);
                }
                PhaseState::Unsat => {
                    debug!(%phase, "phase exhausted its space");
                    return Ok(PhaseState::Unsat);
                }
                PhaseState::Inconclusive => {}
            }
        }

        Ok(PhaseState::Inconclusive)
    }
}
