//! Interval-driven phases
//!
//! Simple math derives an interval from the branch condition itself and
//! walks it; range brute force walks the interval the path constraint
//! already pinned on the single relevant group; the optimistic variant
//! samples a bounded prefix of every known interval.

use tracing::trace;

use crate::analysis::parse_range_constraint;
use crate::ast::Expr;
use crate::consts::{RANGE_BRUTE_FORCE_OPT_BUDGET, RANGE_MAX_WIDTH_BRUTE_FORCE};
use crate::error::Timeout;
use crate::eval::Evaluator;
use crate::group::IndexGroup;
use crate::interval::WrappedInterval;
use crate::state::PhaseState;

use super::Solver;

enum WalkOutcome {
    Sat,
    /// Every value of the interval was evaluated.
    Exhausted,
    /// Only the endpoints were tried.
    Truncated,
}

impl<E: Evaluator> Solver<E> {
    /// Derive an interval from the branch condition alone and enumerate
    /// it. A fully walked interval with no hit is a local unsat.
    pub(crate) fn phase_simple_math(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        if self.config.skip_simple_math {
            return Ok(PhaseState::Inconclusive);
        }

        let Some(rc) = parse_range_constraint(branch, &self.assignments, self.input_bytes) else {
            return Ok(PhaseState::Inconclusive);
        };
        if self.group_blocked(&rc.group) {
            return Ok(PhaseState::Inconclusive);
        }
        if rc.interval.is_empty() {
            return Ok(PhaseState::Unsat);
        }

        match self.walk_interval(&rc.group, &rc.interval, branch, pi)? {
            WalkOutcome::Sat => Ok(PhaseState::Sat),
            WalkOutcome::Exhausted => Ok(PhaseState::Unsat),
            WalkOutcome::Truncated => Ok(PhaseState::Inconclusive),
        }
    }

    /// Enumerate the stored interval when the branch touches exactly one
    /// group the path constraint has bounded.
    pub(crate) fn phase_range_brute_force(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        if self.config.skip_range_brute_force || self.aggressive {
            return Ok(PhaseState::Inconclusive);
        }

        let bounded: Vec<(IndexGroup, WrappedInterval)> = self
            .mutable_groups(branch)
            .into_iter()
            .filter_map(|g| self.ranges.group_interval(&g).map(|wi| (g, wi)))
            .collect();
        let [(group, interval)] = bounded.as_slice() else {
            return Ok(PhaseState::Inconclusive);
        };
        let (group, interval) = (*group, *interval);

        match self.walk_interval(&group, &interval, branch, pi)? {
            WalkOutcome::Sat => Ok(PhaseState::Sat),
            WalkOutcome::Exhausted => Ok(PhaseState::Unsat),
            WalkOutcome::Truncated => Ok(PhaseState::Inconclusive),
        }
    }

    /// Sample a bounded prefix of every known interval the branch touches.
    /// Never declares unsat.
    pub(crate) fn phase_range_brute_force_opt(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        if self.config.skip_range_brute_force_opt {
            return Ok(PhaseState::Inconclusive);
        }

        let bounded: Vec<(IndexGroup, WrappedInterval)> = self
            .mutable_groups(branch)
            .into_iter()
            .filter_map(|g| self.ranges.group_interval(&g).map(|wi| (g, wi)))
            .collect();

        for (group, interval) in bounded {
            trace!(group = ?group.as_slice(), range = interval.range(), "optimistic range walk");
            for value in interval.iter().take(RANGE_BRUTE_FORCE_OPT_BUDGET as usize) {
                if self.try_group_value_le(&group, value, branch, pi)? {
                    return Ok(PhaseState::Sat);
                }
            }
        }
        Ok(PhaseState::Inconclusive)
    }

    fn walk_interval(
        &mut self,
        group: &IndexGroup,
        interval: &WrappedInterval,
        branch: &Expr,
        pi: &Expr,
    ) -> Result<WalkOutcome, Timeout> {
        if interval.range() <= RANGE_MAX_WIDTH_BRUTE_FORCE {
            for value in interval.iter() {
                if self.try_group_value_le(group, value, branch, pi)? {
                    return Ok(WalkOutcome::Sat);
                }
            }
            return Ok(WalkOutcome::Exhausted);
        }

        for value in [interval.min(), interval.max()] {
            if self.try_group_value_le(group, value, branch, pi)? {
                return Ok(WalkOutcome::Sat);
            }
        }
        Ok(WalkOutcome::Truncated)
    }
}
