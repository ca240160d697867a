//! Input-to-state phases
//!
//! The direct phase reads the assignment straight off the comparison
//! constant of a classified branch condition. The extended phase replays
//! every constant seen so far into every group the branch touches, in both
//! byte orders, plus the constants harvested from ITE conditions.

use itertools::Itertools;
use tracing::trace;

use crate::analysis::{adjust_to_sat_side, detect_input_to_state, ItsRhs};
use crate::ast::{width_mask, Expr};
use crate::error::Timeout;
use crate::eval::Evaluator;
use crate::group::IndexGroup;
use crate::state::PhaseState;

use super::Solver;

impl<E: Evaluator> Solver<E> {
    /// Inject the adjusted comparison constant into the group, little
    /// endian, and evaluate.
    pub(crate) fn phase_input_to_state(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        if self.config.skip_input_to_state {
            return Ok(PhaseState::Inconclusive);
        }

        let its = {
            let mut ib = self.info_builder();
            match detect_input_to_state(branch, &mut ib) {
                Some(its) => its,
                None => return Ok(PhaseState::Inconclusive),
            }
        };
        if self.group_blocked(&its.group) {
            return Ok(PhaseState::Inconclusive);
        }

        let raw = match &its.rhs {
            ItsRhs::Const(c) => *c,
            ItsRhs::Evaluable(expr) => {
                let expr = expr.clone();
                self.eval_expr(&expr)?
            }
        };
        let Some(value) = adjust_to_sat_side(its.op, raw, its.width) else {
            return Ok(PhaseState::Inconclusive);
        };
        // A constant wider than the group cannot be represented.
        if its.group.bits() < 64 && value > its.group.max_value() {
            return Ok(PhaseState::Inconclusive);
        }

        trace!(group = ?its.group.as_slice(), value, "input-to-state injection");
        if self.try_group_value_le(&its.group, value, branch, pi)? {
            return Ok(PhaseState::Sat);
        }
        Ok(PhaseState::Inconclusive)
    }

    /// Replay previously seen constants into every touched group, both
    /// endians, then the ITE-harvested constants into their own groups.
    pub(crate) fn phase_input_to_state_extended(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        if self.config.skip_input_to_state_extended {
            return Ok(PhaseState::Inconclusive);
        }

        let groups = self.mutable_groups(branch);
        let constants: Vec<u64> = self.early_constants.iter().copied().sorted().collect();

        for group in &groups {
            for &value in &constants {
                let value = value & width_mask(group.bits());
                if self.try_group_value_le(group, value, branch, pi)? {
                    return Ok(PhaseState::Sat);
                }
                if group.len() > 1 && self.try_group_value_be(group, value, branch, pi)? {
                    return Ok(PhaseState::Sat);
                }
            }
        }

        let harvested = {
            let info = self.info_builder().info(branch);
            info.ite_input_to_state.clone()
        };
        for ite in harvested {
            if self.group_blocked(&ite.group) {
                continue;
            }
            let value = ite.value & width_mask(ite.group.bits());
            if self.try_group_value_le(&ite.group, value, branch, pi)? {
                return Ok(PhaseState::Sat);
            }
        }

        Ok(PhaseState::Inconclusive)
    }

    /// Write `value` into `group` little endian, validate against the
    /// range store and evaluate; restores the bytes unless it satisfies.
    pub(crate) fn try_group_value_le(
        &mut self,
        group: &IndexGroup,
        value: u64,
        branch: &Expr,
        pi: &Expr,
    ) -> Result<bool, Timeout> {
        let saved = self.save_group(group);
        group.set_le(&mut self.tmp_input, value);
        self.finish_group_candidate(group, saved, branch, pi)
    }

    /// Same as [`Self::try_group_value_le`] with the big-endian layout.
    pub(crate) fn try_group_value_be(
        &mut self,
        group: &IndexGroup,
        value: u64,
        branch: &Expr,
        pi: &Expr,
    ) -> Result<bool, Timeout> {
        let saved = self.save_group(group);
        group.set_be(&mut self.tmp_input, value);
        self.finish_group_candidate(group, saved, branch, pi)
    }

    fn finish_group_candidate(
        &mut self,
        group: &IndexGroup,
        saved: [u64; crate::consts::MAX_GROUP_SIZE],
        branch: &Expr,
        pi: &Expr,
    ) -> Result<bool, Timeout> {
        if !self.candidate_in_range(group) {
            self.restore_group(group, saved);
            return Ok(false);
        }
        match self.check_candidate(branch, pi) {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.restore_group(group, saved);
                Ok(false)
            }
            Err(t) => {
                self.restore_group(group, saved);
                Err(t)
            }
        }
    }

    pub(crate) fn save_group(&self, group: &IndexGroup) -> [u64; crate::consts::MAX_GROUP_SIZE] {
        let mut saved = [0u64; crate::consts::MAX_GROUP_SIZE];
        for (slot, index) in saved.iter_mut().zip(group.iter()) {
            *slot = self.tmp_input[index];
        }
        saved
    }

    pub(crate) fn restore_group(&mut self, group: &IndexGroup, saved: [u64; crate::consts::MAX_GROUP_SIZE]) {
        for (slot, index) in saved.iter().zip(group.iter()) {
            self.tmp_input[index] = *slot;
        }
    }
}
