//! Evaluation wrapper
//!
//! Every candidate the phases produce funnels through here: the deadline
//! is polled, duplicate candidates are skipped by digest, the branch
//! condition is asked before the path constraint, and optimistic proofs
//! are collected on the way.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::analysis::InfoBuilder;
use crate::ast::Expr;
use crate::error::Timeout;
use crate::eval::Evaluator;
use crate::group::IndexGroup;

use super::Solver;

impl<E: Evaluator> Solver<E> {
    /// Poll the deadline. The counter test keeps the original's asymmetric
    /// cadence: runs of sixteen polled evaluations alternate with runs of
    /// sixteen unpolled ones.
    pub(crate) fn check_deadline(&mut self) -> Result<(), Timeout> {
        self.poll_counter = self.poll_counter.wrapping_add(1);
        if self.poll_counter & 16 != 0 && self.timer.expired() {
            return Err(Timeout);
        }
        Ok(())
    }

    /// Evaluate an arbitrary expression on the current candidate buffer.
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Result<u64, Timeout> {
        self.check_deadline()?;
        self.stats.evaluations += 1;
        Ok(self
            .evaluator
            .eval(expr, &self.tmp_input, &self.value_sizes, None))
    }

    /// Evaluate without touching the deadline; used to read a witness
    /// value after a descent was interrupted.
    pub(crate) fn eval_raw(&mut self, expr: &Expr) -> u64 {
        self.stats.evaluations += 1;
        self.evaluator
            .eval(expr, &self.tmp_input, &self.value_sizes, None)
    }

    /// Evaluate the branch condition and, only if it holds, the path
    /// constraint. Optimistic bookkeeping happens on every branch hit.
    ///
    /// Returns `true` when the current candidate satisfies both.
    pub(crate) fn check_candidate(&mut self, branch: &Expr, pi: &Expr) -> Result<bool, Timeout> {
        self.check_candidate_inner(branch, pi, true)
    }

    /// Same as [`Self::check_candidate`] but never skipped by the
    /// duplicate-input digest; used for final verifications of a buffer
    /// that earlier steps already evaluated piecewise.
    pub(crate) fn check_candidate_forced(&mut self, branch: &Expr, pi: &Expr) -> Result<bool, Timeout> {
        self.check_candidate_inner(branch, pi, false)
    }

    fn check_candidate_inner(&mut self, branch: &Expr, pi: &Expr, dedup: bool) -> Result<bool, Timeout> {
        if dedup && self.config.check_unnecessary_eval && !self.eval_digests.insert(self.input_digest()) {
            self.stats.duplicate_evaluations += 1;
            return Ok(false);
        }

        self.check_deadline()?;
        self.stats.evaluations += 1;
        let mut depth = 0u64;
        let branch_value = self.evaluator.eval(
            branch,
            &self.tmp_input,
            &self.value_sizes,
            Some(&mut depth),
        );
        if branch_value == 0 {
            return Ok(false);
        }

        self.publish_optimistic(1, depth);

        self.check_deadline()?;
        self.stats.evaluations += 1;
        let pi_value = self
            .evaluator
            .eval(pi, &self.tmp_input, &self.value_sizes, None);
        if pi_value == 0 {
            return Ok(false);
        }

        self.publish_proof();
        Ok(true)
    }

    fn input_digest(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.tmp_input.hash(&mut h);
        h.finish()
    }

    /// Whether the candidate respects every stored interval touching the
    /// group. Suspended in aggressive-optimistic mode.
    pub(crate) fn candidate_in_range(&self, group: &IndexGroup) -> bool {
        self.aggressive || self.ranges.valid_eval_group(group, &self.tmp_input)
    }

    /// Same check for a single mutated byte.
    pub(crate) fn index_in_range(&self, index: usize) -> bool {
        self.aggressive || self.ranges.valid_eval_index(index, &self.tmp_input)
    }

    /// Whether any byte of the group is off-limits for mutation.
    pub(crate) fn group_blocked(&self, group: &IndexGroup) -> bool {
        group.iter().any(|i| self.index_blocked(i))
    }

    /// Whether a byte is off-limits for mutation.
    pub(crate) fn index_blocked(&self, index: usize) -> bool {
        if self.frozen.contains(&index) {
            return true;
        }
        !self.aggressive && self.univocally_defined.contains(&index)
    }

    /// Borrow the analysis state as an [`InfoBuilder`].
    pub(crate) fn info_builder(&mut self) -> InfoBuilder<'_> {
        InfoBuilder {
            cache: &mut self.info_cache,
            assignments: &self.assignments,
            input_bytes: self.input_bytes,
            univocally_defined: &self.univocally_defined,
            early_constants: &mut self.early_constants,
        }
    }

    /// Indices of `expr` the current step may mutate: pinned bytes are
    /// folded back in under aggressive-optimistic, frozen bytes never are.
    pub(crate) fn mutable_indexes(&mut self, expr: &Expr) -> Vec<usize> {
        let info = self.info_builder().info(expr);
        let mut out: Vec<usize> = info.indexes.iter().copied().collect();
        if self.aggressive {
            out.extend(info.indexes_ud.iter().copied());
        }
        out.retain(|i| !self.frozen.contains(i));
        out.sort_unstable();
        out
    }

    /// Groups of `expr` the current step may mutate, with the same
    /// aggressive/frozen policy.
    pub(crate) fn mutable_groups(&mut self, expr: &Expr) -> Vec<IndexGroup> {
        let info = self.info_builder().info(expr);
        let mut out: Vec<IndexGroup> = info.index_groups.iter().copied().collect();
        if self.aggressive {
            out.extend(info.index_groups_ud.iter().copied());
        }
        out.retain(|g| !self.group_blocked(g));
        out.sort_unstable_by_key(|g| (g.len(), g.as_slice().to_vec()));
        out
    }
}
