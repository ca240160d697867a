//! Query entry point, conjunction handling and multigoal coordination
//!
//! A conjunction is solved one clause at a time, freezing the bytes of
//! every satisfied clause before attacking the next. A single clause that
//! only reached an optimistic proof triggers the multigoal step: the
//! clause's bytes are frozen and the conflicting path clauses are solved
//! as branch conditions of their own. When nothing at all satisfied the
//! branch, a last aggressive rerun lifts the pinned-byte and range checks
//! to at least harvest an optimistic proof.

use hashbrown::HashSet;
use tracing::debug;

use crate::ast::Expr;
use crate::consts::NEIGHBOURHOOD_RADIUS;
use crate::error::{SolverError, Timeout};
use crate::eval::Evaluator;
use crate::state::{Phase, PhaseState};

use super::notify::flatten_conjunction;
use super::stats::QueryLogLine;
use super::Solver;

impl<E: Evaluator> Solver<E> {
    /// Core entry: try to satisfy `pi ∧ branch`.
    ///
    /// Returns the proof bytes on success; the slice stays valid until the
    /// next query on this context. On unknown, [`Self::get_optimistic_sol`]
    /// may still offer an assignment satisfying the branch alone.
    pub fn query_check_light(&mut self, pi: &Expr, branch: &Expr) -> Result<Option<&[u8]>, SolverError> {
        self.opt_found = false;
        self.opt_num_sat = 0;
        self.opt_depth = u64::MAX;
        self.frozen.clear();
        self.aggressive = false;
        self.reset_input_to_seed();
        self.timer.start();

        let outcome = self.solve_query(pi, branch);
        self.timer.stop();
        self.log_query(branch);

        match outcome {
            Ok(PhaseState::Sat) => {
                self.stats.sat_queries += 1;
                Ok(Some(self.tmp_proof.as_slice()))
            }
            Ok(_) => {
                self.stats.unknown_queries += 1;
                if self.opt_found {
                    self.stats.optimistic_found += 1;
                }
                Ok(None)
            }
            Err(Timeout) => {
                self.stats.timeouts += 1;
                if self.opt_found {
                    self.stats.optimistic_found += 1;
                }
                Ok(None)
            }
        }
    }

    fn solve_query(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        // Seed check runs before any detector: a hit here returns with no
        // analysis state populated, on purpose.
        self.eval_digests.clear();
        if self.check_candidate(branch, pi)? {
            self.stats.record_sat(Phase::SeedCheck);
            return Ok(PhaseState::Sat);
        }

        let clauses = flatten_conjunction(branch);
        if clauses.len() > 1 {
            self.solve_conjunction(pi, branch, &clauses)
        } else {
            self.solve_single(pi, branch, true)
        }
    }

    /// Solve one branch condition: cascade, then multigoal repair, then
    /// (only at the top level) the aggressive-optimistic rerun.
    fn solve_single(&mut self, pi: &Expr, branch: &Expr, allow_aggressive: bool) -> Result<PhaseState, Timeout> {
        let state = self.cascade(pi, branch)?;
        if state == PhaseState::Sat {
            return Ok(PhaseState::Sat);
        }

        if self.opt_found && self.multigoal_repair(pi, branch)? {
            self.stats.record_sat(Phase::Multigoal);
            return Ok(PhaseState::Sat);
        }

        if allow_aggressive && !self.opt_found {
            if self.aggressive_optimistic(pi, branch)? {
                return Ok(PhaseState::Sat);
            }
        }

        Ok(state)
    }

    /// First pass left to right, second pass right to left when the first
    /// one produced no optimistic proof at all.
    fn solve_conjunction(&mut self, pi: &Expr, branch: &Expr, clauses: &[Expr]) -> Result<PhaseState, Timeout> {
        let forward: Vec<Expr> = clauses.to_vec();
        let state = self.conjunction_pass(pi, branch, &forward)?;
        if state == PhaseState::Sat {
            return Ok(PhaseState::Sat);
        }

        if !self.opt_found {
            let mut backward = forward;
            backward.reverse();
            let state = self.conjunction_pass(pi, branch, &backward)?;
            if state == PhaseState::Sat {
                return Ok(PhaseState::Sat);
            }
        }

        Ok(PhaseState::Inconclusive)
    }

    fn conjunction_pass(&mut self, pi: &Expr, branch: &Expr, clauses: &[Expr]) -> Result<PhaseState, Timeout> {
        self.frozen.clear();
        self.reset_input_to_seed();

        let mut all_sat = true;
        let mut all_opt = true;
        let mut solved: Vec<bool> = vec![false; clauses.len()];

        for (i, clause) in clauses.iter().enumerate() {
            // Carry the accumulated partial assignment forward.
            if self.opt_found {
                let opt = self.tmp_opt_input.clone();
                self.restore_input(&opt);
            }

            // The residual query: every clause not yet dealt with, plus
            // the path constraint.
            let mut residual: Vec<Expr> = clauses
                .iter()
                .enumerate()
                .filter(|(j, _)| !solved[*j])
                .map(|(_, c)| c.clone())
                .collect();
            residual.push(pi.clone());
            let clause_pi = Expr::and(residual);

            // Per-clause optimistic window, so this clause's hits can
            // replace the carried proof.
            let prev_opt = self.opt_found;
            self.opt_found = false;
            self.opt_num_sat = 0;
            self.opt_depth = u64::MAX;

            self.eval_digests.clear();
            let clause_state = if self.check_candidate(clause, &clause_pi)? {
                PhaseState::Sat
            } else {
                self.solve_single(&clause_pi, clause, false)?
            };

            let clause_sat = clause_state == PhaseState::Sat;
            let clause_opt = self.opt_found || clause_sat;
            self.opt_found |= prev_opt;

            if clause_opt {
                if !clause_sat {
                    // The scratch was restored by the failing phases; the
                    // clause's own assignment lives in the optimistic
                    // buffer.
                    let opt = self.tmp_opt_input.clone();
                    self.restore_input(&opt);
                }
                solved[i] = true;
                let frozen: Vec<usize> = self.mutable_indexes(clause);
                self.frozen.extend(frozen);

                let solved_count = solved.iter().filter(|s| **s).count() as u64;
                self.publish_optimistic(solved_count, 0);
            }

            all_sat &= clause_sat;
            all_opt &= clause_opt;
            if !all_sat && !all_opt {
                debug!(clause = i, "conjunction pass cannot recover");
                break;
            }
        }

        self.frozen.clear();

        // The accumulated assignment may satisfy the whole query even when
        // the individual clause solves did not line up.
        if all_opt && self.check_candidate_forced(branch, pi)? {
            return Ok(PhaseState::Sat);
        }
        Ok(PhaseState::Inconclusive)
    }

    /// Try to repair an optimistic proof into a full one.
    ///
    /// Returns `true` when the buffer now satisfies the whole query.
    fn multigoal_repair(&mut self, pi: &Expr, branch: &Expr) -> Result<bool, Timeout> {
        // The optimistic proof is the starting point.
        let opt = self.tmp_opt_input.clone();
        self.restore_input(&opt);
        self.eval_digests.clear();

        if self.freeze_neighbours(pi, branch)? {
            return Ok(true);
        }

        let branch_bytes = self.mutable_indexes(branch);

        // Path clauses sharing a byte with the branch and broken by the
        // optimistic assignment.
        let mut conflicting: Vec<Expr> = vec![];
        let mut seen: HashSet<u64> = HashSet::new();
        for index in &branch_bytes {
            let clauses: Vec<Expr> = self.conflicts.get(index).cloned().unwrap_or_default();
            for clause in clauses {
                if !seen.insert(clause.structural_hash()) {
                    continue;
                }
                if self.eval_expr(&clause)? == 0 {
                    conflicting.push(clause);
                }
            }
        }
        if conflicting.is_empty() {
            return Ok(false);
        }
        debug!(conflicts = conflicting.len(), "multigoal repair");

        let frozen_before: HashSet<usize> = self.frozen.clone();
        self.frozen.extend(branch_bytes.iter().copied());

        let run = |solver: &mut Self| -> Result<bool, Timeout> {
            for clause in &conflicting {
                solver.eval_digests.clear();
                let state = solver.cascade(pi, clause)?;
                if state == PhaseState::Sat {
                    let now_frozen: Vec<usize> = solver.mutable_indexes(clause);
                    solver.frozen.extend(now_frozen);
                }
            }
            solver.eval_digests.clear();
            solver.check_candidate_forced(branch, pi)
        };
        let result = run(self);

        self.frozen = frozen_before;
        result
    }

    /// When a single group dominates the branch, walk its neighbourhood
    /// without touching any other byte: the optimistic value is often just
    /// off the satisfying range of the path constraint.
    fn freeze_neighbours(&mut self, pi: &Expr, branch: &Expr) -> Result<bool, Timeout> {
        let groups = self.mutable_groups(branch);
        let [group] = groups.as_slice() else {
            return Ok(false);
        };
        let group = *group;

        let v0 = group.value_le(&self.tmp_input);
        let mask = crate::ast::width_mask(group.bits());
        for k in 1..=NEIGHBOURHOOD_RADIUS {
            for value in [v0.wrapping_add(k) & mask, v0.wrapping_sub(k) & mask] {
                if self.try_group_value_le(&group, value, branch, pi)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Rerun the cascade with pinned bytes mutable and range validation
    /// off. Statistics are restored afterwards; the optimistic proof (and
    /// a genuine hit, should one appear) is kept.
    fn aggressive_optimistic(&mut self, pi: &Expr, branch: &Expr) -> Result<bool, Timeout> {
        debug!("aggressive optimistic rerun");
        let stats_before = self.stats;
        self.aggressive = true;

        let outcome = self.cascade(pi, branch);

        self.aggressive = false;
        self.stats = stats_before;

        match outcome {
            Ok(PhaseState::Sat) => Ok(true),
            Ok(_) => Ok(false),
            Err(t) => Err(t),
        }
    }

    fn log_query(&mut self, branch: &Expr) {
        if !self.config.log_query_stats {
            return;
        }
        let (query_size, index_count, group_count, linear_ops, nonlinear_ops) = {
            let info = self.info_builder().info(branch);
            (
                info.query_size,
                info.input_extent(),
                info.index_groups.len() + info.index_groups_ud.len(),
                info.linear_ops,
                info.nonlinear_ops,
            )
        };
        let is_its = {
            let mut ib = self.info_builder();
            crate::analysis::detect_input_to_state(branch, &mut ib).is_some()
        };
        QueryLogLine {
            ctx_id: self.ctx_id,
            query_size,
            index_count,
            group_count,
            is_its,
            linear_ops,
            nonlinear_ops,
        }
        .append();
    }
}
