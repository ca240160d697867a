//! Min/max optimisation and value enumeration
//!
//! Both services ride on the gradient-descent engine: optimisation
//! minimises the (possibly complemented) expression under a path-validity
//! check, and enumeration combines interval walks, single-byte sweeps and
//! greedy neighbourhood probing around the seed value.

use hashbrown::HashSet;

use crate::ast::{width_mask, Expr};
use crate::consts::FIND_ALL_GREEDY_STEPS;
use crate::error::{SolverError, Timeout};
use crate::eval::Evaluator;
use crate::group::IndexGroup;
use crate::state::ValueVerdict;

use super::gradient::{extend64, GdGoal, GdOutcome};
use super::Solver;

impl<E: Evaluator> Solver<E> {
    /// Maximise `expr` under the path constraint. Returns the achieved
    /// value and its witness proof.
    pub fn maximize(&mut self, pi: &Expr, expr: &Expr) -> Result<(u64, Vec<u8>), SolverError> {
        self.optimize(pi, expr, true)
    }

    /// Minimise `expr` under the path constraint. Returns the achieved
    /// value and its witness proof.
    pub fn minimize(&mut self, pi: &Expr, expr: &Expr) -> Result<(u64, Vec<u8>), SolverError> {
        self.optimize(pi, expr, false)
    }

    fn optimize(&mut self, pi: &Expr, expr: &Expr, maximize: bool) -> Result<(u64, Vec<u8>), SolverError> {
        let wide = extend64(expr, false);
        // Maximising x is minimising its complement, which is monotone
        // over the whole domain.
        let objective = if maximize { Expr::bvnot(wide) } else { wide };

        self.reset_input_to_seed();
        self.eval_digests.clear();
        self.timer.start();

        let vars = self.descent_vars(expr);
        let outcome = if vars.is_empty() {
            Ok(GdOutcome::Converged(0))
        } else if self.config.use_greedy_mamin {
            self.greedy_minimize(&objective, pi, &vars)
        } else {
            self.gd_minimize(&objective, &vars, GdGoal::Objective { pi })
        };
        self.timer.stop();

        if let Err(Timeout) = outcome {
            self.stats.timeouts += 1;
        }

        let value = self.eval_raw(expr);
        self.publish_proof();
        Ok((value, self.tmp_proof.clone()))
    }

    /// Byte-wise hill climbing used instead of the descent when requested:
    /// every variable tries a full sweep of its neighbourhood and keeps
    /// the best valid candidate, until a fixpoint.
    fn greedy_minimize(
        &mut self,
        objective: &Expr,
        pi: &Expr,
        vars: &[super::DescentVar],
    ) -> Result<GdOutcome, Timeout> {
        let mut best = self.eval_expr(objective)?;

        loop {
            let mut improved = false;

            for var in vars {
                let mask = width_mask(var.bits());
                let mut current = var.get(&self.tmp_input);

                let candidates: Vec<u64> = if mask <= 0xff {
                    (0..=mask).collect()
                } else {
                    let mut c: Vec<u64> = (1..=FIND_ALL_GREEDY_STEPS)
                        .flat_map(|k| [current.wrapping_add(k) & mask, current.wrapping_sub(k) & mask])
                        .collect();
                    c.push(0);
                    c.push(mask);
                    c
                };

                for candidate in candidates {
                    if candidate == current {
                        continue;
                    }
                    var.set(&mut self.tmp_input, candidate);
                    if self.eval_expr(pi)? == 0 {
                        var.set(&mut self.tmp_input, current);
                        continue;
                    }
                    let value = self.eval_expr(objective)?;
                    if value < best {
                        best = value;
                        improved = true;
                        current = candidate;
                    } else {
                        var.set(&mut self.tmp_input, current);
                    }
                }
            }

            if !improved {
                return Ok(GdOutcome::Converged(best));
            }
        }
    }

    /// Enumerate distinct values of `expr` under the path constraint.
    ///
    /// The callback receives a proof and the value it produces; it decides
    /// whether to continue, stop, or keep exploring silently.
    pub fn find_all_values<F>(&mut self, expr: &Expr, pi: &Expr, mut callback: F) -> Result<(), SolverError>
    where
        F: FnMut(&[u8], u64) -> ValueVerdict,
    {
        self.reset_input_to_seed();
        self.eval_digests.clear();
        self.timer.start();

        let mut groups = self.mutable_groups(expr);
        for index in self.mutable_indexes(expr) {
            if !groups.iter().any(|g| g.contains(index)) {
                groups.push(IndexGroup::single(index));
            }
        }

        let mut reporting = true;
        let mut seen: HashSet<u64> = HashSet::new();

        'groups: for group in groups {
            let candidates = self.enumeration_candidates(&group);

            let saved = self.save_group(&group);
            for value in candidates {
                group.set_le(&mut self.tmp_input, value);

                let probed = match self.probe_value(expr, pi) {
                    Ok(probed) => probed,
                    Err(Timeout) => {
                        self.stats.timeouts += 1;
                        self.restore_group(&group, saved);
                        break 'groups;
                    }
                };
                let Some(produced) = probed else { continue };

                if reporting && seen.insert(produced) {
                    match callback(&self.tmp_proof, produced) {
                        ValueVerdict::Stop => {
                            self.restore_group(&group, saved);
                            break 'groups;
                        }
                        ValueVerdict::Last => reporting = false,
                        ValueVerdict::Continue => {}
                    }
                }
            }
            self.restore_group(&group, saved);
        }

        self.timer.stop();
        Ok(())
    }

    /// Candidate values for one group: the known interval when small, the
    /// full byte domain for singletons, otherwise a greedy neighbourhood
    /// of the seed value plus both extremes.
    fn enumeration_candidates(&mut self, group: &IndexGroup) -> Vec<u64> {
        if let Some(wi) = self.ranges.group_interval(group) {
            if wi.range() <= 256 {
                return wi.iter().collect();
            }
        }
        if group.len() == 1 {
            return (0..=0xff).collect();
        }

        let mask = width_mask(group.bits());
        let v0 = group.value_le(&self.tmp_input);
        let mut out: Vec<u64> = vec![];
        for k in 1..=FIND_ALL_GREEDY_STEPS {
            out.push(v0.wrapping_add(k) & mask);
            out.push(v0.wrapping_sub(k) & mask);
        }
        for byte in 0..group.len() {
            for k in 1..=FIND_ALL_GREEDY_STEPS {
                out.push(v0.wrapping_add(k << (8 * byte)) & mask);
                out.push(v0.wrapping_sub(k << (8 * byte)) & mask);
            }
        }
        out.push(0);
        out.push(mask);
        out
    }

    /// Evaluate the path constraint and, when it holds, the expression;
    /// publishes the candidate as the current proof.
    fn probe_value(&mut self, expr: &Expr, pi: &Expr) -> Result<Option<u64>, Timeout> {
        if self.eval_expr(pi)? == 0 {
            return Ok(None);
        }
        let value = self.eval_raw(expr);
        self.publish_proof();
        Ok(Some(value))
    }
}
