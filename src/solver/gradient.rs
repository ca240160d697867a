//! Gradient descent over group words
//!
//! A comparison predicate is reshaped into a distance expression whose
//! value shrinks as the assignment approaches the satisfying side; the
//! descent then walks the touched groups as machine words, doubling its
//! step while the distance improves. The real predicate is re-evaluated
//! after every improvement, so the distance only has to point downhill,
//! not be exact.

use hashbrown::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::trace;

use crate::ast::{width_mask, CmpOp, Expr, ExprKind};
use crate::error::Timeout;
use crate::eval::Evaluator;
use crate::group::IndexGroup;
use crate::state::PhaseState;

use super::Solver;

/// One descent variable: a group word or a lone byte.
#[derive(Debug, Clone, Copy)]
pub(crate) enum DescentVar {
    Group(IndexGroup),
    Byte(usize),
}

impl DescentVar {
    pub(crate) fn bits(&self) -> u32 {
        match self {
            DescentVar::Group(g) => g.bits(),
            DescentVar::Byte(_) => 8,
        }
    }

    pub(crate) fn get(&self, values: &[u64]) -> u64 {
        match self {
            DescentVar::Group(g) => g.value_le(values),
            DescentVar::Byte(i) => values[*i] & 0xff,
        }
    }

    pub(crate) fn set(&self, values: &mut [u64], value: u64) {
        match self {
            DescentVar::Group(g) => g.set_le(values, value),
            DescentVar::Byte(i) => values[*i] = value & 0xff,
        }
    }
}

/// What the descent is driving towards.
#[derive(Clone, Copy)]
pub(crate) enum GdGoal<'a> {
    /// Minimise the distance of a predicate; check the real query after
    /// every improvement.
    Predicate { branch: &'a Expr, pi: &'a Expr },
    /// Minimise the objective itself, only accepting candidates that keep
    /// the path constraint satisfied.
    Objective { pi: &'a Expr },
}

/// Result of a descent run.
pub(crate) enum GdOutcome {
    /// The real query was satisfied mid-descent.
    Sat,
    /// Local minimum; the objective's best value.
    Converged(u64),
}

impl<E: Evaluator> Solver<E> {
    pub(crate) fn phase_gradient(&mut self, pi: &Expr, branch: &Expr) -> Result<PhaseState, Timeout> {
        if self.config.skip_gradient_descend {
            return Ok(PhaseState::Inconclusive);
        }

        let Some(distance) = self.transform_to_distance(branch, false)? else {
            return Ok(PhaseState::Inconclusive);
        };
        let vars = self.descent_vars(branch);
        if vars.is_empty() {
            return Ok(PhaseState::Inconclusive);
        }

        let saved = self.snapshot_input();
        match self.gd_minimize(&distance, &vars, GdGoal::Predicate { branch, pi }) {
            Ok(GdOutcome::Sat) => Ok(PhaseState::Sat),
            Ok(GdOutcome::Converged(best)) => {
                trace!(best, "descent converged without a hit");
                self.restore_input(&saved);
                Ok(PhaseState::Inconclusive)
            }
            Err(t) => {
                self.restore_input(&saved);
                Err(t)
            }
        }
    }

    /// Groups as words; falls back to per-byte variables when two groups
    /// share a byte.
    pub(crate) fn descent_vars(&mut self, expr: &Expr) -> Vec<DescentVar> {
        let groups = self.mutable_groups(expr);
        let indexes = self.mutable_indexes(expr);

        let overlapping = groups
            .iter()
            .enumerate()
            .any(|(i, a)| groups.iter().skip(i + 1).any(|b| a.overlaps(b)));
        if overlapping {
            return indexes.into_iter().map(DescentVar::Byte).collect();
        }

        let mut vars: Vec<DescentVar> = groups.iter().copied().map(DescentVar::Group).collect();
        for index in indexes {
            if !groups.iter().any(|g| g.contains(index)) {
                vars.push(DescentVar::Byte(index));
            }
        }
        vars
    }

    /// Build the distance expression of a predicate: zero exactly on the
    /// satisfying side for orderings and equality, and pushing away from
    /// equality for disequality.
    pub(crate) fn transform_to_distance(&mut self, expr: &Expr, negated: bool) -> Result<Option<Expr>, Timeout> {
        match expr.kind() {
            ExprKind::Not(arg) => {
                let arg = arg.clone();
                self.transform_to_distance(&arg, !negated)
            }

            // A disjunction reduces to its only live operand: input-free
            // disjuncts that already evaluate false are dead weight.
            ExprKind::Or(args) if !negated => {
                let args = args.clone();
                let Some(live) = self.single_live_operand(&args, false)? else {
                    return Ok(None);
                };
                self.transform_to_distance(&live, false)
            }
            ExprKind::And(args) if negated => {
                let args = args.clone();
                let Some(live) = self.single_live_operand(&args, true)? else {
                    return Ok(None);
                };
                self.transform_to_distance(&live, true)
            }

            ExprKind::Cmp { op, lhs, rhs } => {
                let op = if negated { op.negated() } else { *op };
                let (lhs, rhs) = (lhs.clone(), rhs.clone());
                Ok(Some(build_distance(op, &lhs, &rhs)))
            }

            _ => Ok(None),
        }
    }

    /// Find the single operand still relevant to the search. `dead_when`
    /// is the truth value that makes an input-free operand irrelevant.
    fn single_live_operand(&mut self, args: &[Expr], dead_when: bool) -> Result<Option<Expr>, Timeout> {
        let mut live = None;
        for arg in args {
            let input_free = {
                let info = self.info_builder().info(arg);
                info.input_extent() == 0
            };
            if input_free {
                let value = self.eval_expr(arg)? != 0;
                if value == dead_when {
                    continue;
                }
            }
            if live.is_some() {
                return Ok(None);
            }
            live = Some(arg.clone());
        }
        Ok(live)
    }

    /// Iterative descent with doubling line search.
    pub(crate) fn gd_minimize(
        &mut self,
        objective: &Expr,
        vars: &[DescentVar],
        goal: GdGoal<'_>,
    ) -> Result<GdOutcome, Timeout> {
        let mut visited: HashSet<u64> = HashSet::new();
        visited.insert(digest(&self.tmp_input));

        let mut best = self.eval_expr(objective)?;
        if best == 0 {
            if let GdGoal::Predicate { branch, pi } = goal {
                if self.check_candidate(branch, pi)? {
                    return Ok(GdOutcome::Sat);
                }
            }
        }

        loop {
            let mut improved = false;

            for var in vars {
                let mask = width_mask(var.bits());
                for dir in [1i64, -1] {
                    let mut step = 1u64;
                    loop {
                        let current = var.get(&self.tmp_input);
                        let delta = if dir > 0 { step } else { step.wrapping_neg() };
                        let candidate = current.wrapping_add(delta) & mask;
                        if candidate == current {
                            break;
                        }

                        var.set(&mut self.tmp_input, candidate);
                        if !visited.insert(digest(&self.tmp_input)) {
                            var.set(&mut self.tmp_input, current);
                            break;
                        }

                        if let GdGoal::Objective { pi } = goal {
                            if self.eval_expr(pi)? == 0 {
                                var.set(&mut self.tmp_input, current);
                                break;
                            }
                        }

                        let value = self.eval_expr(objective)?;
                        if value >= best {
                            var.set(&mut self.tmp_input, current);
                            break;
                        }

                        best = value;
                        improved = true;
                        if let GdGoal::Predicate { branch, pi } = goal {
                            if self.check_candidate(branch, pi)? {
                                return Ok(GdOutcome::Sat);
                            }
                        }
                        if best == 0 {
                            break;
                        }
                        step = step.saturating_mul(2);
                    }
                }
            }

            if !improved {
                return Ok(GdOutcome::Converged(best));
            }
        }
    }
}

/// Extend a bitvector term to 64 bits in the stated signedness.
pub(crate) fn extend64(expr: &Expr, signed: bool) -> Expr {
    let width = expr.width();
    if width >= 64 {
        return expr.clone();
    }
    if signed {
        Expr::sign_ext(64 - width, expr.clone())
    } else {
        Expr::zero_ext(64 - width, expr.clone())
    }
}

fn build_distance(op: CmpOp, lhs: &Expr, rhs: &Expr) -> Expr {
    let signed = op.is_signed();
    let a = extend64(lhs, signed);
    let b = extend64(rhs, signed);
    let zero = Expr::constant(0, 64);

    let abs_diff = Expr::ite(
        Expr::ugt(a.clone(), b.clone()),
        Expr::sub(a.clone(), b.clone()),
        Expr::sub(b.clone(), a.clone()),
    );

    match op {
        CmpOp::Eq => abs_diff,
        CmpOp::Ne => Expr::neg(abs_diff),
        CmpOp::Ult | CmpOp::Ule | CmpOp::Slt | CmpOp::Sle => Expr::ite(
            Expr::cmp(op, lhs.clone(), rhs.clone()),
            zero,
            Expr::sub(a, b),
        ),
        CmpOp::Ugt | CmpOp::Uge | CmpOp::Sgt | CmpOp::Sge => Expr::ite(
            Expr::cmp(op, lhs.clone(), rhs.clone()),
            zero,
            Expr::sub(b, a),
        ),
    }
}

fn digest(values: &[u64]) -> u64 {
    let mut h = DefaultHasher::new();
    values.hash(&mut h);
    h.finish()
}
