//! Path-constraint notification
//!
//! As symbolic execution proceeds, each new path clause is folded into the
//! context: equalities pin bytes as univocally defined, atomic comparisons
//! feed the range store, and everything else lands in the conflict map
//! that drives the multigoal coordinator.

use tracing::debug;

use crate::analysis::detect_input_to_state;
use crate::ast::{CmpOp, Expr, ExprKind};
use crate::eval::Evaluator;

use super::Solver;

impl<E: Evaluator> Solver<E> {
    /// Fold a path clause into the context. Idempotent per structural
    /// hash.
    pub fn notify_constraint(&mut self, constraint: &Expr) {
        if self.config.skip_notify {
            return;
        }
        if !self.processed.insert(constraint.structural_hash()) {
            return;
        }

        for clause in flatten_conjunction(constraint) {
            self.notify_atom(&clause);
        }
    }

    fn notify_atom(&mut self, clause: &Expr) {
        if self.mark_univocally_defined(clause) {
            return;
        }

        self.ranges
            .update_constraint(clause, &self.assignments, self.input_bytes);

        let info = self.info_builder().info(clause);
        let touched: Vec<usize> = info.indexes.iter().chain(info.indexes_ud.iter()).copied().collect();
        for index in touched {
            let entries = self.conflicts.entry(index).or_default();
            if !entries.iter().any(|e| e == clause) {
                entries.push(clause.clone());
            }
        }
    }

    /// Recognise `eq(group, expr)` with inputs on one side only and pin
    /// every byte of the group. Pinning invalidates the whole info cache,
    /// since memoised footprints partition indices by pin status.
    fn mark_univocally_defined(&mut self, clause: &Expr) -> bool {
        let ExprKind::Cmp { op: CmpOp::Eq, .. } = clause.kind() else {
            return false;
        };
        let mut ib = self.info_builder();
        let Some(its) = detect_input_to_state(clause, &mut ib) else {
            return false;
        };

        let mut changed = false;
        for index in its.group.iter() {
            changed |= self.univocally_defined.insert(index);
        }
        if changed {
            debug!(group = ?its.group.as_slice(), "univocally defined inputs");
            self.info_cache.invalidate();
        }

        // The pinned value is still a range fact.
        self.ranges
            .update_constraint(clause, &self.assignments, self.input_bytes);
        true
    }
}

/// Flatten a top-level conjunction, turning `not(or(..))` into the
/// conjunction of the negated operands.
pub(crate) fn flatten_conjunction(expr: &Expr) -> Vec<Expr> {
    let mut out = vec![];
    let mut stack = vec![expr.clone()];
    while let Some(e) = stack.pop() {
        match e.kind() {
            ExprKind::And(args) => stack.extend(args.iter().cloned()),
            ExprKind::Not(arg) => match arg.kind() {
                ExprKind::Or(args) => stack.extend(args.iter().map(|a| Expr::not(a.clone()))),
                _ => out.push(e.clone()),
            },
            _ => out.push(e.clone()),
        }
    }
    out.reverse();
    out
}
