//! Per-group interval store
//!
//! Accumulates wrapped intervals from atomic comparisons seen in the path
//! constraint and answers two questions: what interval is known for a
//! group, and does a candidate buffer still satisfy every interval that
//! references a mutated byte.

use hashbrown::HashMap;
use tracing::trace;

use crate::analysis::group_match::match_group;
use crate::ast::{CmpOp, Expr, ExprKind};
use crate::group::IndexGroup;
use crate::interval::WrappedInterval;

/// An atomic comparison reduced to "this group lies in this interval".
#[derive(Debug, Clone, Copy)]
pub(crate) struct RangeConstraint {
    pub group: IndexGroup,
    pub interval: WrappedInterval,
}

/// Recognise `(possibly negated) cmp(±group ± const, const)` and turn it
/// into an interval over the raw group value.
pub(crate) fn parse_range_constraint(
    expr: &Expr,
    assignments: &[Expr],
    input_bytes: usize,
) -> Option<RangeConstraint> {
    let (expr, negated) = match expr.kind() {
        ExprKind::Not(arg) => (arg.clone(), true),
        _ => (expr.clone(), false),
    };
    let ExprKind::Cmp { op, lhs, rhs } = expr.kind() else {
        return None;
    };
    let mut op = if negated { op.negated() } else { *op };

    let (side, c, width) = match (lhs.as_const(), rhs.as_const()) {
        (None, Some((c, _))) => (lhs.clone(), c, lhs.width()),
        (Some((c, _)), None) => {
            op = op.swapped();
            (rhs.clone(), c, rhs.width())
        }
        _ => return None,
    };

    // Peel constant arithmetic wrapped around the group, maintaining
    // `compared value = sign·node + offset` with sign = −1 when inverted.
    let mut node = side;
    let mut offset = 0u64;
    let mut inverted = false;
    let signed = |k: u64, inv: bool| if inv { k.wrapping_neg() } else { k };
    loop {
        match node.kind() {
            ExprKind::BvAdd(args) => {
                let mut rest = None;
                let mut sum = 0u64;
                for arg in args {
                    match arg.as_const() {
                        Some((k, _)) => sum = sum.wrapping_add(k),
                        None => {
                            if rest.is_some() {
                                return None;
                            }
                            rest = Some(arg.clone());
                        }
                    }
                }
                offset = offset.wrapping_add(signed(sum, inverted));
                node = rest?;
            }
            ExprKind::BvSub(a, b) => match (a.as_const(), b.as_const()) {
                (None, Some((k, _))) => {
                    offset = offset.wrapping_sub(signed(k, inverted));
                    node = a.clone();
                }
                (Some((k, _)), None) => {
                    offset = offset.wrapping_add(signed(k, inverted));
                    inverted = !inverted;
                    node = b.clone();
                }
                _ => return None,
            },
            ExprKind::BvNeg(a) => {
                inverted = !inverted;
                node = a.clone();
            }
            _ => break,
        }
    }

    let m = match_group(&node, assignments, input_bytes)?;
    if m.approx {
        return None;
    }

    let wi = WrappedInterval::from_comparison(c, op, width)?;
    let wi = wi.sub_constant(offset);
    let wi = if inverted { wi.invert() } else { wi };

    let group_bits = m.group.bits();
    let interval = if wi.size() <= group_bits {
        wi.widen(group_bits)
    } else {
        // A wide comparison over a narrower group: only representable when
        // every member fits the group domain.
        wi.narrow(group_bits)?
    };

    Some(RangeConstraint {
        group: m.group,
        interval,
    })
}

/// Group-value intervals accumulated from the path constraint.
#[derive(Debug, Default)]
pub struct RangeStore {
    intervals: HashMap<IndexGroup, WrappedInterval>,
    by_index: HashMap<usize, Vec<IndexGroup>>,
}

impl RangeStore {
    /// Fold an atomic constraint into the store. Returns `true` when the
    /// expression was recognised.
    pub(crate) fn update_constraint(&mut self, expr: &Expr, assignments: &[Expr], input_bytes: usize) -> bool {
        let Some(rc) = parse_range_constraint(expr, assignments, input_bytes) else {
            return false;
        };
        self.update(rc.group, rc.interval);
        true
    }

    pub(crate) fn update(&mut self, group: IndexGroup, interval: WrappedInterval) {
        let entry = self
            .intervals
            .entry(group)
            .and_modify(|wi| *wi = wi.intersect(&interval))
            .or_insert(interval);
        trace!(group = ?group.as_slice(), range = entry.range(), "range store update");

        for index in group.iter() {
            let groups = self.by_index.entry(index).or_default();
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
    }

    /// Stored interval for `group`, if any.
    pub fn group_interval(&self, group: &IndexGroup) -> Option<WrappedInterval> {
        self.intervals.get(group).copied()
    }

    /// Groups referencing a byte index.
    pub fn groups_of_index(&self, index: usize) -> &[IndexGroup] {
        self.by_index.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether every stored interval referenced by any byte of `group`
    /// still contains its group value under `values`.
    pub fn valid_eval_group(&self, group: &IndexGroup, values: &[u64]) -> bool {
        group.iter().all(|index| self.valid_eval_index(index, values))
    }

    /// Whether every stored interval referenced by `index` still contains
    /// its group value under `values`.
    pub fn valid_eval_index(&self, index: usize, values: &[u64]) -> bool {
        self.groups_of_index(index).iter().all(|g| {
            self.intervals
                .get(g)
                .map(|wi| wi.contains(g.value_le(values)))
                .unwrap_or(true)
        })
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn word(lo: usize) -> Expr {
        Expr::concat(vec![Expr::input(lo + 1), Expr::input(lo)])
    }

    #[test]
    fn plain_comparison() {
        let e = Expr::ult(word(0), Expr::constant(0x1000, 16));
        let rc = parse_range_constraint(&e, &[], 8).unwrap();
        assert_eq!(rc.group.as_slice(), &[1, 0]);
        assert_eq!((rc.interval.min(), rc.interval.max()), (0, 0x0fff));
    }

    #[test]
    fn negated_comparison_flips() {
        let e = Expr::not(Expr::ult(word(0), Expr::constant(0x1000, 16)));
        let rc = parse_range_constraint(&e, &[], 8).unwrap();
        assert_eq!((rc.interval.min(), rc.interval.max()), (0x1000, 0xffff));
    }

    #[test]
    fn swapped_sides() {
        let e = Expr::ugt(Expr::constant(0x20, 16), word(0));
        let rc = parse_range_constraint(&e, &[], 8).unwrap();
        // 0x20 > g ⇒ g < 0x20.
        assert_eq!((rc.interval.min(), rc.interval.max()), (0, 0x1f));
    }

    #[test]
    fn additive_offset_is_peeled() {
        // g + 0x10 <= 0x30 ⇒ g ∈ [-0x10, 0x20] cyclically.
        let e = Expr::cmp(
            CmpOp::Ule,
            Expr::add(vec![word(0), Expr::constant(0x10, 16)]),
            Expr::constant(0x30, 16),
        );
        let rc = parse_range_constraint(&e, &[], 8).unwrap();
        assert_eq!((rc.interval.min(), rc.interval.max()), (0xfff0, 0x20));
        assert!(rc.interval.contains(0x0000));
        assert!(rc.interval.contains(0x0020));
        assert!(!rc.interval.contains(0x0021));
    }

    #[test]
    fn inverted_group_sign() {
        // 0x05 - g <=u 0x02 ⇒ g ∈ [0x03, 0x05].
        let e = Expr::cmp(
            CmpOp::Ule,
            Expr::sub(Expr::constant(0x05, 16), word(0)),
            Expr::constant(0x02, 16),
        );
        let rc = parse_range_constraint(&e, &[], 8).unwrap();
        assert!(rc.interval.contains(0x03));
        assert!(rc.interval.contains(0x05));
        assert!(!rc.interval.contains(0x02));
        assert!(!rc.interval.contains(0x06));
    }

    #[test]
    fn store_intersects_on_update() {
        let mut store = RangeStore::default();
        let g = IndexGroup::from_indices(&[1, 0]).unwrap();

        store.update(g, WrappedInterval::from_comparison(0x1000, CmpOp::Ult, 16).unwrap());
        assert_eq!(store.group_interval(&g).unwrap().range(), 0x1000);

        store.update(g, WrappedInterval::from_comparison(0x0ff0, CmpOp::Ugt, 16).unwrap());
        let wi = store.group_interval(&g).unwrap();
        assert_eq!((wi.min(), wi.max()), (0x0ff1, 0x0fff));
    }

    #[test]
    fn valid_eval_checks_all_groups_of_a_byte() {
        let mut store = RangeStore::default();
        let g = IndexGroup::from_indices(&[1, 0]).unwrap();
        store.update(g, WrappedInterval::from_comparison(0x1000, CmpOp::Ult, 16).unwrap());

        let mut values = vec![0u64; 8];
        g.set_le(&mut values, 0x0fff);
        assert!(store.valid_eval_group(&g, &values));
        assert!(store.valid_eval_index(0, &values));

        g.set_le(&mut values, 0x1000);
        assert!(!store.valid_eval_group(&g, &values));
        assert!(!store.valid_eval_index(1, &values));

        // Untracked bytes are unconstrained.
        assert!(store.valid_eval_index(5, &values));
    }
}
