//! Input-to-state comparison detection
//!
//! Recognises branch conditions of the shape `cmp(group, value)` where one
//! side is exactly an input group and the other is a literal or an
//! expression with no inputs of its own (evaluable at solve time). The
//! comparison constant is adjusted so that injecting it lands on the
//! satisfying side.

use crate::analysis::group_match::match_group;
use crate::analysis::info::InfoBuilder;
use crate::ast::{width_mask, CmpOp, Expr, ExprKind};
use crate::group::IndexGroup;

/// Right-hand side of a detected input-to-state comparison.
#[derive(Debug, Clone)]
pub enum ItsRhs {
    /// Literal value, truncated to the comparison width.
    Const(u64),
    /// Input-free expression, evaluated against the current candidate.
    Evaluable(Expr),
}

/// A branch condition classified as input-to-state.
#[derive(Debug, Clone)]
pub struct ItsMatch {
    pub group: IndexGroup,
    /// Comparison normalised to `group op rhs`, negation folded in.
    pub op: CmpOp,
    pub rhs: ItsRhs,
    /// Width of the comparison in bits.
    pub width: u32,
}

/// Classify `expr` as an input-to-state comparison.
pub(crate) fn detect_input_to_state(expr: &Expr, ib: &mut InfoBuilder<'_>) -> Option<ItsMatch> {
    detect_rec(expr, false, ib, 0)
}

fn detect_rec(expr: &Expr, negated: bool, ib: &mut InfoBuilder<'_>, depth: u8) -> Option<ItsMatch> {
    match expr.kind() {
        ExprKind::Not(arg) => detect_rec(arg, !negated, ib, depth),

        // One unwrapping step: a disjunction (or a negated conjunction)
        // where every operand but one is input-free reduces to the
        // remaining operand.
        ExprKind::Or(args) if !negated && depth == 0 => unwrap_single(args, false, ib),
        ExprKind::And(args) if negated && depth == 0 => unwrap_single(args, true, ib),

        ExprKind::Cmp { op, lhs, rhs } => {
            let op = if negated { op.negated() } else { *op };
            let width = lhs.width().max(rhs.width());

            let classify = |group_side: &Expr, value_side: &Expr, op: CmpOp, ib: &mut InfoBuilder<'_>| {
                let m = match_group(group_side, ib.assignments, ib.input_bytes)?;
                if m.approx {
                    return None;
                }
                let rhs = match value_side.kind() {
                    ExprKind::Const { value, .. } => ItsRhs::Const(*value),
                    _ => {
                        let info = ib.info(value_side);
                        if info.input_extent() != 0 {
                            return None;
                        }
                        ItsRhs::Evaluable(value_side.clone())
                    }
                };
                Some(ItsMatch {
                    group: m.group,
                    op,
                    rhs,
                    width,
                })
            };

            classify(lhs, rhs, op, ib).or_else(|| classify(rhs, lhs, op.swapped(), ib))
        }

        _ => None,
    }
}

fn unwrap_single(args: &[Expr], negate_operand: bool, ib: &mut InfoBuilder<'_>) -> Option<ItsMatch> {
    let mut remaining = None;
    for arg in args {
        let info = ib.info(arg);
        if info.input_extent() == 0 {
            continue;
        }
        if remaining.is_some() {
            return None;
        }
        remaining = Some(arg.clone());
    }
    detect_rec(&remaining?, negate_operand, ib, 1)
}

/// Normalised `cmp(group, const)` shape of an expression, without the
/// evaluable-side handling. Used when scanning ITE conditions.
pub(crate) fn detect_cmp_shape(
    expr: &Expr,
    assignments: &[Expr],
    input_bytes: usize,
) -> Option<(CmpOp, IndexGroup, u64, u32)> {
    let (expr, negated) = match expr.kind() {
        ExprKind::Not(arg) => (arg, true),
        _ => (expr, false),
    };
    let ExprKind::Cmp { op, lhs, rhs } = expr.kind() else {
        return None;
    };
    let op = if negated { op.negated() } else { *op };
    let width = lhs.width().max(rhs.width());

    if let (Some(m), Some((c, _))) = (match_group(lhs, assignments, input_bytes), rhs.as_const()) {
        if !m.approx {
            return Some((op, m.group, c, width));
        }
    }
    if let (Some((c, _)), Some(m)) = (lhs.as_const(), match_group(rhs, assignments, input_bytes)) {
        if !m.approx {
            return Some((op.swapped(), m.group, c, width));
        }
    }
    None
}

/// Move `c` onto the satisfying side of `value op c`, by one where the
/// comparison is strict. Returns `None` when no value of the width can
/// satisfy the comparison.
pub(crate) fn adjust_to_sat_side(op: CmpOp, c: u64, width: u32) -> Option<u64> {
    let mask = width_mask(width);
    let c = c & mask;
    let smin = if width >= 64 { 1u64 << 63 } else { 1u64 << (width - 1) };
    let smax = smin - 1;

    match op {
        CmpOp::Eq | CmpOp::Ule | CmpOp::Uge | CmpOp::Sle | CmpOp::Sge => Some(c),
        CmpOp::Ne => Some(c.wrapping_add(1) & mask),
        CmpOp::Ult => c.checked_sub(1),
        CmpOp::Ugt => {
            if c == mask {
                None
            } else {
                Some(c + 1)
            }
        }
        CmpOp::Slt => {
            if c == smin & mask {
                None
            } else {
                Some(c.wrapping_sub(1) & mask)
            }
        }
        CmpOp::Sgt => {
            if c == smax & mask {
                None
            } else {
                Some(c.wrapping_add(1) & mask)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::info::AstInfoCache;
    use hashbrown::HashSet;

    fn with_builder<R>(f: impl FnOnce(&mut InfoBuilder<'_>) -> R) -> R {
        let mut cache = AstInfoCache::default();
        let ud = HashSet::new();
        let mut consts = HashSet::new();
        let mut ib = InfoBuilder {
            cache: &mut cache,
            assignments: &[],
            input_bytes: 16,
            univocally_defined: &ud,
            early_constants: &mut consts,
        };
        f(&mut ib)
    }

    #[test]
    fn plain_equality() {
        let b = Expr::eq(Expr::input(0), Expr::constant(0x42, 8));
        let m = with_builder(|ib| detect_input_to_state(&b, ib)).unwrap();
        assert_eq!(m.group.as_slice(), &[0]);
        assert_eq!(m.op, CmpOp::Eq);
        assert!(matches!(m.rhs, ItsRhs::Const(0x42)));
    }

    #[test]
    fn swapped_and_negated() {
        // !(0x10 <=u b0) ⇒ b0 <u 0x10 after normalisation.
        let b = Expr::not(Expr::cmp(CmpOp::Ule, Expr::constant(0x10, 8), Expr::input(0)));
        let m = with_builder(|ib| detect_input_to_state(&b, ib)).unwrap();
        assert_eq!(m.op, CmpOp::Ult);
        assert_eq!(adjust_to_sat_side(m.op, 0x10, 8), Some(0x0f));
    }

    #[test]
    fn or_unwrapping() {
        let cmp = Expr::eq(
            Expr::concat(vec![Expr::input(1), Expr::input(0)]),
            Expr::constant(0xbeef, 16),
        );
        let b = Expr::or(vec![Expr::bool_const(false), cmp]);
        let m = with_builder(|ib| detect_input_to_state(&b, ib)).unwrap();
        assert_eq!(m.group.as_slice(), &[1, 0]);
        assert!(matches!(m.rhs, ItsRhs::Const(0xbeef)));
    }

    #[test]
    fn two_input_disjuncts_reject() {
        let c0 = Expr::eq(Expr::input(0), Expr::constant(1, 8));
        let c1 = Expr::eq(Expr::input(1), Expr::constant(2, 8));
        let b = Expr::or(vec![c0, c1]);
        assert!(with_builder(|ib| detect_input_to_state(&b, ib)).is_none());
    }

    #[test]
    fn approximated_groups_reject() {
        let cat = Expr::concat(vec![Expr::input(1), Expr::input(0)]);
        let nibble = Expr::extract(11, 0, cat);
        let b = Expr::eq(nibble, Expr::constant(0xabc, 12));
        assert!(with_builder(|ib| detect_input_to_state(&b, ib)).is_none());
    }

    #[test]
    fn evaluable_side_is_kept() {
        let rhs = Expr::add(vec![Expr::constant(1, 8), Expr::constant(2, 8)]);
        let b = Expr::eq(Expr::input(3), rhs);
        let m = with_builder(|ib| detect_input_to_state(&b, ib)).unwrap();
        assert!(matches!(m.rhs, ItsRhs::Evaluable(_)));
    }

    #[test]
    fn adjustment_edges() {
        assert_eq!(adjust_to_sat_side(CmpOp::Ult, 0, 8), None);
        assert_eq!(adjust_to_sat_side(CmpOp::Ugt, 0xff, 8), None);
        assert_eq!(adjust_to_sat_side(CmpOp::Slt, 0x80, 8), None);
        assert_eq!(adjust_to_sat_side(CmpOp::Sgt, 0x7f, 8), None);
        assert_eq!(adjust_to_sat_side(CmpOp::Sgt, 0xff, 8), Some(0x00));
        assert_eq!(adjust_to_sat_side(CmpOp::Ne, 0xff, 8), Some(0x00));
    }
}
