//! Input-group recognition
//!
//! Walks an expression and decides whether it is, byte for byte, a view of
//! contiguous symbolic input. Each operator is its own case returning an
//! optional match, so unsupported shapes fall out naturally instead of
//! poisoning the caller.

use crate::ast::{Expr, ExprKind};
use crate::group::IndexGroup;

/// A recognised multi-byte input view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupMatch {
    pub group: IndexGroup,
    /// The view does not fall on byte boundaries; usable for mutation but
    /// excluded from strict input-to-state.
    pub approx: bool,
}

impl GroupMatch {
    const fn exact(group: IndexGroup) -> Self {
        Self { group, approx: false }
    }
}

/// Recognise `expr` as an input group.
///
/// `assignments` dereferences indices past the raw input bytes: a symbol
/// with index `input_bytes + k` stands for the `k`-th registered
/// assignment expression.
pub(crate) fn match_group(expr: &Expr, assignments: &[Expr], input_bytes: usize) -> Option<GroupMatch> {
    match expr.kind() {
        ExprKind::Input(i) => match_input(*i, assignments, input_bytes),
        ExprKind::Concat(args) => match_concat(args, assignments, input_bytes),
        ExprKind::Extract { hi, lo, arg } => match_extract(*hi, *lo, arg, assignments, input_bytes),
        ExprKind::BvAnd(args) => match_and_mask(args, assignments, input_bytes),
        ExprKind::BvOr(args) | ExprKind::BvAdd(args) => match_shifted_bytes(args, assignments, input_bytes),
        ExprKind::ZeroExt { arg, .. } => match_group(arg, assignments, input_bytes),
        ExprKind::SignExt { arg, .. } => {
            // The extension bytes depend on the sign bit, so the view only
            // matches the value for non-negative contents.
            match_group(arg, assignments, input_bytes).map(|m| GroupMatch { approx: true, ..m })
        }
        _ => None,
    }
}

fn match_input(index: usize, assignments: &[Expr], input_bytes: usize) -> Option<GroupMatch> {
    if index < input_bytes {
        return Some(GroupMatch::exact(IndexGroup::single(index)));
    }
    let assignment = assignments.get(index - input_bytes)?;
    match_group(assignment, assignments, input_bytes)
}

fn match_concat(args: &[Expr], assignments: &[Expr], input_bytes: usize) -> Option<GroupMatch> {
    let mut group = IndexGroup::new();
    let mut approx = false;
    let mut saw_input = false;
    let mut constant_gap = false;

    for arg in args {
        if let ExprKind::Const { .. } = arg.kind() {
            // A literal after some input bytes only stays harmless if no
            // further input follows.
            if saw_input {
                constant_gap = true;
            }
            continue;
        }
        let sub = match_group(arg, assignments, input_bytes)?;
        if constant_gap {
            approx = true;
        }
        group.extend(&sub.group).ok()?;
        approx |= sub.approx;
        saw_input = true;
    }

    if group.is_empty() {
        return None;
    }
    Some(GroupMatch { group, approx })
}

fn match_extract(hi: u32, lo: u32, arg: &Expr, assignments: &[Expr], input_bytes: usize) -> Option<GroupMatch> {
    let sub = match_group(arg, assignments, input_bytes)?;
    let n = sub.group.len();

    let lo_byte = (lo / 8) as usize;
    let hi_byte = (hi / 8) as usize;
    if hi_byte >= n {
        return None;
    }

    // Positions are counted from the least significant byte; the stored
    // order is most significant first.
    let mut group = IndexGroup::new();
    for pos in (lo_byte..=hi_byte).rev() {
        group.push(sub.group.as_slice()[n - 1 - pos] as usize).ok()?;
    }

    // The high-boundary check degenerates to `hi != 7`, so every extract
    // except the lowest byte is marked approximated. Kept as-is.
    let approx = sub.approx || lo % 8 != 0 || hi != 7;
    Some(GroupMatch { group, approx })
}

fn match_and_mask(args: &[Expr], assignments: &[Expr], input_bytes: usize) -> Option<GroupMatch> {
    let [a, b] = args else { return None };
    let (arg, mask) = match (a.as_const(), b.as_const()) {
        (Some((mask, _)), None) => (b, mask),
        (None, Some((mask, _))) => (a, mask),
        _ => return None,
    };
    if mask == 0 {
        return None;
    }

    let sub = match_group(arg, assignments, input_bytes)?;
    let n = sub.group.len();

    let rightmost = mask.trailing_zeros();
    let leftmost = 63 - mask.leading_zeros();
    let lo_byte = (rightmost / 8) as usize;
    let hi_byte = (leftmost / 8) as usize;
    if hi_byte >= n {
        return None;
    }

    let mut group = IndexGroup::new();
    for pos in (lo_byte..=hi_byte).rev() {
        group.push(sub.group.as_slice()[n - 1 - pos] as usize).ok()?;
    }

    let span: u64 = ((lo_byte..=hi_byte).fold(0u64, |acc, byte| acc | (0xffu64 << (8 * byte))))
        & if n >= 8 { u64::MAX } else { (1 << (8 * n)) - 1 };
    let approx = sub.approx || mask != span;
    Some(GroupMatch { group, approx })
}

/// Recognise `or`/`add` of byte-wide terms shifted to byte positions, e.g.
/// `(zext(b1) << 8) | zext(b0)`. Rejects overlapping positions.
fn match_shifted_bytes(args: &[Expr], assignments: &[Expr], input_bytes: usize) -> Option<GroupMatch> {
    let mut slots = [None; crate::consts::MAX_GROUP_SIZE];
    let mut approx = false;
    let mut top = 0usize;

    for arg in args {
        let (term, shift) = match arg.kind() {
            ExprKind::BvShl(value, amount) => (value.clone(), amount.as_const()?.0),
            _ => (arg.clone(), 0),
        };
        if shift % 8 != 0 {
            return None;
        }
        let pos = (shift / 8) as usize;

        let sub = match_group(&term, assignments, input_bytes)?;
        if sub.group.len() != 1 {
            return None;
        }
        if pos >= slots.len() || slots[pos].is_some() {
            return None;
        }
        slots[pos] = Some(sub.group.as_slice()[0] as usize);
        approx |= sub.approx;
        top = top.max(pos);
    }

    let mut group = IndexGroup::new();
    for pos in (0..=top).rev() {
        group.push(slots[pos]?).ok()?;
    }
    Some(GroupMatch { group, approx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn exact_indices(m: &GroupMatch) -> Vec<u32> {
        m.group.as_slice().to_vec()
    }

    #[test]
    fn single_symbol() {
        let m = match_group(&Expr::input(3), &[], 8).unwrap();
        assert_eq!(exact_indices(&m), vec![3]);
        assert!(!m.approx);
    }

    #[test]
    fn concat_of_symbols() {
        let e = Expr::concat(vec![Expr::input(3), Expr::input(2), Expr::input(1), Expr::input(0)]);
        let m = match_group(&e, &[], 8).unwrap();
        assert_eq!(exact_indices(&m), vec![3, 2, 1, 0]);
        assert!(!m.approx);
    }

    #[test]
    fn concat_with_constant_between_inputs_is_approx() {
        let e = Expr::concat(vec![Expr::input(1), Expr::constant(0, 8), Expr::input(0)]);
        let m = match_group(&e, &[], 8).unwrap();
        assert!(m.approx);

        // A leading literal is just padding.
        let e = Expr::concat(vec![Expr::constant(0, 24), Expr::input(0)]);
        let m = match_group(&e, &[], 8).unwrap();
        assert!(!m.approx);
        assert_eq!(exact_indices(&m), vec![0]);
    }

    #[test]
    fn extract_takes_byte_range() {
        let cat = Expr::concat(vec![Expr::input(3), Expr::input(2), Expr::input(1), Expr::input(0)]);
        let m = match_group(&Expr::extract(23, 8, cat), &[], 8).unwrap();
        assert_eq!(exact_indices(&m), vec![2, 1]);
        assert!(m.approx); // high boundary is not bit 7

        let cat = Expr::concat(vec![Expr::input(1), Expr::input(0)]);
        let m = match_group(&Expr::extract(7, 0, cat), &[], 8).unwrap();
        assert_eq!(exact_indices(&m), vec![0]);
        assert!(!m.approx);
    }

    #[test]
    fn and_mask_selects_bytes() {
        let cat = Expr::concat(vec![Expr::input(1), Expr::input(0)]);
        let m = match_group(&Expr::bvand(vec![cat.clone(), Expr::constant(0xff00, 16)]), &[], 8).unwrap();
        assert_eq!(exact_indices(&m), vec![1]);
        assert!(!m.approx);

        let m = match_group(&Expr::bvand(vec![cat, Expr::constant(0x0f00, 16)]), &[], 8).unwrap();
        assert_eq!(exact_indices(&m), vec![1]);
        assert!(m.approx);
    }

    #[test]
    fn shifted_byte_assembly() {
        let b0 = Expr::zero_ext(8, Expr::input(0));
        let b1 = Expr::zero_ext(8, Expr::input(1));
        let e = Expr::bvor(vec![Expr::shl(b1, Expr::constant(8, 16)), b0]);
        let m = match_group(&e, &[], 8).unwrap();
        assert_eq!(exact_indices(&m), vec![1, 0]);
        assert!(!m.approx);
    }

    #[test]
    fn overlapping_positions_reject() {
        let b0 = Expr::zero_ext(8, Expr::input(0));
        let b1 = Expr::zero_ext(8, Expr::input(1));
        let e = Expr::add(vec![b0, b1]);
        assert!(match_group(&e, &[], 8).is_none());
    }

    #[test]
    fn assignment_indices_dereference() {
        let word = Expr::concat(vec![Expr::input(1), Expr::input(0)]);
        let m = match_group(&Expr::input(8), &[word], 8).unwrap();
        assert_eq!(exact_indices(&m), vec![1, 0]);
    }

    #[test]
    fn arithmetic_is_not_a_group() {
        let e = Expr::add(vec![Expr::zero_ext(8, Expr::input(0)), Expr::constant(3, 16)]);
        assert!(match_group(&e, &[], 8).is_none());
    }
}
