//! Wrapped-interval laws, checked against the comparison semantics.

use quickcheck_macros::quickcheck;

use fuzzbv::ast::{width_mask, CmpOp};
use fuzzbv::interval::WrappedInterval;

const OPS: [CmpOp; 9] = [
    CmpOp::Eq,
    CmpOp::Ult,
    CmpOp::Ule,
    CmpOp::Ugt,
    CmpOp::Uge,
    CmpOp::Slt,
    CmpOp::Sle,
    CmpOp::Sgt,
    CmpOp::Sge,
];

fn op_from(raw: u8) -> CmpOp {
    OPS[raw as usize % OPS.len()]
}

#[quickcheck]
fn constructor_is_sound_over_8_bits(c: u8, raw_op: u8) -> bool {
    let op = op_from(raw_op);
    let wi = WrappedInterval::from_comparison(c as u64, op, 8).unwrap();
    (0u64..=0xff).all(|x| wi.contains(x) == op.eval(x, c as u64, 8))
}

#[quickcheck]
fn constructor_is_sound_over_16_bits(c: u16, raw_op: u8, probe: u16) -> bool {
    let op = op_from(raw_op);
    let wi = WrappedInterval::from_comparison(c as u64, op, 16).unwrap();
    wi.contains(probe as u64) == op.eval(probe as u64, c as u64, 16)
}

#[quickcheck]
fn range_counts_members_over_8_bits(c: u8, raw_op: u8) -> bool {
    let op = op_from(raw_op);
    let wi = WrappedInterval::from_comparison(c as u64, op, 8).unwrap();
    let members = (0u64..=0xff).filter(|&x| wi.contains(x)).count() as u64;
    wi.range() == members
}

#[quickcheck]
fn iter_yields_exactly_the_members(c: u8, raw_op: u8) -> bool {
    let op = op_from(raw_op);
    let wi = WrappedInterval::from_comparison(c as u64, op, 8).unwrap();
    let mut iterated: Vec<u64> = wi.iter().collect();
    iterated.sort_unstable();
    let mut members: Vec<u64> = (0u64..=0xff).filter(|&x| wi.contains(x)).collect();
    members.sort_unstable();
    iterated == members
}

#[quickcheck]
fn intersection_never_grows(a_c: u8, a_op: u8, b_c: u8, b_op: u8) -> bool {
    let a = WrappedInterval::from_comparison(a_c as u64, op_from(a_op), 8).unwrap();
    let b = WrappedInterval::from_comparison(b_c as u64, op_from(b_op), 8).unwrap();
    let i = a.intersect(&b);
    (0u64..=0xff).all(|x| !i.contains(x) || (a.contains(x) && b.contains(x)))
}

#[quickcheck]
fn intersection_is_idempotent(c: u8, raw_op: u8) -> bool {
    let wi = WrappedInterval::from_comparison(c as u64, op_from(raw_op), 8).unwrap();
    let twice = wi.intersect(&wi);
    twice.is_empty() == wi.is_empty() && (0u64..=0xff).all(|x| twice.contains(x) == wi.contains(x))
}

#[quickcheck]
fn widening_preserves_membership(c: u8, raw_op: u8, probe: u8) -> bool {
    let op = op_from(raw_op);
    let wi = WrappedInterval::from_comparison(c as u64, op, 8).unwrap();
    let wide = wi.widen(16);
    let extended = if op.is_signed() {
        (fuzzbv::ast::sext(probe as u64, 8) as u64) & width_mask(16)
    } else {
        probe as u64
    };
    wide.contains(extended) == wi.contains(probe as u64)
}

#[quickcheck]
fn shifting_translates_membership(c: u8, raw_op: u8, k: u8, probe: u8) -> bool {
    let wi = WrappedInterval::from_comparison(c as u64, op_from(raw_op), 8).unwrap();
    let shifted = wi.add_constant(k as u64);
    shifted.contains(probe.wrapping_add(k) as u64) == wi.contains(probe as u64)
}

#[quickcheck]
fn inversion_negates_membership(c: u8, raw_op: u8, probe: u8) -> bool {
    let wi = WrappedInterval::from_comparison(c as u64, op_from(raw_op), 8).unwrap();
    let inv = wi.invert();
    inv.contains((probe as u64).wrapping_neg() & 0xff) == wi.contains(probe as u64)
}
