//! Shared test fixtures: a reference tree-walking evaluator and context
//! builders.
#![allow(dead_code)]

use fuzzbv::ast::{sext, width_mask, Expr, ExprKind};
use fuzzbv::config::Config;
use fuzzbv::eval::Evaluator;
use fuzzbv::solver::Solver;
use fuzzbv::testcase::Testcase;

/// Reference evaluator interpreting the expression tree directly.
///
/// Booleans come back as 0/1, bitvectors as their unsigned 64-bit
/// truncation; the depth signal is the node count.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeEvaluator;

impl Evaluator for TreeEvaluator {
    fn eval(&mut self, expr: &Expr, values: &[u64], _sizes: &[u8], depth: Option<&mut u64>) -> u64 {
        if let Some(depth) = depth {
            *depth = node_count(expr);
        }
        eval_node(expr, values)
    }
}

fn node_count(expr: &Expr) -> u64 {
    1 + expr.children().iter().map(node_count).sum::<u64>()
}

fn eval_node(expr: &Expr, values: &[u64]) -> u64 {
    let width = expr.width();
    let mask = width_mask(width);

    match expr.kind() {
        ExprKind::Input(i) => values.get(*i).copied().unwrap_or(0),
        ExprKind::Const { value, .. } => *value,
        ExprKind::Bool(b) => *b as u64,

        ExprKind::Concat(args) => {
            let mut acc = 0u64;
            for arg in args {
                let w = arg.width();
                acc = if w >= 64 { 0 } else { acc << w };
                acc |= eval_node(arg, values) & width_mask(w);
            }
            acc & mask
        }
        ExprKind::Extract { lo, arg, .. } => {
            let v = eval_node(arg, values);
            if *lo >= 64 {
                0
            } else {
                (v >> lo) & mask
            }
        }
        ExprKind::ZeroExt { arg, .. } => eval_node(arg, values),
        ExprKind::SignExt { arg, .. } => (sext(eval_node(arg, values), arg.width()) as u64) & mask,

        ExprKind::BvNot(a) => !eval_node(a, values) & mask,
        ExprKind::BvNeg(a) => eval_node(a, values).wrapping_neg() & mask,
        ExprKind::BvAnd(args) => args.iter().map(|a| eval_node(a, values)).fold(mask, |x, y| x & y),
        ExprKind::BvOr(args) => args.iter().map(|a| eval_node(a, values)).fold(0, |x, y| x | y),
        ExprKind::BvXor(args) => args.iter().map(|a| eval_node(a, values)).fold(0, |x, y| x ^ y),
        ExprKind::BvAdd(args) => {
            args.iter()
                .map(|a| eval_node(a, values))
                .fold(0u64, |x, y| x.wrapping_add(y))
                & mask
        }
        ExprKind::BvMul(args) => {
            args.iter()
                .map(|a| eval_node(a, values))
                .fold(1u64, |x, y| x.wrapping_mul(y))
                & mask
        }
        ExprKind::BvSub(a, b) => eval_node(a, values).wrapping_sub(eval_node(b, values)) & mask,
        ExprKind::BvShl(a, b) => {
            let shift = eval_node(b, values);
            if shift >= width.min(64) as u64 {
                0
            } else {
                (eval_node(a, values) << shift) & mask
            }
        }
        ExprKind::BvLshr(a, b) => {
            let shift = eval_node(b, values);
            if shift >= width.min(64) as u64 {
                0
            } else {
                (eval_node(a, values) & mask) >> shift
            }
        }
        ExprKind::BvAshr(a, b) => {
            let shift = eval_node(b, values).min(width.min(64) as u64 - 1);
            let signed = sext(eval_node(a, values), width.min(64));
            ((signed >> shift) as u64) & mask
        }
        ExprKind::BvUdiv(a, b) => {
            let d = eval_node(b, values) & mask;
            if d == 0 {
                mask
            } else {
                ((eval_node(a, values) & mask) / d) & mask
            }
        }
        ExprKind::BvSdiv(a, b) => {
            let d = eval_node(b, values) & mask;
            if d == 0 {
                mask
            } else {
                let w = width.min(64);
                (sext(eval_node(a, values), w).wrapping_div(sext(d, w)) as u64) & mask
            }
        }
        ExprKind::BvUrem(a, b) => {
            let n = eval_node(a, values) & mask;
            let d = eval_node(b, values) & mask;
            if d == 0 {
                n
            } else {
                n % d
            }
        }
        ExprKind::BvSrem(a, b) => {
            let n = eval_node(a, values) & mask;
            let d = eval_node(b, values) & mask;
            if d == 0 {
                n
            } else {
                let w = width.min(64);
                (sext(n, w).wrapping_rem(sext(d, w)) as u64) & mask
            }
        }

        ExprKind::Ite(c, t, e) => {
            if eval_node(c, values) != 0 {
                eval_node(t, values)
            } else {
                eval_node(e, values)
            }
        }
        ExprKind::Cmp { op, lhs, rhs } => {
            let w = lhs.width().max(rhs.width()).min(64);
            op.eval(eval_node(lhs, values), eval_node(rhs, values), w) as u64
        }
        ExprKind::Not(a) => (eval_node(a, values) == 0) as u64,
        ExprKind::And(args) => args.iter().all(|a| eval_node(a, values) != 0) as u64,
        ExprKind::Or(args) => args.iter().any(|a| eval_node(a, values) != 0) as u64,
    }
}

/// Solver over an all-zero seed of `len` bytes, environment ignored.
pub fn zero_seed_solver(len: usize) -> Solver<TreeEvaluator> {
    solver_with_config(len, Config::default())
}

/// Same, with a caller-tweaked configuration.
pub fn solver_with_config(len: usize, config: Config) -> Solver<TreeEvaluator> {
    Solver::with_config(TreeEvaluator, Testcase::from_bytes(&vec![0u8; len]), vec![], 0, config)
        .with_rng_seed(0x5eed)
}

/// Shorthand for a byte symbol.
pub fn byte(i: usize) -> Expr {
    Expr::input(i)
}

/// `concat(b_{hi}, …, b_{lo})`: a little-endian multi-byte view.
pub fn word(lo: usize, n: usize) -> Expr {
    let args: Vec<Expr> = (0..n).rev().map(|k| Expr::input(lo + k)).collect();
    Expr::concat(args)
}

/// Evaluate an expression over plain bytes with the reference evaluator.
pub fn eval_bytes(expr: &Expr, bytes: &[u8]) -> u64 {
    let values: Vec<u64> = bytes.iter().map(|&b| b as u64).collect();
    eval_node(expr, &values)
}
