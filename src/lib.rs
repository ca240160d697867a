//! Approximate, mutation-based decision procedure for quantifier-free
//! bitvector formulas.
//!
//! Given a path constraint, a candidate branch condition and a concrete
//! seed for the symbolic input, the solver tries to synthesise an
//! assignment satisfying both, or failing that one that at least
//! satisfies the branch (an optimistic solution). It is a fast best-effort
//! companion to a full SMT solver: it answers SAT quickly on easy formulas
//! and returns unknown otherwise; it never claims UNSAT.

pub mod analysis;
pub mod ast;
pub mod config;
pub mod consts;
pub mod error;
pub mod eval;
pub mod group;
pub mod interval;
pub mod rng;
pub mod solver;
pub mod state;
pub mod testcase;
pub mod timer;

pub mod prelude {
    pub use crate::analysis::{AstInfo, AstInfoCache, RangeStore};
    pub use crate::ast::{CmpOp, Expr, ExprKind, Sort};
    pub use crate::config::Config;
    pub use crate::error::SolverError;
    pub use crate::eval::Evaluator;
    pub use crate::group::IndexGroup;
    pub use crate::interval::WrappedInterval;
    pub use crate::solver::{Solver, SolverStats};
    pub use crate::state::{Phase, PhaseState, ValueVerdict};
    pub use crate::testcase::{dump_proof, Testcase};
}
