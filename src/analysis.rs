//! Static analysis of branch conditions
//!
//! Pure AST walkers that recognise multi-byte input views, comparison
//! shapes and per-expression input footprints. Everything here is memoised
//! by structural hash and owned by the solver context.

mod group_match;
mod info;
mod input_to_state;
mod ranges;

pub use info::{AstInfo, AstInfoCache, IteConstant};
pub use ranges::RangeStore;

pub(crate) use info::InfoBuilder;
pub(crate) use input_to_state::{adjust_to_sat_side, detect_input_to_state, ItsRhs};
pub(crate) use ranges::parse_range_constraint;
