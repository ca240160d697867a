//! Environment-driven solver configuration
//!
//! Every recognised key accepts `"0"` or `"1"`; anything else is a fatal
//! configuration error. Unset keys fall back to their defaults.

use std::env;

use crate::error::SolverError;
use crate::state::{DeterministicPolicy, HavocPolicy};

/// Solving-strategy toggles, resolved once per context.
#[derive(Debug, Clone)]
pub struct Config {
    pub skip_notify: bool,
    pub skip_reuse: bool,
    pub skip_input_to_state: bool,
    pub skip_simple_math: bool,
    pub skip_input_to_state_extended: bool,
    pub skip_brute_force: bool,
    pub skip_range_brute_force: bool,
    pub skip_range_brute_force_opt: bool,
    pub skip_deterministic: bool,
    pub skip_single_walking_bit: bool,
    pub skip_two_walking_bit: bool,
    pub skip_four_walking_bit: bool,
    pub skip_byte_flip: bool,
    pub skip_arith8: bool,
    pub skip_arith16: bool,
    pub skip_arith32: bool,
    pub skip_arith64: bool,
    pub skip_int8: bool,
    pub skip_int16: bool,
    pub skip_int32: bool,
    pub skip_int64: bool,
    pub skip_flip_short: bool,
    pub skip_flip_int: bool,
    pub skip_flip_long: bool,
    pub skip_havoc: bool,
    pub skip_gradient_descend: bool,
    pub use_greedy_mamin: bool,
    pub check_unnecessary_eval: bool,
    pub log_query_stats: bool,
    /// Granularity of the deterministic stage.
    pub deterministic_policy: DeterministicPolicy,
    /// Input set havoc mutates.
    pub havoc_policy: HavocPolicy,
}

impl Config {
    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Result<Self, SolverError> {
        Ok(Self {
            skip_notify: flag("SKIP_NOTIFY", false)?,
            skip_reuse: flag("SKIP_REUSE", true)?,
            skip_input_to_state: flag("SKIP_INPUT_TO_STATE", false)?,
            skip_simple_math: flag("SKIP_SIMPLE_MATH", false)?,
            skip_input_to_state_extended: flag("SKIP_INPUT_TO_STATE_EXTENDED", false)?,
            skip_brute_force: flag("SKIP_BRUTE_FORCE", false)?,
            skip_range_brute_force: flag("SKIP_RANGE_BRUTE_FORCE", false)?,
            skip_range_brute_force_opt: flag("SKIP_RANGE_BRUTE_FORCE_OPT", false)?,
            skip_deterministic: flag("SKIP_DETERMINISTIC", false)?,
            skip_single_walking_bit: flag("SKIP_SINGLE_WALKING_BIT", false)?,
            skip_two_walking_bit: flag("SKIP_TWO_WALKING_BIT", false)?,
            skip_four_walking_bit: flag("SKIP_FOUR_WALKING_BIT", false)?,
            skip_byte_flip: flag("SKIP_BYTE_FLIP", false)?,
            skip_arith8: flag("SKIP_ARITH8", false)?,
            skip_arith16: flag("SKIP_ARITH16", false)?,
            skip_arith32: flag("SKIP_ARITH32", false)?,
            skip_arith64: flag("SKIP_ARITH64", false)?,
            skip_int8: flag("SKIP_INT8", false)?,
            skip_int16: flag("SKIP_INT16", false)?,
            skip_int32: flag("SKIP_INT32", false)?,
            skip_int64: flag("SKIP_INT64", false)?,
            skip_flip_short: flag("SKIP_FLIP_SHORT", false)?,
            skip_flip_int: flag("SKIP_FLIP_INT", false)?,
            skip_flip_long: flag("SKIP_FLIP_LONG", false)?,
            skip_havoc: flag("SKIP_HAVOC", false)?,
            skip_gradient_descend: flag("SKIP_GRADIENT_DESCEND", false)?,
            use_greedy_mamin: flag("USE_GREEDY_MAMIN", false)?,
            check_unnecessary_eval: flag("CHECK_UNNECESSARY_EVAL", true)?,
            log_query_stats: flag("LOG_QUERY_STATS", false)?,
            deterministic_policy: DeterministicPolicy::default(),
            havoc_policy: HavocPolicy::default(),
        })
    }
}

impl Default for Config {
    /// All-default configuration, ignoring the environment.
    fn default() -> Self {
        Self {
            skip_notify: false,
            skip_reuse: true,
            skip_input_to_state: false,
            skip_simple_math: false,
            skip_input_to_state_extended: false,
            skip_brute_force: false,
            skip_range_brute_force: false,
            skip_range_brute_force_opt: false,
            skip_deterministic: false,
            skip_single_walking_bit: false,
            skip_two_walking_bit: false,
            skip_four_walking_bit: false,
            skip_byte_flip: false,
            skip_arith8: false,
            skip_arith16: false,
            skip_arith32: false,
            skip_arith64: false,
            skip_int8: false,
            skip_int16: false,
            skip_int32: false,
            skip_int64: false,
            skip_flip_short: false,
            skip_flip_int: false,
            skip_flip_long: false,
            skip_havoc: false,
            skip_gradient_descend: false,
            use_greedy_mamin: false,
            check_unnecessary_eval: true,
            log_query_stats: false,
            deterministic_policy: DeterministicPolicy::default(),
            havoc_policy: HavocPolicy::default(),
        }
    }
}

fn flag(key: &'static str, default: bool) -> Result<bool, SolverError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(v) if v == "0" => Ok(false),
        Ok(v) if v == "1" => Ok(true),
        Ok(v) => Err(SolverError::InvalidConfig { key, value: v }),
    }
}
