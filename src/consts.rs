//! Solver parameters

/* GROUPS AND CACHES */

/// Maximum byte width of an index group.
pub const MAX_GROUP_SIZE: usize = 8;

/// Entry cap of the AST-info cache; on overflow the whole cache is dropped.
pub const MAX_AST_INFO_CACHE: usize = 14_000;

/* PHASE BUDGETS */

/// Widest interval that the range phases will enumerate exhaustively.
pub const RANGE_MAX_WIDTH_BRUTE_FORCE: u64 = 2048;

/// Per-group enumeration budget of the optimistic range phase.
pub const RANGE_BRUTE_FORCE_OPT_BUDGET: u64 = RANGE_MAX_WIDTH_BRUTE_FORCE / 4;

/// Exclusive upper bound of the deterministic `±k` arithmetic sweep.
pub const ARITH_MAX: u64 = 35;

/// Log2 of the maximum havoc mutation stack.
pub const HAVOC_STACK_POW2: u32 = 7;

/// Havoc iteration budget per touched input byte.
pub const HAVOC_C: usize = 20;

/// PRNG draws between reseeds from OS entropy.
pub const RNG_RESEED_INTERVAL: u32 = 10_000;

/// Neighbourhood explored around a group value when freezing other bytes.
pub const NEIGHBOURHOOD_RADIUS: u64 = 255;

/// Greedy steps taken from the seed value per direction during value
/// enumeration.
pub const FIND_ALL_GREEDY_STEPS: u64 = 5;

/* INTERESTING VALUES */

/// Interesting 8-bit values, as injected by the deterministic stage.
pub const INTERESTING_8: [i64; 9] = [-128, -1, 0, 1, 16, 32, 64, 100, 127];

/// Interesting 16-bit values; extends the 8-bit table.
pub const INTERESTING_16: [i64; 10] = [-32768, -129, 128, 255, 256, 512, 1000, 1024, 4096, 32767];

/// Interesting 32-bit values; extends the 16-bit table.
pub const INTERESTING_32: [i64; 8] = [
    -2147483648,
    -100663046,
    -32769,
    32768,
    65535,
    65536,
    100663045,
    2147483647,
];

/// Interesting 64-bit values; extends the 32-bit table.
pub const INTERESTING_64: [i64; 6] = [
    i64::MIN,
    -2147483649,
    2147483648,
    4294967295,
    4294967296,
    i64::MAX,
];

/* LOGGING */

/// Destination of the optimistic-query statistics log.
pub const QUERY_STATS_PATH: &str = "/tmp/fuzzy-log-info.csv";
