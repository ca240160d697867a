//! Exposed constructors API for the [`Solver`]

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::{HashMap, HashSet};
use tracing::debug;

use super::{Solver, SolverStats};
use crate::analysis::{AstInfoCache, RangeStore};
use crate::config::Config;
use crate::error::SolverError;
use crate::eval::Evaluator;
use crate::rng::ReseedingRng;
use crate::testcase::{load_folder, Testcase};
use crate::timer::Timer;

static NEXT_CTX_ID: AtomicU64 = AtomicU64::new(0);

impl<E: Evaluator> Solver<E> {
    /// Create a solver context from raw seed bytes.
    ///
    /// The seed fixes the proof length and the scratch buffer sizes; the
    /// configuration is resolved from the process environment.
    pub fn new(evaluator: E, seed: &[u8], timeout_ms: u64) -> Result<Self, SolverError> {
        let config = Config::from_env()?;
        Ok(Self::with_config(evaluator, Testcase::from_bytes(seed), vec![], timeout_ms, config))
    }

    /// Create a solver context from a seed file, optionally loading every
    /// file of `testcase_folder` as an auxiliary test case for the reuse
    /// phase.
    pub fn from_seed(
        evaluator: E,
        seed_path: &Path,
        testcase_folder: Option<&Path>,
        timeout_ms: u64,
    ) -> Result<Self, SolverError> {
        let config = Config::from_env()?;
        let seed = Testcase::load(seed_path)?;
        let auxiliaries = match testcase_folder {
            Some(folder) => load_folder(folder)?,
            None => vec![],
        };
        Ok(Self::with_config(evaluator, seed, auxiliaries, timeout_ms, config))
    }

    /// Create a solver context with an explicit configuration.
    pub fn with_config(
        evaluator: E,
        seed: Testcase,
        auxiliaries: Vec<Testcase>,
        timeout_ms: u64,
        config: Config,
    ) -> Self {
        let ctx_id = NEXT_CTX_ID.fetch_add(1, Ordering::Relaxed);
        let len = seed.len;
        debug!(ctx_id, seed_len = len, auxiliaries = auxiliaries.len(), "new solver context");

        let tmp_input = seed.values.clone();
        let value_sizes = seed.value_sizes.clone();

        let mut testcases = Vec::with_capacity(1 + auxiliaries.len());
        testcases.push(seed);
        // Auxiliaries shorter than the seed cannot drive the evaluator;
        // longer ones are truncated by proof publication.
        testcases.extend(auxiliaries.into_iter().filter(|tc| tc.len >= len));

        Self {
            evaluator,
            config,
            timer: Timer::new(timeout_ms),
            rng: ReseedingRng::new(),
            testcases,
            input_bytes: len,
            assignments: vec![],
            tmp_opt_input: tmp_input.clone(),
            tmp_input,
            value_sizes,
            tmp_proof: vec![0; len],
            tmp_opt_proof: vec![0; len],
            info_cache: AstInfoCache::default(),
            ranges: RangeStore::default(),
            univocally_defined: HashSet::new(),
            conflicts: HashMap::new(),
            processed: HashSet::new(),
            early_constants: HashSet::new(),
            eval_digests: HashSet::new(),
            frozen: HashSet::new(),
            opt_found: false,
            opt_num_sat: 0,
            opt_depth: u64::MAX,
            aggressive: false,
            poll_counter: 0,
            stats: SolverStats::default(),
            ctx_id,
        }
    }

    /// Replace the PRNG with a deterministic instance.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = ReseedingRng::with_seed(seed);
        self
    }
}
