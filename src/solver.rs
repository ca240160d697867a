//! [`Solver`] implementation
//!
//! One solver context per symbolic input stream. The context owns the seed
//! and auxiliary test cases, the assignment table, the scratch candidate
//! buffers, every memoised analysis, and the cooperative timer; the only
//! external call it makes is the evaluator seam.

use hashbrown::{HashMap, HashSet};

use crate::analysis::{AstInfoCache, RangeStore};
use crate::ast::Expr;
use crate::config::Config;
use crate::eval::Evaluator;
use crate::rng::ReseedingRng;
use crate::testcase::Testcase;
use crate::timer::Timer;

mod brute_force;
mod check;
mod constructors;
mod deterministic;
mod gradient;
mod havoc;
mod input_to_state;
mod multigoal;
mod notify;
mod optimize;
mod phases;
mod range;
mod reuse;
mod stats;

pub use stats::SolverStats;

pub(crate) use gradient::DescentVar;

/// Approximate decision procedure for quantifier-free bitvector formulas.
///
/// Generic over the caller-supplied model evaluator. A query either
/// publishes a proof satisfying both the path constraint and the branch
/// condition, or reports unknown, possibly leaving behind an optimistic
/// proof that satisfies the branch alone.
pub struct Solver<E> {
    pub(crate) evaluator: E,
    pub(crate) config: Config,
    pub(crate) timer: Timer,
    pub(crate) rng: ReseedingRng,

    /// Seed first, auxiliaries after.
    pub(crate) testcases: Vec<Testcase>,
    /// Raw byte length of the seed; indices past it address assignments.
    pub(crate) input_bytes: usize,
    pub(crate) assignments: Vec<Expr>,

    /// Current candidate, one value slot per index.
    pub(crate) tmp_input: Vec<u64>,
    /// Byte width of each value slot.
    pub(crate) value_sizes: Vec<u8>,
    /// Best assignment seen that satisfied the branch condition.
    pub(crate) tmp_opt_input: Vec<u64>,
    /// Byte truncation of the last satisfying candidate.
    pub(crate) tmp_proof: Vec<u8>,
    /// Byte truncation of the best optimistic candidate.
    pub(crate) tmp_opt_proof: Vec<u8>,

    pub(crate) info_cache: AstInfoCache,
    pub(crate) ranges: RangeStore,
    pub(crate) univocally_defined: HashSet<usize>,
    /// Byte index → atomic path clauses touching it.
    pub(crate) conflicts: HashMap<usize, Vec<Expr>>,
    /// Constraint hashes already folded in.
    pub(crate) processed: HashSet<u64>,
    /// Comparison constants scraped by the detectors.
    pub(crate) early_constants: HashSet<u64>,
    /// Digests of already-evaluated candidates.
    pub(crate) eval_digests: HashSet<u64>,

    /// Bytes the current solving step must not mutate.
    pub(crate) frozen: HashSet<usize>,
    pub(crate) opt_found: bool,
    /// Satisfied-clause count of the best optimistic proof.
    pub(crate) opt_num_sat: u64,
    pub(crate) opt_depth: u64,
    /// Aggressive-optimistic mode: pinned bytes become mutable and range
    /// validation is suspended.
    pub(crate) aggressive: bool,

    pub(crate) poll_counter: u32,
    pub(crate) stats: SolverStats,
    pub(crate) ctx_id: u64,
}

impl<E> Solver<E> {
    /// Length in bytes of the proofs this context produces.
    pub fn testcase_len(&self) -> usize {
        self.testcases[0].len
    }

    /// Raw input byte count of the seed.
    pub const fn input_bytes(&self) -> usize {
        self.input_bytes
    }

    /// Resolved configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Counters accumulated across queries.
    pub const fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Registered test cases, the seed first.
    pub fn testcases(&self) -> &[Testcase] {
        self.testcases.as_slice()
    }

    /// Bytes pinned by equalities of the path constraint.
    pub fn univocally_defined(&self) -> &HashSet<usize> {
        &self.univocally_defined
    }

    /// Per-group intervals accumulated from the path constraint.
    pub const fn ranges(&self) -> &RangeStore {
        &self.ranges
    }

    /// Best assignment of the previous query that satisfied the branch
    /// condition, if one was found.
    pub fn get_optimistic_sol(&self) -> Option<&[u8]> {
        self.opt_found.then(|| self.tmp_opt_proof.as_slice())
    }

    pub(crate) fn snapshot_input(&self) -> Vec<u64> {
        self.tmp_input.clone()
    }

    pub(crate) fn restore_input(&mut self, saved: &[u64]) {
        self.tmp_input.copy_from_slice(saved);
    }

    /// Reset the candidate buffer to the seed test case.
    pub(crate) fn reset_input_to_seed(&mut self) {
        let seed = &self.testcases[0];
        self.tmp_input.copy_from_slice(&seed.values);
    }

    /// Write the current candidate out as a proof.
    pub(crate) fn publish_proof(&mut self) {
        let len = self.testcase_len();
        for (out, value) in self.tmp_proof[..len].iter_mut().zip(self.tmp_input.iter()) {
            *out = *value as u8;
        }
    }

    /// Record the current candidate as the best optimistic proof. More
    /// satisfied clauses win; the evaluator's depth signal breaks ties.
    pub(crate) fn publish_optimistic(&mut self, num_sat: u64, depth: u64) {
        if self.opt_found
            && (num_sat < self.opt_num_sat || (num_sat == self.opt_num_sat && depth >= self.opt_depth))
        {
            return;
        }
        self.opt_found = true;
        self.opt_num_sat = num_sat;
        self.opt_depth = depth;
        self.tmp_opt_input.copy_from_slice(&self.tmp_input);
        let len = self.testcase_len();
        for (out, value) in self.tmp_opt_proof[..len].iter_mut().zip(self.tmp_input.iter()) {
            *out = *value as u8;
        }
    }
}

impl<E> AsRef<E> for Solver<E> {
    fn as_ref(&self) -> &E {
        &self.evaluator
    }
}

impl<E> AsMut<E> for Solver<E> {
    fn as_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }
}

impl<E: Evaluator> Solver<E> {
    /// Register the assignment backing symbol `index`.
    ///
    /// Assignments occupy the indices right after the raw input bytes and
    /// must be registered in order. The concrete value is materialised
    /// eagerly in every known test case, so the reuse phase and the
    /// scratch buffers see assignments exactly like input bytes.
    pub fn add_assignment(&mut self, index: usize, expr: Expr) -> usize {
        debug_assert_eq!(index, self.input_bytes + self.assignments.len());
        let size = expr.width().div_ceil(8).max(1) as u8;

        for tc in self.testcases.iter_mut() {
            let value = self.evaluator.eval(&expr, &tc.values, &tc.value_sizes, None);
            tc.push_assignment(value, size);
        }

        let seed_value = self.testcases[0].values[index];
        self.tmp_input.push(seed_value);
        self.tmp_opt_input.push(seed_value);
        self.value_sizes.push(size);

        self.assignments.push(expr);
        index
    }

    /// Memoised analysis record of an expression, computed against the
    /// current univocally-defined set.
    pub fn ast_info(&mut self, expr: &Expr) -> std::rc::Rc<crate::analysis::AstInfo> {
        self.info_builder().info(expr)
    }

    /// Evaluate an expression over caller-provided raw bytes, recomputing
    /// every assignment slot on the way.
    pub fn evaluate_expression(&mut self, expr: &Expr, bytes: &[u8]) -> u64 {
        let mut values: Vec<u64> = bytes.iter().map(|&b| b as u64).collect();
        let mut sizes: Vec<u8> = vec![1; bytes.len()];
        for (assignment, size) in self
            .assignments
            .iter()
            .zip(self.value_sizes[self.input_bytes..].iter())
            .map(|(a, s)| (a.clone(), *s))
            .collect::<Vec<_>>()
        {
            let value = self.evaluator.eval(&assignment, &values, &sizes, None);
            values.push(value);
            sizes.push(size);
        }
        self.evaluator.eval(expr, &values, &sizes, None)
    }
}
