//! Query statistics and the optional CSV sink

use std::fs::OpenOptions;
use std::io::Write;

use tracing::debug;

use crate::consts::QUERY_STATS_PATH;
use crate::state::Phase;

/// Counters accumulated across every query of a context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// Evaluator invocations.
    pub evaluations: u64,
    /// Candidates skipped by the duplicate-input digest.
    pub duplicate_evaluations: u64,
    /// Queries answered with a proof.
    pub sat_queries: u64,
    /// Queries answered unknown.
    pub unknown_queries: u64,
    /// Queries that hit the deadline.
    pub timeouts: u64,
    /// Queries that left an optimistic proof behind.
    pub optimistic_found: u64,
    /// Proofs per solving phase, in cascade order.
    pub sat_by_phase: [u64; 12],
}

impl SolverStats {
    pub(crate) fn record_sat(&mut self, phase: Phase) {
        self.sat_by_phase[phase as usize] += 1;
    }

    /// Proof count attributed to one phase.
    pub fn sat_for(&self, phase: Phase) -> u64 {
        self.sat_by_phase[phase as usize]
    }
}

/// One line of the optimistic-query log.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueryLogLine {
    pub ctx_id: u64,
    pub query_size: u32,
    pub index_count: usize,
    pub group_count: usize,
    pub is_its: bool,
    pub linear_ops: u32,
    pub nonlinear_ops: u32,
}

impl QueryLogLine {
    /// Append the line to the CSV sink; failures are logged and dropped,
    /// statistics must never break a query.
    pub(crate) fn append(&self) {
        let row = format!(
            "{},{},{},{},{},{},{}\n",
            self.ctx_id,
            self.query_size,
            self.index_count,
            self.group_count,
            self.is_its as u8,
            self.linear_ops,
            self.nonlinear_ops,
        );
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(QUERY_STATS_PATH)
            .and_then(|mut f| f.write_all(row.as_bytes()));
        if let Err(e) = written {
            debug!(error = %e, "query stats sink unavailable");
        }
    }
}
