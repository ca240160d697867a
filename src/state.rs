//! Result-state representation for the phase cascade

use strum::Display;

/// Resulting state of a single solving phase.
///
/// `Unsat` is local to the phase: it means the phase exhausted the space it
/// can reach, not that the query is unsatisfiable. The cascade stops on it
/// but the caller still reports unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseState {
    /// The phase produced an assignment satisfying both the branch
    /// condition and the path constraint.
    Sat,
    /// The phase exhausted its reachable space without a solution.
    Unsat,
    /// The phase gave up without covering its space.
    Inconclusive,
}

impl PhaseState {
    /// Return `true` if the cascade should try the next phase.
    pub const fn should_continue(&self) -> bool {
        matches!(self, Self::Inconclusive)
    }
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::Inconclusive
    }
}

/// Identifier of a solving phase, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Reuse,
    InputToState,
    SimpleMath,
    RangeBruteForce,
    RangeBruteForceOpt,
    InputToStateExtended,
    ByteBruteForce,
    GradientDescent,
    Deterministic,
    Havoc,
    Multigoal,
    SeedCheck,
}

/// Deterministic-stage granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeterministicPolicy {
    /// Mutate whole index groups as machine words.
    PerGroup,
    /// Mutate one byte at a time.
    PerByte,
}

impl Default for DeterministicPolicy {
    fn default() -> Self {
        Self::PerGroup
    }
}

/// Input set that havoc draws its mutations from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HavocPolicy {
    /// Mutate only the bytes touched by the branch condition.
    Branch,
    /// Mutate every byte touched by the whole path constraint.
    WholeQuery,
}

impl Default for HavocPolicy {
    fn default() -> Self {
        Self::Branch
    }
}

/// Flow control returned by the find-all-values callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueVerdict {
    /// Keep enumerating and reporting.
    Continue,
    /// Stop immediately.
    Stop,
    /// Keep evaluating for coverage but stop reporting.
    Last,
}
