//! Structured error types for Chronos.
//!
//! All fallible kernel APIs return `Result<T, SimError>`. Contract
//! violations (negative delays, over-releases, processes terminating while
//! still holding resources) surface at the offending call; errors raised by
//! model actions travel unchanged out of the executive loop.

use thiserror::Error;

use crate::process::ProcessId;
use crate::resource::ResourceId;
use crate::signal::SignalId;

/// The top-level error type for the simulation kernel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    // ── Scheduling errors ─────────────────────────────────

    /// A delay was negative, NaN or infinite.
    #[error("invalid delay {delay}: delays must be finite and non-negative")]
    InvalidDelay { delay: f64 },

    /// Attempted to schedule an event at an absolute time in the past.
    #[error("cannot schedule event at t={requested} when current time is t={current}")]
    NonCausalEvent { requested: f64, current: f64 },

    /// Popped an empty calendar. The executive checks emptiness first, so
    /// this only surfaces through direct misuse.
    #[error("event calendar is empty")]
    CalendarUnderflow,

    // ── Resource errors ───────────────────────────────────

    /// Released more than the process holds.
    #[error("{process} released {requested} units of {resource} but holds only {held}")]
    OverRelease {
        process: ProcessId,
        resource: ResourceId,
        requested: f64,
        held: f64,
    },

    /// A seize or release amount that can never be satisfied.
    #[error("invalid amount {amount} for {resource}")]
    InvalidAmount { resource: ResourceId, amount: f64 },

    /// A capacity that is not finite and strictly positive.
    #[error("invalid capacity {capacity}")]
    InvalidCapacity { capacity: f64 },

    // ── Process errors ────────────────────────────────────

    /// A process finished while still holding allocations or waiting
    /// somewhere. This is a modelling defect.
    #[error("{process} terminated while still holding {held:?}")]
    UnreleasedResourcesAtTermination {
        process: ProcessId,
        held: Vec<(ResourceId, f64)>,
    },

    /// A resumption arrived for a process that cannot run (for example a
    /// terminated one).
    #[error("{0} cannot be resumed in its current state")]
    ProcessNotRunnable(ProcessId),

    // ── Replication errors ────────────────────────────────

    /// The loop stopped before the end-of-replication marker, either at
    /// the event limit or through an explicit stop. The partial run is not
    /// a valid sample.
    #[error("replication stopped at t={at} after {events} events, before its end")]
    ReplicationTruncated { at: f64, events: u64 },

    // ── Lookup errors ─────────────────────────────────────

    #[error("process {0} not found")]
    UnknownProcess(ProcessId),

    #[error("resource {0} not found")]
    UnknownResource(ResourceId),

    #[error("signal {0} not found")]
    UnknownSignal(SignalId),

    // ── Model errors ──────────────────────────────────────

    /// Raised by model logic inside an event action or process.
    #[error("model error: {0}")]
    Model(String),
}

impl SimError {
    /// Convenience constructor for model-raised errors.
    pub fn model(msg: impl Into<String>) -> Self {
        SimError::Model(msg.into())
    }
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
