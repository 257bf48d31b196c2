//! Processes: sequential model logic that suspends and resumes across
//! simulated time.
//!
//! A process is an explicit state machine. The executive calls
//! [`Process::resume`]; the process runs until its next suspension point
//! and returns it as a [`Step`]. Locals that must survive a suspension live
//! in the process's own fields, and the "resume point" is whatever enum the
//! implementation keeps to know where it left off.
//!
//! ```text
//! NotStarted ──activate──▶ Running ──Step──▶ Suspended ──resume──▶ Running ─ … ─▶ Terminated
//! ```
//!
//! # Example
//!
//! ```rust
//! use chronos::{Model, Process, ProcessContext, ResourceId, SimResult, Step};
//!
//! struct Shop { counter: ResourceId }
//! impl Model for Shop { type Message = (); }
//!
//! enum Stage { Arrive, Served, Leave }
//!
//! struct Customer { stage: Stage }
//!
//! impl Process<Shop> for Customer {
//!     fn resume(&mut self, shop: &mut Shop, cx: &mut ProcessContext<'_, Shop>) -> SimResult<Step> {
//!         match self.stage {
//!             Stage::Arrive => {
//!                 self.stage = Stage::Served;
//!                 Ok(Step::Seize { resource: shop.counter, amount: 1.0 })
//!             }
//!             Stage::Served => {
//!                 self.stage = Stage::Leave;
//!                 Ok(Step::Delay(3.0))
//!             }
//!             Stage::Leave => {
//!                 cx.release(shop.counter, 1.0)?;
//!                 Ok(Step::Done)
//!             }
//!         }
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::ops::RangeBounds;

use crate::error::SimResult;
use crate::event::EventHandle;
use crate::executive::Executive;
use crate::model::Model;
use crate::resource::ResourceId;
use crate::signal::SignalId;
use crate::time::SimTime;

// ── ProcessId ─────────────────────────────────────────────────────────

/// Index of a process inside its executive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessId(usize);

impl ProcessId {
    #[inline]
    pub fn new(index: usize) -> Self {
        ProcessId(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

// ── States ────────────────────────────────────────────────────────────

/// Why a process is suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendReason {
    /// Waiting for a delay to elapse.
    Delay,
    /// Queued on a resource.
    Resource(ResourceId),
    /// On a signal's waitlist (possibly with a timeout pending).
    Signal(SignalId),
    /// Granted, released or interrupted; a zero-delay resumption is pending.
    Resuming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    Suspended(SuspendReason),
    Terminated,
}

impl ProcessState {
    pub fn is_suspended(self) -> bool {
        matches!(self, ProcessState::Suspended(_))
    }
}

/// Why a process was resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// First activation.
    Activated,
    /// A delay elapsed.
    Elapsed,
    /// A seize was granted.
    Granted,
    /// Released from a signal.
    Signaled,
    /// A signal wait ran out of time.
    TimedOut,
    /// Interrupted while suspended.
    Interrupted,
}

/// The suspension request a process hands back to the executive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Resume after `delay` units of simulated time.
    Delay(f64),
    /// Acquire `amount` units of `resource`, waiting if necessary.
    Seize { resource: ResourceId, amount: f64 },
    /// Wait until released from `signal`.
    WaitFor(SignalId),
    /// Wait for `signal`, giving up after `timeout`.
    WaitForWithin { signal: SignalId, timeout: f64 },
    /// Finish. All allocations must have been released.
    Done,
}

// ── Process trait ─────────────────────────────────────────────────────

/// Sequential model logic driven by the executive.
pub trait Process<M: Model> {
    /// Run from the current resume point to the next suspension point.
    fn resume(&mut self, model: &mut M, cx: &mut ProcessContext<'_, M>) -> SimResult<Step>;
}

/// A process backed by a closure, handy for generators and tests.
impl<M, F> Process<M> for F
where
    M: Model,
    F: FnMut(&mut M, &mut ProcessContext<'_, M>) -> SimResult<Step>,
{
    fn resume(&mut self, model: &mut M, cx: &mut ProcessContext<'_, M>) -> SimResult<Step> {
        (self)(model, cx)
    }
}

// ── Process slot ──────────────────────────────────────────────────────

/// Executive-side bookkeeping for one process.
pub(crate) struct ProcessSlot<M: Model> {
    pub(crate) name: String,
    pub(crate) state: ProcessState,
    /// Taken out while the process runs, dropped on termination.
    pub(crate) logic: Option<Box<dyn Process<M>>>,
    /// The outstanding resumption (or timeout) event, if any.
    pub(crate) pending: Option<EventHandle>,
    pub(crate) held: BTreeMap<ResourceId, f64>,
    /// Queue rank used by ranked resource queues.
    pub(crate) rank: i64,
}

impl<M: Model> ProcessSlot<M> {
    pub(crate) fn new(name: String, logic: Box<dyn Process<M>>) -> Self {
        ProcessSlot {
            name,
            state: ProcessState::NotStarted,
            logic: Some(logic),
            pending: None,
            held: BTreeMap::new(),
            rank: 0,
        }
    }

    pub(crate) fn held_amounts(&self) -> Vec<(ResourceId, f64)> {
        self.held
            .iter()
            .filter(|(_, &amount)| amount > 0.0)
            .map(|(&r, &amount)| (r, amount))
            .collect()
    }
}

// ── Process context ───────────────────────────────────────────────────

/// Handle passed to a running process.
///
/// Wraps the executive so the process can release resources, fire
/// signals, activate other processes and schedule ordinary events. Every
/// call is attributed to the running process.
pub struct ProcessContext<'a, M: Model> {
    pub(crate) exec: &'a mut Executive<M>,
    pub(crate) pid: ProcessId,
    pub(crate) wake: Wake,
}

impl<'a, M: Model> ProcessContext<'a, M> {
    /// The running process.
    #[inline]
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Why the process was resumed this time.
    #[inline]
    pub fn wake(&self) -> Wake {
        self.wake
    }

    #[inline]
    pub fn now(&self) -> SimTime {
        self.exec.now()
    }

    pub fn name(&self) -> &str {
        self.exec.process_name(self.pid).unwrap_or("")
    }

    /// Units of `resource` currently held by this process.
    pub fn held(&self, resource: ResourceId) -> f64 {
        self.exec.held(self.pid, resource)
    }

    /// Release `amount` units of `resource`.
    pub fn release(&mut self, resource: ResourceId, amount: f64) -> SimResult<()> {
        self.exec.release(self.pid, resource, amount)
    }

    /// Release everything this process holds of `resource`. Returns the
    /// amount released.
    pub fn release_all(&mut self, resource: ResourceId) -> SimResult<f64> {
        let held = self.held(resource);
        if held > 0.0 {
            self.release(resource, held)?;
        }
        Ok(held)
    }

    /// Rank used when this process queues on a ranked resource.
    pub fn set_rank(&mut self, rank: i64) {
        self.exec.set_process_rank(self.pid, rank);
    }

    /// Release the waiters of `signal` at the given waitlist positions.
    pub fn signal_release<R: RangeBounds<usize>>(
        &mut self,
        signal: SignalId,
        range: R,
    ) -> SimResult<usize> {
        self.exec.signal_release(signal, range)
    }

    pub fn signal_release_all(&mut self, signal: SignalId) -> SimResult<usize> {
        self.exec.signal_release_all(signal)
    }

    /// Activate another process after `delay`.
    pub fn activate<P>(&mut self, name: impl Into<String>, process: P, delay: f64) -> SimResult<ProcessId>
    where
        P: Process<M> + 'static,
    {
        self.exec.activate(name, process, delay)
    }

    /// Schedule an ordinary event `delay` from now.
    pub fn schedule_after<F>(&mut self, delay: f64, action: F) -> SimResult<EventHandle>
    where
        F: FnOnce(&mut M, &mut Executive<M>) -> SimResult<()> + 'static,
    {
        self.exec.schedule_after(delay, action)
    }

    /// Full access to the executive.
    pub fn executive(&mut self) -> &mut Executive<M> {
        &mut *self.exec
    }
}
