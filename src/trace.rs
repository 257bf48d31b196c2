//! Execution trace: a record of every decision the kernel makes.
//!
//! The trace is opt-in per executive. It is appended to on process
//! activation, grants, enqueues, releases, signal waits and releases,
//! timeouts, interrupts, terminations and replication boundaries, and is
//! cleared on reset. Useful for test assertions and post-mortem debugging.

use crate::event::EventId;
use crate::process::ProcessId;
use crate::resource::ResourceId;
use crate::signal::SignalId;
use crate::time::SimTime;

/// What happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceKind {
    Activated,
    SeizeGranted { resource: ResourceId, amount: f64 },
    Enqueued { resource: ResourceId, amount: f64 },
    Released { resource: ResourceId, amount: f64 },
    Waiting { signal: SignalId },
    SignalReleased { signal: SignalId },
    TimedOut { signal: SignalId },
    Interrupted,
    Terminated,
    WarmUp,
    ReplicationEnded,
}

impl std::fmt::Display for TraceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceKind::Activated => write!(f, "activated"),
            TraceKind::SeizeGranted { resource, amount } => {
                write!(f, "seize-granted {} x{}", resource, amount)
            }
            TraceKind::Enqueued { resource, amount } => {
                write!(f, "enqueued {} x{}", resource, amount)
            }
            TraceKind::Released { resource, amount } => {
                write!(f, "release {} x{}", resource, amount)
            }
            TraceKind::Waiting { signal } => write!(f, "waiting {}", signal),
            TraceKind::SignalReleased { signal } => write!(f, "signaled {}", signal),
            TraceKind::TimedOut { signal } => write!(f, "timed-out {}", signal),
            TraceKind::Interrupted => write!(f, "interrupted"),
            TraceKind::Terminated => write!(f, "terminated"),
            TraceKind::WarmUp => write!(f, "warm-up"),
            TraceKind::ReplicationEnded => write!(f, "replication-ended"),
        }
    }
}

/// A single trace record.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    /// Simulated time of the decision.
    pub time: SimTime,
    /// The event being dispatched when it was made, if any.
    pub event: Option<EventId>,
    /// The process concerned, with its name.
    pub process: Option<(ProcessId, String)>,
    pub kind: TraceKind,
}

impl TraceEntry {
    /// Name of the process concerned, if any.
    pub fn process_name(&self) -> Option<&str> {
        self.process.as_ref().map(|(_, name)| name.as_str())
    }
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}", self.time)?;
        if let Some(event) = self.event {
            write!(f, " {}", event)?;
        }
        write!(f, "]")?;
        if let Some((pid, name)) = &self.process {
            write!(f, " {}({})", name, pid)?;
        }
        write!(f, " {}", self.kind)
    }
}

/// Append-only trace.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Trace::default()
    }

    pub fn record(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// `(time, process name, kind)` triples, handy for assertions.
    pub fn summary(&self) -> Vec<(f64, String, String)> {
        self.entries
            .iter()
            .map(|e| {
                (
                    e.time.as_f64(),
                    e.process_name().unwrap_or("-").to_string(),
                    e.kind.to_string(),
                )
            })
            .collect()
    }
}
