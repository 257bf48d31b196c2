//! # Chronos: Discrete-Event Simulation Kernel
//!
//! A deterministic simulation kernel with process interaction. Events are
//! ordered by `(time, priority, id)`; processes suspend on delays,
//! resources and signals and are resumed by events on the same calendar.
//! Single-threaded, no wall-clock time: a run is fully determined by its
//! inputs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │    ReplicationController      │ ← reset / warm-up / end per replication
//! │  ┌────────────────────────┐  │
//! │  │       Executive         │  │ ← clock + execution loop
//! │  │  ┌──────────────────┐  │  │
//! │  │  │ Calendar         │  │  │ ← heap / tree / list / leftist
//! │  │  └──────────────────┘  │  │
//! │  │  ┌──────────────────┐  │  │
//! │  │  │ Processes        │  │  │ ← explicit state machines
//! │  │  └──────────────────┘  │  │
//! │  │  ┌──────────────────┐  │  │
//! │  │  │ Resources/Signals│  │  │ ← queues, waitlists
//! │  │  └──────────────────┘  │  │
//! │  └────────────────────────┘  │
//! └──────────────────────────────┘
//! ```

pub mod calendar;
pub mod config;
pub mod demo;
pub mod element;
pub mod error;
pub mod event;
pub mod executive;
pub mod model;
pub mod process;
pub mod queue;
pub mod replication;
pub mod resource;
pub mod signal;
pub mod time;
pub mod trace;

// Re-exports for convenience.
pub use calendar::{Calendar, CalendarKind};
pub use config::{ConfigError, DemoConfig, ExperimentConfig};
pub use element::{ElementId, ElementInfo, ElementKind, ElementRegistry};
pub use error::{SimError, SimResult};
pub use event::{Event, EventHandle, EventId, EventIdGen, EventKey, Priority};
pub use executive::{Action, EventInfo, Executive};
pub use model::Model;
pub use process::{Process, ProcessContext, ProcessId, ProcessState, Step, SuspendReason, Wake};
pub use queue::{Discipline, Queue, QueueEntry};
pub use replication::{
    ExperimentReport, ReplicationController, ReplicationObserver, ReplicationOutcome,
    ReplicationReport, ReplicationSettings,
};
pub use resource::{Request, Resource, ResourceId};
pub use signal::{Signal, SignalId};
pub use time::SimTime;
pub use trace::{Trace, TraceEntry, TraceKind};
