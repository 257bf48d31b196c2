//! Event records for the discrete-event kernel.
//!
//! Every state change in a model happens inside an `Event`. Events are
//! placed on a [`Calendar`](crate::calendar::Calendar) and dispatched in
//! ascending `(time, priority, id)` order, which makes the dispatch order
//! a pure function of the sequence of scheduling calls.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::time::SimTime;

// ── Event ID ──────────────────────────────────────────────────────────

/// A globally unique, strictly-increasing event identifier.
///
/// The id is the final tie-break of the ordering: two events with the
/// same time and priority run in the order they were scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Deterministic, strictly-increasing event-ID generator.
///
/// Each `Executive` owns exactly one of these. It is never rewound, so ids
/// stay unique across replications of the same executive.
#[derive(Debug, Clone)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// Peek at the next ID without consuming it.
    pub fn peek(&self) -> EventId {
        EventId(self.next)
    }
}

impl Default for EventIdGen {
    fn default() -> Self {
        Self::new()
    }
}

// ── Priority ──────────────────────────────────────────────────────────

/// Tie-break among events scheduled for the same instant. Lower runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Priority(i32);

impl Priority {
    /// Warm-up boundary: observed before anything else at that instant.
    pub const WARM_UP: Priority = Priority(0);
    /// Process resumptions (delays, grants, signal releases, activations).
    pub const RESUME: Priority = Priority(5);
    /// Ordinary model events.
    pub const DEFAULT: Priority = Priority(10);
    /// End of replication: everything else at that instant runs first.
    pub const END_REPLICATION: Priority = Priority(i32::MAX);

    #[inline]
    pub fn new(value: i32) -> Self {
        Priority(value)
    }

    #[inline]
    pub fn value(self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::DEFAULT
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

// ── Ordering key ──────────────────────────────────────────────────────

/// The total order of the calendar: `(time, priority, id)` ascending.
///
/// Field order matters, the derived `Ord` compares lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    pub time: SimTime,
    pub priority: Priority,
    pub id: EventId,
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}/{}", self.id, self.time, self.priority)
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single scheduled event.
///
/// The key is immutable once built. The cancelled flag is shared with
/// every [`EventHandle`] cut from this event; the calendar owns the only
/// strong reference, so handles go inert once the event is popped.
#[derive(Debug)]
pub struct Event<T> {
    key: EventKey,
    payload: T,
    cancelled: Rc<Cell<bool>>,
}

impl<T> Event<T> {
    pub fn new(id: EventId, time: SimTime, priority: Priority, payload: T) -> Self {
        Event {
            key: EventKey { time, priority, id },
            payload,
            cancelled: Rc::new(Cell::new(false)),
        }
    }

    #[inline]
    pub fn key(&self) -> EventKey {
        self.key
    }

    #[inline]
    pub fn id(&self) -> EventId {
        self.key.id
    }

    #[inline]
    pub fn time(&self) -> SimTime {
        self.key.time
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.key.priority
    }

    #[inline]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Whether the event was cancelled while pending.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// Cut a cancellation handle for this event.
    pub fn handle(&self) -> EventHandle {
        EventHandle {
            key: self.key,
            flag: Rc::downgrade(&self.cancelled),
        }
    }

    /// Consume the event, yielding its payload.
    pub fn into_payload(self) -> T {
        self.payload
    }
}

// ── Event Handle ──────────────────────────────────────────────────────

/// Weak reference to a scheduled event, good only for cancellation and
/// inspection.
#[derive(Debug, Clone)]
pub struct EventHandle {
    key: EventKey,
    flag: Weak<Cell<bool>>,
}

impl EventHandle {
    #[inline]
    pub fn id(&self) -> EventId {
        self.key.id
    }

    #[inline]
    pub fn time(&self) -> SimTime {
        self.key.time
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.key.priority
    }

    /// `true` while the event sits in a calendar and has not been cancelled.
    pub fn is_pending(&self) -> bool {
        self.flag.upgrade().is_some_and(|flag| !flag.get())
    }

    /// `true` if the event was cancelled and has not yet been discarded.
    pub fn is_cancelled(&self) -> bool {
        self.flag.upgrade().is_some_and(|flag| flag.get())
    }

    /// Set the cancelled flag. Returns `true` only if this call cancelled a
    /// still-pending event.
    pub(crate) fn mark_cancelled(&self) -> bool {
        match self.flag.upgrade() {
            Some(flag) if !flag.get() => {
                flag.set(true);
                true
            }
            _ => false,
        }
    }
}
