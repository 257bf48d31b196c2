//! Rendezvous signals.
//!
//! Processes wait on a signal in arrival order; a release picks a range of
//! waitlist positions and the executive resumes those processes in the same
//! order at the current instant.

use std::ops::{Bound, RangeBounds};

use crate::process::ProcessId;

/// Index of a signal inside its executive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalId(usize);

impl SignalId {
    #[inline]
    pub fn new(index: usize) -> Self {
        SignalId(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Signal {
    id: SignalId,
    name: String,
    waiting: Vec<ProcessId>,
    releases: u64,
}

impl Signal {
    pub(crate) fn new(id: SignalId, name: impl Into<String>) -> Self {
        Signal {
            id,
            name: name.into(),
            waiting: Vec::new(),
            releases: 0,
        }
    }

    pub fn id(&self) -> SignalId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waiting processes, oldest first.
    pub fn waiting(&self) -> &[ProcessId] {
        &self.waiting
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_waiting(&self, process: ProcessId) -> bool {
        self.waiting.contains(&process)
    }

    /// Whether the signal has released anybody since the last reset.
    pub fn is_signaled(&self) -> bool {
        self.releases > 0
    }

    /// Number of non-empty releases since the last reset.
    pub fn releases(&self) -> u64 {
        self.releases
    }

    pub(crate) fn wait(&mut self, process: ProcessId) {
        self.waiting.push(process);
    }

    /// Remove the waiters at the given positions, clamped to the waitlist.
    pub(crate) fn take_range<R: RangeBounds<usize>>(&mut self, range: R) -> Vec<ProcessId> {
        let len = self.waiting.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);
        if start >= end {
            return Vec::new();
        }
        self.releases += 1;
        self.waiting.drain(start..end).collect()
    }

    /// Drop a single waiter (timeout or interrupt).
    pub(crate) fn remove(&mut self, process: ProcessId) -> bool {
        match self.waiting.iter().position(|&p| p == process) {
            Some(at) => {
                self.waiting.remove(at);
                true
            }
            None => false,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.waiting.clear();
        self.releases = 0;
    }
}
