//! Finite-capacity resources with a waiting queue.
//!
//! A `Resource` only does the bookkeeping: capacity, allocation and the
//! queue of pending requests. Scheduling the resumption of granted
//! processes is the executive's job, so every method that can grant
//! returns the requests it satisfied.

use crate::error::{SimError, SimResult};
use crate::process::ProcessId;
use crate::queue::{Discipline, Queue};
use crate::time::SimTime;

/// Tolerance for comparing fractional amounts. Sums such as `0.1 + 0.2`
/// overshoot their decimal value by a few ulps.
pub(crate) const AMOUNT_EPSILON: f64 = 1e-12;

/// Index of a resource inside its executive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceId(usize);

impl ResourceId {
    #[inline]
    pub fn new(index: usize) -> Self {
        ResourceId(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A pending seize request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub process: ProcessId,
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    name: String,
    capacity: f64,
    initial_capacity: f64,
    allocated: f64,
    queue: Queue<Request>,
    grants: u64,
}

fn check_capacity(capacity: f64) -> SimResult<()> {
    if capacity.is_finite() && capacity > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidCapacity { capacity })
    }
}

impl Resource {
    pub(crate) fn new(
        id: ResourceId,
        name: impl Into<String>,
        capacity: f64,
        discipline: Discipline,
    ) -> SimResult<Self> {
        check_capacity(capacity)?;
        Ok(Resource {
            id,
            name: name.into(),
            capacity,
            initial_capacity: capacity,
            allocated: 0.0,
            queue: Queue::with_discipline(discipline),
            grants: 0,
        })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn allocated(&self) -> f64 {
        self.allocated
    }

    /// Free units. Zero while usage exceeds a reduced capacity.
    pub fn available(&self) -> f64 {
        (self.capacity - self.allocated).max(0.0)
    }

    /// Whether `amount` fits in the free capacity right now.
    pub fn fits(&self, amount: f64) -> bool {
        self.allocated + amount <= self.capacity + AMOUNT_EPSILON
    }

    pub fn queue(&self) -> &Queue<Request> {
        &self.queue
    }

    /// Total number of grants since the last reset.
    pub fn grants(&self) -> u64 {
        self.grants
    }

    pub(crate) fn check_amount(&self, amount: f64) -> SimResult<()> {
        if amount.is_finite() && amount > 0.0 {
            Ok(())
        } else {
            Err(SimError::InvalidAmount {
                resource: self.id,
                amount,
            })
        }
    }

    /// Grant at once if the request fits and nobody is queued ahead of it.
    pub(crate) fn try_allocate(&mut self, amount: f64) -> bool {
        if self.queue.is_empty() && self.fits(amount) {
            self.allocate(amount);
            true
        } else {
            false
        }
    }

    pub(crate) fn enqueue(&mut self, request: Request, rank: i64, now: SimTime) {
        self.queue.enqueue_ranked(request, rank, now);
    }

    pub(crate) fn deallocate(&mut self, amount: f64) {
        self.allocated -= amount;
        // Absorb rounding residue from fractional amounts.
        if self.allocated < AMOUNT_EPSILON {
            self.allocated = 0.0;
        }
    }

    /// Strict head-of-line granting: satisfy queued requests while the head
    /// fits, and stop at the first head that does not.
    pub(crate) fn grant_waiting(&mut self) -> Vec<Request> {
        let mut granted = Vec::new();
        while let Some(head) = self.queue.peek() {
            let amount = head.item.amount;
            if !self.fits(amount) {
                break;
            }
            if let Some(entry) = self.queue.dequeue_next() {
                self.allocate(amount);
                granted.push(entry.item);
            }
        }
        granted
    }

    /// Change capacity. An increase immediately re-attempts the queue; a
    /// decrease never revokes what has been granted.
    pub(crate) fn set_capacity(&mut self, capacity: f64) -> SimResult<Vec<Request>> {
        check_capacity(capacity)?;
        let increased = capacity > self.capacity;
        self.capacity = capacity;
        if increased {
            Ok(self.grant_waiting())
        } else {
            Ok(Vec::new())
        }
    }

    /// Withdraw a queued request, e.g. when its process is interrupted.
    pub(crate) fn withdraw(&mut self, process: ProcessId) -> Option<Request> {
        self.queue
            .remove(|r| r.process == process)
            .map(|entry| entry.item)
    }

    /// Restore the configuration the resource was created with.
    pub(crate) fn reset(&mut self) {
        self.capacity = self.initial_capacity;
        self.allocated = 0.0;
        self.queue.clear();
        self.grants = 0;
    }

    fn allocate(&mut self, amount: f64) {
        self.allocated += amount;
        self.grants += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(capacity: f64) -> Resource {
        Resource::new(ResourceId::new(0), "server", capacity, Discipline::Fifo).unwrap()
    }

    fn request(pid: usize, amount: f64) -> Request {
        Request {
            process: ProcessId::new(pid),
            amount,
        }
    }

    #[test]
    fn test_rejects_bad_capacity() {
        for cap in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(Resource::new(ResourceId::new(0), "r", cap, Discipline::Fifo).is_err());
        }
    }

    #[test]
    fn test_allocate_within_capacity() {
        let mut r = resource(2.0);
        assert!(r.try_allocate(1.0));
        assert!(r.try_allocate(1.0));
        assert!(!r.try_allocate(1.0));
        assert_eq!(r.allocated(), 2.0);
        assert_eq!(r.available(), 0.0);
        assert_eq!(r.grants(), 2);
    }

    #[test]
    fn test_fractional_amounts_fill_capacity() {
        let mut r = resource(0.3);
        assert!(r.try_allocate(0.1));
        assert!(r.try_allocate(0.2));
        assert!(!r.try_allocate(0.01));
        r.deallocate(0.2);
        r.deallocate(0.1);
        assert_eq!(r.allocated(), 0.0);
    }

    #[test]
    fn test_no_barging_past_queued_requests() {
        let mut r = resource(3.0);
        assert!(r.try_allocate(2.0));
        r.enqueue(request(1, 2.0), 0, SimTime::ZERO);
        // One unit is free, but a request is already waiting.
        assert!(!r.try_allocate(1.0));
    }

    #[test]
    fn test_head_of_line_blocking() {
        let mut r = resource(3.0);
        assert!(r.try_allocate(3.0));
        r.enqueue(request(1, 2.0), 0, SimTime::ZERO);
        r.enqueue(request(2, 1.0), 0, SimTime::ZERO);

        r.deallocate(1.0);
        // Head needs 2, only 1 free: the smaller request behind it waits too.
        assert!(r.grant_waiting().is_empty());

        r.deallocate(1.0);
        let granted = r.grant_waiting();
        assert_eq!(granted, vec![request(1, 2.0)]);
        assert_eq!(r.queue().len(), 1);

        r.deallocate(1.0);
        assert_eq!(r.grant_waiting(), vec![request(2, 1.0)]);
        assert_eq!(r.allocated(), 3.0);
    }

    #[test]
    fn test_capacity_increase_grants_queue() {
        let mut r = resource(1.0);
        assert!(r.try_allocate(1.0));
        r.enqueue(request(1, 1.0), 0, SimTime::ZERO);
        r.enqueue(request(2, 1.0), 0, SimTime::ZERO);
        let granted = r.set_capacity(3.0).unwrap();
        assert_eq!(granted.len(), 2);
        assert_eq!(r.allocated(), 3.0);
    }

    #[test]
    fn test_capacity_decrease_never_revokes() {
        let mut r = resource(3.0);
        assert!(r.try_allocate(3.0));
        assert!(r.set_capacity(1.0).unwrap().is_empty());
        assert_eq!(r.allocated(), 3.0);
        assert_eq!(r.available(), 0.0);

        r.enqueue(request(1, 1.0), 0, SimTime::ZERO);
        r.deallocate(2.0);
        // Usage is back at the new capacity: still nothing to grant.
        assert!(r.grant_waiting().is_empty());
        r.deallocate(1.0);
        assert_eq!(r.grant_waiting().len(), 1);
    }

    #[test]
    fn test_withdraw_and_reset() {
        let mut r = resource(1.0);
        assert!(r.try_allocate(1.0));
        r.enqueue(request(7, 1.0), 0, SimTime::ZERO);
        assert_eq!(r.withdraw(ProcessId::new(7)), Some(request(7, 1.0)));
        assert!(r.withdraw(ProcessId::new(7)).is_none());

        r.set_capacity(4.0).unwrap();
        r.reset();
        assert_eq!(r.capacity(), 1.0);
        assert_eq!(r.allocated(), 0.0);
        assert!(r.queue().is_empty());
    }
}
