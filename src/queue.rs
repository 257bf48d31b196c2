//! Ordered holding areas with a pluggable dequeue discipline.
//!
//! A [`Queue`] keeps its entries physically in discipline order, so the
//! head is always `entries.front()` and `dequeue_next` is O(1). Resources
//! use one for their waiting requests; models can use them directly for
//! transient work items.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::time::SimTime;

/// Dequeue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    /// First in, first out.
    #[default]
    Fifo,
    /// Last in, first out.
    Lifo,
    /// Lowest rank first; FIFO among equal ranks.
    Ranked,
}

/// An item together with its queueing metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry<T> {
    pub item: T,
    pub enqueued_at: SimTime,
    pub rank: i64,
}

/// A discipline-ordered queue.
#[derive(Debug, Clone)]
pub struct Queue<T> {
    discipline: Discipline,
    entries: VecDeque<QueueEntry<T>>,
    total_enqueued: u64,
}

impl<T> Queue<T> {
    /// Create an empty FIFO queue.
    pub fn new() -> Self {
        Self::with_discipline(Discipline::Fifo)
    }

    pub fn with_discipline(discipline: Discipline) -> Self {
        Queue {
            discipline,
            entries: VecDeque::new(),
            total_enqueued: 0,
        }
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// Enqueue with the default rank of 0.
    pub fn enqueue(&mut self, item: T, now: SimTime) {
        self.enqueue_ranked(item, 0, now);
    }

    /// Enqueue with an explicit rank. The rank only matters under
    /// [`Discipline::Ranked`].
    pub fn enqueue_ranked(&mut self, item: T, rank: i64, now: SimTime) {
        let entry = QueueEntry {
            item,
            enqueued_at: now,
            rank,
        };
        match self.discipline {
            Discipline::Fifo => self.entries.push_back(entry),
            Discipline::Lifo => self.entries.push_front(entry),
            Discipline::Ranked => {
                // Insert after every entry of equal rank, keeping ties FIFO.
                let at = self.entries.partition_point(|e| e.rank <= rank);
                self.entries.insert(at, entry);
            }
        }
        self.total_enqueued += 1;
    }

    /// Remove and return the head.
    pub fn dequeue_next(&mut self) -> Option<QueueEntry<T>> {
        self.entries.pop_front()
    }

    /// The head, without removing it.
    pub fn peek(&self) -> Option<&QueueEntry<T>> {
        self.entries.front()
    }

    /// Remove the first entry (in discipline order) matching `pred`.
    pub fn remove<F>(&mut self, mut pred: F) -> Option<QueueEntry<T>>
    where
        F: FnMut(&T) -> bool,
    {
        let at = self.entries.iter().position(|e| pred(&e.item))?;
        self.entries.remove(at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of items ever enqueued since creation or the last `clear`.
    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_enqueued = 0;
    }

    /// Iterate in dequeue order.
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry<T>> {
        self.entries.iter()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<T: Copy>(q: &mut Queue<T>) -> Vec<T> {
        std::iter::from_fn(|| q.dequeue_next().map(|e| e.item)).collect()
    }

    #[test]
    fn test_fifo_is_default() {
        let mut q = Queue::new();
        assert_eq!(q.discipline(), Discipline::Fifo);
        q.enqueue('a', SimTime::ZERO);
        q.enqueue('b', SimTime::new(1.0));
        q.enqueue('c', SimTime::new(2.0));
        assert_eq!(drain(&mut q), vec!['a', 'b', 'c']);
    }

    #[test]
    fn test_lifo() {
        let mut q = Queue::with_discipline(Discipline::Lifo);
        q.enqueue(1, SimTime::ZERO);
        q.enqueue(2, SimTime::ZERO);
        q.enqueue(3, SimTime::ZERO);
        assert_eq!(drain(&mut q), vec![3, 2, 1]);
    }

    #[test]
    fn test_ranked_is_stable_for_equal_rank() {
        let mut q = Queue::with_discipline(Discipline::Ranked);
        q.enqueue_ranked("low-1", 5, SimTime::ZERO);
        q.enqueue_ranked("high", 1, SimTime::ZERO);
        q.enqueue_ranked("low-2", 5, SimTime::ZERO);
        q.enqueue_ranked("mid", 3, SimTime::ZERO);
        assert_eq!(drain(&mut q), vec!["high", "mid", "low-1", "low-2"]);
    }

    #[test]
    fn test_entries_record_enqueue_time() {
        let mut q = Queue::new();
        q.enqueue("x", SimTime::new(4.5));
        let head = q.peek().unwrap();
        assert_eq!(head.enqueued_at, SimTime::new(4.5));
        assert_eq!(head.rank, 0);
    }

    #[test]
    fn test_remove() {
        let mut q = Queue::new();
        for i in 0..5 {
            q.enqueue(i, SimTime::ZERO);
        }
        assert_eq!(q.remove(|&i| i == 2).map(|e| e.item), Some(2));
        assert!(q.remove(|&i| i == 2).is_none());
        assert_eq!(drain(&mut q), vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_counts_and_clear() {
        let mut q = Queue::new();
        assert!(q.is_empty());
        q.enqueue((), SimTime::ZERO);
        q.enqueue((), SimTime::ZERO);
        q.dequeue_next();
        assert_eq!(q.len(), 1);
        assert_eq!(q.total_enqueued(), 2);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.total_enqueued(), 0);
        assert!(q.dequeue_next().is_none());
    }
}
