//! Event calendars: priority-ordered containers of pending events.
//!
//! Every backing honours the same contract: `peek_min`/`pop_min` yield the
//! event with the smallest `(time, priority, id)` key, and cancellation is
//! lazy (it flips the event's flag and leaves the structure alone). The
//! executive discards cancelled events as they come off the top.
//!
//! | Backing | insert | pop | Notes |
//! |---|---|---|---|
//! | [`HeapCalendar`] | O(log n) | O(log n) | reference choice |
//! | [`TreeCalendar`] | O(log n) | O(log n) | balanced tree keyed by `EventKey` |
//! | [`ListCalendar`] | O(n) | O(1) | sorted list, cheap for append-mostly loads |
//! | [`LeftistCalendar`] | O(log n) | O(log n) | mergeable heap |

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, VecDeque};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventHandle, EventKey};

// ── Calendar trait ────────────────────────────────────────────────────

/// Ordered set of pending events.
pub trait Calendar<T> {
    /// Add an event.
    fn insert(&mut self, event: Event<T>);

    /// The minimal pending event, without removing it.
    fn peek_min(&self) -> Option<&Event<T>>;

    /// Remove and return the minimal pending event.
    fn pop_min(&mut self) -> Option<Event<T>>;

    /// Mark an event cancelled. Structural membership is unchanged.
    ///
    /// Idempotent; returns `true` only when a pending event was newly
    /// cancelled.
    fn cancel(&mut self, handle: &EventHandle) -> bool {
        handle.mark_cancelled()
    }

    /// Drop every pending event without running anything.
    fn clear(&mut self);

    /// Number of events in the structure, cancelled ones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Which backing this is.
    fn kind(&self) -> CalendarKind;

    /// Pop everything in order. Useful for tests and snapshots.
    fn drain_ordered(&mut self) -> Vec<Event<T>> {
        let mut events = Vec::with_capacity(self.len());
        while let Some(e) = self.pop_min() {
            events.push(e);
        }
        events
    }
}

// ── Calendar kind ─────────────────────────────────────────────────────

/// Selects a calendar backing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarKind {
    #[default]
    Heap,
    Tree,
    List,
    Leftist,
}

impl CalendarKind {
    pub const ALL: [CalendarKind; 4] = [
        CalendarKind::Heap,
        CalendarKind::Tree,
        CalendarKind::List,
        CalendarKind::Leftist,
    ];

    /// Build an empty calendar of this kind.
    pub fn build<T: 'static>(self) -> Box<dyn Calendar<T>> {
        match self {
            CalendarKind::Heap => Box::new(HeapCalendar::new()),
            CalendarKind::Tree => Box::new(TreeCalendar::new()),
            CalendarKind::List => Box::new(ListCalendar::new()),
            CalendarKind::Leftist => Box::new(LeftistCalendar::new()),
        }
    }
}

impl FromStr for CalendarKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heap" => Ok(CalendarKind::Heap),
            "tree" => Ok(CalendarKind::Tree),
            "list" => Ok(CalendarKind::List),
            "leftist" => Ok(CalendarKind::Leftist),
            other => Err(format!(
                "unknown calendar '{}' (expected heap, tree, list or leftist)",
                other
            )),
        }
    }
}

impl std::fmt::Display for CalendarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CalendarKind::Heap => "heap",
            CalendarKind::Tree => "tree",
            CalendarKind::List => "list",
            CalendarKind::Leftist => "leftist",
        };
        f.write_str(name)
    }
}

// ── Binary heap ───────────────────────────────────────────────────────

/// Heap entry with reversed ordering, so `BinaryHeap` (a max-heap) pops
/// the smallest key first.
struct HeapEntry<T>(Event<T>);

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.key() == other.0.key()
    }
}

impl<T> Eq for HeapEntry<T> {}

impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.key().cmp(&self.0.key())
    }
}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Binary min-heap keyed by `(time, priority, id)`.
pub struct HeapCalendar<T> {
    heap: BinaryHeap<HeapEntry<T>>,
}

impl<T> HeapCalendar<T> {
    pub fn new() -> Self {
        HeapCalendar {
            heap: BinaryHeap::new(),
        }
    }
}

impl<T> Default for HeapCalendar<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Calendar<T> for HeapCalendar<T> {
    fn insert(&mut self, event: Event<T>) {
        self.heap.push(HeapEntry(event));
    }

    fn peek_min(&self) -> Option<&Event<T>> {
        self.heap.peek().map(|entry| &entry.0)
    }

    fn pop_min(&mut self) -> Option<Event<T>> {
        self.heap.pop().map(|entry| entry.0)
    }

    fn clear(&mut self) {
        self.heap.clear();
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn kind(&self) -> CalendarKind {
        CalendarKind::Heap
    }
}

// ── Balanced tree ─────────────────────────────────────────────────────

/// B-tree keyed directly by `EventKey`; keys are unique because ids are.
pub struct TreeCalendar<T> {
    tree: BTreeMap<EventKey, Event<T>>,
}

impl<T> TreeCalendar<T> {
    pub fn new() -> Self {
        TreeCalendar {
            tree: BTreeMap::new(),
        }
    }
}

impl<T> Default for TreeCalendar<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Calendar<T> for TreeCalendar<T> {
    fn insert(&mut self, event: Event<T>) {
        self.tree.insert(event.key(), event);
    }

    fn peek_min(&self) -> Option<&Event<T>> {
        self.tree.first_key_value().map(|(_, e)| e)
    }

    fn pop_min(&mut self) -> Option<Event<T>> {
        self.tree.pop_first().map(|(_, e)| e)
    }

    fn clear(&mut self) {
        self.tree.clear();
    }

    fn len(&self) -> usize {
        self.tree.len()
    }

    fn kind(&self) -> CalendarKind {
        CalendarKind::Tree
    }
}

// ── Sorted list ───────────────────────────────────────────────────────

/// Ascending list; the front is always the minimum.
pub struct ListCalendar<T> {
    list: VecDeque<Event<T>>,
}

impl<T> ListCalendar<T> {
    pub fn new() -> Self {
        ListCalendar {
            list: VecDeque::new(),
        }
    }
}

impl<T> Default for ListCalendar<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Calendar<T> for ListCalendar<T> {
    fn insert(&mut self, event: Event<T>) {
        let key = event.key();
        // Fast path: most new events land at the back.
        if self.list.back().map_or(true, |last| last.key() < key) {
            self.list.push_back(event);
            return;
        }
        let at = self.list.partition_point(|e| e.key() < key);
        self.list.insert(at, event);
    }

    fn peek_min(&self) -> Option<&Event<T>> {
        self.list.front()
    }

    fn pop_min(&mut self) -> Option<Event<T>> {
        self.list.pop_front()
    }

    fn clear(&mut self) {
        self.list.clear();
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn kind(&self) -> CalendarKind {
        CalendarKind::List
    }
}

// ── Leftist heap ──────────────────────────────────────────────────────

struct LeftistNode<T> {
    event: Event<T>,
    /// Length of the right spine; the leftist property keeps it O(log n).
    rank: usize,
    left: Option<Box<LeftistNode<T>>>,
    right: Option<Box<LeftistNode<T>>>,
}

fn rank<T>(node: &Option<Box<LeftistNode<T>>>) -> usize {
    node.as_ref().map_or(0, |n| n.rank)
}

/// Merge two leftist heaps. Recursion only walks right spines, so depth is
/// logarithmic in the heap size.
fn merge<T>(
    a: Option<Box<LeftistNode<T>>>,
    b: Option<Box<LeftistNode<T>>>,
) -> Option<Box<LeftistNode<T>>> {
    match (a, b) {
        (None, h) | (h, None) => h,
        (Some(mut a), Some(mut b)) => {
            if b.event.key() < a.event.key() {
                std::mem::swap(&mut a, &mut b);
            }
            let right = a.right.take();
            a.right = merge(right, Some(b));
            if rank(&a.left) < rank(&a.right) {
                std::mem::swap(&mut a.left, &mut a.right);
            }
            a.rank = rank(&a.right) + 1;
            Some(a)
        }
    }
}

/// Mergeable leftist heap.
pub struct LeftistCalendar<T> {
    root: Option<Box<LeftistNode<T>>>,
    len: usize,
}

impl<T> LeftistCalendar<T> {
    pub fn new() -> Self {
        LeftistCalendar { root: None, len: 0 }
    }

    /// Absorb every event of `other`, leaving it empty.
    pub fn merge_from(&mut self, other: &mut LeftistCalendar<T>) {
        let theirs = other.root.take();
        self.len += std::mem::take(&mut other.len);
        self.root = merge(self.root.take(), theirs);
    }
}

impl<T> Default for LeftistCalendar<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LeftistCalendar<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Calendar<T> for LeftistCalendar<T> {
    fn insert(&mut self, event: Event<T>) {
        let node = Box::new(LeftistNode {
            event,
            rank: 1,
            left: None,
            right: None,
        });
        self.root = merge(self.root.take(), Some(node));
        self.len += 1;
    }

    fn peek_min(&self) -> Option<&Event<T>> {
        self.root.as_ref().map(|n| &n.event)
    }

    fn pop_min(&mut self) -> Option<Event<T>> {
        let mut root = self.root.take()?;
        self.root = merge(root.left.take(), root.right.take());
        self.len -= 1;
        Some(root.event)
    }

    fn clear(&mut self) {
        // Left spines can be long; tear down iteratively instead of relying
        // on recursive Box drops.
        let mut stack: Vec<Box<LeftistNode<T>>> = self.root.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }

    fn kind(&self) -> CalendarKind {
        CalendarKind::Leftist
    }
}
