//! Pending-request queue contract and in-memory implementations
//!
//! The engine only relies on push/pop/has_pending; ordering is whatever the
//! chosen implementation provides. `MemoryQueue` is plain FIFO,
//! `PriorityQueue` pops lower priority values first.

use crate::protocol::Request;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Holds not-yet-dispatched requests
///
/// Engine correctness must not depend on the ordering discipline; the only
/// guarantees are that `push` always succeeds and that a pushed request is
/// eventually returned by `pop`.
pub trait PendingQueue: Send {
    fn push(&mut self, request: Request);
    fn pop(&mut self) -> Option<Request>;
    fn has_pending(&self) -> bool;
}

/// FIFO queue backed by a `VecDeque`
#[derive(Default)]
pub struct MemoryQueue {
    pending: VecDeque<Request>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingQueue for MemoryQueue {
    fn push(&mut self, request: Request) {
        self.pending.push_back(request);
    }

    fn pop(&mut self) -> Option<Request> {
        self.pending.pop_front()
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

// Heap entry ordering: lower priority values pop first, ties broken by
// insertion order so equal-priority requests stay FIFO.
struct HeapEntry {
    request: Request,
    seq: u64,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .request
            .priority
            .cmp(&self.request.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.request.priority == other.request.priority && self.seq == other.seq
    }
}

impl Eq for HeapEntry {}

/// Priority queue backed by a `BinaryHeap`; lower values are popped first
#[derive(Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<HeapEntry>,
    next_seq: u64,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingQueue for PriorityQueue {
    fn push(&mut self, request: Request) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapEntry { request, seq });
    }

    fn pop(&mut self) -> Option<Request> {
        self.heap.pop().map(|entry| entry.request)
    }

    fn has_pending(&self) -> bool {
        !self.heap.is_empty()
    }
}
