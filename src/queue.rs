//! Priority-driven event queue (spec §4.3, §5): a binary max-heap ordered by
//! budget priority, ties broken by insertion order (oldest first) so the
//! scheduler behaves deterministically under equal priority.

use crate::propagation::Event;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Scheduled {
    event: Event,
    seq: u64,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.event.budget.priority == other.event.budget.priority && self.seq == other.seq
    }
}
impl Eq for Scheduled {}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.event
            .budget
            .priority
            .partial_cmp(&other.event.budget.priority)
            .unwrap_or(Ordering::Equal)
            // earlier insertion wins ties: reverse seq ordering so BinaryHeap
            // (a max-heap) surfaces the smaller seq first among equal priorities.
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority-ordered event queue driving the propagation loop.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn push(&mut self, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { event, seq });
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|s| s.event)
    }

    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek().map(|s| &s.event)
    }

    /// Drain every event matching `predicate`, leaving the rest queued in
    /// their relative order.
    pub fn filter(&mut self, predicate: impl Fn(&Event) -> bool) -> Vec<Event> {
        let drained: Vec<Scheduled> = std::mem::take(&mut self.heap).into_vec();
        let (matched, rest): (Vec<_>, Vec<_>) =
            drained.into_iter().partition(|s| predicate(&s.event));
        self.heap = BinaryHeap::from(rest);
        matched.into_iter().map(|s| s.event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{EdgeId, Term, TermType};
    use crate::truth::{Budget, TruthValue};

    fn event_with_priority(p: f64) -> Event {
        let term = Term::compound(TermType::Inheritance, vec![Term::atom("a"), Term::atom("b")]);
        Event {
            edge_id: term.edge_id(),
            term,
            truth: TruthValue::default_assertion(),
            budget: Budget::new(p, 0.8, 0.8),
            path_hash: 0,
            path_length: 0,
            source: None,
            premises: Vec::new(),
            derived_by: None,
        }
    }

    #[test]
    fn pops_highest_priority_first() {
        let mut q = PriorityQueue::new();
        q.push(event_with_priority(0.2));
        q.push(event_with_priority(0.9));
        q.push(event_with_priority(0.5));
        assert_eq!(q.pop().unwrap().budget.priority, 0.9);
        assert_eq!(q.pop().unwrap().budget.priority, 0.5);
        assert_eq!(q.pop().unwrap().budget.priority, 0.2);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut q = PriorityQueue::new();
        let mut first = event_with_priority(0.5);
        first.edge_id = EdgeId::new("first");
        let mut second = event_with_priority(0.5);
        second.edge_id = EdgeId::new("second");
        q.push(first);
        q.push(second);
        assert_eq!(q.pop().unwrap().edge_id.as_str(), "first");
        assert_eq!(q.pop().unwrap().edge_id.as_str(), "second");
    }

    #[test]
    fn filter_removes_matching_events_only() {
        let mut q = PriorityQueue::new();
        q.push(event_with_priority(0.1));
        q.push(event_with_priority(0.9));
        let dropped = q.filter(|e| e.budget.priority < 0.5);
        assert_eq!(dropped.len(), 1);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn empty_queue_pops_none() {
        let mut q = PriorityQueue::new();
        assert!(q.pop().is_none());
    }
}
