//! Typed observer/listener set (Design Notes): replaces an event-emitter
//! with string event names by a closed enum of everything the engine can
//! report, so subscribers pattern-match instead of string-matching.

use crate::term::EdgeId;
use crate::truth::TruthValue;
use tracing::debug;

/// Everything external code can observe happening inside the engine.
#[derive(Debug, Clone)]
pub enum Observer {
    BeliefAdded {
        edge_id: EdgeId,
        truth: TruthValue,
    },
    ContradictionDetected {
        edge_id: EdgeId,
        severity: f64,
    },
    ContradictionResolved {
        edge_id: EdgeId,
        strategy: String,
    },
    FocusChanged {
        focus: String,
    },
    KnowledgePruned {
        edge_id: EdgeId,
        reason: String,
    },
    ConceptFormed {
        edge_id: EdgeId,
    },
    Log {
        message: String,
    },
}

/// A subscriber callback. Boxed so `ObserverSet` can hold a heterogeneous
/// collection of closures and trait objects alike.
pub type ObserverFn = Box<dyn Fn(&Observer) + Send + Sync>;

/// Registered observers, notified in registration order. Every notification
/// is additionally traced at debug level regardless of subscribers, so the
/// `tracing` log carries a full record even with no observers attached.
#[derive(Default)]
pub struct ObserverSet {
    subscribers: Vec<ObserverFn>,
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, f: impl Fn(&Observer) + Send + Sync + 'static) {
        self.subscribers.push(Box::new(f));
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn notify(&self, event: Observer) {
        trace_event(&event);
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
    }
}

fn trace_event(event: &Observer) {
    match event {
        Observer::BeliefAdded { edge_id, truth } => {
            debug!(edge_id = %edge_id, frequency = truth.frequency, confidence = truth.confidence, "belief added");
        }
        Observer::ContradictionDetected { edge_id, severity } => {
            debug!(edge_id = %edge_id, severity, "contradiction detected");
        }
        Observer::ContradictionResolved { edge_id, strategy } => {
            debug!(edge_id = %edge_id, strategy, "contradiction resolved");
        }
        Observer::FocusChanged { focus } => {
            debug!(focus, "focus changed");
        }
        Observer::KnowledgePruned { edge_id, reason } => {
            debug!(edge_id = %edge_id, reason, "knowledge pruned");
        }
        Observer::ConceptFormed { edge_id } => {
            debug!(edge_id = %edge_id, "concept formed");
        }
        Observer::Log { message } => {
            debug!(message, "log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn notifies_all_subscribers_in_order() {
        let mut set = ObserverSet::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c1 = count.clone();
        set.subscribe(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = count.clone();
        set.subscribe(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        });
        set.notify(Observer::Log {
            message: "hello".into(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn empty_set_notifies_without_panicking() {
        let set = ObserverSet::new();
        set.notify(Observer::Log {
            message: "noop".into(),
        });
    }
}
