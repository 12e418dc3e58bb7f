//! Priority-driven propagation (spec §4.3): turning one `Event` into a
//! merged belief in the hypergraph, subject to four ordered guards —
//! path-length cap, budget-threshold cutoff, and a path-hash/path-length
//! loop guard that stops an event from re-treading ground it (or a
//! cheaper route to the same conclusion) has already covered.
//!
//! The path-hash mixing scheme is deliberately implemented once, here:
//! FNV-1a64 folds the edge id's bytes into a 64-bit digest, then
//! SplitMix64 mixes that digest with the parent path hash. Every other
//! module that needs a path hash calls [`mix_path_hash`] rather than
//! reimplementing the combination.

use crate::config::Config;
use crate::hypergraph::HypergraphStore;
use crate::observer::{Observer, ObserverSet};
use crate::term::{EdgeId, Term};
use crate::truth::{Budget, TruthValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One unit of propagating belief: a term with its truth/budget, and the
/// bookkeeping (`path_hash`, `path_length`) the loop guard needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub edge_id: EdgeId,
    pub term: Term,
    pub truth: TruthValue,
    pub budget: Budget,
    pub path_hash: u64,
    pub path_length: u32,
    /// Edge this event was derived from, if any (root assertions have none).
    pub source: Option<EdgeId>,
    /// Edges this event's belief is grounded in, for provenance (spec §3's
    /// `Belief.premises`). Empty for an externally asserted root event.
    pub premises: Vec<EdgeId>,
    /// Name of the rule that produced this event, `None` for a root event.
    pub derived_by: Option<String>,
}

impl Event {
    /// A root event: an externally asserted belief with no propagation
    /// history yet.
    pub fn new(term: Term, truth: TruthValue, budget: Budget) -> Self {
        let edge_id = term.edge_id();
        let path_hash = mix_path_hash(0, &edge_id);
        Self {
            edge_id,
            term,
            truth,
            budget,
            path_hash,
            path_length: 0,
            source: None,
            premises: Vec::new(),
            derived_by: None,
        }
    }

    /// A derived event produced by propagating from `parent` through a rule
    /// or revision step: extends the parent's path hash and length by one.
    /// Inherits the parent's provenance; rule actions that know the precise
    /// premise set should overwrite `premises`/`derived_by` with
    /// [`Event::with_provenance`] afterward.
    pub fn propagate_to(parent: &Event, term: Term, truth: TruthValue, budget: Budget) -> Self {
        let edge_id = term.edge_id();
        let path_hash = mix_path_hash(parent.path_hash, &edge_id);
        Self {
            edge_id,
            term,
            truth,
            budget,
            path_hash,
            path_length: parent.path_length + 1,
            source: Some(parent.edge_id.clone()),
            premises: parent.premises.clone(),
            derived_by: parent.derived_by.clone(),
        }
    }

    /// Attach explicit provenance to a derived event (the rule name and the
    /// exact premise edges it combined).
    pub fn with_provenance(mut self, premises: Vec<EdgeId>, derived_by: impl Into<String>) -> Self {
        self.premises = premises;
        self.derived_by = Some(derived_by.into());
        self
    }
}

/// FNV-1a 64-bit hash of a string, the first stage of [`mix_path_hash`].
fn fnv1a64(s: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// SplitMix64's mixing step, used to fold a parent path hash with the
/// FNV-1a64 digest of the next edge id in the path.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Combine a parent path hash with the next edge id's digest. Every module
/// that needs a path hash (propagation, inference, tests) calls this rather
/// than hashing ad hoc, so a single scheme governs loop detection
/// consistently across the engine.
pub fn mix_path_hash(parent_hash: u64, edge_id: &EdgeId) -> u64 {
    splitmix64(parent_hash ^ fnv1a64(edge_id.as_str()))
}

/// Outcome of attempting to propagate one event, reported to the caller so
/// it can decide whether to enqueue further derivation from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationOutcome {
    Accepted,
    DroppedPathTooLong,
    DroppedBelowThreshold,
    DroppedLoop,
}

/// Enqueue-time admission guard (spec §4.3, guards 1-3): an event only
/// reaches the scheduler if its priority clears `budgetThreshold`, its path
/// length is within `maxPathLength`, and it isn't retreading a path
/// `memoization` already recorded at an equal or shorter length. Callers
/// that push onto the [`crate::queue::PriorityQueue`] — root assertions
/// and rule-derived children alike — consult this before `push`, so a
/// rejected event never occupies a queue slot (scenario S5).
pub fn admit(event: &Event, config: &Config, memoization: &HashMap<(EdgeId, u64), u32>) -> bool {
    if event.budget.priority < config.budget_threshold {
        return false;
    }
    if event.path_length > config.max_path_length {
        return false;
    }
    if let Some(&best) = memoization.get(&(event.edge_id.clone(), event.path_hash)) {
        if best <= event.path_length {
            return false;
        }
    }
    true
}

/// Run one event through the four ordered guards and, if accepted, merge
/// its belief into `hypergraph` and update `memoization`.
///
/// Guard order (spec §4.3):
/// 1. `path_length <= config.max_path_length`
/// 2. `budget.priority >= config.budget_threshold`
/// 3. loop guard: `memoization[(edge_id, path_hash)]` must not already
///    record a path length `<= event.path_length` — an event retreading a
///    path it (or an equally short alternate path) already took is dropped.
/// 4. merge the belief, update memoization, notify observers.
pub fn propagate(
    hypergraph: &mut HypergraphStore,
    memoization: &mut HashMap<(EdgeId, u64), u32>,
    config: &Config,
    observers: &ObserverSet,
    timestamp: u64,
    event: Event,
) -> (PropagationOutcome, Option<crate::hypergraph::Belief>) {
    if event.path_length > config.max_path_length {
        return (PropagationOutcome::DroppedPathTooLong, None);
    }
    if event.budget.priority < config.budget_threshold {
        return (PropagationOutcome::DroppedBelowThreshold, None);
    }

    let key = (event.edge_id.clone(), event.path_hash);
    if let Some(&best) = memoization.get(&key) {
        if best <= event.path_length {
            return (PropagationOutcome::DroppedLoop, None);
        }
    }
    memoization.insert(key, event.path_length);

    let (_, belief) = hypergraph.add_full(
        event.term.clone(),
        event.truth,
        event.budget,
        timestamp,
        None,
        event.premises.clone(),
        event.derived_by.clone(),
    );
    observers.notify(Observer::BeliefAdded {
        edge_id: event.edge_id.clone(),
        truth: event.truth,
    });

    (PropagationOutcome::Accepted, Some(belief))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Term, TermType};

    fn edge(name: &str) -> EdgeId {
        EdgeId::new(name)
    }

    #[test]
    fn mix_path_hash_is_deterministic() {
        let a = mix_path_hash(42, &edge("Inheritance(a,b)"));
        let b = mix_path_hash(42, &edge("Inheritance(a,b)"));
        assert_eq!(a, b);
    }

    #[test]
    fn mix_path_hash_differs_for_different_edges() {
        let a = mix_path_hash(42, &edge("Inheritance(a,b)"));
        let b = mix_path_hash(42, &edge("Inheritance(a,c)"));
        assert_ne!(a, b);
    }

    #[test]
    fn propagate_to_extends_path_length() {
        let root = Event::new(
            Term::compound(TermType::Inheritance, vec![Term::atom("a"), Term::atom("b")]),
            TruthValue::default_assertion(),
            Budget::full(),
        );
        let child = Event::propagate_to(
            &root,
            Term::compound(TermType::Inheritance, vec![Term::atom("a"), Term::atom("c")]),
            TruthValue::default_assertion(),
            Budget::full(),
        );
        assert_eq!(child.path_length, 1);
        assert_eq!(child.source, Some(root.edge_id));
        assert_ne!(child.path_hash, root.path_hash);
    }

    #[test]
    fn drops_event_exceeding_max_path_length() {
        let mut hypergraph = HypergraphStore::new(8, 64);
        let mut memo = HashMap::new();
        let config = Config {
            max_path_length: 1,
            ..Config::default()
        };
        let observers = ObserverSet::new();
        let mut event = Event::new(
            Term::compound(TermType::Inheritance, vec![Term::atom("a"), Term::atom("b")]),
            TruthValue::default_assertion(),
            Budget::full(),
        );
        event.path_length = 5;
        let (outcome, _) = propagate(&mut hypergraph, &mut memo, &config, &observers, 0, event);
        assert_eq!(outcome, PropagationOutcome::DroppedPathTooLong);
    }

    #[test]
    fn drops_event_below_budget_threshold() {
        let mut hypergraph = HypergraphStore::new(8, 64);
        let mut memo = HashMap::new();
        let config = Config::default();
        let observers = ObserverSet::new();
        let event = Event::new(
            Term::compound(TermType::Inheritance, vec![Term::atom("a"), Term::atom("b")]),
            TruthValue::default_assertion(),
            Budget::new(0.001, 0.001, 0.001),
        );
        let (outcome, _) = propagate(&mut hypergraph, &mut memo, &config, &observers, 0, event);
        assert_eq!(outcome, PropagationOutcome::DroppedBelowThreshold);
    }

    #[test]
    fn drops_repeated_event_on_equal_or_shorter_path() {
        let mut hypergraph = HypergraphStore::new(8, 64);
        let mut memo = HashMap::new();
        let config = Config::default();
        let observers = ObserverSet::new();
        let term = Term::compound(TermType::Inheritance, vec![Term::atom("a"), Term::atom("b")]);
        let event = Event::new(term.clone(), TruthValue::default_assertion(), Budget::full());
        let repeat = event.clone();
        assert_eq!(
            propagate(&mut hypergraph, &mut memo, &config, &observers, 0, event).0,
            PropagationOutcome::Accepted
        );
        assert_eq!(
            propagate(&mut hypergraph, &mut memo, &config, &observers, 0, repeat).0,
            PropagationOutcome::DroppedLoop
        );
    }

    #[test]
    fn accepted_event_merges_into_hypergraph() {
        let mut hypergraph = HypergraphStore::new(8, 64);
        let mut memo = HashMap::new();
        let config = Config::default();
        let observers = ObserverSet::new();
        let term = Term::compound(TermType::Inheritance, vec![Term::atom("a"), Term::atom("b")]);
        let event = Event::new(term.clone(), TruthValue::default_assertion(), Budget::full());
        let edge_id = event.edge_id.clone();
        propagate(&mut hypergraph, &mut memo, &config, &observers, 0, event);
        assert!(hypergraph.has(&edge_id));
    }
}
