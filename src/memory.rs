//! Memory maintenance and resource allocation (spec §4.7).
//!
//! `maintain` runs the periodic upkeep sweep: decay every belief's and
//! edge's budget, prune anything that falls below the forgetting
//! threshold, and truncate the derivation/question/path caches back to
//! their configured sizes. `allocate` turns a task's importance/urgency
//! into a fresh [`Budget`] for scheduling.

use crate::config::Config;
use crate::hypergraph::HypergraphStore;
use crate::observer::{Observer, ObserverSet};
use crate::term::EdgeId;
use crate::truth::Budget;

/// A belief younger than this is never pruned, no matter how low its
/// relevance (spec §4.7).
const MIN_PRUNABLE_AGE_MS: u64 = 60_000;

/// A belief this confident is never pruned even if its relevance has
/// decayed (spec §4.7).
const HIGH_EXPECTATION_GUARD: f64 = 0.9;

/// Importance/urgency pair driving budget allocation for a new task.
#[derive(Debug, Clone, Copy)]
pub struct TaskDemand {
    pub importance: f64,
    pub urgency: f64,
}

/// Derive a budget from a task's importance and urgency: importance sets
/// the durability (how much staying power the task deserves), urgency
/// sets the priority, and quality starts as their product (a task that is
/// both important and urgent has the best initial quality estimate).
pub fn allocate(demand: TaskDemand) -> Budget {
    Budget::new(
        demand.urgency.clamp(0.0, 1.0),
        demand.importance.clamp(0.0, 1.0),
        (demand.importance * demand.urgency).clamp(0.0, 1.0),
    )
}

/// Report produced by one maintenance sweep.
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub edges_pruned: usize,
    pub beliefs_decayed: usize,
    pub derivation_cache_truncated_to: usize,
}

/// Run the five-step maintenance procedure (spec §4.7):
/// 1. decay every edge's belief budgets by `config.budget_decay`
/// 2. decay every belief's truth confidence slightly by `config.decay`
///    (older, unrevisited evidence should count for a little less)
/// 3. collect candidates whose decayed relevance (budget total) falls below
///    `config.budget_threshold` *and* whose expectation is below 0.5,
///    skipping anything younger than 60s or with expectation above 0.9
/// 4. sort candidates by `relevance + expectation` ascending and remove only
///    `min(5, 5% of candidates)` of them, notifying observers
/// 5. truncate the derivation cache back to `config.derivation_cache_size`
///
/// `now_ms` is the clock reading used for the age guard in step 3; the spec
/// names a `forgettingThreshold` distinct from `budgetThreshold`, but §6's
/// config table carries no such option, so relevance is measured against
/// `budget_threshold` — the only forgetting-adjacent knob the core exposes.
pub fn maintain(store: &mut HypergraphStore, config: &Config, observers: &ObserverSet, now_ms: u64) -> MaintenanceReport {
    let mut report = MaintenanceReport::default();

    let ids: Vec<_> = store.iter().map(|e| e.id.clone()).collect();

    for id in &ids {
        let Some(edge) = store.get(id) else { continue };
        let decayed_beliefs: Vec<_> = edge
            .beliefs
            .iter()
            .map(|b| {
                let mut decayed = b.clone();
                decayed.budget = decayed.budget.decay(config.budget_decay);
                decayed.truth.confidence = (decayed.truth.confidence * (1.0 - config.decay * 0.1)).max(0.0);
                decayed
            })
            .collect();
        report.beliefs_decayed += decayed_beliefs.len();
        let _ = store.replace_beliefs(id, decayed_beliefs);
    }

    let forgetting_threshold = config.budget_threshold;
    let mut candidates: Vec<(EdgeId, f64, f64)> = Vec::new();
    for id in &ids {
        let Some(edge) = store.get(id) else { continue };
        let belief = edge.best_belief();
        let relevance = belief.budget.total();
        let expectation = belief.truth.expectation();
        let age_ms = now_ms.saturating_sub(belief.timestamp);
        if age_ms < MIN_PRUNABLE_AGE_MS || expectation > HIGH_EXPECTATION_GUARD {
            continue;
        }
        if relevance < forgetting_threshold && expectation < 0.5 {
            candidates.push((id.clone(), relevance, expectation));
        }
    }

    candidates.sort_by(|a, b| {
        (a.1 + a.2)
            .partial_cmp(&(b.1 + b.2))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let remove_count = (((candidates.len() as f64) * 0.05).floor() as usize).min(5);

    for (id, _, _) in candidates.into_iter().take(remove_count) {
        if store.remove(&id).is_some() {
            report.edges_pruned += 1;
            observers.notify(Observer::KnowledgePruned {
                edge_id: id,
                reason: "relevance and expectation below forgetting threshold".to_string(),
            });
        }
    }

    store.truncate_derivation_cache(config.derivation_cache_size);
    report.derivation_cache_truncated_to = store.derivation_cache_len();

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Term, TermType};
    use crate::truth::TruthValue;

    fn inheritance(a: &str, b: &str) -> Term {
        Term::compound(TermType::Inheritance, vec![Term::atom(a), Term::atom(b)])
    }

    #[test]
    fn allocate_scales_priority_with_urgency() {
        let low = allocate(TaskDemand { importance: 0.5, urgency: 0.1 });
        let high = allocate(TaskDemand { importance: 0.5, urgency: 0.9 });
        assert!(high.priority > low.priority);
    }

    /// A low-relevance, low-expectation belief old enough to be prunable.
    fn stale_low_expectation_belief() -> TruthValue {
        TruthValue::new(0.1, 0.5, 0.5)
    }

    #[test]
    fn maintain_prunes_only_a_bounded_fraction_of_stale_candidates() {
        let mut store = HypergraphStore::new(8, 64);
        let config = Config {
            budget_decay: 1.0,
            budget_threshold: 0.5,
            ..Config::default()
        };
        let observers = ObserverSet::new();
        for i in 0..20 {
            store.add(
                inheritance("a", &format!("b{i}")),
                stale_low_expectation_belief(),
                Budget::new(0.01, 0.01, 0.01),
                0,
            );
        }
        let report = maintain(&mut store, &config, &observers, 100_000);
        assert_eq!(report.edges_pruned, 1, "5% of 20 candidates caps removal at one edge per sweep");
        assert_eq!(store.len(), 19);
    }

    #[test]
    fn maintain_keeps_edges_with_healthy_budget() {
        let mut store = HypergraphStore::new(8, 64);
        let config = Config::default();
        let observers = ObserverSet::new();
        store.add(inheritance("a", "b"), TruthValue::default_assertion(), Budget::full(), 0);
        let report = maintain(&mut store, &config, &observers, 100_000);
        assert_eq!(report.edges_pruned, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn maintain_never_prunes_a_belief_younger_than_sixty_seconds() {
        let mut store = HypergraphStore::new(8, 64);
        let config = Config {
            budget_decay: 1.0,
            budget_threshold: 0.5,
            ..Config::default()
        };
        let observers = ObserverSet::new();
        for i in 0..20 {
            store.add(
                inheritance("a", &format!("b{i}")),
                stale_low_expectation_belief(),
                Budget::new(0.01, 0.01, 0.01),
                0,
            );
        }
        // now_ms is well inside the 60s recency guard for every belief.
        let report = maintain(&mut store, &config, &observers, 1_000);
        assert_eq!(report.edges_pruned, 0);
        assert_eq!(store.len(), 20);
    }

    #[test]
    fn maintain_never_prunes_a_belief_above_the_expectation_guard() {
        let mut store = HypergraphStore::new(8, 64);
        let config = Config {
            budget_decay: 1.0,
            budget_threshold: 0.5,
            ..Config::default()
        };
        let observers = ObserverSet::new();
        for i in 0..20 {
            // frequency/confidence near 1.0 pushes expectation above the 0.9 guard.
            store.add(
                inheritance("a", &format!("b{i}")),
                TruthValue::new(0.99, 0.99, 0.5),
                Budget::new(0.01, 0.01, 0.01),
                0,
            );
        }
        let report = maintain(&mut store, &config, &observers, 100_000);
        assert_eq!(report.edges_pruned, 0);
        assert_eq!(store.len(), 20);
    }

    #[test]
    fn maintain_truncates_derivation_cache() {
        let mut store = HypergraphStore::new(8, 64);
        let config = Config {
            derivation_cache_size: 1,
            ..Config::default()
        };
        let observers = ObserverSet::new();
        store.cache_derivations(crate::term::EdgeId::new("a"), vec![crate::term::EdgeId::new("x")]);
        store.cache_derivations(crate::term::EdgeId::new("b"), vec![crate::term::EdgeId::new("y")]);
        let report = maintain(&mut store, &config, &observers, 100_000);
        assert!(report.derivation_cache_truncated_to <= 1);
    }
}
