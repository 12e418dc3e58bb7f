//! Contradiction detection and resolution (spec §4.5).
//!
//! Two beliefs on the same edge contradict when their frequencies diverge
//! by more than `contradiction_threshold` and both are confident enough to
//! take seriously. Resolution picks a strategy by a fixed priority order
//! and a circuit breaker suspends resolution after too many failures in a
//! sliding window, the way a flaky external dependency gets temporarily
//! fenced off rather than retried forever.

use crate::config::Config;
use crate::error::ContradictionError;
use crate::hypergraph::{Belief, Evidence, Hyperedge, HypergraphStore};
use crate::observer::{Observer, ObserverSet};
use crate::term::{EdgeId, Term, TermType};
use crate::truth::{Budget, TruthValue};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A detected conflict between two beliefs on the same edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    pub edge_id: EdgeId,
    pub belief_a: Belief,
    pub belief_b: Belief,
    pub severity: f64,
    /// Snapshot of the edge's evidence array at detection time, the raw
    /// material `evidence_strength` scores against (spec §3, §4.5).
    pub evidence: Vec<Evidence>,
}

/// Resolution strategies, in the fixed priority order they're attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    DominantEvidence,
    Specialize,
    SourceReliability,
    RecencyBiased,
    EvidenceWeighted,
    Merge,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::DominantEvidence => "dominant_evidence",
            Strategy::Specialize => "specialize",
            Strategy::SourceReliability => "source-reliability",
            Strategy::RecencyBiased => "recency-biased",
            Strategy::EvidenceWeighted => "evidence-weighted",
            Strategy::Merge => "merge",
        }
    }

    pub fn parse(s: &str) -> Option<Strategy> {
        Some(match s {
            "dominant_evidence" => Strategy::DominantEvidence,
            "specialize" => Strategy::Specialize,
            "source-reliability" => Strategy::SourceReliability,
            "recency-biased" => Strategy::RecencyBiased,
            "evidence-weighted" => Strategy::EvidenceWeighted,
            "merge" => Strategy::Merge,
            _ => return None,
        })
    }

    /// Fixed attempt order (spec §4.5): try to pick one clear winner first,
    /// then progressively more conservative fallbacks, ending in a merge
    /// that always succeeds.
    pub fn priority_order() -> &'static [Strategy] {
        &[
            Strategy::DominantEvidence,
            Strategy::Specialize,
            Strategy::SourceReliability,
            Strategy::RecencyBiased,
            Strategy::EvidenceWeighted,
            Strategy::Merge,
        ]
    }
}

/// Detect a contradiction between two beliefs on the same edge (spec §4.5):
/// either a strong frequency gap with both beliefs reasonably confident on
/// average, or a moderate frequency gap paired with a large confidence gap.
pub fn detect(belief_a: &Belief, belief_b: &Belief, config: &Config) -> Option<f64> {
    let frequency_gap = (belief_a.truth.frequency - belief_b.truth.frequency).abs();
    let confidence_gap = (belief_a.truth.confidence - belief_b.truth.confidence).abs();
    let avg_confidence = (belief_a.truth.confidence + belief_b.truth.confidence) / 2.0;

    let strong_gap = frequency_gap > config.contradiction_threshold && avg_confidence > 0.6;
    let moderate_gap = frequency_gap > 0.3 && confidence_gap > 0.4 && avg_confidence > 0.5;
    if !strong_gap && !moderate_gap {
        return None;
    }
    Some((belief_a.truth.expectation() - belief_b.truth.expectation()).abs())
}

/// Scan an edge's belief array for the most severe pairwise contradiction,
/// if any crosses the threshold.
pub fn check_edge(edge: &Hyperedge, config: &Config) -> Option<Contradiction> {
    let beliefs = &edge.beliefs;
    let mut worst: Option<Contradiction> = None;
    for i in 0..beliefs.len() {
        for j in (i + 1)..beliefs.len() {
            if let Some(severity) = detect(&beliefs[i], &beliefs[j], config) {
                let candidate = Contradiction {
                    edge_id: edge.id.clone(),
                    belief_a: beliefs[i].clone(),
                    belief_b: beliefs[j].clone(),
                    severity,
                    evidence: edge.evidence.clone(),
                };
                if worst.as_ref().map(|w| severity > w.severity).unwrap_or(true) {
                    worst = Some(candidate);
                }
            }
        }
    }
    worst
}

/// Sliding-window failure circuit breaker for contradiction resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircuitBreaker {
    failures: VecDeque<u64>,
    tripped_until: Option<u64>,
}

impl CircuitBreaker {
    pub fn is_open(&self, now_ms: u64) -> bool {
        self.tripped_until.map(|until| now_ms < until).unwrap_or(false)
    }

    fn record_failure(&mut self, now_ms: u64, config: &Config) {
        self.failures.push_back(now_ms);
        while let Some(&front) = self.failures.front() {
            if now_ms.saturating_sub(front) > config.circuit_breaker_window_ms {
                self.failures.pop_front();
            } else {
                break;
            }
        }
        if self.failures.len() as u32 >= config.circuit_breaker_threshold {
            self.tripped_until = Some(now_ms + config.circuit_breaker_duration_ms);
            self.failures.clear();
        }
    }

    fn record_success(&mut self) {
        self.failures.clear();
    }
}

/// Attempt to resolve `contradiction` in-place on `store`, trying each
/// strategy in priority order until one applies, reporting the outcome to
/// `observers` and the circuit breaker. `source_reliability` feeds the
/// `source-reliability` strategy's trigger and the reliability term of
/// `evidence_strength`; pass an empty map when no reliability data is
/// tracked (every source then defaults to 0.5).
pub fn resolve(
    store: &mut HypergraphStore,
    contradiction: &Contradiction,
    breaker: &mut CircuitBreaker,
    config: &Config,
    observers: &ObserverSet,
    now_ms: u64,
    source_reliability: &HashMap<String, f64>,
) -> Result<Strategy, ContradictionError> {
    if breaker.is_open(now_ms) {
        let remaining = breaker.tripped_until.unwrap_or(now_ms).saturating_sub(now_ms);
        return Err(ContradictionError::ResolverUnavailable {
            remaining_ms: remaining,
        });
    }

    observers.notify(Observer::ContradictionDetected {
        edge_id: contradiction.edge_id.clone(),
        severity: contradiction.severity,
    });

    for strategy in Strategy::priority_order() {
        if *strategy == Strategy::Specialize {
            if specialize(store, contradiction, now_ms).is_some() {
                breaker.record_success();
                observers.notify(Observer::ContradictionResolved {
                    edge_id: contradiction.edge_id.clone(),
                    strategy: strategy.name().to_string(),
                });
                return Ok(*strategy);
            }
            continue;
        }
        if let Some(resolved) = apply_strategy(*strategy, contradiction, source_reliability) {
            let result = store.replace_beliefs(&contradiction.edge_id, resolved);
            match result {
                Ok(()) => {
                    breaker.record_success();
                    observers.notify(Observer::ContradictionResolved {
                        edge_id: contradiction.edge_id.clone(),
                        strategy: strategy.name().to_string(),
                    });
                    return Ok(*strategy);
                }
                Err(_) => {
                    breaker.record_failure(now_ms, config);
                    continue;
                }
            }
        }
    }

    breaker.record_failure(now_ms, config);
    Err(ContradictionError::NotFound {
        edge_id: contradiction.edge_id.as_str().to_string(),
    })
}

/// `specialize` (spec §4.5): when the two contenders carry distinct context
/// tags (approximated here by their `source`, the closest field our Belief
/// model carries), split the weaker one off into its own `edgeId|context:`
/// edge, link it back to the original via `Similarity` at (0.8, 0.8), and
/// drop it from the original edge's belief list.
fn specialize(store: &mut HypergraphStore, c: &Contradiction, now_ms: u64) -> Option<EdgeId> {
    let (a_ctx, b_ctx) = (c.belief_a.source.as_ref()?, c.belief_b.source.as_ref()?);
    if a_ctx == b_ctx {
        return None;
    }
    let (winner, loser, loser_ctx) = if c.belief_a.truth.expectation() >= c.belief_b.truth.expectation() {
        (&c.belief_a, &c.belief_b, b_ctx.clone())
    } else {
        (&c.belief_b, &c.belief_a, a_ctx.clone())
    };

    let original_term = store.get(&c.edge_id)?.term.clone();
    store.replace_beliefs(&c.edge_id, vec![winner.clone()]).ok()?;
    let specialized_id = store.add_specialized(&c.edge_id, &loser_ctx, original_term, loser.clone());

    let similarity = Term::compound(
        TermType::Similarity,
        vec![Term::atom(specialized_id.as_str()), Term::atom(c.edge_id.as_str())],
    );
    store.add(similarity, TruthValue::new(0.8, 0.8, 0.8), Budget::full(), now_ms);
    Some(specialized_id)
}

/// Evidence-strength score for one belief (spec §4.5): a normalized blend of
/// its own truth/budget (weight 0.2), the sum of matching evidence-array
/// strength (weight 0.8), and that same sum weighted by each evidence
/// item's source reliability (weight 0.5). "Matching" means evidence
/// recorded for the same source this belief carries.
fn evidence_strength(belief: &Belief, evidence: &[Evidence], source_reliability: &HashMap<String, f64>) -> f64 {
    const W_INTRINSIC: f64 = 0.2;
    const W_EXTERNAL: f64 = 0.8;
    const W_RELIABILITY: f64 = 0.5;

    let intrinsic = belief.truth.expectation() * belief.budget.priority;
    let matching: Vec<&Evidence> = evidence.iter().filter(|e| e.source == belief.source).collect();
    let external_sum: f64 = matching.iter().map(|e| e.strength).sum();
    let reliability_weighted: f64 = matching
        .iter()
        .map(|e| {
            let reliability = e
                .source
                .as_ref()
                .and_then(|s| source_reliability.get(s))
                .copied()
                .unwrap_or(0.5);
            e.strength * reliability
        })
        .sum();

    (W_INTRINSIC * intrinsic + W_EXTERNAL * external_sum + W_RELIABILITY * reliability_weighted)
        / (W_INTRINSIC + W_EXTERNAL + W_RELIABILITY)
}

/// Synthesize one belief as a weighted blend of two contenders' frequency
/// and confidence (spec §4.5's `evidence-weighted`/`source-reliability`
/// actions), falling back to an even split if both weights vanish.
fn weighted_synthesis(c: &Contradiction, weight_a: f64, weight_b: f64) -> Belief {
    let total = weight_a + weight_b;
    let (wa, wb) = if total > 1e-9 { (weight_a / total, weight_b / total) } else { (0.5, 0.5) };
    let frequency = c.belief_a.truth.frequency * wa + c.belief_b.truth.frequency * wb;
    let confidence = c.belief_a.truth.confidence * wa + c.belief_b.truth.confidence * wb;
    let priority = c.belief_a.truth.priority.max(c.belief_b.truth.priority);
    let truth = TruthValue::new(frequency, confidence, priority);
    let budget = c.belief_a.budget.merge(&c.belief_b.budget);
    Belief::new(truth, budget, c.belief_a.timestamp.max(c.belief_b.timestamp))
}

/// Compute the reconciled belief array a given strategy would produce, or
/// `None` if that strategy does not apply to this contradiction.
fn apply_strategy(strategy: Strategy, c: &Contradiction, source_reliability: &HashMap<String, f64>) -> Option<Vec<Belief>> {
    match strategy {
        Strategy::DominantEvidence => {
            let strength_a = evidence_strength(&c.belief_a, &c.evidence, source_reliability);
            let strength_b = evidence_strength(&c.belief_b, &c.evidence, source_reliability);
            let (winner, strongest, next) = if strength_a >= strength_b {
                (&c.belief_a, strength_a, strength_b)
            } else {
                (&c.belief_b, strength_b, strength_a)
            };
            let dominant = if next <= 1e-9 { strongest > 1e-9 } else { strongest >= 1.5 * next };
            if !dominant {
                return None;
            }
            Some(vec![winner.clone()])
        }
        Strategy::Specialize => {
            if c.belief_a.source.is_none() || c.belief_b.source.is_none() {
                return None;
            }
            Some(vec![c.belief_a.clone(), c.belief_b.clone()])
        }
        Strategy::SourceReliability => {
            let (a_src, b_src) = (c.belief_a.source.as_ref()?, c.belief_b.source.as_ref()?);
            if a_src == b_src {
                return None;
            }
            let a_rel = source_reliability.get(a_src).copied().unwrap_or(0.5);
            let b_rel = source_reliability.get(b_src).copied().unwrap_or(0.5);
            if (a_rel - b_rel).abs() < 0.3 {
                return None;
            }
            Some(vec![weighted_synthesis(c, a_rel, b_rel)])
        }
        Strategy::RecencyBiased => {
            if c.belief_a.timestamp == c.belief_b.timestamp {
                return None;
            }
            let newer = if c.belief_a.timestamp > c.belief_b.timestamp {
                &c.belief_a
            } else {
                &c.belief_b
            };
            Some(vec![newer.clone()])
        }
        Strategy::EvidenceWeighted => {
            if c.evidence.len() < 3 {
                return None;
            }
            let strength_a = evidence_strength(&c.belief_a, &c.evidence, source_reliability);
            let strength_b = evidence_strength(&c.belief_b, &c.evidence, source_reliability);
            Some(vec![weighted_synthesis(c, strength_a, strength_b)])
        }
        Strategy::Merge => {
            let merged = c.belief_a.truth.revise(&c.belief_b.truth);
            let budget = c.belief_a.budget.merge(&c.belief_b.budget);
            Some(vec![Belief::new(merged, budget, c.belief_a.timestamp.max(c.belief_b.timestamp))])
        }
    }
}

/// Attempt exactly one named strategy (an explicit caller choice via
/// `resolveContradiction(id, strategy)`), rather than walking the fixed
/// priority order. Still subject to the circuit breaker and still reports
/// to observers/the breaker on success or failure.
pub fn resolve_strategy(
    store: &mut HypergraphStore,
    contradiction: &Contradiction,
    strategy: Strategy,
    breaker: &mut CircuitBreaker,
    config: &Config,
    observers: &ObserverSet,
    now_ms: u64,
    source_reliability: &HashMap<String, f64>,
) -> Result<Strategy, ContradictionError> {
    if breaker.is_open(now_ms) {
        let remaining = breaker.tripped_until.unwrap_or(now_ms).saturating_sub(now_ms);
        return Err(ContradictionError::ResolverUnavailable {
            remaining_ms: remaining,
        });
    }

    let applied = if strategy == Strategy::Specialize {
        specialize(store, contradiction, now_ms).is_some()
    } else if let Some(resolved) = apply_strategy(strategy, contradiction, source_reliability) {
        store.replace_beliefs(&contradiction.edge_id, resolved).is_ok()
    } else {
        false
    };

    if applied {
        breaker.record_success();
        observers.notify(Observer::ContradictionResolved {
            edge_id: contradiction.edge_id.clone(),
            strategy: strategy.name().to_string(),
        });
        Ok(strategy)
    } else {
        breaker.record_failure(now_ms, config);
        Err(ContradictionError::NotFound {
            edge_id: contradiction.edge_id.as_str().to_string(),
        })
    }
}

/// Variant of [`resolve`] that threads a source-reliability table through —
/// kept as a distinct name for callers that track `sourceReliability` state
/// (spec §5), though it now just forwards into `resolve`'s own priority-order
/// loop rather than special-casing `source-reliability` ahead of
/// `dominant_evidence`/`specialize`.
pub fn resolve_with_reliability(
    store: &mut HypergraphStore,
    contradiction: &Contradiction,
    breaker: &mut CircuitBreaker,
    config: &Config,
    observers: &ObserverSet,
    now_ms: u64,
    source_reliability: &HashMap<String, f64>,
) -> Result<Strategy, ContradictionError> {
    resolve(store, contradiction, breaker, config, observers, now_ms, source_reliability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::truth::{Budget, TruthValue};

    fn belief(f: f64, c: f64, ts: u64) -> Belief {
        Belief::new(TruthValue::new(f, c, 0.8), Budget::full(), ts)
    }

    #[test]
    fn detects_contradiction_above_threshold() {
        let config = Config::default();
        let a = belief(0.95, 0.9, 0);
        let b = belief(0.1, 0.9, 1);
        assert!(detect(&a, &b, &config).is_some());
    }

    #[test]
    fn does_not_detect_below_threshold() {
        let config = Config::default();
        let a = belief(0.9, 0.9, 0);
        let b = belief(0.85, 0.9, 1);
        assert!(detect(&a, &b, &config).is_none());
    }

    #[test]
    fn low_confidence_beliefs_never_contradict() {
        let config = Config::default();
        let a = belief(0.95, 0.1, 0);
        let b = belief(0.05, 0.1, 1);
        assert!(detect(&a, &b, &config).is_none());
    }

    #[test]
    fn dominant_evidence_picks_higher_confidence_when_gap_is_large() {
        let c = Contradiction {
            edge_id: EdgeId::new("e"),
            belief_a: belief(0.95, 0.95, 0),
            belief_b: belief(0.05, 0.4, 1),
            severity: 0.5,
            evidence: Vec::new(),
        };
        let resolved = apply_strategy(Strategy::DominantEvidence, &c, &HashMap::new()).unwrap();
        assert_eq!(resolved.len(), 1);
        assert!((resolved[0].truth.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn merge_always_produces_a_single_revised_belief() {
        let c = Contradiction {
            edge_id: EdgeId::new("e"),
            belief_a: belief(0.9, 0.5, 0),
            belief_b: belief(0.1, 0.5, 1),
            severity: 0.5,
            evidence: Vec::new(),
        };
        let resolved = apply_strategy(Strategy::Merge, &c, &HashMap::new()).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn circuit_breaker_trips_after_threshold_failures_in_window() {
        let config = Config::default();
        let mut breaker = CircuitBreaker::default();
        for i in 0..config.circuit_breaker_threshold {
            breaker.record_failure(i as u64 * 100, &config);
        }
        assert!(breaker.is_open(config.circuit_breaker_threshold as u64 * 100));
    }

    #[test]
    fn circuit_breaker_resets_on_success() {
        let config = Config::default();
        let mut breaker = CircuitBreaker::default();
        breaker.record_failure(0, &config);
        breaker.record_failure(100, &config);
        breaker.record_success();
        assert!(breaker.failures.is_empty());
    }

    #[test]
    fn specialize_splits_weaker_belief_into_a_new_context_edge() {
        let mut store = HypergraphStore::new(8, 64);
        let term = crate::term::Term::compound(
            crate::term::TermType::Inheritance,
            vec![crate::term::Term::atom("tweety"), crate::term::Term::atom("flyer")],
        );
        let (id, _) = store.add_full(
            term,
            TruthValue::new(0.9, 0.9, 0.9),
            Budget::full(),
            0,
            Some("summer".into()),
            vec![EdgeId::new("seed-a")],
            None,
        );
        store.add_full(
            store.get(&id).unwrap().term.clone(),
            TruthValue::new(0.1, 0.9, 0.9),
            Budget::full(),
            1,
            Some("winter".into()),
            vec![EdgeId::new("seed-b")],
            None,
        );
        let edge = store.get(&id).unwrap();
        let c = Contradiction {
            edge_id: id.clone(),
            belief_a: edge.beliefs[0].clone(),
            belief_b: edge.beliefs[1].clone(),
            severity: 0.5,
            evidence: edge.evidence.clone(),
        };
        let specialized = specialize(&mut store, &c, 0).expect("should specialize");
        assert_eq!(specialized.as_str(), format!("{}|context:winter", id.as_str()));
        assert_eq!(store.get(&id).unwrap().beliefs.len(), 1);
        assert!(store.has(&specialized));
        let similarity_id = EdgeId::new(format!("Similarity({},{})", specialized.as_str(), id.as_str()));
        assert!(store.has(&similarity_id));
    }

    #[test]
    fn resolve_returns_resolver_unavailable_when_breaker_open() {
        let mut store = HypergraphStore::new(8, 64);
        let config = Config::default();
        let observers = ObserverSet::new();
        let mut breaker = CircuitBreaker::default();
        breaker.tripped_until = Some(5000);
        let c = Contradiction {
            edge_id: EdgeId::new("e"),
            belief_a: belief(0.9, 0.9, 0),
            belief_b: belief(0.1, 0.9, 1),
            severity: 0.5,
            evidence: Vec::new(),
        };
        let err = resolve(&mut store, &c, &mut breaker, &config, &observers, 10, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ContradictionError::ResolverUnavailable { .. }));
    }

    #[test]
    fn detects_moderate_frequency_gap_with_large_confidence_gap() {
        let config = Config::default();
        let a = belief(0.9, 0.9, 0);
        let b = belief(0.5, 0.3, 1);
        assert!(detect(&a, &b, &config).is_some());
    }

    #[test]
    fn source_reliability_requires_a_large_enough_reliability_gap() {
        let c = Contradiction {
            edge_id: EdgeId::new("e"),
            belief_a: belief(0.9, 0.8, 0).with_source("alice"),
            belief_b: belief(0.1, 0.8, 1).with_source("bob"),
            severity: 0.5,
            evidence: Vec::new(),
        };
        let mut reliability = HashMap::new();
        reliability.insert("alice".to_string(), 0.6);
        reliability.insert("bob".to_string(), 0.5);
        assert!(apply_strategy(Strategy::SourceReliability, &c, &reliability).is_none());

        reliability.insert("alice".to_string(), 0.9);
        let resolved = apply_strategy(Strategy::SourceReliability, &c, &reliability).unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].truth.frequency > 0.5);
    }

    #[test]
    fn evidence_weighted_requires_at_least_three_evidence_items() {
        let c = Contradiction {
            edge_id: EdgeId::new("e"),
            belief_a: belief(0.9, 0.5, 0),
            belief_b: belief(0.1, 0.5, 1),
            severity: 0.5,
            evidence: vec![
                Evidence { source: None, strength: 0.5, context: None },
                Evidence { source: None, strength: 0.5, context: None },
            ],
        };
        assert!(apply_strategy(Strategy::EvidenceWeighted, &c, &HashMap::new()).is_none());

        let c_enough = Contradiction {
            evidence: vec![
                Evidence { source: None, strength: 0.5, context: None },
                Evidence { source: None, strength: 0.5, context: None },
                Evidence { source: None, strength: 0.5, context: None },
            ],
            ..c
        };
        let resolved = apply_strategy(Strategy::EvidenceWeighted, &c_enough, &HashMap::new()).unwrap();
        assert_eq!(resolved.len(), 1);
    }
}
