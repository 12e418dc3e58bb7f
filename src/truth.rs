//! Truth values and resource budgets (spec §3, §4).
//!
//! `TruthValue` carries the non-axiomatic frequency/confidence pair plus the
//! priority it was asserted with; `Budget` carries the three independent
//! resource dimensions that drive scheduling and forgetting. Both are pure
//! value types — all arithmetic here is referentially transparent so the
//! propagation and inference engines can reason about it without side
//! effects.

use serde::{Deserialize, Serialize};

/// Clamp a value into `[0, 1]`.
fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// A non-axiomatic truth value: how often a statement has held (`frequency`)
/// and how much evidence backs that estimate (`confidence`), plus the
/// `priority` it was asserted or derived with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthValue {
    pub frequency: f64,
    pub confidence: f64,
    pub priority: f64,
}

impl TruthValue {
    pub fn new(frequency: f64, confidence: f64, priority: f64) -> Self {
        Self {
            frequency: clamp01(frequency),
            confidence: clamp01(confidence),
            priority: clamp01(priority),
        }
    }

    /// Default truth value for a freshly asserted belief with no explicit
    /// annotation: full frequency, moderate confidence, high priority.
    pub fn default_assertion() -> Self {
        Self::new(1.0, 0.9, 0.8)
    }

    /// Expectation `e = c*(f - 0.5) + 0.5`: the single scalar used to rank
    /// and compare beliefs (spec §3). `e` sits in `[0,1]` and collapses to
    /// `0.5` as confidence approaches zero, regardless of frequency —
    /// unconfirmed evidence can't pull expectation far from neutral.
    pub fn expectation(&self) -> f64 {
        self.confidence * (self.frequency - 0.5) + 0.5
    }

    /// Revise two truth values for the *same* statement from independent
    /// evidence: `c' = 1 - (1-c1)(1-c2)`, `f'` is the confidence-weighted
    /// mean of the two frequencies. Confidence only grows from revision
    /// (more evidence), never shrinks.
    pub fn revise(&self, other: &TruthValue) -> TruthValue {
        let c1 = self.confidence;
        let c2 = other.confidence;
        let new_confidence = 1.0 - (1.0 - c1) * (1.0 - c2);
        let new_frequency = if new_confidence > 0.0 {
            (self.frequency * c1 + other.frequency * c2) / (c1 + c2).max(f64::EPSILON)
        } else {
            0.5
        };
        TruthValue::new(new_frequency, new_confidence, self.priority.max(other.priority))
    }

    /// Transitive inference (deduction): `<a-->b>, <b-->c> |- <a-->c>`.
    /// `f' = f1*f2`, `c' = c1*c2*f1*f2`.
    pub fn transitive(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * other.frequency;
        let c = self.confidence * other.confidence * f;
        TruthValue::new(f, c, self.priority.min(other.priority) * 0.9)
    }

    /// Induction: generalize from `<a-->b>, <a-->c>` to `<b-->c>`.
    /// `f' = f1`, `c' = c1*c2*f2 / (c1*c2*f2 + k)` with evidential horizon
    /// `k = 1`, simplified to the NAL-1 form `c' = (f2*c1*c2) / (f2*c1*c2 + 1)`.
    pub fn induction(&self, other: &TruthValue) -> TruthValue {
        let w = self.confidence * other.confidence * other.frequency;
        let c = w / (w + 1.0);
        TruthValue::new(self.frequency, c, self.priority.min(other.priority) * 0.85)
    }

    /// Analogy: `<a-->b>, <b<->c> |- <a-->c>`. `f' = f1*f2`, `c' = c1*c2*f2`.
    pub fn analogy(&self, other: &TruthValue) -> TruthValue {
        let f = self.frequency * other.frequency;
        let c = self.confidence * other.confidence * other.frequency;
        TruthValue::new(f, c, self.priority.min(other.priority) * 0.8)
    }

    /// Abduction: `<a-->b>, <c-->b> |- <a-->c>`. `f' = f2`, same evidential
    /// weight form as induction but driven by the second premise's frequency.
    pub fn abduction(&self, other: &TruthValue) -> TruthValue {
        let w = self.confidence * other.confidence * self.frequency;
        let c = w / (w + 1.0);
        TruthValue::new(other.frequency, c, self.priority.min(other.priority) * 0.8)
    }
}

/// Resource budget governing how much attention a task or belief deserves.
///
/// `priority` drives scheduling order, `durability` how slowly priority
/// decays, `quality` a long-run estimate of usefulness that resists rapid
/// change. All three independently clamp to `[0,1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub priority: f64,
    pub durability: f64,
    pub quality: f64,
}

impl Budget {
    pub fn new(priority: f64, durability: f64, quality: f64) -> Self {
        Self {
            priority: clamp01(priority),
            durability: clamp01(durability),
            quality: clamp01(quality),
        }
    }

    pub fn full() -> Self {
        Self::new(1.0, 0.9, 0.9)
    }

    /// Scale priority and quality by `k`, leaving durability — the decay
    /// rate itself — untouched.
    pub fn scale(&self, k: f64) -> Budget {
        Budget::new(self.priority * k, self.durability, self.quality * k)
    }

    /// Merge two budgets for the same task: priority and quality take the
    /// max (the task is at least as urgent/useful as its most urgent/useful
    /// source), durability blends.
    pub fn merge(&self, other: &Budget) -> Budget {
        Budget::new(
            self.priority.max(other.priority),
            (self.durability + other.durability) / 2.0,
            self.quality.max(other.quality),
        )
    }

    /// Aggregate scalar used to rank tasks and drive the forgetting
    /// threshold: priority weighted by durability and quality.
    pub fn total(&self) -> f64 {
        self.priority * (0.5 + 0.25 * self.durability + 0.25 * self.quality)
    }

    /// Decay priority and quality toward zero by `rate` (spec §4.7 memory
    /// maintenance), durability governing how much survives.
    pub fn decay(&self, rate: f64) -> Budget {
        let retain = 1.0 - rate * (1.0 - self.durability);
        Budget::new(self.priority * retain, self.durability, self.quality * retain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expectation_of_neutral_confidence_is_half() {
        let tv = TruthValue::new(1.0, 0.0, 0.5);
        assert!((tv.expectation() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn expectation_of_full_confidence_full_frequency_is_one() {
        let tv = TruthValue::new(1.0, 1.0, 0.5);
        assert!((tv.expectation() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn revision_increases_confidence_from_independent_evidence() {
        let a = TruthValue::new(0.9, 0.6, 0.8);
        let b = TruthValue::new(0.9, 0.6, 0.8);
        let r = a.revise(&b);
        assert!(r.confidence > a.confidence);
        assert!(r.confidence > b.confidence);
    }

    #[test]
    fn revision_toward_conflicting_evidence_lowers_expectation() {
        let a = TruthValue::new(0.95, 0.9, 0.8);
        let b = TruthValue::new(0.1, 0.9, 0.8);
        let r = a.revise(&b);
        assert!(r.expectation() < a.expectation());
    }

    #[test]
    fn transitive_confidence_never_exceeds_premises() {
        let a = TruthValue::new(0.9, 0.9, 0.8);
        let b = TruthValue::new(0.9, 0.9, 0.8);
        let r = a.transitive(&b);
        assert!(r.confidence <= a.confidence);
        assert!(r.confidence <= b.confidence);
    }

    #[test]
    fn budget_scale_leaves_durability_untouched() {
        let b = Budget::new(0.8, 0.5, 0.6);
        let scaled = b.scale(0.5);
        assert!((scaled.priority - 0.4).abs() < 1e-9);
        assert_eq!(scaled.durability, b.durability);
        assert!((scaled.quality - 0.3).abs() < 1e-9);
    }

    #[test]
    fn budget_merge_takes_max_priority() {
        let a = Budget::new(0.3, 0.5, 0.5);
        let b = Budget::new(0.9, 0.5, 0.5);
        let m = a.merge(&b);
        assert_eq!(m.priority, 0.9);
    }

    #[test]
    fn budget_decay_reduces_low_durability_faster() {
        let sturdy = Budget::new(0.8, 0.95, 0.5);
        let fragile = Budget::new(0.8, 0.1, 0.5);
        let sturdy_decayed = sturdy.decay(0.5);
        let fragile_decayed = fragile.decay(0.5);
        assert!(fragile_decayed.priority < sturdy_decayed.priority);
    }

    #[test]
    fn values_clamp_into_unit_range() {
        let tv = TruthValue::new(1.5, -0.2, 2.0);
        assert_eq!(tv.frequency, 1.0);
        assert_eq!(tv.confidence, 0.0);
        assert_eq!(tv.priority, 1.0);
    }
}
