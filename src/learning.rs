//! Learning engine (spec §4.8, part one): reinforces rules that keep
//! producing accepted conclusions and, once a specific premise/conclusion
//! shape has succeeded often enough, synthesizes a shortcut rule so future
//! derivations along that shape skip the intermediate step.

use crate::contradiction::Strategy;
use crate::infer::RuleRegistry;
use crate::term::TermType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum successful experiences along one `(premise, conclusion)` shape
/// before a shortcut is synthesized (spec §4.8).
pub const SHORTCUT_SYNTHESIS_THRESHOLD: u32 = 50;

/// One recorded outcome of applying a rule.
#[derive(Debug, Clone, Copy)]
pub struct Experience {
    pub premise_type: TermType,
    pub conclusion_type: TermType,
    pub success: bool,
}

/// A synthesized two-hop shortcut: `premise_type -> conclusion_type`
/// skips whatever intermediate rule used to mediate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutRule {
    pub premise_type: TermType,
    pub conclusion_type: TermType,
    pub experience_count: u32,
}

/// Tracks experience counts per `(premise_type, conclusion_type)` shape and
/// reinforces the rule registry's priorities from outcomes.
/// Attempt/success counters for one contradiction resolution strategy,
/// kept so a caller can inspect which strategies are actually paying off
/// (spec §4.5: "every resolution outcome is reported to the Learning
/// Engine as (operation='contradiction_resolution', strategy, edgeId,
/// success)"). The edge id itself isn't retained — only the aggregate
/// per-strategy tally — since nothing downstream keys off individual
/// edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyStats {
    pub attempts: u32,
    pub successes: u32,
}

#[derive(Debug, Default)]
pub struct LearningEngine {
    successes: HashMap<(TermType, TermType), u32>,
    synthesized: Vec<ShortcutRule>,
    contradiction_stats: HashMap<Strategy, StrategyStats>,
}

impl LearningEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shortcuts(&self) -> &[ShortcutRule] {
        &self.synthesized
    }

    /// Record the outcome of one contradiction resolution attempt.
    pub fn record_contradiction_resolution(&mut self, strategy: Strategy, success: bool) {
        let stats = self.contradiction_stats.entry(strategy).or_default();
        stats.attempts += 1;
        if success {
            stats.successes += 1;
        }
    }

    pub fn contradiction_stats(&self, strategy: Strategy) -> StrategyStats {
        self.contradiction_stats.get(&strategy).copied().unwrap_or_default()
    }

    /// Record an experience, reinforcing the acting rule's priority on
    /// success (premise confidence reinforcement) and checking whether
    /// this premise/conclusion shape has crossed the synthesis threshold.
    pub fn record(&mut self, rule_name: &str, registry: &mut RuleRegistry, experience: Experience) {
        if let Some(rule) = registry.rule_mut(rule_name) {
            if experience.success {
                rule.priority = (rule.priority + 0.01).min(1.0);
            } else {
                rule.priority = (rule.priority - 0.005).max(0.05);
            }
        }

        if !experience.success {
            return;
        }

        let key = (experience.premise_type, experience.conclusion_type);
        let count = self.successes.entry(key).or_insert(0);
        *count += 1;

        if *count >= SHORTCUT_SYNTHESIS_THRESHOLD
            && !self.synthesized.iter().any(|s| s.premise_type == key.0 && s.conclusion_type == key.1)
        {
            self.synthesized.push(ShortcutRule {
                premise_type: key.0,
                conclusion_type: key.1,
                experience_count: *count,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DerivationMode;

    #[test]
    fn successful_experience_raises_rule_priority() {
        let mut registry = RuleRegistry::with_mode(DerivationMode::Simple);
        let before = registry.rules()[0].priority;
        let mut engine = LearningEngine::new();
        let name = registry.rules()[0].name().to_string();
        engine.record(
            &name,
            &mut registry,
            Experience { premise_type: TermType::Inheritance, conclusion_type: TermType::Inheritance, success: true },
        );
        let after = registry.rule_mut(&name).unwrap().priority;
        assert!(after > before);
    }

    #[test]
    fn failed_experience_lowers_rule_priority() {
        let mut registry = RuleRegistry::with_mode(DerivationMode::Simple);
        let before = registry.rules()[0].priority;
        let mut engine = LearningEngine::new();
        let name = registry.rules()[0].name().to_string();
        engine.record(
            &name,
            &mut registry,
            Experience { premise_type: TermType::Inheritance, conclusion_type: TermType::Inheritance, success: false },
        );
        let after = registry.rule_mut(&name).unwrap().priority;
        assert!(after < before);
    }

    #[test]
    fn synthesizes_shortcut_after_threshold_successes() {
        let mut registry = RuleRegistry::with_mode(DerivationMode::Simple);
        let mut engine = LearningEngine::new();
        let name = registry.rules()[0].name().to_string();
        for _ in 0..SHORTCUT_SYNTHESIS_THRESHOLD {
            engine.record(
                &name,
                &mut registry,
                Experience { premise_type: TermType::Inheritance, conclusion_type: TermType::Similarity, success: true },
            );
        }
        assert_eq!(engine.shortcuts().len(), 1);
        assert_eq!(engine.shortcuts()[0].premise_type, TermType::Inheritance);
    }

    #[test]
    fn contradiction_resolution_outcomes_accumulate_per_strategy() {
        let mut engine = LearningEngine::new();
        engine.record_contradiction_resolution(Strategy::Merge, true);
        engine.record_contradiction_resolution(Strategy::Merge, true);
        engine.record_contradiction_resolution(Strategy::Merge, false);
        let stats = engine.contradiction_stats(Strategy::Merge);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.successes, 2);
        assert_eq!(engine.contradiction_stats(Strategy::DominantEvidence).attempts, 0);
    }

    #[test]
    fn does_not_synthesize_duplicate_shortcuts() {
        let mut registry = RuleRegistry::with_mode(DerivationMode::Simple);
        let mut engine = LearningEngine::new();
        let name = registry.rules()[0].name().to_string();
        for _ in 0..(SHORTCUT_SYNTHESIS_THRESHOLD * 2) {
            engine.record(
                &name,
                &mut registry,
                Experience { premise_type: TermType::Inheritance, conclusion_type: TermType::Similarity, success: true },
            );
        }
        assert_eq!(engine.shortcuts().len(), 1);
    }
}
