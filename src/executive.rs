//! Cognitive executive (spec §4.8, part two): the meta-reasoning layer that
//! scales rule selection weights, tracks which subsystem currently has
//! focus, and nudges adaptive thresholds in response to aggregate
//! performance signals.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rate at which adaptive thresholds move toward their target each cycle.
pub const ADAPTATION_RATE: f64 = 0.1;

/// What the engine is currently prioritizing attention toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Focus {
    Derivation,
    ContradictionResolution,
    QuestionAnswering,
    MemoryMaintenance,
}

impl Focus {
    pub fn name(self) -> &'static str {
        match self {
            Focus::Derivation => "derivation",
            Focus::ContradictionResolution => "contradiction_resolution",
            Focus::QuestionAnswering => "question_answering",
            Focus::MemoryMaintenance => "memory_maintenance",
        }
    }
}

/// Aggregate signals sampled once per adaptation cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptationSignal {
    pub inference_rate: f64,
    pub contradiction_rate: f64,
    pub resource_utilization: f64,
}

/// An issue the adaptation signal surfaced, and which direction to nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issue {
    DerivationStalling,
    ContradictionsSpiking,
    ResourcesSaturated,
    Healthy,
}

/// Diagnose the dominant issue from a signal sample (spec §4.8's
/// issue -> adjustment table): resource saturation takes priority since an
/// overloaded engine can't reliably diagnose anything else, contradiction
/// spikes come next since unresolved conflicts poison downstream
/// derivation, and a low inference rate is the remaining, least urgent
/// case.
pub fn diagnose(signal: AdaptationSignal) -> Issue {
    if signal.resource_utilization > 0.9 {
        Issue::ResourcesSaturated
    } else if signal.contradiction_rate > 0.3 {
        Issue::ContradictionsSpiking
    } else if signal.inference_rate < 0.1 {
        Issue::DerivationStalling
    } else {
        Issue::Healthy
    }
}

/// The cognitive executive: per-rule scaling, current focus, and the
/// adaptive thresholds it nudges in response to diagnosed issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveExecutive {
    rule_scales: HashMap<String, f64>,
    #[serde(skip, default = "default_focus")]
    focus: Focus,
    pub inference_threshold: f64,
    pub contradiction_threshold: f64,
    pub budget_threshold: f64,
}

fn default_focus() -> Focus {
    Focus::Derivation
}

impl CognitiveExecutive {
    pub fn new(inference_threshold: f64, contradiction_threshold: f64, budget_threshold: f64) -> Self {
        Self {
            rule_scales: HashMap::new(),
            focus: Focus::Derivation,
            inference_threshold,
            contradiction_threshold,
            budget_threshold,
        }
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Scale factor applied to a rule's priority during weighted selection;
    /// defaults to 1.0 for a rule the executive hasn't adjusted yet.
    pub fn rule_scale(&self, rule_name: &str) -> f64 {
        self.rule_scales.get(rule_name).copied().unwrap_or(1.0)
    }

    pub fn set_rule_scale(&mut self, rule_name: impl Into<String>, scale: f64) {
        self.rule_scales.insert(rule_name.into(), scale.clamp(0.0, 2.0));
    }

    /// Switch focus if `candidate` differs from the current one, returning
    /// whether a switch happened (callers notify observers on `true`).
    pub fn switch_focus(&mut self, candidate: Focus) -> bool {
        if self.focus == candidate {
            return false;
        }
        self.focus = candidate;
        true
    }

    /// Apply one adaptation cycle: diagnose the dominant issue from
    /// `signal` and nudge the relevant threshold toward a healthier value
    /// by `ADAPTATION_RATE`, also switching focus to the subsystem that
    /// needs attention.
    pub fn adapt(&mut self, signal: AdaptationSignal) -> Issue {
        let issue = diagnose(signal);
        match issue {
            Issue::ResourcesSaturated => {
                self.budget_threshold += ADAPTATION_RATE * (0.5 - self.budget_threshold);
                self.switch_focus(Focus::MemoryMaintenance);
            }
            Issue::ContradictionsSpiking => {
                self.contradiction_threshold += ADAPTATION_RATE * (0.9 - self.contradiction_threshold);
                self.switch_focus(Focus::ContradictionResolution);
            }
            Issue::DerivationStalling => {
                self.inference_threshold += ADAPTATION_RATE * (0.1 - self.inference_threshold);
                self.switch_focus(Focus::Derivation);
            }
            Issue::Healthy => {
                self.switch_focus(Focus::QuestionAnswering);
            }
        }
        issue
    }
}
