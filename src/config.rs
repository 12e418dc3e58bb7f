//! Configuration options recognized by the core (spec §6).
//!
//! Mirrors the teacher's `EngineConfig` pattern: a single struct, a
//! `Default` impl carrying the documented defaults, closed over the exact
//! option set — there is no escape hatch for unknown keys.

use serde::{Deserialize, Serialize};

/// Tunable parameters governing scheduling, forgetting, and derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Activation decay per maintenance cycle.
    pub decay: f64,
    /// Belief-budget decay per maintenance cycle.
    pub budget_decay: f64,
    /// Minimum activation for a rule to fire.
    pub inference_threshold: f64,
    /// Hard cap on propagation path length.
    pub max_path_length: u32,
    /// Max beliefs retained per edge.
    pub belief_capacity: usize,
    /// Depth limit for temporal composition.
    pub temporal_horizon: u32,
    /// Event enqueue cutoff.
    pub budget_threshold: f64,
    /// Pathlength cap for rule application.
    pub max_derivation_depth: u32,
    /// LRU cap for derivation memo.
    pub derivation_cache_size: usize,
    /// Default ask deadline, in milliseconds.
    pub question_timeout_ms: u64,
    /// Steps between maintenance sweeps.
    pub memory_maintenance_interval: u32,
    /// Steps between pending-question resolution sweeps.
    pub question_resolution_interval: u32,
    /// Frequency gap for a strong contradiction.
    pub contradiction_threshold: f64,
    /// Which default rule set the derivation engine registers.
    pub derivation_mode: DerivationMode,
    /// Circuit-breaker trip threshold: failed resolutions within `circuit_breaker_window_ms`.
    pub circuit_breaker_threshold: u32,
    /// Circuit-breaker cooldown window, in milliseconds.
    pub circuit_breaker_window_ms: u64,
    /// Circuit-breaker suspension duration once tripped, in milliseconds.
    pub circuit_breaker_duration_ms: u64,
    /// Target size for the question-answer cache, truncated on maintenance.
    pub question_cache_size: usize,
    /// Target size for the propagation path cache, truncated on maintenance.
    pub path_cache_size: usize,
}

/// Which default rules the derivation engine registers (Open Question §9).
///
/// `Simple` and `Advanced` are not separate engine classes — both use the
/// same `Rule` representation; the mode only selects which rules
/// `DerivationEngine::with_mode` installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivationMode {
    /// Only structural closure: `Inheritance` and `Similarity`.
    Simple,
    /// Full rule table from spec §4.4.
    Advanced,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decay: 0.1,
            budget_decay: 0.8,
            inference_threshold: 0.3,
            max_path_length: 15,
            belief_capacity: 8,
            temporal_horizon: 3,
            budget_threshold: 0.05,
            max_derivation_depth: 5,
            derivation_cache_size: 1000,
            question_timeout_ms: 3000,
            memory_maintenance_interval: 100,
            question_resolution_interval: 10,
            contradiction_threshold: 0.7,
            derivation_mode: DerivationMode::Advanced,
            circuit_breaker_threshold: 5,
            circuit_breaker_window_ms: 30_000,
            circuit_breaker_duration_ms: 30_000,
            question_cache_size: 256,
            path_cache_size: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.decay, 0.1);
        assert_eq!(cfg.budget_decay, 0.8);
        assert_eq!(cfg.inference_threshold, 0.3);
        assert_eq!(cfg.max_path_length, 15);
        assert_eq!(cfg.belief_capacity, 8);
        assert_eq!(cfg.temporal_horizon, 3);
        assert_eq!(cfg.budget_threshold, 0.05);
        assert_eq!(cfg.max_derivation_depth, 5);
        assert_eq!(cfg.derivation_cache_size, 1000);
        assert_eq!(cfg.question_timeout_ms, 3000);
        assert_eq!(cfg.memory_maintenance_interval, 100);
        assert_eq!(cfg.question_resolution_interval, 10);
        assert_eq!(cfg.contradiction_threshold, 0.7);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
