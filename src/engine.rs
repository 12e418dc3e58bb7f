//! Engine facade: top-level API for the non-axiomatic reasoning core.
//!
//! `State` owns every subsystem — the hypergraph, scheduler, derivation
//! registry, contradiction breaker, question registry, cognitive executive,
//! and learning engine — and drives the step loop (spec §5) that ties them
//! together. Everything external code does (assert a statement, ask a
//! question, inspect a contradiction, persist and restore) goes through
//! this facade rather than reaching into a subsystem directly.

use std::collections::HashMap;

use rand::rngs::ThreadRng;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::contradiction::{self, CircuitBreaker, Contradiction, Strategy};
use crate::error::{ContradictionError, InvalidArgument, NarError, NarResult, QuestionError, StateError};
use crate::hypergraph::{Belief, HypergraphStore};
use crate::infer::{self, RuleRegistry};
use crate::learning::{Experience, LearningEngine};
use crate::memory;
use crate::observer::{Observer, ObserverSet};
use crate::parser;
use crate::propagation::{self, Event};
use crate::queue::PriorityQueue;
use crate::question::{AskOptions, QuestionAnswer, QuestionRegistry};
use crate::term::{EdgeId, Term};
use crate::truth::{Budget, TruthValue};
use crate::executive::{AdaptationSignal, CognitiveExecutive};

/// Options accepted by [`State::nal`] beyond the statement text itself.
#[derive(Debug, Clone, Default)]
pub struct NalOptions {
    pub source: Option<String>,
}

/// Format `explain()` renders its output in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainFormat {
    Detailed,
    Concise,
    Technical,
    Json,
    Story,
    Justification,
}

impl ExplainFormat {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "detailed" => ExplainFormat::Detailed,
            "concise" => ExplainFormat::Concise,
            "technical" => ExplainFormat::Technical,
            "json" => ExplainFormat::Json,
            "story" => ExplainFormat::Story,
            "justification" => ExplainFormat::Justification,
            _ => return None,
        })
    }
}

/// Perspective `explain()` narrates its derivation tree from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainPerspective {
    Evidential,
    Causal,
    Counterfactual,
}

impl ExplainPerspective {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "evidential" => ExplainPerspective::Evidential,
            "causal" => ExplainPerspective::Causal,
            "counterfactual" => ExplainPerspective::Counterfactual,
            _ => return None,
        })
    }
}

/// Options controlling [`State::explain`].
#[derive(Debug, Clone)]
pub struct ExplainOptions {
    pub format: ExplainFormat,
    pub perspective: ExplainPerspective,
    pub depth: usize,
}

impl Default for ExplainOptions {
    fn default() -> Self {
        Self {
            format: ExplainFormat::Detailed,
            perspective: ExplainPerspective::Evidential,
            depth: 5,
        }
    }
}

/// Options controlling [`State::query`].
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub limit: usize,
    pub min_expectation: f64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: 20,
            min_expectation: 0.0,
        }
    }
}

/// One binding match returned by [`State::query`].
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub bindings: HashMap<String, Term>,
    pub expectation: f64,
}

/// Outcome of a contradiction resolution (spec §6).
#[derive(Debug, Clone)]
pub struct Resolution {
    pub edge_id: EdgeId,
    pub strategy: Strategy,
}

/// Extra detail surfaced about a contradiction beyond the raw record.
#[derive(Debug, Clone)]
pub struct ContradictionAnalysis {
    pub edge_id: EdgeId,
    pub severity: f64,
    pub belief_a: Belief,
    pub belief_b: Belief,
    pub candidate_strategies: Vec<Strategy>,
}

/// Persisted-state JSON shape (spec §6).
#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    version: String,
    timestamp: u64,
    config: Config,
    current_step: u64,
    hypergraph: Vec<PersistedEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEdge {
    id: String,
    #[serde(rename = "type")]
    ty: Option<String>,
    args: Vec<String>,
    beliefs: Vec<PersistedBelief>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedBelief {
    truth: TruthValue,
    budget: Budget,
    premises: Vec<EdgeId>,
    derived_by: Option<String>,
    timestamp: u64,
}

const PERSISTED_VERSION: &str = "1.0";

/// The reasoning core: hypergraph, scheduler, derivation and contradiction
/// machinery, question registry, and the meta-reasoning layers that tune
/// them, all wired together behind one API (spec §3, §6).
pub struct State {
    config: Config,
    clock: Box<dyn Clock>,
    hypergraph: HypergraphStore,
    queue: PriorityQueue,
    memoization: HashMap<(EdgeId, u64), u32>,
    rules: RuleRegistry,
    rng: ThreadRng,
    questions: QuestionRegistry,
    breaker: CircuitBreaker,
    executive: CognitiveExecutive,
    learning: LearningEngine,
    observers: ObserverSet,
    source_reliability: HashMap<String, f64>,
    current_step: u64,
    steps_since_maintenance: u32,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("current_step", &self.current_step)
            .field("hypergraph_len", &self.hypergraph.len())
            .field("queue_len", &self.queue.len())
            .finish()
    }
}

impl State {
    /// Build a fresh engine from `config`, using the real system clock.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    /// Build a fresh engine with an injected clock (tests use [`crate::clock::FrozenClock`]).
    pub fn with_clock(config: Config, clock: Box<dyn Clock>) -> Self {
        tracing::info!(
            mode = ?config.derivation_mode,
            belief_capacity = config.belief_capacity,
            "initializing nar-core engine"
        );
        let rules = RuleRegistry::with_mode(config.derivation_mode);
        let executive = CognitiveExecutive::new(
            config.inference_threshold,
            config.contradiction_threshold,
            config.budget_threshold,
        );
        Self {
            hypergraph: HypergraphStore::new(config.belief_capacity, config.derivation_cache_size),
            queue: PriorityQueue::new(),
            memoization: HashMap::new(),
            rules,
            rng: rand::thread_rng(),
            questions: QuestionRegistry::new(),
            breaker: CircuitBreaker::default(),
            executive,
            learning: LearningEngine::new(),
            observers: ObserverSet::new(),
            source_reliability: HashMap::new(),
            current_step: 0,
            steps_since_maintenance: 0,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn observers_mut(&mut self) -> &mut ObserverSet {
        &mut self.observers
    }

    pub fn set_source_reliability(&mut self, source: impl Into<String>, reliability: f64) {
        self.source_reliability.insert(source.into(), reliability.clamp(0.0, 1.0));
    }

    // -----------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------

    /// Parse and assert one NAL statement, enqueueing it for propagation.
    /// Returns the edge id it was stored under.
    pub fn nal(&mut self, text: &str, opts: Option<NalOptions>) -> NarResult<EdgeId> {
        let parsed = parser::parse_statement(text)?;
        if parsed.is_question {
            return Err(NarError::Argument(InvalidArgument::new(
                "nal() received a question statement",
                "use ask() or query() for statements ending in '?'",
            )));
        }
        let opts = opts.unwrap_or_default();
        let truth = parsed.truth.unwrap_or_else(TruthValue::default_assertion);
        let priority = parsed.priority.unwrap_or(0.8);
        let budget = Budget::new(priority, 0.9, 0.9);

        let now = self.clock.now_ms();
        let (edge_id, belief) = self.hypergraph.add_full(
            parsed.term.clone(),
            truth,
            budget,
            now,
            opts.source,
            Vec::new(),
            None,
        );
        self.questions.check_answers(&parsed.term, &belief);
        let event = Event::new(parsed.term, truth, budget);
        if propagation::admit(&event, &self.config, &self.memoization) {
            self.queue.push(event);
        }
        Ok(edge_id)
    }

    // -----------------------------------------------------------------
    // Questions
    // -----------------------------------------------------------------

    /// Ask a question: check immediately against current beliefs, then pump
    /// the step loop forward (deriving new beliefs as it goes) until either
    /// a matching belief clears `minExpectation` or the deadline passes.
    /// There is no async runtime backing this crate, so this blocks the
    /// caller rather than returning a future — callers on a real clock
    /// should expect `ask` to take up to `timeout_ms` wall-clock time.
    pub fn ask(&mut self, text: &str, opts: Option<AskOptions>) -> NarResult<QuestionAnswer> {
        let parsed = parser::parse_statement(text)?;
        let opts = opts.unwrap_or_default();
        let timeout_ms = opts.timeout_ms;
        let now = self.clock.now_ms();
        let id = self.questions.ask(parsed.term, opts, now);

        const MAX_PUMP_STEPS: u32 = 10_000;
        for _ in 0..MAX_PUMP_STEPS {
            let now = self.clock.now_ms();
            match self.questions.resolve_against(id, &self.hypergraph, now) {
                Ok(Some(answer)) => return Ok(answer),
                Ok(None) => {
                    if !self.step() {
                        break;
                    }
                }
                Err(err) => return Err(NarError::Question(err)),
            }
        }

        let now = self.clock.now_ms();
        match self.questions.resolve_against(id, &self.hypergraph, now) {
            Ok(Some(answer)) => Ok(answer),
            Ok(None) => Err(NarError::Question(QuestionError::Timeout {
                text: text.to_string(),
                timeout_ms,
            })),
            Err(err) => Err(NarError::Question(err)),
        }
    }

    /// Query the hypergraph for every belief matching `pattern` (which may
    /// contain variables), ranked by expectation and capped at `opts.limit`.
    pub fn query(&self, pattern_text: &str, opts: Option<QueryOptions>) -> NarResult<Vec<QueryMatch>> {
        let parsed = parser::parse_statement(&ensure_terminator(pattern_text))?;
        let opts = opts.unwrap_or_default();

        let mut matches: Vec<QueryMatch> = Vec::new();
        for edge in self.hypergraph.iter() {
            let mut bindings = HashMap::new();
            if !parsed.term.match_pattern(&edge.term, &mut bindings) {
                continue;
            }
            let expectation = edge.best_belief().truth.expectation();
            if expectation < opts.min_expectation {
                continue;
            }
            matches.push(QueryMatch { bindings, expectation });
        }
        matches.sort_by(|a, b| b.expectation.partial_cmp(&a.expectation).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(opts.limit);
        Ok(matches)
    }

    // -----------------------------------------------------------------
    // Belief inspection
    // -----------------------------------------------------------------

    pub fn get_beliefs(&self, edge_id: &EdgeId) -> Vec<Belief> {
        self.hypergraph
            .get(edge_id)
            .map(|edge| edge.beliefs.clone())
            .unwrap_or_default()
    }

    /// Parse `pattern_text` as a statement and return the current best
    /// belief for its edge id, if the edge exists.
    pub fn query_belief(&self, pattern_text: &str) -> NarResult<Option<Belief>> {
        let parsed = parser::parse_statement(&ensure_terminator(pattern_text))?;
        Ok(self
            .hypergraph
            .get(&parsed.term.edge_id())
            .map(|edge| edge.best_belief().clone()))
    }

    // -----------------------------------------------------------------
    // Contradictions
    // -----------------------------------------------------------------

    /// Scan every edge with more than one belief for the worst pairwise
    /// contradiction, if any crosses the configured threshold.
    pub fn get_contradictions(&self) -> Vec<Contradiction> {
        self.hypergraph
            .iter()
            .filter(|edge| edge.beliefs.len() > 1)
            .filter_map(|edge| contradiction::check_edge(edge, &self.config))
            .collect()
    }

    pub fn analyze_contradiction(&self, edge_id: &EdgeId) -> NarResult<ContradictionAnalysis> {
        let edge = self
            .hypergraph
            .get(edge_id)
            .ok_or_else(|| NarError::Contradiction(ContradictionError::NotFound {
                edge_id: edge_id.as_str().to_string(),
            }))?;
        let found = contradiction::check_edge(edge, &self.config)
            .ok_or_else(|| NarError::Contradiction(ContradictionError::NotFound {
                edge_id: edge_id.as_str().to_string(),
            }))?;
        Ok(ContradictionAnalysis {
            edge_id: found.edge_id.clone(),
            severity: found.severity,
            belief_a: found.belief_a.clone(),
            belief_b: found.belief_b.clone(),
            candidate_strategies: Strategy::priority_order().to_vec(),
        })
    }

    /// Resolve a contradiction with an explicitly named strategy, or the
    /// fixed priority order when `strategy` is `None`.
    pub fn resolve_contradiction(
        &mut self,
        edge_id: &EdgeId,
        strategy: Option<&str>,
    ) -> NarResult<Resolution> {
        let edge = self
            .hypergraph
            .get(edge_id)
            .ok_or_else(|| NarError::Contradiction(ContradictionError::NotFound {
                edge_id: edge_id.as_str().to_string(),
            }))?;
        let found = contradiction::check_edge(edge, &self.config)
            .ok_or_else(|| NarError::Contradiction(ContradictionError::NotFound {
                edge_id: edge_id.as_str().to_string(),
            }))?;

        if let Some(name) = strategy {
            let requested = Strategy::parse(name).ok_or_else(|| {
                NarError::Contradiction(ContradictionError::UnknownStrategy {
                    strategy: name.to_string(),
                })
            })?;
            return self.resolve_with_named_strategy(requested, &found);
        }

        let now = self.clock.now_ms();
        let outcome = contradiction::resolve_with_reliability(
            &mut self.hypergraph,
            &found,
            &mut self.breaker,
            &self.config,
            &self.observers,
            now,
            &self.source_reliability,
        );
        self.report_resolution_outcome(&outcome);
        let resolved = outcome?;
        Ok(Resolution {
            edge_id: found.edge_id,
            strategy: resolved,
        })
    }

    fn resolve_with_named_strategy(&mut self, strategy: Strategy, found: &Contradiction) -> NarResult<Resolution> {
        let now = self.clock.now_ms();
        let outcome = contradiction::resolve_strategy(
            &mut self.hypergraph,
            found,
            strategy,
            &mut self.breaker,
            &self.config,
            &self.observers,
            now,
            &self.source_reliability,
        );
        self.learning.record_contradiction_resolution(strategy, outcome.is_ok());
        let resolved = outcome?;
        Ok(Resolution {
            edge_id: found.edge_id.clone(),
            strategy: resolved,
        })
    }

    /// Report a contradiction resolution attempt to the learning engine
    /// (spec §4.5: every outcome is reported as `(contradiction_resolution,
    /// strategy, edgeId, success)`). `ResolverUnavailable` (circuit breaker
    /// open) isn't tied to one strategy, so it isn't recorded.
    fn report_resolution_outcome(&mut self, outcome: &Result<Strategy, ContradictionError>) {
        // The heuristic cascade (no explicit strategy requested) doesn't
        // surface which strategy it landed on when it fails outright, so
        // only a successful pick is attributable to one strategy.
        if let Ok(strategy) = outcome {
            self.learning.record_contradiction_resolution(*strategy, true);
        }
    }

    // -----------------------------------------------------------------
    // Explanation
    // -----------------------------------------------------------------

    /// Render a human- or machine-readable account of how `edge_id`'s
    /// current belief came to be, walking its derivation `premises` up to
    /// `opts.depth` levels.
    pub fn explain(&self, edge_id: &EdgeId, opts: Option<ExplainOptions>) -> NarResult<String> {
        let opts = opts.unwrap_or_default();
        let edge = self
            .hypergraph
            .get(edge_id)
            .ok_or_else(|| NarError::Argument(InvalidArgument::new(
                format!("no such edge: {edge_id}"),
                "call getBeliefs() or query() to find a valid edge id first",
            )))?;
        let belief = edge.best_belief();
        let tree = self.derivation_tree(edge_id, belief, opts.depth);
        Ok(render_explanation(edge_id, belief, &tree, &opts))
    }

    fn derivation_tree(&self, edge_id: &EdgeId, belief: &Belief, depth: usize) -> Vec<String> {
        if depth == 0 || belief.premises.is_empty() {
            return Vec::new();
        }
        let mut lines = Vec::new();
        for premise_id in &belief.premises {
            if let Some(premise_edge) = self.hypergraph.get(premise_id) {
                let premise_belief = premise_edge.best_belief();
                lines.push(format!(
                    "{} [f={:.2} c={:.2}]",
                    premise_id, premise_belief.truth.frequency, premise_belief.truth.confidence
                ));
                for nested in self.derivation_tree(premise_id, premise_belief, depth - 1) {
                    lines.push(format!("  {nested}"));
                }
            } else {
                lines.push(format!("{premise_id} [unknown]"));
            }
        }
        let _ = edge_id;
        lines
    }

    // -----------------------------------------------------------------
    // Step loop (spec §5)
    // -----------------------------------------------------------------

    /// Run one step: pop one event, derive from it, and run periodic
    /// maintenance/adaptation/contradiction sweeps when due. Returns
    /// whether an event was actually processed (the queue may be empty).
    pub fn step(&mut self) -> bool {
        self.current_step += 1;
        self.steps_since_maintenance += 1;

        let processed = if let Some(event) = self.queue.pop() {
            self.process_event(event);
            true
        } else {
            false
        };

        if self.steps_since_maintenance >= self.config.memory_maintenance_interval {
            self.run_maintenance();
        }
        if self.current_step % 100 == 0 {
            self.run_adaptation();
        }
        if self.current_step % self.config.question_resolution_interval as u64 == 0 {
            self.resolve_pending_contradictions();
        }

        processed
    }

    /// Run up to `n` steps, stopping early once the queue empties.
    pub fn run(&mut self, n: u64) -> u64 {
        let mut ran = 0;
        for _ in 0..n {
            let processed = self.step();
            ran += 1;
            if !processed && self.queue.is_empty() {
                break;
            }
        }
        ran
    }

    fn process_event(&mut self, event: Event) {
        let now = self.clock.now_ms();
        let (outcome, belief) = propagation::propagate(
            &mut self.hypergraph,
            &mut self.memoization,
            &self.config,
            &self.observers,
            now,
            event.clone(),
        );
        if outcome != propagation::PropagationOutcome::Accepted {
            return;
        }
        if let Some(belief) = &belief {
            self.questions.check_answers(&event.term, belief);
        }

        let rule_scale = {
            let executive = &self.executive;
            move |name: &str| executive.rule_scale(name)
        };
        let derived = infer::derive(
            &mut self.rules,
            &mut self.hypergraph,
            &mut self.rng,
            rule_scale,
            self.current_step,
            &event,
        );

        let success = !derived.is_empty();
        if let Some(rule_name) = derived.first().and_then(|e| e.derived_by.clone()) {
            self.learning.record(
                &rule_name,
                &mut self.rules,
                Experience {
                    premise_type: event.term.term_type().unwrap_or(crate::term::TermType::Term),
                    conclusion_type: derived
                        .first()
                        .and_then(|e| e.term.term_type())
                        .unwrap_or(crate::term::TermType::Term),
                    success,
                },
            );
        }

        for child in derived {
            if propagation::admit(&child, &self.config, &self.memoization) {
                self.queue.push(child);
            }
        }
    }

    fn run_maintenance(&mut self) {
        self.steps_since_maintenance = 0;
        let now = self.clock.now_ms();
        let report = memory::maintain(&mut self.hypergraph, &self.config, &self.observers, now);
        tracing::debug!(
            edges_pruned = report.edges_pruned,
            beliefs_decayed = report.beliefs_decayed,
            "memory maintenance complete"
        );
        for id in self.questions.sweep_timeouts(now) {
            tracing::debug!(question_id = id, "question timed out");
        }
    }

    fn run_adaptation(&mut self) {
        let total = self.hypergraph.len().max(1) as f64;
        let contradictions = self.get_contradictions().len() as f64;
        let signal = AdaptationSignal {
            inference_rate: (self.queue.len() as f64 / total).min(1.0),
            contradiction_rate: contradictions / total,
            resource_utilization: (self.hypergraph.len() as f64 / self.config.derivation_cache_size.max(1) as f64).min(1.0),
        };
        let issue = self.executive.adapt(signal);
        self.observers.notify(Observer::FocusChanged {
            focus: self.executive.focus().name().to_string(),
        });
        tracing::debug!(?issue, focus = self.executive.focus().name(), "cognitive adaptation cycle");
    }

    fn resolve_pending_contradictions(&mut self) {
        let now = self.clock.now_ms();
        let pending = self.get_contradictions();
        for contradiction in pending {
            let _ = contradiction::resolve_with_reliability(
                &mut self.hypergraph,
                &contradiction,
                &mut self.breaker,
                &self.config,
                &self.observers,
                now,
                &self.source_reliability,
            );
        }
    }

    // -----------------------------------------------------------------
    // State management
    // -----------------------------------------------------------------

    /// Reset the engine to a fresh state, keeping the current configuration.
    pub fn clear_state(&mut self) {
        let config = self.config.clone();
        let rules = RuleRegistry::with_mode(config.derivation_mode);
        let executive = CognitiveExecutive::new(
            config.inference_threshold,
            config.contradiction_threshold,
            config.budget_threshold,
        );
        self.hypergraph = HypergraphStore::new(config.belief_capacity, config.derivation_cache_size);
        self.queue = PriorityQueue::new();
        self.memoization.clear();
        self.rules = rules;
        self.questions = QuestionRegistry::new();
        self.breaker = CircuitBreaker::default();
        self.executive = executive;
        self.learning = LearningEngine::new();
        self.source_reliability.clear();
        self.current_step = 0;
        self.steps_since_maintenance = 0;
        self.config = config;
    }

    /// Serialize the current hypergraph and config to the spec's persisted
    /// JSON shape, then encode it with bincode for compact storage.
    pub fn save_state(&self) -> NarResult<Vec<u8>> {
        let hypergraph = self
            .hypergraph
            .iter()
            .map(|edge| PersistedEdge {
                id: edge.id.as_str().to_string(),
                ty: edge.term.term_type().map(|t| t.name().to_string()),
                args: edge.term.args().iter().map(|a| a.canonical()).collect(),
                beliefs: edge
                    .beliefs
                    .iter()
                    .map(|b| PersistedBelief {
                        truth: b.truth,
                        budget: b.budget,
                        premises: b.premises.clone(),
                        derived_by: b.derived_by.clone(),
                        timestamp: b.timestamp,
                    })
                    .collect(),
            })
            .collect();

        let persisted = PersistedState {
            version: PERSISTED_VERSION.to_string(),
            timestamp: self.clock.now_ms(),
            config: self.config.clone(),
            current_step: self.current_step,
            hypergraph,
        };
        bincode::serialize(&persisted).map_err(|e| {
            NarError::State(StateError::InvalidState {
                reason: format!("failed to serialize state: {e}"),
            })
        })
    }

    /// Restore state from bytes produced by [`State::save_state`]: clears
    /// current state, reinstalls config, then replays every persisted edge
    /// by re-deriving its term from `id` and re-asserting each belief in
    /// original order via `add_full`.
    pub fn load_state(&mut self, bytes: &[u8]) -> NarResult<()> {
        let persisted: PersistedState = bincode::deserialize(bytes).map_err(|e| {
            NarError::State(StateError::InvalidState {
                reason: format!("failed to deserialize state: {e}"),
            })
        })?;
        if persisted.version != PERSISTED_VERSION {
            return Err(NarError::State(StateError::InvalidState {
                reason: format!("unsupported version {}", persisted.version),
            }));
        }

        self.config = persisted.config;
        self.clear_state();
        self.current_step = persisted.current_step;

        for edge in persisted.hypergraph {
            let term = reparse_persisted_term(&edge)?;
            for belief in edge.beliefs {
                self.hypergraph.add_full(
                    term.clone(),
                    belief.truth,
                    belief.budget,
                    belief.timestamp,
                    None,
                    belief.premises,
                    belief.derived_by,
                );
            }
        }
        Ok(())
    }
}

/// Reconstruct a persisted edge's `Term` from its recorded id — canonical
/// `Type(arg1,arg2,…)` ids don't round-trip through the NAL statement
/// grammar (no infix operators there), so this walks the canonical string
/// directly instead of re-parsing it as a statement (spec §6's `loadState`
/// replay).
fn reparse_persisted_term(edge: &PersistedEdge) -> NarResult<Term> {
    Term::from_canonical(&edge.id).ok_or_else(|| {
        NarError::State(StateError::InvalidState {
            reason: format!("could not reconstruct term from persisted id {}", edge.id),
        })
    })
}

/// `query()`/`queryBelief()` accept bare pattern text; append the statement
/// terminator the parser requires if the caller omitted it.
fn ensure_terminator(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.ends_with('.') || trimmed.ends_with('?') {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

fn render_explanation(edge_id: &EdgeId, belief: &Belief, tree: &[String], opts: &ExplainOptions) -> String {
    match opts.format {
        ExplainFormat::Json => {
            let premises: Vec<String> = belief.premises.iter().map(|p| p.as_str().to_string()).collect();
            format!(
                "{{\"edge\":\"{}\",\"frequency\":{:.4},\"confidence\":{:.4},\"rule\":{},\"premises\":{:?}}}",
                edge_id,
                belief.truth.frequency,
                belief.truth.confidence,
                belief
                    .derived_by
                    .as_ref()
                    .map(|r| format!("\"{r}\""))
                    .unwrap_or_else(|| "null".to_string()),
                premises
            )
        }
        ExplainFormat::Concise => format!(
            "{} (f={:.2}, c={:.2})",
            edge_id, belief.truth.frequency, belief.truth.confidence
        ),
        ExplainFormat::Technical => {
            let mut out = format!(
                "{} truth={{f:{:.4},c:{:.4},e:{:.4}}} budget={{p:{:.4},d:{:.4},q:{:.4}}} rule={:?}",
                edge_id,
                belief.truth.frequency,
                belief.truth.confidence,
                belief.truth.expectation(),
                belief.budget.priority,
                belief.budget.durability,
                belief.budget.quality,
                belief.derived_by
            );
            for line in tree {
                out.push('\n');
                out.push_str(line);
            }
            out
        }
        ExplainFormat::Story => {
            if belief.is_asserted() {
                format!("I was told that {edge_id} holds, directly.")
            } else {
                format!(
                    "I came to believe {} via {} from: {}",
                    edge_id,
                    belief.derived_by.as_deref().unwrap_or("an unnamed rule"),
                    belief
                        .premises
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(" and ")
                )
            }
        }
        ExplainFormat::Justification => {
            let perspective = match opts.perspective {
                ExplainPerspective::Evidential => "the evidence observed",
                ExplainPerspective::Causal => "the causal chain that produced it",
                ExplainPerspective::Counterfactual => "what would change if a premise were false",
            };
            format!(
                "{} is justified, at expectation {:.2}, by {}: {}",
                edge_id,
                belief.truth.expectation(),
                perspective,
                if tree.is_empty() {
                    "no recorded derivation (externally asserted)".to_string()
                } else {
                    tree.join("; ")
                }
            )
        }
        ExplainFormat::Detailed => {
            let mut out = format!(
                "{}\n  frequency: {:.4}\n  confidence: {:.4}\n  expectation: {:.4}\n  derived_by: {}",
                edge_id,
                belief.truth.frequency,
                belief.truth.confidence,
                belief.truth.expectation(),
                belief.derived_by.as_deref().unwrap_or("(asserted)")
            );
            if !tree.is_empty() {
                out.push_str("\n  derivation:");
                for line in tree {
                    out.push_str("\n    ");
                    out.push_str(line);
                }
            }
            out
        }
    }
}
