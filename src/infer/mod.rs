//! Derivation engine (spec §4.4): a registry of rules selected by stochastic
//! weighted sampling proportional to `priority * cognitiveExec.ruleScale`,
//! consulting the hypergraph's derivation cache before producing
//! conclusions, and falling back deterministically to the last-active rule
//! when every rule's weight collapses to zero (an empty or disabled
//! registry, or a scale function that zeroes every weight).

pub mod allen;

use crate::hypergraph::HypergraphStore;
use crate::propagation::Event;
use crate::term::{Term, TermType};
use crate::truth::Budget;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The specific combination logic a rule applies. Each variant names the
/// relation types it reads and the truth-value formula (spec §3) it feeds
/// the result through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    /// `Inheritance(a,b) + Inheritance(b,c) |- Inheritance(a,c)`, transitive formula.
    TransitiveInheritance,
    /// `Similarity(a,b) + Inheritance(b,c) |- Inheritance(a,c)`, analogy formula.
    AnalogyFromSimilarity,
    /// `Similarity(a,b) |- Inheritance(a,b), Inheritance(b,a)`.
    SymmetricClosure,
    /// `Implication(a,b) + belief(a) |- belief(b)`, detachment.
    ImplicationDetachment,
    /// `Equivalence(a,b) + belief(a|b) |- belief(b|a)`, detachment both ways.
    EquivalenceDetachment,
    /// `Conjunction(a,b) |- belief(a), belief(b)`.
    ConjunctionDecomposition,
    /// `Inheritance(a,b) + Inheritance(a,c) |- Inheritance(b,c)`, induction formula.
    InductionSharedSubject,
    /// `Inheritance(a,c) + Inheritance(b,c) |- Inheritance(a,b)`, abduction formula.
    AbductionSharedPredicate,
    /// Compose two `TemporalRelation` edges sharing an interval via Allen's algebra.
    TemporalComposition,
}

impl RuleKind {
    pub fn name(self) -> &'static str {
        match self {
            RuleKind::TransitiveInheritance => "transitive_inheritance",
            RuleKind::AnalogyFromSimilarity => "analogy_from_similarity",
            RuleKind::SymmetricClosure => "symmetric_closure",
            RuleKind::ImplicationDetachment => "implication_detachment",
            RuleKind::EquivalenceDetachment => "equivalence_detachment",
            RuleKind::ConjunctionDecomposition => "conjunction_decomposition",
            RuleKind::InductionSharedSubject => "induction_shared_subject",
            RuleKind::AbductionSharedPredicate => "abduction_shared_predicate",
            RuleKind::TemporalComposition => "temporal_composition",
        }
    }

    /// Budget scale applied to a conclusion derived by this rule (spec §4.4).
    fn budget_scale(self) -> f64 {
        match self {
            RuleKind::TransitiveInheritance => 0.7,
            RuleKind::AnalogyFromSimilarity => 0.6,
            RuleKind::ImplicationDetachment => 0.75,
            RuleKind::EquivalenceDetachment => 0.75,
            RuleKind::SymmetricClosure => 0.9,
            RuleKind::ConjunctionDecomposition => 0.9,
            RuleKind::InductionSharedSubject => 0.85,
            RuleKind::AbductionSharedPredicate => 0.8,
            RuleKind::TemporalComposition => 0.8,
        }
    }

    /// The triggering event's term type this rule's condition accepts (spec
    /// §4.4's "filter rules whose `condition(event)==true`" — every action
    /// here starts by matching `from`'s term type, so the condition check
    /// is exactly that type comparison, done once up front instead of
    /// inside each rule's action after it has already been drawn.
    fn condition(self, term_type: Option<TermType>) -> bool {
        let Some(t) = term_type else { return false };
        match self {
            RuleKind::TransitiveInheritance
            | RuleKind::InductionSharedSubject
            | RuleKind::AbductionSharedPredicate => t == TermType::Inheritance,
            RuleKind::AnalogyFromSimilarity | RuleKind::SymmetricClosure => t == TermType::Similarity,
            RuleKind::ImplicationDetachment => t == TermType::Implication,
            RuleKind::EquivalenceDetachment => t == TermType::Equivalence,
            RuleKind::ConjunctionDecomposition => t == TermType::Conjunction,
            RuleKind::TemporalComposition => t == TermType::TemporalRelation,
        }
    }
}

/// Productivity statistics tracked per rule, consumed by the learning
/// engine for reinforcement and shortcut-rule synthesis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RuleStats {
    pub attempts: u64,
    pub successes: u64,
    pub last_used_step: Option<u64>,
}

impl RuleStats {
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.5
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

/// A registered derivation rule: its matching/combination logic plus usage
/// statistics and an enable flag the cognitive executive can flip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub kind: RuleKind,
    pub priority: f64,
    pub enabled: bool,
    pub stats: RuleStats,
}

impl Rule {
    fn new(kind: RuleKind, priority: f64) -> Self {
        Self {
            kind,
            priority,
            enabled: true,
            stats: RuleStats::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Registry of derivation rules plus the state needed for weighted
/// selection and deterministic fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    last_active: Option<usize>,
}

impl RuleRegistry {
    /// Build the registry for a given `DerivationMode` (spec §9 Open
    /// Question: Simple registers only structural closure; Advanced
    /// registers the full rule table).
    pub fn with_mode(mode: crate::config::DerivationMode) -> Self {
        use crate::config::DerivationMode;
        let mut rules = vec![
            Rule::new(RuleKind::TransitiveInheritance, 0.9),
            Rule::new(RuleKind::SymmetricClosure, 0.6),
        ];
        if mode == DerivationMode::Advanced {
            rules.extend([
                Rule::new(RuleKind::AnalogyFromSimilarity, 0.7),
                Rule::new(RuleKind::ImplicationDetachment, 0.95),
                Rule::new(RuleKind::EquivalenceDetachment, 0.85),
                Rule::new(RuleKind::ConjunctionDecomposition, 0.8),
                Rule::new(RuleKind::InductionSharedSubject, 0.5),
                Rule::new(RuleKind::AbductionSharedPredicate, 0.45),
                Rule::new(RuleKind::TemporalComposition, 0.65),
            ]);
        }
        Self {
            rules,
            last_active: None,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_mut(&mut self, name: &str) -> Option<&mut Rule> {
        self.rules.iter_mut().find(|r| r.name() == name)
    }

    /// Weighted selection proportional to `priority * rule_scale(name)`,
    /// restricted to rules whose `condition` accepts `term_type` (spec
    /// §4.4). If no rule's condition matches, there is nothing to draw
    /// from and selection returns `None` outright — falling back to
    /// `last_active` here would apply a rule to a term shape it was never
    /// meant to see. Among condition-matching rules, if every weight is
    /// zero, falls back to the last-active rule (if still enabled and
    /// still condition-matching) rather than silently selecting nothing or
    /// picking arbitrarily.
    fn select(
        &self,
        rng: &mut impl Rng,
        rule_scale: &impl Fn(&str) -> f64,
        term_type: Option<TermType>,
    ) -> Option<usize> {
        let weights: Vec<(usize, f64)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.enabled && r.kind.condition(term_type))
            .map(|(i, r)| (i, r.priority * rule_scale(r.name())))
            .collect();
        if weights.is_empty() {
            return None;
        }
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return self
                .last_active
                .filter(|&i| self.rules[i].enabled && self.rules[i].kind.condition(term_type));
        }
        let mut pick = rng.gen_range(0.0..total);
        for (idx, weight) in weights {
            if pick < weight {
                return Some(idx);
            }
            pick -= weight;
        }
        self.last_active
    }

    fn record(&mut self, idx: usize, step: u64, success: bool) {
        let rule = &mut self.rules[idx];
        rule.stats.attempts += 1;
        if success {
            rule.stats.successes += 1;
        }
        rule.stats.last_used_step = Some(step);
        self.last_active = Some(idx);
    }
}

/// Pick one rule by weighted selection, apply it against `from`'s edge and
/// the rest of the hypergraph, and return the resulting derived events
/// (empty if the rule found no applicable partner premise). Consults
/// (and populates) the hypergraph's derivation cache so a given source
/// edge is not re-derived every single step.
pub fn derive(
    registry: &mut RuleRegistry,
    store: &mut HypergraphStore,
    rng: &mut impl Rng,
    rule_scale: impl Fn(&str) -> f64,
    step: u64,
    from: &Event,
) -> Vec<Event> {
    if let Some(cached) = store.cached_derivations(&from.edge_id) {
        if !cached.is_empty() {
            return Vec::new();
        }
    }

    let Some(idx) = registry.select(rng, &rule_scale, from.term.term_type()) else {
        return Vec::new();
    };
    let kind = registry.rules[idx].kind;
    let conclusions = apply_rule(kind, store, from);
    let success = !conclusions.is_empty();
    registry.record(idx, step, success);

    let produced: Vec<_> = conclusions.iter().map(|(t, _, _, _)| t.edge_id()).collect();
    store.cache_derivations(from.edge_id.clone(), produced);

    let rule_name = kind.name();
    conclusions
        .into_iter()
        .map(|(term, truth, budget, premises)| {
            Event::propagate_to(from, term, truth, budget).with_provenance(premises, rule_name)
        })
        .collect()
}

type Conclusion = (Term, crate::truth::TruthValue, Budget, Vec<crate::term::EdgeId>);

fn apply_rule(kind: RuleKind, store: &HypergraphStore, from: &Event) -> Vec<Conclusion> {
    let scale = kind.budget_scale();
    match kind {
        RuleKind::TransitiveInheritance => binary_same_type(
            store,
            from,
            TermType::Inheritance,
            scale,
            |a, b| a != b,
            |t1, t2| t1.transitive(t2),
        ),
        RuleKind::InductionSharedSubject => shared_first_argument(store, from, scale),
        RuleKind::AbductionSharedPredicate => shared_second_argument(store, from, scale),
        RuleKind::AnalogyFromSimilarity => analogy_from_similarity(store, from, scale),
        RuleKind::SymmetricClosure => symmetric_closure(from, scale),
        RuleKind::ImplicationDetachment => detachment(store, from, TermType::Implication, scale),
        RuleKind::EquivalenceDetachment => detachment(store, from, TermType::Equivalence, scale),
        RuleKind::ConjunctionDecomposition => conjunction_decomposition(from, scale),
        RuleKind::TemporalComposition => temporal_composition(store, from, scale),
    }
}

/// `TemporalRelation(a,b,r1) + TemporalRelation(b,c,r2) |- TemporalRelation(a,c,r)`
/// for each `r` in the Allen composition of `r1` and `r2` (spec §4.4).
fn temporal_composition(store: &HypergraphStore, from: &Event, scale: f64) -> Vec<Conclusion> {
    let Term::Compound { ty, args } = &from.term else {
        return Vec::new();
    };
    if *ty != TermType::TemporalRelation || args.len() != 3 {
        return Vec::new();
    }
    let (a, b) = (&args[0], &args[1]);
    let Term::Atom(r1_name) = &args[2] else {
        return Vec::new();
    };
    let Some(r1) = crate::infer::allen::AllenRelation::parse(r1_name) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for edge in store.by_type(TermType::TemporalRelation) {
        let Term::Compound { args: other_args, .. } = &edge.term else {
            continue;
        };
        if other_args.len() != 3 {
            continue;
        }
        if &other_args[0] != b {
            continue;
        }
        let c = &other_args[1];
        if c == a {
            continue;
        }
        let Term::Atom(r2_name) = &other_args[2] else {
            continue;
        };
        let Some(r2) = crate::infer::allen::AllenRelation::parse(r2_name) else {
            continue;
        };

        let premise = edge.best_belief();
        let truth = from.truth.transitive(&premise.truth);
        let budget = from.budget.scale(scale).merge(&premise.budget.scale(scale));
        for composed in crate::infer::allen::compose(r1, r2) {
            let term = Term::compound(
                TermType::TemporalRelation,
                vec![a.clone(), c.clone(), Term::atom(composed.name())],
            );
            out.push((term, truth, budget, vec![from.edge_id.clone(), edge.id.clone()]));
        }
    }
    out
}

/// `from = Type(a,b)`, look for `Type(b,c)` edges and combine via `combine`.
fn binary_same_type(
    store: &HypergraphStore,
    from: &Event,
    ty: TermType,
    scale: f64,
    accept: impl Fn(&str, &str) -> bool,
    combine: impl Fn(&crate::truth::TruthValue, &crate::truth::TruthValue) -> crate::truth::TruthValue,
) -> Vec<Conclusion> {
    let Term::Compound { ty: from_ty, args } = &from.term else {
        return Vec::new();
    };
    if *from_ty != ty || args.len() != 2 {
        return Vec::new();
    }
    let (a, b) = (&args[0], &args[1]);
    let Term::Atom(b_name) = b else { return Vec::new() };

    let mut out = Vec::new();
    for edge in store.by_type(ty) {
        let Term::Compound { args: other_args, .. } = &edge.term else {
            continue;
        };
        if other_args.len() != 2 {
            continue;
        }
        let Term::Atom(other_first) = &other_args[0] else {
            continue;
        };
        if other_first != b_name {
            continue;
        }
        let c = &other_args[1];
        if let (Term::Atom(a_name), Term::Atom(c_name)) = (a, c) {
            if !accept(a_name, c_name) {
                continue;
            }
        }
        let term = Term::compound(ty, vec![a.clone(), c.clone()]);
        let truth = combine(&from.truth, &edge.best_belief().truth);
        let budget = from.budget.scale(scale).merge(&edge.best_belief().budget.scale(scale));
        out.push((term, truth, budget, vec![from.edge_id.clone(), edge.id.clone()]));
    }
    out
}

/// `Inheritance(a,b) + Inheritance(a,c) |- Inheritance(b,c)`.
fn shared_first_argument(store: &HypergraphStore, from: &Event, scale: f64) -> Vec<Conclusion> {
    let Term::Compound { ty, args } = &from.term else {
        return Vec::new();
    };
    if *ty != TermType::Inheritance || args.len() != 2 {
        return Vec::new();
    }
    let (a, b) = (&args[0], &args[1]);
    let Term::Atom(a_name) = a else { return Vec::new() };

    let mut out = Vec::new();
    for edge in store.by_type(TermType::Inheritance) {
        let Term::Compound { args: other_args, .. } = &edge.term else {
            continue;
        };
        if other_args.len() != 2 {
            continue;
        }
        let Term::Atom(other_a) = &other_args[0] else {
            continue;
        };
        if other_a != a_name {
            continue;
        }
        let c = &other_args[1];
        if c == b {
            continue;
        }
        let term = Term::compound(TermType::Inheritance, vec![b.clone(), c.clone()]);
        let truth = from.truth.induction(&edge.best_belief().truth);
        let budget = from.budget.scale(scale).merge(&edge.best_belief().budget.scale(scale));
        out.push((term, truth, budget, vec![from.edge_id.clone(), edge.id.clone()]));
    }
    out
}

/// `Inheritance(a,c) + Inheritance(b,c) |- Inheritance(a,b)`.
fn shared_second_argument(store: &HypergraphStore, from: &Event, scale: f64) -> Vec<Conclusion> {
    let Term::Compound { ty, args } = &from.term else {
        return Vec::new();
    };
    if *ty != TermType::Inheritance || args.len() != 2 {
        return Vec::new();
    }
    let (a, c) = (&args[0], &args[1]);
    let Term::Atom(c_name) = c else { return Vec::new() };

    let mut out = Vec::new();
    for edge in store.by_type(TermType::Inheritance) {
        let Term::Compound { args: other_args, .. } = &edge.term else {
            continue;
        };
        if other_args.len() != 2 {
            continue;
        }
        let Term::Atom(other_c) = &other_args[1] else {
            continue;
        };
        if other_c != c_name {
            continue;
        }
        let b = &other_args[0];
        if b == a {
            continue;
        }
        let term = Term::compound(TermType::Inheritance, vec![a.clone(), b.clone()]);
        let truth = from.truth.abduction(&edge.best_belief().truth);
        let budget = from.budget.scale(scale).merge(&edge.best_belief().budget.scale(scale));
        out.push((term, truth, budget, vec![from.edge_id.clone(), edge.id.clone()]));
    }
    out
}

/// `Similarity(a,b) + Inheritance(b,c) |- Inheritance(a,c)` (and symmetric).
fn analogy_from_similarity(store: &HypergraphStore, from: &Event, scale: f64) -> Vec<Conclusion> {
    let Term::Compound { ty, args } = &from.term else {
        return Vec::new();
    };
    if *ty != TermType::Similarity || args.len() != 2 {
        return Vec::new();
    }
    let (a, b) = (&args[0], &args[1]);

    let mut out = Vec::new();
    for (source, target) in [(a, b), (b, a)] {
        let Term::Atom(source_name) = target else {
            continue;
        };
        for edge in store.by_type(TermType::Inheritance) {
            let Term::Compound { args: other_args, .. } = &edge.term else {
                continue;
            };
            if other_args.len() != 2 {
                continue;
            }
            let Term::Atom(other_first) = &other_args[0] else {
                continue;
            };
            if other_first != source_name {
                continue;
            }
            let c = &other_args[1];
            let term = Term::compound(TermType::Inheritance, vec![source.clone(), c.clone()]);
            let truth = from.truth.analogy(&edge.best_belief().truth);
            let budget = from.budget.scale(scale).merge(&edge.best_belief().budget.scale(scale));
            out.push((term, truth, budget, vec![from.edge_id.clone(), edge.id.clone()]));
        }
    }
    out
}

/// `Similarity(a,b) |- Inheritance(a,b), Inheritance(b,a)`.
fn symmetric_closure(from: &Event, scale: f64) -> Vec<Conclusion> {
    let Term::Compound { ty, args } = &from.term else {
        return Vec::new();
    };
    if *ty != TermType::Similarity || args.len() != 2 {
        return Vec::new();
    }
    let (a, b) = (&args[0], &args[1]);
    let budget = from.budget.scale(scale);
    let premises = vec![from.edge_id.clone()];
    vec![
        (
            Term::compound(TermType::Inheritance, vec![a.clone(), b.clone()]),
            from.truth,
            budget,
            premises.clone(),
        ),
        (
            Term::compound(TermType::Inheritance, vec![b.clone(), a.clone()]),
            from.truth,
            budget,
            premises,
        ),
    ]
}

/// `Implication(a,b)` or `Equivalence(a,b)` plus a standing belief in `a`
/// (as a bare atom's self-inheritance, i.e. an asserted `Inheritance(a,a)`
/// or any edge whose canonical id equals `a`) detaches `b`, activation
/// scaled by 0.9 on top of the rule's budget scale.
fn detachment(store: &HypergraphStore, from: &Event, ty: TermType, scale: f64) -> Vec<Conclusion> {
    let Term::Compound { ty: from_ty, args } = &from.term else {
        return Vec::new();
    };
    if *from_ty != ty || args.len() != 2 {
        return Vec::new();
    }
    let (antecedent, consequent) = (&args[0], &args[1]);

    let mut out = Vec::new();
    let antecedent_id = antecedent.edge_id();
    if let Some(edge) = store.get(&antecedent_id) {
        let premise = edge.best_belief();
        let truth = from.truth.transitive(&premise.truth);
        let budget = from.budget.scale(scale * 0.9).merge(&premise.budget.scale(scale));
        out.push((consequent.clone(), truth, budget, vec![from.edge_id.clone(), edge.id.clone()]));
    }
    if ty == TermType::Equivalence {
        let consequent_id = consequent.edge_id();
        if let Some(edge) = store.get(&consequent_id) {
            let premise = edge.best_belief();
            let truth = from.truth.transitive(&premise.truth);
            let budget = from.budget.scale(scale * 0.9).merge(&premise.budget.scale(scale));
            out.push((antecedent.clone(), truth, budget, vec![from.edge_id.clone(), edge.id.clone()]));
        }
    }
    out
}

/// `Conjunction(a,b) |- a, b`, each scaled identically to `SymmetricClosure`.
fn conjunction_decomposition(from: &Event, scale: f64) -> Vec<Conclusion> {
    let Term::Compound { ty, args } = &from.term else {
        return Vec::new();
    };
    if *ty != TermType::Conjunction {
        return Vec::new();
    }
    let budget = from.budget.scale(scale);
    let premises = vec![from.edge_id.clone()];
    args.iter()
        .map(|a| (a.clone(), from.truth, budget, premises.clone()))
        .collect()
}
