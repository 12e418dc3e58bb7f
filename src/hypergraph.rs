//! The hypergraph of beliefs: typed, argument-ordered edges each carrying a
//! bounded, priority-sorted array of beliefs (spec §3, §4.2, §8).
//!
//! An edge's identity is always its canonical [`EdgeId`] — nothing
//! constructs or mutates one outside `HypergraphStore`. Four indexes keep
//! lookups off a linear scan: `by_type` (all edges of a `TermType`),
//! `by_arg` (edges referencing a given argument string, a [`ArgTrie`]),
//! `structural` (edges of a given `(TermType, arity)` shape, for rule
//! matching), and a derivation cache the inference engine consults before
//! re-deriving a conclusion it has already produced.

use crate::error::HypergraphError;
use crate::lru::LruCache;
use crate::term::{EdgeId, Term, TermType};
use crate::trie::ArgTrie;
use crate::truth::{Budget, TruthValue};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A single piece of evidence for an edge: a truth value, the resource
/// budget it carries, when it was recorded, and (optionally) the source
/// that asserted it — used by contradiction resolution's
/// source-reliability strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    pub truth: TruthValue,
    pub budget: Budget,
    pub timestamp: u64,
    pub source: Option<String>,
    /// Edges this belief was derived from, in order (empty for an
    /// externally asserted belief). Drives `explain()`'s derivation tree,
    /// the learning engine's premise reinforcement, and the question
    /// handler's `derivationPath` (spec §3, §4.6, §4.8).
    #[serde(default)]
    pub premises: Vec<EdgeId>,
    /// Name of the rule that produced this belief, `None` for an
    /// externally asserted one.
    #[serde(default)]
    pub derived_by: Option<String>,
}

/// A single piece of evidence recorded against an edge, independent of
/// which belief currently holds top rank — the raw material contradiction
/// resolution's evidence-strength scoring reads (spec §3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub source: Option<String>,
    pub strength: f64,
    pub context: Option<String>,
}

impl Belief {
    pub fn new(truth: TruthValue, budget: Budget, timestamp: u64) -> Self {
        Self {
            truth,
            budget,
            timestamp,
            source: None,
            premises: Vec::new(),
            derived_by: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_provenance(mut self, premises: Vec<EdgeId>, derived_by: impl Into<String>) -> Self {
        self.premises = premises;
        self.derived_by = Some(derived_by.into());
        self
    }

    /// Whether this belief was asserted externally rather than derived.
    pub fn is_asserted(&self) -> bool {
        self.derived_by.is_none()
    }

    /// The ranking scalar used for belief-capacity eviction: expectation
    /// weighted by the asserting budget's priority.
    pub fn rank(&self) -> f64 {
        self.truth.expectation() * self.budget.priority
    }
}

/// A hyperedge: the canonical term it represents plus its belief array.
///
/// Invariant: `beliefs` is never empty while the edge exists in a store —
/// `HypergraphStore` deletes an edge the moment its last belief is removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hyperedge {
    pub id: EdgeId,
    pub term: Term,
    pub beliefs: Vec<Belief>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

impl Hyperedge {
    /// Highest-ranked belief, i.e. the one the engine treats as current.
    pub fn best_belief(&self) -> &Belief {
        &self.beliefs[0]
    }

    fn sort_and_truncate(&mut self, capacity: usize) -> Vec<Belief> {
        self.beliefs
            .sort_by(|a, b| b.rank().partial_cmp(&a.rank()).unwrap_or(std::cmp::Ordering::Equal));
        if self.beliefs.len() > capacity {
            self.beliefs.split_off(capacity)
        } else {
            Vec::new()
        }
    }
}

/// The belief hypergraph plus its secondary indexes.
#[derive(Debug)]
pub struct HypergraphStore {
    edges: HashMap<EdgeId, Hyperedge>,
    by_type: HashMap<TermType, HashSet<EdgeId>>,
    by_arg: ArgTrie,
    structural: HashMap<(TermType, usize), HashSet<EdgeId>>,
    derivation_cache: LruCache<EdgeId, Vec<EdgeId>>,
    belief_capacity: usize,
}

impl HypergraphStore {
    pub fn new(belief_capacity: usize, derivation_cache_size: usize) -> Self {
        Self {
            edges: HashMap::new(),
            by_type: HashMap::new(),
            by_arg: ArgTrie::new(),
            structural: HashMap::new(),
            derivation_cache: LruCache::new(derivation_cache_size.max(1)),
            belief_capacity: belief_capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn has(&self, id: &EdgeId) -> bool {
        self.edges.contains_key(id)
    }

    pub fn get(&self, id: &EdgeId) -> Option<&Hyperedge> {
        self.edges.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hyperedge> {
        self.edges.values()
    }

    /// Edges of a given relation type.
    pub fn by_type(&self, ty: TermType) -> Vec<&Hyperedge> {
        self.by_type
            .get(&ty)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.edges.get(id))
            .collect()
    }

    /// Edges referencing `arg` as an argument anywhere in their term.
    pub fn by_arg(&self, arg: &str) -> Vec<&Hyperedge> {
        self.by_arg
            .get(arg)
            .into_iter()
            .filter_map(|id| self.edges.get(&id))
            .collect()
    }

    /// Edges whose term has the exact shape `(ty, arity)`.
    pub fn by_structure(&self, ty: TermType, arity: usize) -> Vec<&Hyperedge> {
        self.structural
            .get(&(ty, arity))
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.edges.get(id))
            .collect()
    }

    /// Add a new belief for `term` with no provenance (an externally
    /// asserted statement). See [`HypergraphStore::add_full`] for the full
    /// revision contract.
    pub fn add(&mut self, term: Term, truth: TruthValue, budget: Budget, timestamp: u64) -> EdgeId {
        self.add_full(term, truth, budget, timestamp, None, Vec::new(), None).0
    }

    pub fn add_with_source(
        &mut self,
        term: Term,
        truth: TruthValue,
        budget: Budget,
        timestamp: u64,
        source: Option<String>,
    ) -> EdgeId {
        self.add_full(term, truth, budget, timestamp, source, Vec::new(), None).0
    }

    /// Add or revise a belief for `term`, carrying full provenance (spec
    /// §4.2's `revise`).
    ///
    /// If the edge already holds a belief with *identical* `(premises,
    /// derived_by)` — the same conclusion reached the same way — two cases
    /// apply: if the truth value is unchanged, the call is a no-op (spec
    /// §8 invariant 6's idempotence); otherwise the existing belief is
    /// revised in place via `TruthValue::revise`, never growing the array.
    /// Otherwise a genuinely new, independently-grounded belief is pushed
    /// alongside the existing ones (this is what lets contradiction
    /// detection see two competing beliefs on one edge). Either way the
    /// array is re-sorted by rank and truncated to `belief_capacity`.
    ///
    /// Returns the edge id and the belief as stored after this call.
    pub fn add_full(
        &mut self,
        term: Term,
        truth: TruthValue,
        budget: Budget,
        timestamp: u64,
        source: Option<String>,
        premises: Vec<EdgeId>,
        derived_by: Option<String>,
    ) -> (EdgeId, Belief) {
        let id = term.edge_id();
        let mut belief = Belief::new(truth, budget, timestamp);
        belief.premises = premises;
        belief.derived_by = derived_by;
        if let Some(source) = source {
            belief = belief.with_source(source);
        }
        let evidence = Evidence {
            source: belief.source.clone(),
            strength: belief.truth.expectation(),
            context: belief.source.clone(),
        };

        if let Some(edge) = self.edges.get_mut(&id) {
            if let Some(existing) = edge
                .beliefs
                .iter_mut()
                .find(|b| b.premises == belief.premises && b.derived_by == belief.derived_by)
            {
                if truths_equal(&existing.truth, &belief.truth) {
                    return (id, existing.clone());
                }
                existing.truth = existing.truth.revise(&belief.truth);
                existing.budget = existing.budget.merge(&belief.budget);
                existing.timestamp = timestamp;
                let stored = existing.clone();
                edge.evidence.push(evidence);
                edge.sort_and_truncate(self.belief_capacity);
                return (id, stored);
            }
            edge.beliefs.push(belief.clone());
            edge.evidence.push(evidence);
            edge.sort_and_truncate(self.belief_capacity);
        } else {
            self.index_new(&id, &term);
            self.edges.insert(
                id.clone(),
                Hyperedge {
                    id: id.clone(),
                    term,
                    beliefs: vec![belief.clone()],
                    evidence: vec![evidence],
                },
            );
        }
        (id, belief)
    }

    /// Insert a context-specialized edge (contradiction resolution's
    /// `specialize` strategy): same term as `original` but keyed under
    /// `original|context:<context>`, holding just `belief`. This is the one
    /// place an edge's id is not `term.edge_id()` — the specialization
    /// suffix is what distinguishes it.
    pub fn add_specialized(&mut self, original: &EdgeId, context: &str, term: Term, belief: Belief) -> EdgeId {
        let id = original.specialized(context);
        self.index_new(&id, &term);
        let evidence = Evidence {
            source: belief.source.clone(),
            strength: belief.truth.expectation(),
            context: belief.source.clone(),
        };
        self.edges.insert(
            id.clone(),
            Hyperedge { id: id.clone(), term, beliefs: vec![belief], evidence: vec![evidence] },
        );
        id
    }

    /// Replace an edge's entire belief array outright (used by contradiction
    /// resolution strategies such as `dominant_evidence` and `merge`, which
    /// compute a single reconciled belief rather than appending evidence).
    pub fn replace_beliefs(
        &mut self,
        id: &EdgeId,
        beliefs: Vec<Belief>,
    ) -> Result<(), HypergraphError> {
        if beliefs.is_empty() {
            return Err(HypergraphError::EmptyBeliefs {
                edge_id: id.as_str().to_string(),
            });
        }
        let edge = self
            .edges
            .get_mut(id)
            .ok_or_else(|| HypergraphError::InternalInvariantViolation {
                edge_id: id.as_str().to_string(),
                detail: "replace_beliefs called on a non-existent edge".into(),
            })?;
        edge.beliefs = beliefs;
        edge.sort_and_truncate(self.belief_capacity);
        Ok(())
    }

    /// Remove an edge entirely, dropping it from every index.
    pub fn remove(&mut self, id: &EdgeId) -> Option<Hyperedge> {
        let edge = self.edges.remove(id)?;
        self.deindex(&edge);
        Some(edge)
    }

    fn index_new(&mut self, id: &EdgeId, term: &Term) {
        if let Some(ty) = term.term_type() {
            self.by_type.entry(ty).or_default().insert(id.clone());
            self.structural
                .entry((ty, term.args().len()))
                .or_default()
                .insert(id.clone());
        }
        for arg in collect_argument_strings(term) {
            self.by_arg.insert(&arg, id.clone());
        }
    }

    fn deindex(&mut self, edge: &Hyperedge) {
        if let Some(ty) = edge.term.term_type() {
            if let Some(set) = self.by_type.get_mut(&ty) {
                set.remove(&edge.id);
            }
            if let Some(set) = self.structural.get_mut(&(ty, edge.term.args().len())) {
                set.remove(&edge.id);
            }
        }
        for arg in collect_argument_strings(&edge.term) {
            self.by_arg.remove(&arg, &edge.id);
        }
    }

    /// Consult the derivation cache for previously derived conclusions
    /// reachable from `source`.
    pub fn cached_derivations(&mut self, source: &EdgeId) -> Option<Vec<EdgeId>> {
        self.derivation_cache.get(source).cloned()
    }

    /// Record that deriving from `source` produced `conclusions`.
    pub fn cache_derivations(&mut self, source: EdgeId, conclusions: Vec<EdgeId>) {
        self.derivation_cache.put(source, conclusions);
    }

    pub fn derivation_cache_len(&self) -> usize {
        self.derivation_cache.len()
    }

    pub fn truncate_derivation_cache(&mut self, new_capacity: usize) {
        self.derivation_cache.truncate(new_capacity);
    }
}

/// Whether two truth values are close enough to count as "the same belief"
/// for idempotence purposes (spec §8 invariant 6).
fn truths_equal(a: &TruthValue, b: &TruthValue) -> bool {
    (a.frequency - b.frequency).abs() < 1e-9 && (a.confidence - b.confidence).abs() < 1e-9
}

/// Flatten a term into the argument strings its atoms/variables present at
/// the top two levels — enough for `byArg` to serve pattern-matching
/// lookups without indexing every nested atom in deeply composed terms.
fn collect_argument_strings(term: &Term) -> Vec<String> {
    let mut out = Vec::new();
    match term {
        Term::Atom(name) => out.push(name.clone()),
        Term::Variable(_) => {}
        Term::Compound { args, .. } => {
            for arg in args {
                match arg {
                    Term::Atom(name) => out.push(name.clone()),
                    Term::Variable(_) => {}
                    Term::Compound { .. } => out.push(arg.canonical()),
                }
            }
        }
    }
    out
}
