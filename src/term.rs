//! Term algebra: the typed tree the parser produces and the hypergraph stores.
//!
//! A [`Term`] is the parsed representation of a statement; an [`EdgeId`] is
//! its canonical, deterministic string identity — the *only* basis for
//! equality between edges (spec §3).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The relation/connective type of a compound term or hyperedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermType {
    Inheritance,
    Similarity,
    Implication,
    Equivalence,
    Conjunction,
    Disjunction,
    Negation,
    Product,
    ImageExt,
    ImageInt,
    TemporalRelation,
    Instance,
    Property,
    Term,
}

impl TermType {
    /// The canonical head name used inside `Type(args…)`.
    pub fn name(self) -> &'static str {
        match self {
            TermType::Inheritance => "Inheritance",
            TermType::Similarity => "Similarity",
            TermType::Implication => "Implication",
            TermType::Equivalence => "Equivalence",
            TermType::Conjunction => "Conjunction",
            TermType::Disjunction => "Disjunction",
            TermType::Negation => "Negation",
            TermType::Product => "Product",
            TermType::ImageExt => "ImageExt",
            TermType::ImageInt => "ImageInt",
            TermType::TemporalRelation => "TemporalRelation",
            TermType::Instance => "Instance",
            TermType::Property => "Property",
            TermType::Term => "Term",
        }
    }

    /// Whether this type commutes its two arguments for canonicalization
    /// purposes. Only `Similarity` and `Equivalence` are symmetric in NAL;
    /// everything else is order-sensitive.
    pub fn is_symmetric(self) -> bool {
        matches!(self, TermType::Similarity | TermType::Equivalence)
    }

    /// Inverse of `name()`, for reconstructing a type from a canonical id.
    pub fn from_name(s: &str) -> Option<Self> {
        Some(match s {
            "Inheritance" => TermType::Inheritance,
            "Similarity" => TermType::Similarity,
            "Implication" => TermType::Implication,
            "Equivalence" => TermType::Equivalence,
            "Conjunction" => TermType::Conjunction,
            "Disjunction" => TermType::Disjunction,
            "Negation" => TermType::Negation,
            "Product" => TermType::Product,
            "ImageExt" => TermType::ImageExt,
            "ImageInt" => TermType::ImageInt,
            "TemporalRelation" => TermType::TemporalRelation,
            "Instance" => TermType::Instance,
            "Property" => TermType::Property,
            "Term" => TermType::Term,
            _ => return None,
        })
    }
}

impl fmt::Display for TermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A parsed term: atom, variable, or typed compound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    Atom(String),
    Variable(String),
    Compound { ty: TermType, args: Vec<Term> },
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    pub fn compound(ty: TermType, args: Vec<Term>) -> Self {
        Term::Compound { ty, args }
    }

    /// Whether this term (or any subterm) contains a variable.
    pub fn has_variable(&self) -> bool {
        match self {
            Term::Atom(_) => false,
            Term::Variable(_) => true,
            Term::Compound { args, .. } => args.iter().any(Term::has_variable),
        }
    }

    /// Recursively canonicalize into the deterministic string form used as
    /// an [`EdgeId`]. Atoms and variables render as their name (variables
    /// prefixed `$`); compounds render as `Type(arg1,arg2,…)` with symmetric
    /// types sorting their two arguments lexicographically so that
    /// `Similarity(a,b)` and `Similarity(b,a)` collapse to one id.
    pub fn canonical(&self) -> String {
        match self {
            Term::Atom(name) => name.clone(),
            Term::Variable(name) => format!("${name}"),
            Term::Compound { ty, args } => {
                let mut rendered: Vec<String> = args.iter().map(Term::canonical).collect();
                if ty.is_symmetric() && rendered.len() == 2 && rendered[0] > rendered[1] {
                    rendered.swap(0, 1);
                }
                format!("{}({})", ty.name(), rendered.join(","))
            }
        }
    }

    /// Build the `EdgeId` for this term (identical to `canonical()` but
    /// typed, to keep call sites self-documenting).
    pub fn edge_id(&self) -> EdgeId {
        EdgeId(self.canonical())
    }

    /// Reconstruct a term from the `Type(arg1,arg2,…)` string `canonical()`
    /// produces. This is NOT the NAL statement grammar (no infix operators,
    /// no terminators) — it exists solely to replay persisted hyperedges
    /// from their stored canonical id without re-deriving them.
    pub fn from_canonical(s: &str) -> Option<Term> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('$') {
            return Some(Term::variable(rest));
        }
        match s.find('(') {
            None => Some(Term::atom(s)),
            Some(paren_idx) => {
                if !s.ends_with(')') {
                    return None;
                }
                let ty = TermType::from_name(&s[..paren_idx])?;
                let inner = &s[paren_idx + 1..s.len() - 1];
                let args: Option<Vec<Term>> = split_top_level_commas(inner)
                    .into_iter()
                    .map(Term::from_canonical)
                    .collect();
                Some(Term::compound(ty, args?))
            }
        }
    }

    /// Type of this term, if it's a compound (atoms/variables have none).
    pub fn term_type(&self) -> Option<TermType> {
        match self {
            Term::Compound { ty, .. } => Some(*ty),
            _ => None,
        }
    }

    /// Arguments of this term, if it's a compound.
    pub fn args(&self) -> &[Term] {
        match self {
            Term::Compound { args, .. } => args,
            _ => &[],
        }
    }

    /// Match `self` as a pattern against `concrete`, binding variables.
    /// Atoms must match exactly; a `Variable` matches anything and binds.
    /// Returns `None` on structural mismatch or conflicting bindings.
    pub fn match_pattern<'a>(
        &'a self,
        concrete: &'a Term,
        bindings: &mut std::collections::HashMap<String, Term>,
    ) -> bool {
        match (self, concrete) {
            (Term::Variable(name), other) => {
                if let Some(existing) = bindings.get(name) {
                    existing == other
                } else {
                    bindings.insert(name.clone(), other.clone());
                    true
                }
            }
            (Term::Atom(a), Term::Atom(b)) => a == b,
            (
                Term::Compound { ty: t1, args: a1 },
                Term::Compound { ty: t2, args: a2 },
            ) => t1 == t2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| x.match_pattern(y, bindings)),
            _ => false,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Canonical identity of a hyperedge: `Type(arg1,arg2,…)`.
///
/// This is the *only* basis for equality between edges. It is always
/// derived from `Term::canonical()`; nothing constructs an `EdgeId` by
/// hand outside of `Term::edge_id` and the specialization/context suffix
/// used by the contradiction manager (`edgeId|context:<ctx>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(s: impl Into<String>) -> Self {
        EdgeId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a specialized id for contradiction-resolution's `specialize`
    /// strategy: `edgeId|context:<ctx>`.
    pub fn specialized(&self, context: &str) -> EdgeId {
        EdgeId(format!("{}|context:{}", self.0, context))
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Split `s` on top-level commas, respecting nested parens — used to pull
/// apart the argument list inside a canonical `Type(arg1,arg2,…)` string.
fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}
