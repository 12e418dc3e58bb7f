//! Question handling (spec §4.6): register a pattern, wait for a belief
//! that matches it with enough expectation, and time out deterministically
//! via the injectable [`Clock`](crate::clock::Clock) if none arrives.

use crate::error::QuestionError;
use crate::hypergraph::{Belief, HypergraphStore};
use crate::term::Term;
use crate::truth::TruthValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options controlling how a question is answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskOptions {
    pub min_expectation: f64,
    pub timeout_ms: u64,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            min_expectation: 0.6,
            timeout_ms: 3000,
        }
    }
}

/// A question awaiting resolution: a pattern term (possibly with
/// variables) plus the deadline it must be answered by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub id: u64,
    pub pattern: Term,
    pub options: AskOptions,
    pub asked_at_ms: u64,
    pub deadline_ms: u64,
}

/// The outcome of a resolved question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QuestionAnswer {
    Answered { term: Term, truth: TruthValue },
    TimedOut,
}

/// Registry of pending questions, resolved incrementally as beliefs arrive.
#[derive(Debug, Default)]
pub struct QuestionRegistry {
    pending: HashMap<u64, PendingQuestion>,
    answered: HashMap<u64, QuestionAnswer>,
    next_id: u64,
}

impl QuestionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Register a new question, returning its id.
    pub fn ask(&mut self, pattern: Term, options: AskOptions, now_ms: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let deadline = now_ms + options.timeout_ms;
        self.pending.insert(
            id,
            PendingQuestion {
                id,
                pattern,
                options,
                asked_at_ms: now_ms,
                deadline_ms: deadline,
            },
        );
        id
    }

    /// Look up a question's resolution, if it has one yet.
    pub fn answer(&self, id: u64) -> Option<&QuestionAnswer> {
        self.answered.get(&id)
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    /// Check a newly-added `(term, belief)` pair against every pending
    /// question's pattern; any question whose pattern matches and whose
    /// expectation threshold is met moves to `answered`. Returns the ids
    /// resolved this call.
    pub fn check_answers(&mut self, term: &Term, belief: &Belief) -> Vec<u64> {
        let mut resolved = Vec::new();
        let mut bindings = HashMap::new();
        for (id, question) in self.pending.iter() {
            bindings.clear();
            if question.pattern.match_pattern(term, &mut bindings)
                && belief.truth.expectation() >= question.options.min_expectation
            {
                resolved.push(*id);
            }
        }
        for id in &resolved {
            self.pending.remove(id);
            self.answered.insert(
                *id,
                QuestionAnswer::Answered {
                    term: term.clone(),
                    truth: belief.truth,
                },
            );
        }
        resolved
    }

    /// Sweep pending questions whose deadline has passed, marking them
    /// timed out. Returns the ids resolved this call.
    pub fn sweep_timeouts(&mut self, now_ms: u64) -> Vec<u64> {
        let expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, q)| now_ms >= q.deadline_ms)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.pending.remove(id);
            self.answered.insert(*id, QuestionAnswer::TimedOut);
        }
        expired
    }

    /// Resolve a question synchronously against the current hypergraph
    /// state (used by `ask()`'s immediate-check path before falling back
    /// to the scheduled sweep), returning an error if no match exists yet
    /// and the deadline has already passed.
    pub fn resolve_against(
        &mut self,
        id: u64,
        store: &HypergraphStore,
        now_ms: u64,
    ) -> Result<Option<QuestionAnswer>, QuestionError> {
        let question = self
            .pending
            .get(&id)
            .ok_or_else(|| QuestionError::NotFound {
                question_id: id.to_string(),
            })?
            .clone();

        for edge in store.iter() {
            let mut bindings = HashMap::new();
            if question.pattern.match_pattern(&edge.term, &mut bindings) {
                let belief = edge.best_belief();
                if belief.truth.expectation() >= question.options.min_expectation {
                    self.pending.remove(&id);
                    let answer = QuestionAnswer::Answered {
                        term: edge.term.clone(),
                        truth: belief.truth,
                    };
                    self.answered.insert(id, answer.clone());
                    return Ok(Some(answer));
                }
            }
        }

        if now_ms >= question.deadline_ms {
            self.pending.remove(&id);
            self.answered.insert(id, QuestionAnswer::TimedOut);
            return Err(QuestionError::Timeout {
                text: question.pattern.canonical(),
                timeout_ms: question.options.timeout_ms,
            });
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TermType;
    use crate::truth::Budget;

    #[test]
    fn ask_registers_a_pending_question() {
        let mut registry = QuestionRegistry::new();
        let pattern = Term::compound(TermType::Inheritance, vec![Term::variable("x"), Term::atom("bird")]);
        let id = registry.ask(pattern, AskOptions::default(), 0);
        assert!(registry.is_pending(id));
    }

    #[test]
    fn check_answers_resolves_matching_question() {
        let mut registry = QuestionRegistry::new();
        let pattern = Term::compound(TermType::Inheritance, vec![Term::variable("x"), Term::atom("bird")]);
        let id = registry.ask(pattern, AskOptions::default(), 0);
        let term = Term::compound(TermType::Inheritance, vec![Term::atom("tweety"), Term::atom("bird")]);
        let belief = Belief::new(TruthValue::new(0.9, 0.9, 0.9), Budget::full(), 0);
        let resolved = registry.check_answers(&term, &belief);
        assert_eq!(resolved, vec![id]);
        assert!(!registry.is_pending(id));
        assert!(matches!(registry.answer(id), Some(QuestionAnswer::Answered { .. })));
    }

    #[test]
    fn low_expectation_belief_does_not_resolve_question() {
        let mut registry = QuestionRegistry::new();
        let pattern = Term::compound(TermType::Inheritance, vec![Term::variable("x"), Term::atom("bird")]);
        let id = registry.ask(pattern, AskOptions::default(), 0);
        let term = Term::compound(TermType::Inheritance, vec![Term::atom("tweety"), Term::atom("bird")]);
        let belief = Belief::new(TruthValue::new(0.5, 0.1, 0.5), Budget::full(), 0);
        let resolved = registry.check_answers(&term, &belief);
        assert!(resolved.is_empty());
        assert!(registry.is_pending(id));
    }

    #[test]
    fn sweep_timeouts_expires_past_deadline_questions() {
        let mut registry = QuestionRegistry::new();
        let pattern = Term::atom("moon");
        let id = registry.ask(pattern, AskOptions { min_expectation: 0.6, timeout_ms: 100 }, 0);
        let expired = registry.sweep_timeouts(150);
        assert_eq!(expired, vec![id]);
        assert!(matches!(registry.answer(id), Some(QuestionAnswer::TimedOut)));
    }

    #[test]
    fn sweep_timeouts_leaves_questions_before_deadline_pending() {
        let mut registry = QuestionRegistry::new();
        let pattern = Term::atom("moon");
        let id = registry.ask(pattern, AskOptions { min_expectation: 0.6, timeout_ms: 1000 }, 0);
        let expired = registry.sweep_timeouts(50);
        assert!(expired.is_empty());
        assert!(registry.is_pending(id));
    }

    #[test]
    fn resolve_against_returns_timeout_error_past_deadline_with_no_match() {
        let mut registry = QuestionRegistry::new();
        let store = HypergraphStore::new(8, 64);
        let pattern = Term::atom("moon");
        let id = registry.ask(pattern, AskOptions { min_expectation: 0.6, timeout_ms: 10 }, 0);
        let err = registry.resolve_against(id, &store, 100).unwrap_err();
        assert!(matches!(err, QuestionError::Timeout { .. }));
    }
}
