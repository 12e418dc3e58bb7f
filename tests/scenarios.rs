//! End-to-end scenarios driven entirely through the public [`State`] API,
//! matching the canonical walkthroughs from the reasoning core's operating
//! notes: transitive closure, belief revision under contradiction, question
//! timeouts and direct answers, the low-budget enqueue guard, and Allen
//! temporal composition.

use nar_core::clock::FrozenClock;
use nar_core::config::{Config, DerivationMode};
use nar_core::contradiction::{self, Strategy};
use nar_core::engine::State;
use nar_core::error::{NarError, QuestionError};
use nar_core::hypergraph::HypergraphStore;
use nar_core::question::{AskOptions, QuestionAnswer};
use nar_core::term::{EdgeId, Term, TermType};
use nar_core::truth::{Budget, TruthValue};

fn frozen_state(config: Config) -> State {
    State::with_clock(config, Box::new(FrozenClock::at(0)))
}

/// S1 — transitive inheritance: `<a-->b>`, `<b-->c>`, run, and `<a-->c>`
/// should emerge with enough confidence and expectation to be usable.
///
/// Uses `DerivationMode::Simple` so the only rule whose condition accepts
/// an `Inheritance` event is `transitive_inheritance` itself — the
/// stochastic draw has exactly one candidate, making the derivation
/// deterministic rather than a coin flip across the full rule table.
#[test]
fn s1_transitive_inheritance_closes_the_chain() {
    let config = Config {
        derivation_mode: DerivationMode::Simple,
        ..Config::default()
    };
    let mut state = frozen_state(config);
    state.nal("(a --> b). %0.9;0.9%", None).unwrap();
    state.nal("(b --> c). %0.9;0.9%", None).unwrap();
    state.run(20);

    let belief = state
        .query_belief("(a --> c).")
        .unwrap()
        .expect("transitive closure should have been derived");
    assert!(belief.truth.confidence > 0.3, "confidence was {}", belief.truth.confidence);
    assert!(belief.truth.expectation() > 0.5, "expectation was {}", belief.truth.expectation());
}

/// S2 — belief revision lowering expectation. Two independently-grounded
/// beliefs land on the same edge (distinguished by `premises`, the way
/// real rule-derived beliefs are — not two `nal()` calls on the same text,
/// which always revise in place rather than coexist); resolving the
/// contradiction by merging must strictly lower the expectation below the
/// confident root belief's own.
///
/// This exercises the contradiction/resolution machinery directly against
/// a hand-built [`HypergraphStore`] rather than waiting on the engine's
/// stochastic rule draw to happen to produce the second belief — the
/// draw's *existence* is already covered by S1 and S6, and a resolution
/// test should not also depend on it landing a specific way.
#[test]
fn s2_merge_resolution_lowers_expectation_below_the_confident_root() {
    let config = Config::default();
    let mut store = HypergraphStore::new(8, 64);
    let term = Term::compound(TermType::Inheritance, vec![Term::atom("tweety"), Term::atom("flyer")]);

    let (edge_id, root) = store.add_full(
        term.clone(),
        TruthValue::new(0.8, 0.7, 0.8),
        Budget::full(),
        0,
        None,
        Vec::new(),
        None,
    );
    let e0 = root.truth.expectation();

    store.add_full(
        term,
        TruthValue::new(0.05, 0.75, 0.8),
        Budget::full(),
        1,
        None,
        vec![EdgeId::new("witness-edge")],
        Some("induction_shared_subject".to_string()),
    );

    let edge = store.get(&edge_id).unwrap();
    assert_eq!(edge.beliefs.len(), 2, "two independently-grounded beliefs should coexist");
    let found = contradiction::check_edge(edge, &config)
        .expect("frequency gap and confidence should register as a contradiction");

    let mut breaker = contradiction::CircuitBreaker::default();
    let observers = nar_core::observer::ObserverSet::new();
    let resolved = contradiction::resolve_strategy(
        &mut store,
        &found,
        Strategy::Merge,
        &mut breaker,
        &config,
        &observers,
        0,
        &std::collections::HashMap::new(),
    )
    .unwrap();
    assert_eq!(resolved, Strategy::Merge);

    let after = store.get(&edge_id).unwrap();
    assert_eq!(after.beliefs.len(), 1, "merge replaces the array with one reconciled belief");
    let new_expectation = after.beliefs[0].truth.expectation();
    assert!(
        new_expectation < e0,
        "expected revised expectation {new_expectation} to be strictly below the root's {e0}"
    );
}

/// S3 — a question with no matching belief times out, reporting the
/// timeout the caller actually requested rather than a hardcoded value.
#[test]
fn s3_question_times_out_reporting_the_requested_deadline() {
    let mut state = frozen_state(Config::default());
    let opts = AskOptions { min_expectation: 0.6, timeout_ms: 100 };
    let err = state.ask("(moon --> cheese)?", Some(opts)).unwrap_err();
    match err {
        NarError::Question(QuestionError::Timeout { text, timeout_ms }) => {
            assert_eq!(text, "(moon --> cheese)?");
            assert_eq!(timeout_ms, 100);
        }
        other => panic!("expected a question timeout, got {other:?}"),
    }
}

/// S4 — a question answers immediately once a confident matching belief
/// is already present.
#[test]
fn s4_question_answers_directly_from_an_existing_belief() {
    let mut state = frozen_state(Config::default());
    state.nal("(sky --> blue). %1.0;0.9%", None).unwrap();
    let opts = AskOptions { min_expectation: 0.8, timeout_ms: 3000 };
    let answer = state.ask("(sky --> blue)?", Some(opts)).unwrap();
    match answer {
        QuestionAnswer::Answered { term, truth } => {
            assert_eq!(term.canonical(), "Inheritance(sky,blue)");
            assert_eq!(truth.frequency, 1.0);
            assert_eq!(truth.confidence, 0.9);
        }
        QuestionAnswer::TimedOut => panic!("expected an immediate answer"),
    }
}

/// S5 — an event whose budget never clears `budgetThreshold` never reaches
/// the scheduler. The queue itself isn't part of the public surface, so
/// this is observed indirectly: `run()` always exits after its very first
/// step when the queue is empty, and asserting a below-threshold belief
/// must leave it exactly as empty as it started — if the event had been
/// admitted, `run()` would have at least one more step's worth of work to
/// do processing it.
#[test]
fn s5_low_budget_event_never_reaches_the_queue() {
    let mut state = frozen_state(Config::default());
    assert_eq!(state.run(5), 1, "an empty queue always exits after one step");

    let id = state.nal("(ghost --> rumor). #0.01#", None).unwrap();
    assert_eq!(state.get_beliefs(&id).len(), 1, "the belief itself is still asserted");
    assert_eq!(
        state.run(5),
        1,
        "a below-threshold event must not have been enqueued for propagation"
    );
}

/// S6 — Allen transitivity: two `before` relations compose into a third.
/// Requires `DerivationMode::Advanced` (the only mode that registers
/// `temporal_composition`); since no other rule's condition accepts a
/// `TemporalRelation` event, the stochastic draw still has exactly one
/// candidate and the derivation is deterministic.
#[test]
fn s6_allen_composition_derives_transitive_before() {
    let mut state = frozen_state(Config::default());
    state.nal("TemporalRelation(A,B,before). %0.9;0.9%", None).unwrap();
    state.nal("TemporalRelation(B,C,before). %0.9;0.9%", None).unwrap();
    state.run(20);

    let belief = state
        .query_belief("TemporalRelation(A,C,before).")
        .unwrap()
        .expect("Allen composition should have derived A before C");
    assert!(belief.truth.confidence > 0.0, "confidence was {}", belief.truth.confidence);
}
