// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # nar-core
//!
//! A non-axiomatic reasoning core: a hypergraph of uncertain beliefs, a
//! priority-driven scheduler, and a rule-mediated derivation engine that
//! keeps deriving, revising, and retiring beliefs under the assumption of
//! insufficient knowledge and resources (AIKR).
//!
//! ## Architecture
//!
//! - **Terms and truth** (`term`, `truth`): canonical statement identity and
//!   the frequency/confidence/priority truth and budget values attached to
//!   every belief.
//! - **Parsing** (`parser`): Narsese-style statement syntax — judgments,
//!   questions, and truth/priority annotations.
//! - **Hypergraph** (`hypergraph`): the belief store, indexed by edge id,
//!   argument, and structural shape, backed by a derivation cache (`lru`)
//!   and prefix trie (`trie`).
//! - **Scheduling** (`queue`, `propagation`): the priority-ordered event
//!   queue and the path-guarded propagation events it carries.
//! - **Inference** (`infer`): NAL deduction, induction, abduction, analogy,
//!   revision, and Allen interval composition (`infer::allen`), dispatched
//!   through a stochastically-weighted rule registry.
//! - **Contradiction handling** (`contradiction`): detection and a
//!   fixed-priority strategy resolver with a circuit breaker.
//! - **Questions** (`question`): pattern-matched answers with deadlines.
//! - **Memory, executive, learning** (`memory`, `executive`, `learning`):
//!   budget decay and pruning, adaptive threshold tuning, and rule
//!   reinforcement / shortcut synthesis.
//! - **Engine facade** (`engine`): [`engine::State`] ties every subsystem
//!   together behind the step loop and public API.
//!
//! ## Library usage
//!
//! ```no_run
//! use nar_core::config::Config;
//! use nar_core::engine::State;
//!
//! let mut state = State::new(Config::default());
//! let tweety = state.nal("(tweety --> bird). %0.9;0.9%", None).unwrap();
//! state.run(10);
//! let belief = state.get_beliefs(&tweety);
//! ```

pub mod clock;
pub mod config;
pub mod contradiction;
pub mod engine;
pub mod error;
pub mod executive;
pub mod hypergraph;
pub mod infer;
pub mod learning;
pub mod lru;
pub mod memory;
pub mod observer;
pub mod parser;
pub mod propagation;
pub mod question;
pub mod queue;
pub mod term;
pub mod trie;
pub mod truth;

pub use config::Config;
pub use engine::State;
pub use error::{NarError, NarResult};
pub use term::{EdgeId, Term, TermType};
pub use truth::{Budget, TruthValue};
