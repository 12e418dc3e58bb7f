//! nar: command-line front end for the non-axiomatic reasoning core.
//!
//! Operates on a session file (bincode-encoded, spec §6 persisted shape):
//! each invocation loads the session if present, applies the requested
//! command, runs the scheduler for any steps that unlocks, and writes the
//! session back out. A fresh session is created on first use.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};

use nar_core::config::Config;
use nar_core::engine::{ExplainOptions, NalOptions, QueryOptions, State};
use nar_core::question::AskOptions;
use nar_core::term::EdgeId;

#[derive(Parser)]
#[command(name = "nar", version, about = "Non-axiomatic reasoning core CLI")]
struct Cli {
    /// Session file holding the persisted hypergraph (bincode).
    #[arg(long, global = true, default_value = "nar.session")]
    session: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discard any existing session and start from an empty hypergraph.
    Init,

    /// Assert a NAL statement (e.g. `<a --> b>. %0.9;0.9%`).
    Nal {
        text: String,
        /// Provenance tag recorded on the belief, consulted by contradiction resolution.
        #[arg(long)]
        source: Option<String>,
    },

    /// Ask a question and wait (within the step budget) for a matching belief.
    Ask {
        text: String,
        #[arg(long, default_value = "3000")]
        timeout_ms: u64,
        #[arg(long, default_value = "0.6")]
        min_expectation: f64,
    },

    /// Pattern-match the hypergraph and list bindings with their expectation.
    Query {
        pattern: String,
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, default_value = "0.0")]
        min_expectation: f64,
    },

    /// Print the belief list currently held on an edge.
    Beliefs { edge_id: String },

    /// List edges with an unresolved contradiction.
    Contradictions,

    /// Show the competing beliefs and candidate strategies for a contradiction.
    Analyze { edge_id: String },

    /// Resolve a contradiction, optionally naming the strategy explicitly.
    Resolve {
        edge_id: String,
        #[arg(long)]
        strategy: Option<String>,
    },

    /// Explain how an edge's current belief was derived.
    Explain {
        edge_id: String,
        #[arg(long, default_value = "detailed")]
        format: String,
        #[arg(long, default_value = "evidential")]
        perspective: String,
        #[arg(long, default_value = "5")]
        depth: usize,
    },

    /// Run the scheduler for up to `steps` events.
    Run {
        #[arg(default_value = "20")]
        steps: u64,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if matches!(cli.command, Commands::Init) {
        if cli.session.exists() {
            fs::remove_file(&cli.session).into_diagnostic()?;
        }
        let state = State::new(Config::default());
        save(&cli.session, &state)?;
        println!("initialized empty session at {}", cli.session.display());
        return Ok(());
    }

    let mut state = load(&cli.session)?;

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Nal { text, source } => {
            let opts = NalOptions { source };
            let edge_id = state.nal(&text, Some(opts))?;
            println!("{edge_id}");
        }
        Commands::Ask {
            text,
            timeout_ms,
            min_expectation,
        } => {
            let opts = AskOptions {
                timeout_ms,
                min_expectation,
            };
            match state.ask(&text, Some(opts))? {
                nar_core::question::QuestionAnswer::Answered { term, truth } => {
                    println!("{term} %{:.3};{:.3}%", truth.frequency, truth.confidence);
                }
                nar_core::question::QuestionAnswer::TimedOut => {
                    println!("(no answer within {timeout_ms} ms)");
                }
            }
        }
        Commands::Query {
            pattern,
            limit,
            min_expectation,
        } => {
            let opts = QueryOptions {
                limit,
                min_expectation,
            };
            let matches = state.query(&pattern, Some(opts))?;
            if matches.is_empty() {
                println!("(no matches)");
            }
            for m in matches {
                let bindings: Vec<String> = m
                    .bindings
                    .iter()
                    .map(|(var, term)| format!("{var}={term}"))
                    .collect();
                println!("{:.3}  {}", m.expectation, bindings.join(", "));
            }
        }
        Commands::Beliefs { edge_id } => {
            let edge_id = EdgeId::new(edge_id);
            for belief in state.get_beliefs(&edge_id) {
                println!(
                    "%{:.3};{:.3}% priority={:.3} derivedBy={}",
                    belief.truth.frequency,
                    belief.truth.confidence,
                    belief.budget.priority,
                    belief.derived_by.as_deref().unwrap_or("<input>"),
                );
            }
        }
        Commands::Contradictions => {
            for c in state.get_contradictions() {
                println!("{} severity={:.3}", c.edge_id, c.severity);
            }
        }
        Commands::Analyze { edge_id } => {
            let edge_id = EdgeId::new(edge_id);
            let analysis = state.analyze_contradiction(&edge_id)?;
            println!(
                "{} severity={:.3}\n  a: %{:.3};{:.3}%\n  b: %{:.3};{:.3}%\n  candidates: {}",
                analysis.edge_id,
                analysis.severity,
                analysis.belief_a.truth.frequency,
                analysis.belief_a.truth.confidence,
                analysis.belief_b.truth.frequency,
                analysis.belief_b.truth.confidence,
                analysis
                    .candidate_strategies
                    .iter()
                    .map(|s| s.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        Commands::Resolve { edge_id, strategy } => {
            let edge_id = EdgeId::new(edge_id);
            let resolution = state.resolve_contradiction(&edge_id, strategy.as_deref())?;
            println!("{} resolved via {}", resolution.edge_id, resolution.strategy.name());
        }
        Commands::Explain {
            edge_id,
            format,
            perspective,
            depth,
        } => {
            let edge_id = EdgeId::new(edge_id);
            let format = nar_core::engine::ExplainFormat::parse(&format)
                .ok_or_else(|| miette!("unknown explain format: {format}"))?;
            let perspective = nar_core::engine::ExplainPerspective::parse(&perspective)
                .ok_or_else(|| miette!("unknown explain perspective: {perspective}"))?;
            let text = state.explain(
                &edge_id,
                Some(ExplainOptions {
                    format,
                    perspective,
                    depth,
                }),
            )?;
            println!("{text}");
        }
        Commands::Run { steps } => {
            let ran = state.run(steps);
            println!("ran {ran}/{steps} steps, now at step {}", state.current_step());
        }
    }

    save(&cli.session, &state)?;
    Ok(())
}

fn load(path: &PathBuf) -> Result<State> {
    if !path.exists() {
        return Ok(State::new(Config::default()));
    }
    let bytes = fs::read(path).into_diagnostic()?;
    let mut state = State::new(Config::default());
    state.load_state(&bytes)?;
    Ok(state)
}

fn save(path: &PathBuf, state: &State) -> Result<()> {
    let bytes = state.save_state()?;
    fs::write(path, bytes).into_diagnostic()?;
    Ok(())
}
