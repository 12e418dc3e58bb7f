//! Benchmarks for the priority queue and the ingest-and-derive step loop.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nar_core::config::Config;
use nar_core::engine::State;
use nar_core::propagation::Event;
use nar_core::queue::PriorityQueue;
use nar_core::term::Term;
use nar_core::truth::{Budget, TruthValue};

fn bench_queue_push_pop(c: &mut Criterion) {
    c.bench_function("queue_push_pop_1k", |bench| {
        bench.iter(|| {
            let mut queue = PriorityQueue::new();
            for i in 0..1000 {
                let term = Term::atom(format!("a{i}"));
                let truth = TruthValue::new(0.9, 0.8, 0.5);
                let priority = (i % 100) as f64 / 100.0;
                let budget = Budget::new(priority, 0.5, 0.5);
                queue.push(Event::new(term, truth, budget));
            }
            while let Some(event) = queue.pop() {
                black_box(event);
            }
        })
    });
}

fn bench_transitive_chain(c: &mut Criterion) {
    c.bench_function("transitive_chain_50_run_200", |bench| {
        bench.iter(|| {
            let mut state = State::new(Config::default());
            for i in 0..50 {
                let stmt = format!("<n{i} --> n{}>. %0.9;0.9%", i + 1);
                state.nal(&stmt, None).unwrap();
            }
            black_box(state.run(200));
        })
    });
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_inheritance_with_truth", |bench| {
        bench.iter(|| black_box(nar_core::parser::parse_statement("<bird --> animal>. %0.9;0.9%")))
    });
}

criterion_group!(benches, bench_queue_push_pop, bench_transitive_chain, bench_parse);
criterion_main!(benches);
