use criterion::{BatchSize, BenchmarkId, Criterion, SamplingMode, Throughput, criterion_group};
use flowbox_rs::dinic::Dinic;
use flowbox_rs::edmonds_karp::EdmondsKarp;
use flowbox_rs::max_flow::{MaxFlow, SolverOptions};
use flowbox_rs::numerics::NodeID;
use flowbox_rs::push_relabel::PushRelabel;
use flowbox_rs::residual_graph::ResidualGraph;
use rand::RngExt;

/// A width x width grid with unit-ish capacities, source in the top
/// left corner, sink in the bottom right.
fn grid_network(width: i64) -> (ResidualGraph, NodeID, NodeID) {
    let mut rng = rand::rng();
    let mut graph = ResidualGraph::new();
    let id = |row: i64, column: i64| row * width + column;
    for row in 0..width {
        for column in 0..width {
            if column + 1 < width {
                let capacity = rng.random_range(1..=16) as f64;
                graph.add_edge_with_reverse(id(row, column), id(row, column + 1), capacity, 1.);
            }
            if row + 1 < width {
                let capacity = rng.random_range(1..=16) as f64;
                graph.add_edge_with_reverse(id(row, column), id(row + 1, column), capacity, 1.);
            }
        }
    }
    (graph, 0, width * width - 1)
}

fn bench_max_flow(c: &mut Criterion) {
    let _ = env_logger::try_init();
    let mut group = c.benchmark_group("max flow on capacitated grids");
    group.sampling_mode(SamplingMode::Flat);
    for width in [8, 16, 32] {
        let (graph, source, sink) = grid_network(width);
        group.throughput(Throughput::Elements((width * width) as u64));
        let options = SolverOptions::default();

        group.bench_function(BenchmarkId::new("EdmondsKarp", width), |b| {
            b.iter_batched(
                || graph.clone(),
                |mut graph| EdmondsKarp::new().max_flow(&mut graph, source, sink, &options),
                BatchSize::LargeInput,
            )
        });
        group.bench_function(BenchmarkId::new("Dinic", width), |b| {
            b.iter_batched(
                || graph.clone(),
                |mut graph| Dinic::new().max_flow(&mut graph, source, sink, &options),
                BatchSize::LargeInput,
            )
        });
        group.bench_function(BenchmarkId::new("PushRelabel::fifo", width), |b| {
            b.iter_batched(
                || graph.clone(),
                |mut graph| PushRelabel::fifo().max_flow(&mut graph, source, sink, &options),
                BatchSize::LargeInput,
            )
        });
        group.bench_function(BenchmarkId::new("PushRelabel::highest_label", width), |b| {
            b.iter_batched(
                || graph.clone(),
                |mut graph| {
                    PushRelabel::highest_label().max_flow(&mut graph, source, sink, &options)
                },
                BatchSize::LargeInput,
            )
        });
    }
}

criterion_group!(all_max_flow, bench_max_flow);
