use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group};
use flowbox_rs::control::RunControl;
use flowbox_rs::dijkstra::{Dijkstra, bellman_ford};
use flowbox_rs::numerics::DEFAULT_EPSILON;
use flowbox_rs::residual_graph::ResidualGraph;
use rand::RngExt;

fn random_network(nodes: i64, arcs_per_node: usize) -> ResidualGraph {
    let mut rng = rand::rng();
    let mut graph = ResidualGraph::new();
    for from in 0..nodes {
        for _ in 0..arcs_per_node {
            let to = rng.random_range(0..nodes);
            if to == from {
                continue;
            }
            let cost = rng.random_range(1..=100) as f64;
            graph.add_edge_with_reverse(from, to, 10., cost);
        }
    }
    graph
}

fn bench_searches(c: &mut Criterion) {
    let mut group = c.benchmark_group("shortest paths on random networks");
    for nodes in [100, 1_000] {
        let graph = random_network(nodes, 8);
        group.throughput(Throughput::Elements(nodes as u64));

        group.bench_function(BenchmarkId::new("Dijkstra::run", nodes), |b| {
            b.iter_batched(
                || graph.clone(),
                |graph| {
                    Dijkstra::new().run(&graph, 0, DEFAULT_EPSILON, &mut RunControl::unbounded())
                },
                BatchSize::LargeInput,
            )
        });
        group.bench_function(BenchmarkId::new("bellman_ford", nodes), |b| {
            b.iter_batched(
                || graph.clone(),
                |graph| bellman_ford(&graph, 0, DEFAULT_EPSILON, &mut RunControl::unbounded()),
                BatchSize::LargeInput,
            )
        });
    }
}

criterion_group!(all_shortest_path, bench_searches);
