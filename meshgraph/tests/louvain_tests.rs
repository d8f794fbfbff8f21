// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Louvain indices and driver end to end

#[path = "testutils/mod.rs"]
mod testutils;

use meshgraph::algorithms::modularity_from_partition;
use meshgraph::{
    louvain, louvain_assign, louvain_detailed, modularity, CsrLayout, DirectedLouvainIndex, Graph,
    LouvainIndexOptions, LouvainMoves, LouvainOptions, ModularityOptions, UndirectedLouvainIndex,
};
use std::collections::HashMap;
use testutils::fixtures::{clique_ring, cliques, partitioned};
use testutils::{close_to, init_logging};

fn seeded(seed: u64) -> LouvainOptions {
    LouvainOptions::default().with_seed(seed)
}

/// Put every clique of the ring into the community of its first row
fn gather_cliques_undirected(index: &mut UndirectedLouvainIndex) {
    for base in [0, 4, 8] {
        for i in base + 1..base + 4 {
            index.expensive_move(i, base);
        }
    }
}

#[test]
fn test_unrolled_dendrogram_reproduces_moves() {
    init_logging();
    let graph = clique_ring(Graph::undirected());
    let mut index = UndirectedLouvainIndex::new(&graph, &LouvainIndexOptions::default()).unwrap();

    gather_cliques_undirected(&mut index);
    assert_eq!(index.belongings(), &[0, 0, 0, 0, 4, 4, 4, 4, 8, 8, 8, 8]);
    let before = index.modularity();

    assert_eq!(index.zoom_out(), 3);
    assert_eq!(index.level(), 1);
    assert!(close_to(index.modularity(), before, 1e-12));
    assert!(close_to(before, 0.5238, 1e-3));

    let level_one: Vec<usize> = index.collect_level(1).unwrap().values().copied().collect();
    assert_eq!(level_one, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
    assert_eq!(index.collect(), index.collect_level(1).unwrap());

    let level_zero: Vec<usize> = index.collect_level(0).unwrap().values().copied().collect();
    assert_eq!(level_zero, (0..12).collect::<Vec<_>>());
}

#[test]
fn test_zoom_out_conserves_weight() {
    init_logging();
    let graph = clique_ring(Graph::undirected());
    let mut index = UndirectedLouvainIndex::new(&graph, &LouvainIndexOptions::default()).unwrap();
    let total = index.total_weight();

    gather_cliques_undirected(&mut index);
    index.zoom_out();

    assert_eq!(index.total_weight(), total);
    assert_eq!(index.loops(), &[12.0, 12.0, 12.0]);
    assert_eq!(index.weights(), &[1.0; 6]);
    assert_eq!(index.total_weights(), &[14.0, 14.0, 14.0]);

    let internal: f64 = index.loops().iter().sum::<f64>() + index.weights().iter().sum::<f64>();
    assert_eq!(internal, total * 2.0);

    let projection = index.project();
    assert_eq!(projection.len(), 3);
    assert!(projection.values().all(|neighbors| neighbors.len() == 2));
}

#[test]
fn test_directed_zoom_out() {
    init_logging();
    let graph = clique_ring(Graph::directed());
    let mut index = DirectedLouvainIndex::new(&graph, &LouvainIndexOptions::default()).unwrap();

    for base in [0, 4, 8] {
        for i in base + 1..base + 4 {
            index.expensive_move(i, base);
        }
    }
    let before = index.modularity();

    assert_eq!(index.zoom_out(), 3);
    assert!(close_to(index.modularity(), before, 1e-12));
    assert_eq!(index.loops(), &[12.0, 12.0, 12.0]);
    assert_eq!(index.total_in_weights(), &[13.0, 13.0, 13.0]);
    assert_eq!(index.total_out_weights(), &[13.0, 13.0, 13.0]);

    let partition: HashMap<String, usize> = index.collect().into_iter().collect();
    let expected = modularity_from_partition(&graph, &partition, &ModularityOptions::default()).unwrap();
    assert!(close_to(before, expected, 1e-9));
}

#[test]
fn test_louvain_finds_cliques() {
    init_logging();
    let graph = clique_ring(Graph::undirected());

    for fast_local_moves in [true, false] {
        for random_walk in [true, false] {
            let options = LouvainOptions {
                fast_local_moves,
                random_walk,
                ..seeded(21)
            };
            let communities = louvain(&graph, &options).unwrap();

            for clique in cliques() {
                let first = communities[&clique[0]];
                assert!(clique.iter().all(|node| communities[node] == first));
            }
            assert_ne!(communities["0"], communities["4"]);
            assert_ne!(communities["4"], communities["8"]);
            assert_ne!(communities["0"], communities["8"]);
        }
    }
}

#[test]
fn test_assigned_partition_scores_reported_modularity() {
    init_logging();
    for mut graph in [clique_ring(Graph::undirected()), clique_ring(Graph::directed())] {
        let options = seeded(99);
        let report = louvain_detailed(&graph, &options).unwrap();
        louvain_assign(&mut graph, &options).unwrap();

        let scored = modularity(&graph, &ModularityOptions::default()).unwrap();
        assert!(close_to(report.modularity, scored, 1e-9));
        assert!(report.count >= 1 && report.count <= 12);
    }
}

#[test]
fn test_high_resolution_keeps_singletons() {
    init_logging();
    let graph = clique_ring(Graph::undirected());
    let options = LouvainOptions {
        resolution: 10.0,
        ..seeded(4)
    };

    let report = louvain_detailed(&graph, &options).unwrap();
    assert_eq!(report.count, 12);
    assert_eq!(report.level, 0);
    assert_eq!(report.moves, Some(LouvainMoves::Fast(vec![0])));
    assert_eq!(report.nodes_visited, 12);
    assert_eq!(report.dendrogram, Some(Vec::new()));
}

#[test]
fn test_report_serializes_to_camel_case() {
    init_logging();
    let graph = partitioned(Graph::undirected());
    let report = louvain_detailed(&graph, &seeded(8)).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("deltaComputations").is_some());
    assert!(json.get("nodesVisited").is_some());
    assert_eq!(json["communities"].as_object().unwrap().len(), 6);
    assert!(json["moves"].is_array());
}

#[test]
fn test_weighted_runs_read_weights() {
    init_logging();
    // Two triangles with heavy internal edges and a light bridge
    let mut graph = Graph::undirected();
    for (source, target, weight) in [
        ("a", "b", 10.0),
        ("b", "c", 10.0),
        ("a", "c", 10.0),
        ("x", "y", 10.0),
        ("y", "z", 10.0),
        ("x", "z", 10.0),
        ("c", "x", 0.1),
    ] {
        graph
            .merge_edge(source, target, meshgraph::attrs!("weight" => weight))
            .unwrap();
    }

    let options = LouvainOptions {
        weighted: true,
        ..seeded(5)
    };
    let communities = louvain(&graph, &options).unwrap();
    assert_eq!(communities["a"], communities["c"]);
    assert_eq!(communities["x"], communities["z"]);
    assert_ne!(communities["a"], communities["x"]);

    let index = UndirectedLouvainIndex::new(&graph, &LouvainIndexOptions::default()).unwrap();
    assert!(close_to(index.total_weight(), 60.1, 1e-9));
    let unweighted = UndirectedLouvainIndex::new(&graph, &LouvainIndexOptions::unweighted()).unwrap();
    assert_eq!(unweighted.total_weight(), 7.0);
}
