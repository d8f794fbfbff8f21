// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Fixture graphs

use meshgraph::{attrs, Graph, GraphType};

/// `(node, community)` pairs of the reference partition
pub const PARTITION: [(&str, i64); 6] = [("1", 1), ("2", 2), ("3", 2), ("4", 2), ("5", 1), ("6", 2)];

pub const PARTITION_EDGES: [(&str, &str); 7] = [
    ("1", "2"),
    ("1", "5"),
    ("2", "3"),
    ("3", "4"),
    ("4", "2"),
    ("5", "1"),
    ("6", "3"),
];

/// Reference partition stored on the `community` attribute. On undirected
/// graphs `5 - 1` merges into `1 - 5`.
pub fn partitioned(mut graph: Graph) -> Graph {
    for (node, community) in PARTITION {
        graph
            .add_node(node, attrs!("community" => community))
            .expect("fixture node");
    }
    for (source, target) in PARTITION_EDGES {
        graph.merge_edge(source, target, attrs!()).expect("fixture edge");
    }
    graph
}

/// Three 4-cliques `0..4`, `4..8` and `8..12` linked in a ring by the
/// bridges `3 - 4`, `7 - 8` and `11 - 0`. Directed graphs get both
/// directions inside cliques and one direction on bridges.
pub fn clique_ring(mut graph: Graph) -> Graph {
    for clique in 0..3 {
        let base = clique * 4;
        for a in base..base + 4 {
            for b in a + 1..base + 4 {
                let (a, b) = (a.to_string(), b.to_string());
                graph.merge_edge(&a, &b, attrs!()).expect("clique edge");
                if graph.graph_type() == GraphType::Directed {
                    graph.merge_edge(&b, &a, attrs!()).expect("clique edge");
                }
            }
        }
    }
    for (source, target) in [("3", "4"), ("7", "8"), ("11", "0")] {
        graph.merge_edge(source, target, attrs!()).expect("bridge");
    }
    graph
}

/// Members of each clique of [`clique_ring`]
pub fn cliques() -> Vec<Vec<String>> {
    (0..3)
        .map(|clique| (clique * 4..clique * 4 + 4).map(|n| n.to_string()).collect())
        .collect()
}

/// Weighted path `a - b - c - d` plus a heavy self-loop on `a`
pub fn weighted_path(mut graph: Graph) -> Graph {
    for (source, target, weight) in [("a", "b", 3.0), ("b", "c", 1.0), ("c", "d", 4.0), ("a", "a", 2.0)] {
        graph
            .merge_edge(source, target, attrs!("weight" => weight))
            .expect("weighted edge");
    }
    graph
}
