// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Neighbor and edge iteration across graph types

#[path = "testutils/mod.rs"]
mod testutils;

use meshgraph::{attrs, Graph, Shape};
use testutils::init_logging;

fn mixed_multi() -> Graph {
    let mut graph = Graph::multi();
    for key in ["a", "b", "c", "d"] {
        graph.add_node(key, attrs!()).unwrap();
    }
    graph.add_directed_edge("a", "b", attrs!()).unwrap();
    graph.add_undirected_edge("a", "b", attrs!()).unwrap();
    graph.add_directed_edge("b", "a", attrs!()).unwrap();
    graph.add_directed_edge("c", "a", attrs!()).unwrap();
    graph.add_undirected_edge("d", "a", attrs!()).unwrap();
    graph
}

#[test]
fn test_mixed_neighbors_are_deduplicated() {
    init_logging();
    let graph = mixed_multi();

    let neighbors = graph.neighbors("a").unwrap();
    assert_eq!(neighbors.iter().filter(|n| **n == "b").count(), 1);

    // in, then out, then undirected
    assert_eq!(neighbors, vec!["b", "c", "d"]);
    assert_eq!(graph.outbound_neighbors("a").unwrap(), vec!["b", "d"]);
    assert_eq!(graph.inbound_neighbors("a").unwrap(), vec!["b", "c", "d"]);
    assert_eq!(graph.directed_neighbors("a").unwrap(), vec!["b", "c"]);
    assert_eq!(graph.undirected_neighbors("a").unwrap(), vec!["b", "d"]);
}

#[test]
fn test_every_shape_agrees_across_forms() {
    init_logging();
    let graph = mixed_multi();

    for shape in Shape::ALL {
        for node in ["a", "b", "c", "d"] {
            let listed = graph.neighbors_of(shape, node).unwrap();

            let mut visited = Vec::new();
            graph
                .for_each_neighbor(shape, node, |key, _| visited.push(key.to_string()))
                .unwrap();
            assert_eq!(visited, listed);

            let iterated: Vec<&str> = graph
                .neighbor_entries(shape, node)
                .unwrap()
                .map(|(key, _)| key)
                .collect();
            assert_eq!(iterated, listed);

            for candidate in ["a", "b", "c", "d", "ghost"] {
                assert_eq!(
                    graph.are_neighbors(shape, node, candidate).unwrap(),
                    listed.contains(&candidate),
                    "{} {} {}",
                    shape,
                    node,
                    candidate
                );
            }
        }
    }
}

#[test]
fn test_breakable_iteration_stops() {
    init_logging();
    let graph = mixed_multi();

    let mut seen = 0;
    let stopped = graph
        .for_each_neighbor_until(Shape::Mixed, "a", |_, _| {
            seen += 1;
            seen == 2
        })
        .unwrap();

    assert!(stopped);
    assert_eq!(seen, 2);
}

#[test]
fn test_entries_iterator_rewinds() {
    init_logging();
    let graph = mixed_multi();

    let mut entries = graph.neighbor_entries(Shape::Mixed, "a").unwrap();
    let first: Vec<&str> = entries.by_ref().map(|(key, _)| key).collect();
    assert!(entries.next().is_none());

    entries.rewind();
    let second: Vec<&str> = entries.map(|(key, _)| key).collect();
    assert_eq!(first, second);
}

#[test]
fn test_incompatible_shapes_are_empty() {
    init_logging();
    let mut undirected = Graph::undirected();
    undirected.merge_edge("a", "b", attrs!()).unwrap();

    assert!(undirected.directed_neighbors("a").unwrap().is_empty());
    assert!(undirected.out_neighbors("a").unwrap().is_empty());
    assert_eq!(undirected.neighbors("a").unwrap(), vec!["b"]);
    assert!(undirected.neighbors("ghost").unwrap_err().is_not_found());
}

#[test]
fn test_edges_of_node() {
    init_logging();
    let graph = mixed_multi();

    assert_eq!(graph.edges_of(Shape::Mixed, "a").unwrap().len(), 5);
    assert_eq!(graph.edges_of(Shape::Out, "a").unwrap().len(), 1);
    assert_eq!(graph.edges_of(Shape::Undirected, "a").unwrap().len(), 2);
    assert_eq!(graph.directed_edges().count(), 3);
    assert_eq!(graph.undirected_edges().count(), 2);
}
