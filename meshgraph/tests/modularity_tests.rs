// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Modularity of reference partitions

#[path = "testutils/mod.rs"]
mod testutils;

use meshgraph::algorithms::{dense_modularity_from_partition, directed_modularity_delta};
use meshgraph::{attrs, dense_modularity, modularity, Graph, ModularityOptions};
use std::collections::HashMap;
use testutils::fixtures::{partitioned, weighted_path};
use testutils::{close_to, init_logging};

#[test]
fn test_reference_partition() {
    init_logging();
    let options = ModularityOptions::default();

    let undirected = partitioned(Graph::undirected());
    assert!(close_to(modularity(&undirected, &options).unwrap(), 0.2083, 1e-3));
    assert!(close_to(dense_modularity(&undirected, &options).unwrap(), 0.2083, 1e-3));

    let directed = partitioned(Graph::directed());
    assert!(close_to(modularity(&directed, &options).unwrap(), 0.3265, 1e-3));
    assert!(close_to(dense_modularity(&directed, &options).unwrap(), 0.3265, 1e-3));
}

#[test]
fn test_mixed_typed_graph_with_one_kind_of_edge() {
    init_logging();
    let options = ModularityOptions::default();

    // Directed edges only, stored in a mixed graph
    let graph = partitioned(Graph::new());
    assert!(close_to(modularity(&graph, &options).unwrap(), 0.3265, 1e-3));
}

#[test]
fn test_string_labels_and_resolution() {
    init_logging();
    let mut graph = weighted_path(Graph::undirected());
    let partition: HashMap<String, &str> = [("a", "left"), ("b", "left"), ("c", "right"), ("d", "right")]
        .into_iter()
        .map(|(node, label)| (node.to_string(), label))
        .collect();

    for resolution in [0.25, 1.0, 3.0] {
        let options = ModularityOptions {
            resolution,
            ..ModularityOptions::default()
        };
        let dense = dense_modularity_from_partition(&graph, &partition, &options).unwrap();

        for (node, label) in &partition {
            graph.set_node_attribute(node, "community", *label).unwrap();
        }
        assert!(close_to(modularity(&graph, &options).unwrap(), dense, 1e-9));
    }
}

#[test]
fn test_unweighted_option_ignores_weights() {
    init_logging();
    let mut graph = Graph::undirected();
    graph.merge_edge("a", "b", attrs!("weight" => 50.0)).unwrap();
    graph.merge_edge("c", "d", attrs!("weight" => 1.0)).unwrap();
    graph.merge_edge("b", "c", attrs!("weight" => 1.0)).unwrap();
    for (node, community) in [("a", 0), ("b", 0), ("c", 1), ("d", 1)] {
        graph.set_node_attribute(node, "community", community).unwrap();
    }

    let weighted = modularity(&graph, &ModularityOptions::default()).unwrap();
    let unweighted = modularity(
        &graph,
        &ModularityOptions {
            weighted: false,
            ..ModularityOptions::default()
        },
    )
    .unwrap();

    // Three unit edges: 2 * (1/3 - (3/6)^2)
    assert!(close_to(unweighted, 2.0 * (1.0 / 3.0 - 0.25), 1e-12));
    assert!((weighted - unweighted).abs() > 1e-3);
}

#[test]
fn test_options_from_json() {
    let options: ModularityOptions =
        serde_json::from_str(r#"{"resolution": 2, "communityAttribute": "cluster"}"#).unwrap();

    assert_eq!(options.resolution, 2.0);
    assert_eq!(options.community_attribute, "cluster");
    assert!(options.weighted);
    assert_eq!(options.weight_attribute, "weight");
}

#[test]
fn test_directed_delta_helper() {
    // Moving a node with no links into a community only costs its expected share
    let delta = directed_modularity_delta(10.0, 4.0, 6.0, 2.0, 3.0, 0.0);
    assert!(close_to(delta, -(3.0 * 4.0 + 2.0 * 6.0) / 100.0, 1e-12));
}
