// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Graph store contracts seen through the public API

#[path = "testutils/mod.rs"]
mod testutils;

use meshgraph::{attrs, Graph, GraphEvent, GraphOptions, GraphType, Value};
use std::cell::RefCell;
use std::rc::Rc;
use testutils::init_logging;

#[test]
fn test_drop_node_cascades() {
    init_logging();
    let mut graph = Graph::new();
    graph.merge_directed_edge("a", "b", attrs!()).unwrap();
    graph.merge_directed_edge("c", "a", attrs!()).unwrap();
    graph.merge_undirected_edge("a", "d", attrs!()).unwrap();
    graph.merge_directed_edge("b", "c", attrs!()).unwrap();

    graph.drop_node("a").unwrap();

    assert_eq!(graph.order(), 3);
    assert_eq!(graph.size(), 1);
    assert!(graph.neighbors("b").unwrap().iter().all(|n| *n != "a"));
    assert!(graph.neighbors("d").unwrap().is_empty());
    assert!(!graph.has_node("a"));
    assert!(graph.drop_node("a").unwrap_err().is_not_found());
}

#[test]
fn test_rejected_mutations_leave_graph_intact() {
    init_logging();
    let mut graph = Graph::with_options(GraphOptions::directed().with_self_loops(false));
    graph.add_node("a", attrs!()).unwrap();
    graph.add_node("b", attrs!()).unwrap();
    graph.add_edge("a", "b", attrs!()).unwrap();

    assert!(graph.add_node("a", attrs!()).unwrap_err().is_usage());
    assert!(graph.add_edge("a", "b", attrs!()).unwrap_err().is_usage());
    assert!(graph.add_edge("a", "a", attrs!()).unwrap_err().is_usage());
    assert!(graph.add_undirected_edge("a", "b", attrs!()).unwrap_err().is_usage());
    assert!(graph.add_edge("a", "missing", attrs!()).unwrap_err().is_not_found());

    assert_eq!(graph.order(), 2);
    assert_eq!(graph.size(), 1);
    assert!(!graph.has_node("missing"));
}

#[test]
fn test_multi_drop_removes_one_parallel_edge() {
    init_logging();
    let mut graph = Graph::multi_directed();
    for _ in 0..3 {
        graph.merge_edge("a", "b", attrs!()).unwrap();
    }
    assert_eq!(graph.size(), 3);

    graph.drop_edge_between("a", "b").unwrap();
    assert_eq!(graph.size(), 2);
    assert_eq!(graph.edges_between("a", "b").unwrap().len(), 2);
    assert_eq!(graph.out_degree("a").unwrap(), 2);
}

#[test]
fn test_attribute_access() {
    init_logging();
    let mut graph = Graph::undirected();
    graph.add_node("a", attrs!("age" => 30)).unwrap();

    assert_eq!(graph.get_node_attribute("a", "missing").unwrap(), None);
    assert!(graph.get_node_attribute("ghost", "age").unwrap_err().is_not_found());

    let next = graph
        .update_node_attribute("a", "age", |age| {
            Value::from(age.and_then(Value::as_number).unwrap_or(0.0) + 1.0)
        })
        .unwrap();
    assert_eq!(next, Value::from(31));

    graph.merge_node("a", attrs!("name" => "Ada"));
    let attributes = graph.get_node_attributes("a").unwrap();
    assert_eq!(attributes.len(), 2);
    assert_eq!(attributes.get("name"), Some(&Value::from("Ada")));
}

#[test]
fn test_observers_see_mutations() {
    init_logging();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);

    let mut graph = Graph::directed();
    let subscription = graph.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    graph.add_node("a", attrs!()).unwrap();
    graph.set_node_attribute("a", "x", 1).unwrap();
    graph.drop_node("a").unwrap();

    assert!(graph.unsubscribe(subscription));
    graph.add_node("b", attrs!()).unwrap();

    let events = events.borrow();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], GraphEvent::NodeAdded { key: "a".to_string() });
    assert!(matches!(events[1], GraphEvent::NodeAttributesUpdated { .. }));
    assert_eq!(events[2], GraphEvent::NodeDropped { key: "a".to_string() });
}

#[test]
fn test_one_way_upgrades() {
    init_logging();
    let mut graph = Graph::directed();
    graph.merge_edge("a", "b", attrs!()).unwrap();

    graph.upgrade_to_mixed();
    graph.upgrade_to_multi();
    graph.merge_undirected_edge("a", "b", attrs!()).unwrap();
    graph.add_directed_edge("a", "b", attrs!()).unwrap();

    assert_eq!(graph.graph_type(), GraphType::Mixed);
    assert!(graph.is_multi());
    assert_eq!(graph.directed_size(), 2);
    assert_eq!(graph.undirected_size(), 1);
}

#[test]
fn test_options_from_json() {
    let options = GraphOptions::from_json(r#"{"type": "undirected", "multi": true}"#).unwrap();
    assert_eq!(options.graph_type, GraphType::Undirected);
    assert!(options.multi);
    assert!(options.allow_self_loops);

    assert!(GraphOptions::from_json(r#"{"type": "hypergraph"}"#)
        .unwrap_err()
        .is_invalid_argument());
}
