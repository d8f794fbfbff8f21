// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Edge iteration, graph-wide and per node

use crate::storage::graph_store::Graph;
use crate::storage::iteration::neighbors::Shape;
use crate::storage::types::{EdgeEntry, EdgeId, NodeId, Result};

impl Graph {
    /// Edge keys in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &str> + '_ {
        self.edge_index.keys().map(String::as_str)
    }

    pub fn directed_edges(&self) -> impl Iterator<Item = &str> + '_ {
        self.edge_entries()
            .filter(|entry| !entry.undirected)
            .map(|entry| entry.key)
    }

    pub fn undirected_edges(&self) -> impl Iterator<Item = &str> + '_ {
        self.edge_entries()
            .filter(|entry| entry.undirected)
            .map(|entry| entry.key)
    }

    /// Every edge with its endpoints, in insertion order
    pub fn edge_entries(&self) -> impl Iterator<Item = EdgeEntry<'_>> + '_ {
        self.edge_index.values().map(move |id| self.edge_entry(*id))
    }

    pub fn for_each_edge<F>(&self, mut callback: F)
    where
        F: FnMut(EdgeEntry<'_>),
    {
        for entry in self.edge_entries() {
            callback(entry);
        }
    }

    /// Breakable edge iteration. Returns true if the callback stopped it.
    pub fn for_each_edge_until<F>(&self, mut callback: F) -> bool
    where
        F: FnMut(EdgeEntry<'_>) -> bool,
    {
        self.edge_entries().any(|entry| callback(entry))
    }

    /// Edges attached to `id` for a shape. A directed self-loop read through
    /// both the inbound and the outbound map is listed once.
    pub(crate) fn edge_ids_of(&self, shape: Shape, id: NodeId) -> Vec<EdgeId> {
        let (inbound, outbound, _) = shape.sources();
        let skip_outbound_loop = inbound && outbound;
        let maps = self.source_maps(shape, id);

        let mut edges = Vec::new();
        for (position, map) in maps.iter().enumerate() {
            // Maps are ordered inbound, outbound, undirected
            let is_outbound = skip_outbound_loop && position == 1;

            for (neighbor, bucket) in map.iter() {
                if is_outbound && *neighbor == id {
                    continue;
                }
                edges.extend(bucket.iter().copied());
            }
        }
        edges
    }

    /// Keys of the edges attached to `node` for a shape
    pub fn edges_of(&self, shape: Shape, node: &str) -> Result<Vec<&str>> {
        let id = self.require_node(&format!("{}_edges", shape), node)?;
        Ok(self
            .edge_ids_of(shape, id)
            .into_iter()
            .map(|edge| self.edge_record(edge).key.as_str())
            .collect())
    }

    pub fn for_each_edge_of<F>(&self, shape: Shape, node: &str, mut callback: F) -> Result<()>
    where
        F: FnMut(EdgeEntry<'_>),
    {
        let id = self.require_node(&format!("for_each_{}_edge", shape), node)?;
        for edge in self.edge_ids_of(shape, id) {
            callback(self.edge_entry(edge));
        }
        Ok(())
    }

    /// Every edge going from `source` to `target`: directed ones first,
    /// then undirected ones
    pub fn edges_between(&self, source: &str, target: &str) -> Result<Vec<&str>> {
        let s = self.require_node("edges_between", source)?;
        let t = self.require_node("edges_between", target)?;

        let record = self.node_record(s);
        let keys = record
            .outbound
            .get(&t)
            .into_iter()
            .chain(record.undirected.get(&t))
            .flatten()
            .map(|edge| self.edge_record(*edge).key.as_str())
            .collect();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    fn sample() -> Graph {
        let mut graph = Graph::multi();
        for key in ["a", "b", "c"] {
            graph.add_node(key, attrs!()).unwrap();
        }
        graph.add_directed_edge_with_key("ab", "a", "b", attrs!()).unwrap();
        graph.add_directed_edge_with_key("ab2", "a", "b", attrs!()).unwrap();
        graph.add_undirected_edge_with_key("bc", "b", "c", attrs!()).unwrap();
        graph.add_directed_edge_with_key("aa", "a", "a", attrs!()).unwrap();
        graph.add_directed_edge_with_key("ca", "c", "a", attrs!()).unwrap();
        graph
    }

    #[test]
    fn test_graph_wide_edges() {
        let graph = sample();
        assert_eq!(
            graph.edges().collect::<Vec<_>>(),
            vec!["ab", "ab2", "bc", "aa", "ca"]
        );
        assert_eq!(graph.undirected_edges().collect::<Vec<_>>(), vec!["bc"]);
        assert_eq!(graph.directed_edges().count(), 4);
    }

    #[test]
    fn test_edges_of_lists_self_loop_once() {
        let graph = sample();
        assert_eq!(
            graph.edges_of(Shape::Mixed, "a").unwrap(),
            vec!["aa", "ca", "ab", "ab2"]
        );
        assert_eq!(graph.edges_of(Shape::Out, "a").unwrap(), vec!["ab", "ab2", "aa"]);
        assert_eq!(graph.edges_of(Shape::Inbound, "b").unwrap(), vec!["ab", "ab2", "bc"]);
    }

    #[test]
    fn test_edges_between() {
        let graph = sample();
        assert_eq!(graph.edges_between("a", "b").unwrap(), vec!["ab", "ab2"]);
        assert!(graph.edges_between("b", "a").unwrap().is_empty());
        assert_eq!(graph.edges_between("c", "b").unwrap(), vec!["bc"]);
    }

    #[test]
    fn test_for_each_edge_until() {
        let graph = sample();
        let mut seen = 0;
        let stopped = graph.for_each_edge_until(|entry| {
            seen += 1;
            entry.is_self_loop()
        });
        assert!(stopped);
        assert_eq!(seen, 4);
    }
}
