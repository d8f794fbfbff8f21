// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory graph store
//!
//! Nodes and edges live in slot arenas addressed by integer handles. Each
//! node keeps three adjacency maps (`inbound`, `outbound`, `undirected`)
//! keyed by neighbor handle, each entry holding the edge(s) reaching that
//! neighbor. Undirected edges are stored symmetrically: the same edge is
//! reachable from both endpoints' `undirected` map.
//!
//! External keys are strings. `node_index` / `edge_index` map them to
//! handles and preserve insertion order, which is the enumeration order of
//! every bulk read.

use crate::storage::arena::Arena;
use crate::storage::attributes::Attributes;
use crate::storage::config::GraphOptions;
use crate::storage::events::{GraphEvent, Observers, Subscription};
use crate::storage::types::{
    AdjacencyMap, EdgeId, EdgeRecord, GraphError, GraphType, NodeId, NodeRecord, Result,
};
use indexmap::IndexMap;
use std::fmt;

/// Which degree to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegreeKind {
    In,
    Out,
    Directed,
    Undirected,
    All,
}

/// In-memory graph with attribute-bearing nodes and edges
pub struct Graph {
    pub(crate) options: GraphOptions,
    pub(crate) attributes: Attributes,
    pub(crate) nodes: Arena<NodeRecord>,
    pub(crate) edges: Arena<EdgeRecord>,
    pub(crate) node_index: IndexMap<String, NodeId>,
    pub(crate) edge_index: IndexMap<String, EdgeId>,
    pub(crate) directed_size: usize,
    pub(crate) undirected_size: usize,
    pub(crate) directed_self_loops: usize,
    pub(crate) undirected_self_loops: usize,
    pub(crate) observers: Observers,
}

impl Graph {
    /// Create an empty mixed, simple graph allowing self-loops
    pub fn new() -> Self {
        Self::with_options(GraphOptions::default())
    }

    /// Create an empty graph with the given options
    pub fn with_options(options: GraphOptions) -> Self {
        Self {
            options,
            attributes: Attributes::new(),
            nodes: Arena::new(),
            edges: Arena::new(),
            node_index: IndexMap::new(),
            edge_index: IndexMap::new(),
            directed_size: 0,
            undirected_size: 0,
            directed_self_loops: 0,
            undirected_self_loops: 0,
            observers: Observers::default(),
        }
    }

    pub fn directed() -> Self {
        Self::with_options(GraphOptions::directed())
    }

    pub fn undirected() -> Self {
        Self::with_options(GraphOptions::undirected())
    }

    pub fn multi_directed() -> Self {
        Self::with_options(GraphOptions::directed().with_multi(true))
    }

    pub fn multi_undirected() -> Self {
        Self::with_options(GraphOptions::undirected().with_multi(true))
    }

    pub fn multi() -> Self {
        Self::with_options(GraphOptions::mixed().with_multi(true))
    }

    // ---------------------------------------------------------------------
    // Configuration & counters
    // ---------------------------------------------------------------------

    pub fn options(&self) -> GraphOptions {
        self.options
    }

    pub fn graph_type(&self) -> GraphType {
        self.options.graph_type
    }

    pub fn is_multi(&self) -> bool {
        self.options.multi
    }

    pub fn allows_self_loops(&self) -> bool {
        self.options.allow_self_loops
    }

    /// Number of nodes
    pub fn order(&self) -> usize {
        self.node_index.len()
    }

    /// Number of edges
    pub fn size(&self) -> usize {
        self.edge_index.len()
    }

    pub fn directed_size(&self) -> usize {
        self.directed_size
    }

    pub fn undirected_size(&self) -> usize {
        self.undirected_size
    }

    pub fn self_loop_count(&self) -> usize {
        self.directed_self_loops + self.undirected_self_loops
    }

    pub fn directed_self_loop_count(&self) -> usize {
        self.directed_self_loops
    }

    pub fn undirected_self_loop_count(&self) -> usize {
        self.undirected_self_loops
    }

    /// Check if the graph has neither nodes nor edges
    pub fn is_empty(&self) -> bool {
        self.node_index.is_empty()
    }

    /// Effective type given the edges actually present.
    ///
    /// A mixed graph holding only directed (resp. undirected) edges reports
    /// directed (resp. undirected). An edgeless mixed graph stays mixed.
    pub fn infer_type(&self) -> GraphType {
        match self.options.graph_type {
            GraphType::Mixed => match (self.directed_size > 0, self.undirected_size > 0) {
                (true, false) => GraphType::Directed,
                (false, true) => GraphType::Undirected,
                _ => GraphType::Mixed,
            },
            other => other,
        }
    }

    // ---------------------------------------------------------------------
    // Observers
    // ---------------------------------------------------------------------

    /// Register a listener called after every mutation
    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&GraphEvent) + 'static,
    {
        self.observers.subscribe(Box::new(listener))
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.observers.unsubscribe(subscription)
    }

    // ---------------------------------------------------------------------
    // Handle resolution
    // ---------------------------------------------------------------------

    pub(crate) fn node_id(&self, key: &str) -> Option<NodeId> {
        self.node_index.get(key).copied()
    }

    pub(crate) fn edge_id(&self, key: &str) -> Option<EdgeId> {
        self.edge_index.get(key).copied()
    }

    pub(crate) fn require_node(&self, method: &str, key: &str) -> Result<NodeId> {
        self.node_id(key).ok_or_else(|| {
            GraphError::not_found(format!(
                "Graph.{}: could not find the \"{}\" node in the graph.",
                method, key
            ))
        })
    }

    pub(crate) fn require_edge(&self, method: &str, key: &str) -> Result<EdgeId> {
        self.edge_id(key).ok_or_else(|| {
            GraphError::not_found(format!(
                "Graph.{}: could not find the \"{}\" edge in the graph.",
                method, key
            ))
        })
    }

    pub(crate) fn node_record(&self, id: NodeId) -> &NodeRecord {
        &self.nodes[id.0]
    }

    pub(crate) fn node_record_mut(&mut self, id: NodeId) -> &mut NodeRecord {
        &mut self.nodes[id.0]
    }

    pub(crate) fn edge_record(&self, id: EdgeId) -> &EdgeRecord {
        &self.edges[id.0]
    }

    pub(crate) fn edge_record_mut(&mut self, id: EdgeId) -> &mut EdgeRecord {
        &mut self.edges[id.0]
    }

    pub(crate) fn node_key(&self, id: NodeId) -> &str {
        &self.node_record(id).key
    }

    // ---------------------------------------------------------------------
    // Node & edge reads
    // ---------------------------------------------------------------------

    pub fn has_node(&self, key: &str) -> bool {
        self.node_index.contains_key(key)
    }

    pub fn has_edge(&self, key: &str) -> bool {
        self.edge_index.contains_key(key)
    }

    /// Whether a directed edge goes from `source` to `target`.
    /// Missing nodes simply yield false.
    pub fn has_directed_edge(&self, source: &str, target: &str) -> bool {
        if self.options.graph_type == GraphType::Undirected {
            return false;
        }

        self.bucket_between(source, target, |record| &record.outbound)
            .is_some()
    }

    /// Whether an undirected edge links `source` and `target`
    pub fn has_undirected_edge(&self, source: &str, target: &str) -> bool {
        if self.options.graph_type == GraphType::Directed {
            return false;
        }

        self.bucket_between(source, target, |record| &record.undirected)
            .is_some()
    }

    /// Whether any edge (directed from `source` or undirected) links the nodes
    pub fn has_edge_between(&self, source: &str, target: &str) -> bool {
        self.has_directed_edge(source, target) || self.has_undirected_edge(source, target)
    }

    fn bucket_between<'a, F>(&'a self, source: &str, target: &str, select: F) -> Option<EdgeId>
    where
        F: Fn(&'a NodeRecord) -> &'a AdjacencyMap,
    {
        let source = self.node_id(source)?;
        let target = self.node_id(target)?;

        select(self.node_record(source))
            .get(&target)
            .and_then(|bucket| bucket.first().copied())
    }

    fn ensure_simple(&self, method: &str) -> Result<()> {
        if self.options.multi {
            return Err(GraphError::usage(format!(
                "Graph.{}: this method is irrelevant with multigraphs since there might be multiple edges between source & target. See #.edges_between instead.",
                method
            )));
        }
        Ok(())
    }

    /// Key of the directed edge from `source` to `target`, if any.
    /// Fails on multi graphs, where the answer is ambiguous.
    pub fn directed_edge(&self, source: &str, target: &str) -> Result<Option<&str>> {
        self.ensure_simple("directed_edge")?;
        self.require_node("directed_edge", source)?;
        self.require_node("directed_edge", target)?;

        if self.options.graph_type == GraphType::Undirected {
            return Ok(None);
        }

        Ok(self
            .bucket_between(source, target, |record| &record.outbound)
            .map(|edge| self.edge_record(edge).key.as_str()))
    }

    /// Key of the undirected edge linking `source` and `target`, if any
    pub fn undirected_edge(&self, source: &str, target: &str) -> Result<Option<&str>> {
        self.ensure_simple("undirected_edge")?;
        self.require_node("undirected_edge", source)?;
        self.require_node("undirected_edge", target)?;

        if self.options.graph_type == GraphType::Directed {
            return Ok(None);
        }

        Ok(self
            .bucket_between(source, target, |record| &record.undirected)
            .map(|edge| self.edge_record(edge).key.as_str()))
    }

    /// Key of the edge linking `source` to `target`, directed first
    pub fn edge(&self, source: &str, target: &str) -> Result<Option<&str>> {
        self.ensure_simple("edge")?;
        self.require_node("edge", source)?;
        self.require_node("edge", target)?;

        let found = self
            .bucket_between(source, target, |record| &record.outbound)
            .or_else(|| self.bucket_between(source, target, |record| &record.undirected));

        Ok(found.map(|edge| self.edge_record(edge).key.as_str()))
    }

    pub fn source(&self, edge: &str) -> Result<&str> {
        let id = self.require_edge("source", edge)?;
        Ok(self.node_key(self.edge_record(id).source))
    }

    pub fn target(&self, edge: &str) -> Result<&str> {
        let id = self.require_edge("target", edge)?;
        Ok(self.node_key(self.edge_record(id).target))
    }

    /// Both endpoints of an edge, as (source, target)
    pub fn extremities(&self, edge: &str) -> Result<(&str, &str)> {
        let id = self.require_edge("extremities", edge)?;
        let record = self.edge_record(id);
        Ok((self.node_key(record.source), self.node_key(record.target)))
    }

    /// The endpoint of `edge` that is not `node`
    pub fn opposite(&self, node: &str, edge: &str) -> Result<&str> {
        let node_id = self.require_node("opposite", node)?;
        let edge_id = self.require_edge("opposite", edge)?;
        let record = self.edge_record(edge_id);

        if record.source != node_id && record.target != node_id {
            return Err(GraphError::not_found(format!(
                "Graph.opposite: the \"{}\" node is not attached to the \"{}\" edge ({}, {}).",
                node,
                edge,
                self.node_key(record.source),
                self.node_key(record.target)
            )));
        }

        Ok(self.node_key(record.opposite(node_id)))
    }

    pub fn is_undirected(&self, edge: &str) -> Result<bool> {
        let id = self.require_edge("is_undirected", edge)?;
        Ok(self.edge_record(id).undirected)
    }

    pub fn is_directed(&self, edge: &str) -> Result<bool> {
        let id = self.require_edge("is_directed", edge)?;
        Ok(!self.edge_record(id).undirected)
    }

    pub fn is_self_loop(&self, edge: &str) -> Result<bool> {
        let id = self.require_edge("is_self_loop", edge)?;
        Ok(self.edge_record(id).is_self_loop())
    }

    /// Whether the edge key was generated by the graph
    pub fn has_generated_key(&self, edge: &str) -> Result<bool> {
        let id = self.require_edge("has_generated_key", edge)?;
        Ok(self.edge_record(id).generated_key)
    }

    // ---------------------------------------------------------------------
    // Degrees
    // ---------------------------------------------------------------------

    /// Degree of a node. With `self_loops` a directed loop counts once in
    /// each direction and an undirected loop counts twice.
    pub fn degree_of(&self, node: &str, kind: DegreeKind, self_loops: bool) -> Result<usize> {
        let id = self.require_node("degree_of", node)?;
        Ok(self.compute_degree(id, kind, self_loops))
    }

    pub(crate) fn compute_degree(&self, id: NodeId, kind: DegreeKind, self_loops: bool) -> usize {
        let record = self.node_record(id);
        let graph_type = self.options.graph_type;

        let directed_loops = if self_loops { record.directed_self_loops } else { 0 };
        let undirected_loops = if self_loops {
            record.undirected_self_loops * 2
        } else {
            0
        };

        let in_degree = record.in_degree + directed_loops;
        let out_degree = record.out_degree + directed_loops;
        let undirected = record.undirected_degree + undirected_loops;

        match kind {
            DegreeKind::In if graph_type.accepts_directed() => in_degree,
            DegreeKind::Out if graph_type.accepts_directed() => out_degree,
            DegreeKind::Directed if graph_type.accepts_directed() => in_degree + out_degree,
            DegreeKind::Undirected if graph_type.accepts_undirected() => undirected,
            DegreeKind::All => in_degree + out_degree + undirected,
            _ => 0,
        }
    }

    pub fn in_degree(&self, node: &str) -> Result<usize> {
        self.degree_of(node, DegreeKind::In, true)
    }

    pub fn out_degree(&self, node: &str) -> Result<usize> {
        self.degree_of(node, DegreeKind::Out, true)
    }

    pub fn directed_degree(&self, node: &str) -> Result<usize> {
        self.degree_of(node, DegreeKind::Directed, true)
    }

    pub fn undirected_degree(&self, node: &str) -> Result<usize> {
        self.degree_of(node, DegreeKind::Undirected, true)
    }

    pub fn degree(&self, node: &str) -> Result<usize> {
        self.degree_of(node, DegreeKind::All, true)
    }

    pub fn degree_without_self_loops(&self, node: &str) -> Result<usize> {
        self.degree_of(node, DegreeKind::All, false)
    }

    // ---------------------------------------------------------------------
    // Node enumeration
    // ---------------------------------------------------------------------

    /// Node keys in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.node_index.keys().map(String::as_str)
    }

    /// (key, attributes) pairs in insertion order
    pub fn node_entries(&self) -> impl Iterator<Item = (&str, &Attributes)> + '_ {
        self.node_index.values().map(move |id| {
            let record = self.node_record(*id);
            (record.key.as_str(), &record.attributes)
        })
    }

    pub fn for_each_node<F>(&self, mut callback: F)
    where
        F: FnMut(&str, &Attributes),
    {
        for (key, attributes) in self.node_entries() {
            callback(key, attributes);
        }
    }

    /// Breakable node iteration. Returns true if the callback stopped it.
    pub fn for_each_node_until<F>(&self, mut callback: F) -> bool
    where
        F: FnMut(&str, &Attributes) -> bool,
    {
        self.node_entries()
            .any(|(key, attributes)| callback(key, attributes))
    }

    pub(crate) fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_index.values().copied()
    }

    pub(crate) fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edge_index.values().copied()
    }

    /// Lookup table from node handle to its enumeration rank.
    /// Free slots map to `usize::MAX`.
    pub(crate) fn node_ranks(&self) -> Vec<usize> {
        let mut ranks = vec![usize::MAX; self.nodes.slot_count()];
        for (rank, id) in self.node_ids().enumerate() {
            ranks[id.0] = rank;
        }
        ranks
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Graph {
    /// Deep copy of structure and attributes. Observers are not carried over.
    fn clone(&self) -> Self {
        Self {
            options: self.options,
            attributes: self.attributes.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            node_index: self.node_index.clone(),
            edge_index: self.edge_index.clone(),
            directed_size: self.directed_size,
            undirected_size: self.undirected_size,
            directed_self_loops: self.directed_self_loops,
            undirected_self_loops: self.undirected_self_loops,
            observers: Observers::default(),
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("type", &self.options.graph_type)
            .field("multi", &self.options.multi)
            .field("allow_self_loops", &self.options.allow_self_loops)
            .field("order", &self.order())
            .field("size", &self.size())
            .field("observers", &self.observers)
            .finish()
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Graph<{}{}, {} nodes, {} edges>",
            if self.options.multi { "multi " } else { "" },
            self.options.graph_type,
            self.order(),
            self.size()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    #[test]
    fn test_infer_type() {
        let mut graph = Graph::new();
        assert_eq!(graph.infer_type(), GraphType::Mixed);

        graph.add_node("a", attrs!()).unwrap();
        graph.add_node("b", attrs!()).unwrap();
        graph.add_undirected_edge("a", "b", attrs!()).unwrap();
        assert_eq!(graph.infer_type(), GraphType::Undirected);

        graph.add_directed_edge("a", "b", attrs!()).unwrap();
        assert_eq!(graph.infer_type(), GraphType::Mixed);
    }

    #[test]
    fn test_degrees_with_self_loops() {
        let mut graph = Graph::new();
        graph.add_node("a", attrs!()).unwrap();
        graph.add_node("b", attrs!()).unwrap();
        graph.add_directed_edge("a", "a", attrs!()).unwrap();
        graph.add_undirected_edge("a", "a", attrs!()).unwrap();
        graph.add_directed_edge("a", "b", attrs!()).unwrap();

        assert_eq!(graph.in_degree("a").unwrap(), 1);
        assert_eq!(graph.out_degree("a").unwrap(), 2);
        assert_eq!(graph.undirected_degree("a").unwrap(), 2);
        assert_eq!(graph.degree("a").unwrap(), 5);
        assert_eq!(graph.degree_without_self_loops("a").unwrap(), 1);
        assert_eq!(graph.self_loop_count(), 2);
    }

    #[test]
    fn test_degree_on_incompatible_type_is_zero() {
        let mut graph = Graph::undirected();
        graph.add_node("a", attrs!()).unwrap();
        assert_eq!(graph.in_degree("a").unwrap(), 0);
        assert!(graph.in_degree("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_display() {
        let graph = Graph::multi_directed();
        assert_eq!(graph.to_string(), "Graph<multi directed, 0 nodes, 0 edges>");
    }
}
