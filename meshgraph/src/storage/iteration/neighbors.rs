// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Neighbor iteration
//!
//! Every neighbor query goes through one engine parameterized by a
//! [`Shape`]. A shape selects which of a node's adjacency maps are read
//! (`inbound`, `outbound`, `undirected`, always in that order). When more
//! than one map is read, a neighbor already produced by an earlier map is
//! skipped, so a node linked through several edges is reported once.

use crate::storage::attributes::Attributes;
use crate::storage::graph_store::Graph;
use crate::storage::types::{AdjacencyMap, GraphType, NodeId, Result};
use smallvec::SmallVec;
use std::fmt;

/// The seven neighborhood shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Every neighbor: in, out and undirected
    Mixed,
    /// Sources of directed edges pointing at the node
    In,
    /// Targets of directed edges leaving the node
    Out,
    /// In plus undirected
    Inbound,
    /// Out plus undirected
    Outbound,
    /// In plus out
    Directed,
    /// Undirected only
    Undirected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeType {
    Mixed,
    Directed,
    Undirected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
    Both,
}

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::Mixed,
        Shape::In,
        Shape::Out,
        Shape::Inbound,
        Shape::Outbound,
        Shape::Directed,
        Shape::Undirected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Mixed => "mixed",
            Shape::In => "in",
            Shape::Out => "out",
            Shape::Inbound => "inbound",
            Shape::Outbound => "outbound",
            Shape::Directed => "directed",
            Shape::Undirected => "undirected",
        }
    }

    fn kind(self) -> ShapeType {
        match self {
            Shape::Mixed | Shape::Inbound | Shape::Outbound => ShapeType::Mixed,
            Shape::In | Shape::Out | Shape::Directed => ShapeType::Directed,
            Shape::Undirected => ShapeType::Undirected,
        }
    }

    fn direction(self) -> Direction {
        match self {
            Shape::In | Shape::Inbound => Direction::In,
            Shape::Out | Shape::Outbound => Direction::Out,
            _ => Direction::Both,
        }
    }

    /// Whether this shape can yield anything on a graph of the given type
    pub(crate) fn fits(self, graph_type: GraphType) -> bool {
        match (self.kind(), graph_type) {
            (ShapeType::Mixed, _) | (_, GraphType::Mixed) => true,
            (ShapeType::Directed, GraphType::Directed) => true,
            (ShapeType::Undirected, GraphType::Undirected) => true,
            _ => false,
        }
    }

    /// Which adjacency maps to read: (inbound, outbound, undirected)
    pub(crate) fn sources(self) -> (bool, bool, bool) {
        let kind = self.kind();
        let direction = self.direction();

        let directed = kind != ShapeType::Undirected;
        (
            directed && direction != Direction::Out,
            directed && direction != Direction::In,
            kind != ShapeType::Directed,
        )
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Adjacency maps read by one query, in visitation order
pub(crate) type SourceMaps<'a> = SmallVec<[&'a AdjacencyMap; 3]>;

/// Lazy, deduplicated neighbor handles of one node
#[derive(Clone)]
pub(crate) struct NeighborIds<'a> {
    maps: SourceMaps<'a>,
    current: usize,
    position: usize,
}

impl<'a> NeighborIds<'a> {
    fn new(maps: SourceMaps<'a>) -> Self {
        Self {
            maps,
            current: 0,
            position: 0,
        }
    }

    fn rewind(&mut self) {
        self.current = 0;
        self.position = 0;
    }
}

impl Iterator for NeighborIds<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let map = *self.maps.get(self.current)?;

            match map.get_index(self.position) {
                Some((neighbor, _)) => {
                    self.position += 1;

                    let seen = self.maps[..self.current]
                        .iter()
                        .any(|earlier| earlier.contains_key(neighbor));
                    if !seen {
                        return Some(*neighbor);
                    }
                }
                None => {
                    self.current += 1;
                    self.position = 0;
                }
            }
        }
    }
}

/// Restartable iterator over `(neighbor key, neighbor attributes)`
#[derive(Clone)]
pub struct NeighborEntries<'a> {
    graph: &'a Graph,
    ids: NeighborIds<'a>,
}

impl<'a> NeighborEntries<'a> {
    /// Start over from the first neighbor
    pub fn rewind(&mut self) {
        self.ids.rewind();
    }
}

impl<'a> Iterator for NeighborEntries<'a> {
    type Item = (&'a str, &'a Attributes);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?;
        let record = self.graph.node_record(id);
        Some((record.key.as_str(), &record.attributes))
    }
}

impl fmt::Debug for NeighborEntries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeighborEntries")
            .field("maps", &self.ids.maps.len())
            .field("current", &self.ids.current)
            .field("position", &self.ids.position)
            .finish()
    }
}

impl Graph {
    /// Adjacency maps of `id` read by `shape`; empty when the shape does
    /// not fit the graph type
    pub(crate) fn source_maps(&self, shape: Shape, id: NodeId) -> SourceMaps<'_> {
        let mut maps = SourceMaps::new();
        if !shape.fits(self.graph_type()) {
            return maps;
        }

        let record = self.node_record(id);
        let (inbound, outbound, undirected) = shape.sources();

        if inbound {
            maps.push(&record.inbound);
        }
        if outbound {
            maps.push(&record.outbound);
        }
        if undirected {
            maps.push(&record.undirected);
        }
        maps
    }

    pub(crate) fn neighbor_ids(&self, shape: Shape, id: NodeId) -> NeighborIds<'_> {
        NeighborIds::new(self.source_maps(shape, id))
    }

    /// Lazy iterator over the neighbors of `node`
    pub fn neighbor_entries(&self, shape: Shape, node: &str) -> Result<NeighborEntries<'_>> {
        let id = self.require_node(&format!("{}_neighbor_entries", shape), node)?;
        Ok(NeighborEntries {
            graph: self,
            ids: self.neighbor_ids(shape, id),
        })
    }

    /// Keys of the neighbors of `node`
    pub fn neighbors_of(&self, shape: Shape, node: &str) -> Result<Vec<&str>> {
        let id = self.require_node(&format!("{}_neighbors", shape), node)?;
        Ok(self
            .neighbor_ids(shape, id)
            .map(|neighbor| self.node_key(neighbor))
            .collect())
    }

    /// Whether `candidate` is a neighbor of `node`. A missing candidate is
    /// simply not a neighbor.
    pub fn are_neighbors(&self, shape: Shape, node: &str, candidate: &str) -> Result<bool> {
        let id = self.require_node(&format!("are_{}_neighbors", shape), node)?;

        let candidate = match self.node_id(candidate) {
            Some(candidate) => candidate,
            None => return Ok(false),
        };

        Ok(self
            .source_maps(shape, id)
            .iter()
            .any(|map| map.contains_key(&candidate)))
    }

    pub fn for_each_neighbor<F>(&self, shape: Shape, node: &str, mut callback: F) -> Result<()>
    where
        F: FnMut(&str, &Attributes),
    {
        for (key, attributes) in self.neighbor_entries(shape, node)? {
            callback(key, attributes);
        }
        Ok(())
    }

    /// Breakable iteration. Returns true if the callback asked to stop.
    pub fn for_each_neighbor_until<F>(&self, shape: Shape, node: &str, mut callback: F) -> Result<bool>
    where
        F: FnMut(&str, &Attributes) -> bool,
    {
        Ok(self
            .neighbor_entries(shape, node)?
            .any(|(key, attributes)| callback(key, attributes)))
    }
}

macro_rules! neighbor_shortcuts {
    ($($shape:ident => $list:ident, $test:ident;)+) => {
        impl Graph {
            $(
                #[doc = concat!("Keys of the `", stringify!($shape), "` neighbors of `node`")]
                pub fn $list(&self, node: &str) -> Result<Vec<&str>> {
                    self.neighbors_of(Shape::$shape, node)
                }

                #[doc = concat!("Whether `candidate` is a `", stringify!($shape), "` neighbor of `node`")]
                pub fn $test(&self, node: &str, candidate: &str) -> Result<bool> {
                    self.are_neighbors(Shape::$shape, node, candidate)
                }
            )+
        }
    };
}

neighbor_shortcuts! {
    Mixed => neighbors, has_neighbor;
    In => in_neighbors, has_in_neighbor;
    Out => out_neighbors, has_out_neighbor;
    Inbound => inbound_neighbors, has_inbound_neighbor;
    Outbound => outbound_neighbors, has_outbound_neighbor;
    Directed => directed_neighbors, has_directed_neighbor;
    Undirected => undirected_neighbors, has_undirected_neighbor;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    fn mixed() -> Graph {
        let mut graph = Graph::multi();
        for key in ["a", "b", "c", "d"] {
            graph.add_node(key, attrs!()).unwrap();
        }
        graph.add_directed_edge("a", "b", attrs!()).unwrap();
        graph.add_undirected_edge("a", "b", attrs!()).unwrap();
        graph.add_directed_edge("c", "a", attrs!()).unwrap();
        graph.add_undirected_edge("d", "a", attrs!()).unwrap();
        graph.add_directed_edge("a", "a", attrs!()).unwrap();
        graph
    }

    #[test]
    fn test_shape_sources() {
        assert_eq!(Shape::Mixed.sources(), (true, true, true));
        assert_eq!(Shape::In.sources(), (true, false, false));
        assert_eq!(Shape::Outbound.sources(), (false, true, true));
        assert_eq!(Shape::Directed.sources(), (true, true, false));
        assert_eq!(Shape::Undirected.sources(), (false, false, true));
    }

    #[test]
    fn test_mixed_dedup_order() {
        let graph = mixed();
        // in first (c, a), then out (b; a already seen), then undirected (b seen, d)
        assert_eq!(graph.neighbors("a").unwrap(), vec!["c", "a", "b", "d"]);
        assert_eq!(graph.in_neighbors("a").unwrap(), vec!["c", "a"]);
        assert_eq!(graph.outbound_neighbors("a").unwrap(), vec!["b", "a", "d"]);
        assert_eq!(graph.undirected_neighbors("b").unwrap(), vec!["a"]);
    }

    #[test]
    fn test_are_neighbors() {
        let graph = mixed();
        assert!(graph.has_out_neighbor("a", "b").unwrap());
        assert!(!graph.has_out_neighbor("b", "a").unwrap());
        assert!(graph.has_neighbor("b", "a").unwrap());
        assert!(!graph.has_neighbor("a", "nope").unwrap());
        assert!(graph.has_neighbor("nope", "a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_incompatible_shape_is_empty() {
        let mut graph = Graph::undirected();
        graph.merge_edge("a", "b", attrs!()).unwrap();
        assert!(graph.directed_neighbors("a").unwrap().is_empty());
        assert!(graph.out_neighbors("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_entries_rewind_and_until() {
        let graph = mixed();
        let mut entries = graph.neighbor_entries(Shape::Mixed, "a").unwrap();
        assert_eq!(entries.by_ref().count(), 4);
        entries.rewind();
        assert_eq!(entries.next().map(|(key, _)| key), Some("c"));

        let mut visited = Vec::new();
        let stopped = graph
            .for_each_neighbor_until(Shape::Mixed, "a", |key, _| {
                visited.push(key.to_string());
                key == "a"
            })
            .unwrap();
        assert!(stopped);
        assert_eq!(visited, vec!["c", "a"]);
    }
}
