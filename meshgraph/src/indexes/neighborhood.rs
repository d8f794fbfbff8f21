// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Compressed neighborhood (CSR) indices
//!
//! An index is a one-shot flattening of the store's adjacency: node `i`
//! (dense id, in `graph.nodes()` order) has its neighbor ids stored in
//! `neighborhood[starts[i]..starts[i + 1]]`.
//!
//! Indices are snapshots. Once the source graph is mutated, an index built
//! from it describes a graph that no longer exists and its results are
//! meaningless. Nothing checks for this: rebuild the index instead.

use crate::indexes::pointer::PointerArray;
use crate::indexes::weights::EdgeWeight;
use crate::storage::graph_store::Graph;
use crate::storage::iteration::Shape;
use crate::storage::types::{GraphError, Result};
use crate::storage::value::Value;
use indexmap::IndexMap;
use log::debug;

/// Which adjacency an index flattens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NeighborhoodMethod {
    In,
    Out,
    Directed,
    Undirected,
    Inbound,
    #[default]
    Outbound,
    Mixed,
}

impl NeighborhoodMethod {
    pub fn shape(&self) -> Shape {
        match self {
            NeighborhoodMethod::In => Shape::In,
            NeighborhoodMethod::Out => Shape::Out,
            NeighborhoodMethod::Directed => Shape::Directed,
            NeighborhoodMethod::Undirected => Shape::Undirected,
            NeighborhoodMethod::Inbound => Shape::Inbound,
            NeighborhoodMethod::Outbound => Shape::Outbound,
            NeighborhoodMethod::Mixed => Shape::Mixed,
        }
    }

    /// Most entries the flattened adjacency can hold. A directed edge shows
    /// up once per endpoint it is read from, an undirected one at both.
    pub fn upper_bound(&self, graph: &Graph) -> usize {
        let directed = graph.directed_size();
        let undirected = graph.undirected_size() * 2;

        match self {
            NeighborhoodMethod::In | NeighborhoodMethod::Out => directed,
            NeighborhoodMethod::Inbound | NeighborhoodMethod::Outbound => directed + undirected,
            NeighborhoodMethod::Directed => directed * 2,
            NeighborhoodMethod::Undirected => undirected,
            NeighborhoodMethod::Mixed => directed * 2 + undirected,
        }
    }
}

/// Read access shared by every CSR-shaped index
pub trait CsrLayout {
    /// Keys of the indexed nodes, by dense id
    fn node_keys(&self) -> &[String];

    fn starts(&self) -> &PointerArray;

    fn neighborhood(&self) -> &PointerArray;

    /// Number of rows currently laid out
    fn rows(&self) -> usize {
        self.node_keys().len()
    }

    /// Half-open range of row `i` inside `neighborhood`
    fn bounds(&self, i: usize) -> (usize, usize) {
        let starts = self.starts();
        (starts.get(i), starts.get(i + 1))
    }

    /// Neighbor ids of row `i`
    fn row(&self, i: usize) -> Vec<usize> {
        let (start, end) = self.bounds(i);
        (start..end).map(|j| self.neighborhood().get(j)).collect()
    }

    /// Rebuild a key-addressed adjacency from the flat arrays
    fn project(&self) -> IndexMap<String, Vec<String>> {
        let keys = self.node_keys();
        (0..self.rows())
            .map(|i| {
                let neighbors = self
                    .row(i)
                    .into_iter()
                    .map(|j| keys[j].clone())
                    .collect();
                (keys[i].clone(), neighbors)
            })
            .collect()
    }
}

/// Map a results array indexed by dense id back onto node keys
pub(crate) fn collect_by_key<T: Clone>(keys: &[String], results: &[T]) -> Result<IndexMap<String, T>> {
    if results.len() != keys.len() {
        return Err(GraphError::invalid_argument(format!(
            "expected {} results (one per indexed node) but got {}",
            keys.len(),
            results.len()
        )));
    }

    Ok(keys.iter().cloned().zip(results.iter().cloned()).collect())
}

/// Write a results array indexed by dense id onto a node attribute
pub(crate) fn assign_by_key<T>(graph: &mut Graph, keys: &[String], name: &str, results: &[T]) -> Result<()>
where
    T: Clone + Into<Value>,
{
    if results.len() != keys.len() {
        return Err(GraphError::invalid_argument(format!(
            "expected {} results (one per indexed node) but got {}",
            keys.len(),
            results.len()
        )));
    }

    for (key, result) in keys.iter().zip(results) {
        graph.set_node_attribute(key, name, result.clone())?;
    }
    Ok(())
}

/// Unweighted CSR index
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborhoodIndex {
    pub method: NeighborhoodMethod,
    pub nodes: Vec<String>,
    pub starts: PointerArray,
    pub neighborhood: PointerArray,
}

impl NeighborhoodIndex {
    pub fn new(graph: &Graph, method: NeighborhoodMethod) -> Self {
        let shape = method.shape();
        let upper_bound = method.upper_bound(graph);
        let order = graph.order();
        let ranks = graph.node_ranks();

        let nodes: Vec<String> = graph.nodes().map(str::to_string).collect();
        let mut starts = PointerArray::with_max_value(upper_bound, order + 1);
        let mut written: Vec<usize> = Vec::with_capacity(upper_bound);

        for (i, id) in graph.node_ids().enumerate() {
            starts.set(i, written.len());
            written.extend(graph.neighbor_ids(shape, id).map(|neighbor| ranks[neighbor.index()]));
        }
        starts.set(order, written.len());

        let mut neighborhood = PointerArray::with_max_value(order, written.len());
        for (j, neighbor) in written.into_iter().enumerate() {
            neighborhood.set(j, neighbor);
        }

        debug!(
            "Built {:?} neighborhood index: {} nodes, {} entries",
            method,
            order,
            neighborhood.len()
        );

        Self {
            method,
            nodes,
            starts,
            neighborhood,
        }
    }

    /// Outbound index, the default
    pub fn outbound(graph: &Graph) -> Self {
        Self::new(graph, NeighborhoodMethod::Outbound)
    }

    pub fn collect<T: Clone>(&self, results: &[T]) -> Result<IndexMap<String, T>> {
        collect_by_key(&self.nodes, results)
    }

    pub fn assign<T>(&self, graph: &mut Graph, name: &str, results: &[T]) -> Result<()>
    where
        T: Clone + Into<Value>,
    {
        assign_by_key(graph, &self.nodes, name, results)
    }
}

impl CsrLayout for NeighborhoodIndex {
    fn node_keys(&self) -> &[String] {
        &self.nodes
    }

    fn starts(&self) -> &PointerArray {
        &self.starts
    }

    fn neighborhood(&self) -> &PointerArray {
        &self.neighborhood
    }
}

/// CSR index carrying one weight per entry and the weighted out-degree of
/// every node. Built from edges rather than neighbors, so parallel edges
/// produce repeated entries.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedNeighborhoodIndex {
    pub method: NeighborhoodMethod,
    pub nodes: Vec<String>,
    pub starts: PointerArray,
    pub neighborhood: PointerArray,
    pub weights: Vec<f64>,
    pub out_degrees: Vec<f64>,
}

impl WeightedNeighborhoodIndex {
    pub fn new(graph: &Graph, weight: &EdgeWeight, method: NeighborhoodMethod) -> Self {
        let shape = method.shape();
        let upper_bound = method.upper_bound(graph);
        let order = graph.order();
        let ranks = graph.node_ranks();

        let nodes: Vec<String> = graph.nodes().map(str::to_string).collect();
        let mut starts = PointerArray::with_max_value(upper_bound, order + 1);
        let mut written: Vec<usize> = Vec::with_capacity(upper_bound);
        let mut weights: Vec<f64> = Vec::with_capacity(upper_bound);
        let mut out_degrees = vec![0.0; order];

        for (i, id) in graph.node_ids().enumerate() {
            starts.set(i, written.len());

            for edge in graph.edge_ids_of(shape, id) {
                let neighbor = graph.edge_record(edge).opposite(id);
                let w = weight.weight_of(graph.edge_entry(edge));

                written.push(ranks[neighbor.index()]);
                weights.push(w);
                out_degrees[i] += w;
            }
        }
        starts.set(order, written.len());

        let mut neighborhood = PointerArray::with_max_value(order, written.len());
        for (j, neighbor) in written.into_iter().enumerate() {
            neighborhood.set(j, neighbor);
        }

        debug!(
            "Built weighted {:?} neighborhood index: {} nodes, {} entries",
            method,
            order,
            neighborhood.len()
        );

        Self {
            method,
            nodes,
            starts,
            neighborhood,
            weights,
            out_degrees,
        }
    }

    pub fn collect<T: Clone>(&self, results: &[T]) -> Result<IndexMap<String, T>> {
        collect_by_key(&self.nodes, results)
    }

    pub fn assign<T>(&self, graph: &mut Graph, name: &str, results: &[T]) -> Result<()>
    where
        T: Clone + Into<Value>,
    {
        assign_by_key(graph, &self.nodes, name, results)
    }
}

impl CsrLayout for WeightedNeighborhoodIndex {
    fn node_keys(&self) -> &[String] {
        &self.nodes
    }

    fn starts(&self) -> &PointerArray {
        &self.starts
    }

    fn neighborhood(&self) -> &PointerArray {
        &self.neighborhood
    }
}
