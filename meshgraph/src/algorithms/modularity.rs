// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Newman modularity of a node partition
//!
//! Two implementations are provided. The sparse one sweeps the edges once
//! and is what callers normally want. The dense one evaluates the textbook
//! double sum over every pair of nodes sharing a community, which makes it
//! quadratic but useful as a reference for small graphs.
//!
//! Undirected: `Q = Σ_c [ in_c / 2M - res · (tot_c / 2M)² ]`
//!
//! Directed: `Q = Σ_c [ in_c / M - res · tot_in_c · tot_out_c / M² ]`

use crate::indexes::weights::{EdgeWeight, DEFAULT_WEIGHT_ATTRIBUTE};
use crate::storage::graph_store::Graph;
use crate::storage::types::{EdgeId, GraphError, NodeId, Result};
use crate::storage::value::Value;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default node attribute holding community labels
pub const DEFAULT_COMMUNITY_ATTRIBUTE: &str = "community";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModularityOptions {
    pub resolution: f64,
    /// Read edge weights from `weight_attribute`; otherwise every edge weighs 1
    pub weighted: bool,
    pub weight_attribute: String,
    pub community_attribute: String,
}

impl Default for ModularityOptions {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            weighted: true,
            weight_attribute: DEFAULT_WEIGHT_ATTRIBUTE.to_string(),
            community_attribute: DEFAULT_COMMUNITY_ATTRIBUTE.to_string(),
        }
    }
}

impl ModularityOptions {
    pub fn edge_weight(&self) -> EdgeWeight {
        if self.weighted {
            EdgeWeight::Attribute(self.weight_attribute.clone())
        } else {
            EdgeWeight::Unweighted
        }
    }
}

/// Dense community id of every node, by enumeration rank
struct Partition {
    communities: Vec<usize>,
    count: usize,
}

impl Partition {
    fn from_attribute(graph: &Graph, attribute: &str) -> Result<Self> {
        let mut labels: IndexMap<String, usize> = IndexMap::new();
        let mut communities = Vec::with_capacity(graph.order());

        for (node, attributes) in graph.node_entries() {
            let label = attributes
                .get(attribute)
                .and_then(community_label)
                .ok_or_else(|| not_in_partition(node))?;

            let next = labels.len();
            communities.push(*labels.entry(label).or_insert(next));
        }

        Ok(Self {
            communities,
            count: labels.len(),
        })
    }

    fn from_map<V>(graph: &Graph, partition: &HashMap<String, V>) -> Result<Self>
    where
        V: Eq + std::hash::Hash + Clone,
    {
        let mut labels: HashMap<V, usize> = HashMap::new();
        let mut communities = Vec::with_capacity(graph.order());

        for node in graph.nodes() {
            let label = partition.get(node).ok_or_else(|| not_in_partition(node))?;

            let next = labels.len();
            communities.push(*labels.entry(label.clone()).or_insert(next));
        }

        Ok(Self {
            count: labels.len(),
            communities,
        })
    }
}

fn not_in_partition(node: &str) -> GraphError {
    GraphError::invalid_argument(format!(
        "modularity: the \"{}\" node is not in the partition.",
        node
    ))
}

/// Community labels compare by their textual form, so `1` and `1.0` are
/// the same community
fn community_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Number(n) if n.is_nan() => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Boolean(b) => Some(b.to_string()),
        other => serde_json::to_string(other).ok(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Directed,
    Undirected,
}

fn check_graph(graph: &Graph) -> Result<Orientation> {
    if graph.size() == 0 {
        return Err(GraphError::usage(
            "modularity: cannot compute modularity of an empty graph.",
        ));
    }

    if graph.is_multi() {
        return Err(GraphError::usage(
            "modularity: cannot compute modularity of a multi graph. Cast it to a simple one beforehand.",
        ));
    }

    match (graph.directed_size() > 0, graph.undirected_size() > 0) {
        (true, true) => Err(GraphError::usage(
            "modularity: cannot compute modularity of a mixed graph.",
        )),
        (true, false) => Ok(Orientation::Directed),
        _ => Ok(Orientation::Undirected),
    }
}

/// `(edge, source rank, target rank, weight)` of every edge
fn weighted_edges(graph: &Graph, weight: &EdgeWeight) -> Vec<(EdgeId, usize, usize, f64)> {
    let ranks = graph.node_ranks();
    graph
        .edge_ids()
        .map(|edge| {
            let record = graph.edge_record(edge);
            (
                edge,
                ranks[record.source.index()],
                ranks[record.target.index()],
                weight.weight_of(graph.edge_entry(edge)),
            )
        })
        .collect()
}

fn sparse(graph: &Graph, partition: &Partition, options: &ModularityOptions) -> Result<f64> {
    let orientation = check_graph(graph)?;
    let resolution = options.resolution;
    let communities = &partition.communities;

    let mut internal = vec![0.0; partition.count];
    let mut total_in = vec![0.0; partition.count];
    let mut total_out = vec![0.0; partition.count];
    let mut m = 0.0;

    for (_, source, target, weight) in weighted_edges(graph, &options.edge_weight()) {
        let (cs, ct) = (communities[source], communities[target]);
        m += weight;

        match orientation {
            Orientation::Undirected => {
                // Undirected totals only use `total_out`
                total_out[cs] += weight;
                total_out[ct] += weight;
                if cs == ct {
                    internal[cs] += weight * 2.0;
                }
            }
            Orientation::Directed => {
                total_out[cs] += weight;
                total_in[ct] += weight;
                if cs == ct {
                    internal[cs] += weight;
                }
            }
        }
    }

    let q = match orientation {
        Orientation::Undirected => {
            let m2 = m * 2.0;
            internal
                .iter()
                .zip(&total_out)
                .map(|(inside, total)| inside / m2 - (total / m2).powi(2) * resolution)
                .sum()
        }
        Orientation::Directed => internal
            .iter()
            .zip(total_in.iter().zip(&total_out))
            .map(|(inside, (tin, tout))| inside / m - tin * tout / (m * m) * resolution)
            .sum(),
    };

    debug!(
        "Modularity over {} communities ({:?}): {}",
        partition.count, orientation, q
    );

    Ok(q)
}

fn dense(graph: &Graph, partition: &Partition, options: &ModularityOptions) -> Result<f64> {
    let orientation = check_graph(graph)?;
    let resolution = options.resolution;
    let communities = &partition.communities;
    let order = graph.order();

    let mut weights: HashMap<EdgeId, f64> = HashMap::new();
    let mut in_degrees = vec![0.0; order];
    let mut out_degrees = vec![0.0; order];
    let mut m = 0.0;

    for (edge, source, target, weight) in weighted_edges(graph, &options.edge_weight()) {
        m += weight;
        weights.insert(edge, weight);

        match orientation {
            Orientation::Undirected => {
                // A loop adds its weight to both ends, i.e. twice
                out_degrees[source] += weight;
                out_degrees[target] += weight;
            }
            Orientation::Directed => {
                out_degrees[source] += weight;
                in_degrees[target] += weight;
            }
        }
    }

    let ids: Vec<NodeId> = graph.node_ids().collect();
    let edge_between = |i: usize, j: usize| -> Option<EdgeId> {
        let record = graph.node_record(ids[i]);
        let adjacency = match orientation {
            Orientation::Undirected => &record.undirected,
            Orientation::Directed => &record.outbound,
        };
        adjacency.get(&ids[j]).and_then(|bucket| bucket.first().copied())
    };

    let mut sum = 0.0;
    // The whole matrix is walked, diagonal and both triangles included
    for i in 0..order {
        for j in 0..order {
            if communities[i] != communities[j] {
                continue;
            }

            let a = edge_between(i, j)
                .and_then(|e| weights.get(&e).copied())
                .unwrap_or(0.0);

            match orientation {
                Orientation::Undirected => {
                    // Undirected loops sit twice on the diagonal
                    let a = if i == j { a * 2.0 } else { a };
                    sum += a - out_degrees[i] * out_degrees[j] / (2.0 * m) * resolution;
                }
                Orientation::Directed => {
                    sum += a - in_degrees[i] * out_degrees[j] / m * resolution;
                }
            }
        }
    }

    Ok(match orientation {
        Orientation::Undirected => sum / (2.0 * m),
        Orientation::Directed => sum / m,
    })
}

/// Modularity of the partition stored on the community attribute
pub fn modularity(graph: &Graph, options: &ModularityOptions) -> Result<f64> {
    let partition = Partition::from_attribute(graph, &options.community_attribute)?;
    sparse(graph, &partition, options)
}

/// Modularity of an explicit node to community map
pub fn modularity_from_partition<V>(
    graph: &Graph,
    partition: &HashMap<String, V>,
    options: &ModularityOptions,
) -> Result<f64>
where
    V: Eq + std::hash::Hash + Clone,
{
    let partition = Partition::from_map(graph, partition)?;
    sparse(graph, &partition, options)
}

/// Brute-force modularity over the community attribute
pub fn dense_modularity(graph: &Graph, options: &ModularityOptions) -> Result<f64> {
    let partition = Partition::from_attribute(graph, &options.community_attribute)?;
    dense(graph, &partition, options)
}

pub fn dense_modularity_from_partition<V>(
    graph: &Graph,
    partition: &HashMap<String, V>,
    options: &ModularityOptions,
) -> Result<f64>
where
    V: Eq + std::hash::Hash + Clone,
{
    let partition = Partition::from_map(graph, partition)?;
    dense(graph, &partition, options)
}

/// Gain of moving an isolated node into a community of an undirected
/// graph. `node_community_degree` counts each linking edge twice.
pub fn undirected_modularity_delta(
    m: f64,
    community_total_weight: f64,
    node_degree: f64,
    node_community_degree: f64,
) -> f64 {
    node_community_degree / (2.0 * m) - (community_total_weight * node_degree) / (2.0 * m * m)
}

/// Directed counterpart of [`undirected_modularity_delta`]
pub fn directed_modularity_delta(
    m: f64,
    community_total_in_weight: f64,
    community_total_out_weight: f64,
    node_in_degree: f64,
    node_out_degree: f64,
    node_community_degree: f64,
) -> f64 {
    node_community_degree / m
        - (node_out_degree * community_total_in_weight + node_in_degree * community_total_out_weight)
            / (m * m)
}
