// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Louvain community indices
//!
//! Both indices extend the CSR layout with community bookkeeping: which
//! community each row belongs to (`belongings`), how many rows each
//! community holds (`counts`), a stack of emptied community ids (`unused`)
//! so isolated rows can be given a fresh community, and the aggregate
//! degree of every community. Moves update those aggregates in O(1), so
//! modularity deltas can be evaluated in closed form.
//!
//! `zoom_out` contracts every community into a single row of a smaller
//! graph: intra-community weight becomes a self-loop, inter-community
//! weight is summed per pair of communities. The rows of level `k + 1` are
//! the communities of level `k`, and every contraction is recorded in the
//! dendrogram.
//!
//! The Leiden addenda refine the communities of an undirected index before
//! each contraction, so that every community stays connected.
//!
//! Like the neighborhood indices, these are snapshots of the graph they
//! were built from and must be rebuilt after that graph is mutated.

pub mod directed;
pub mod leiden;
pub mod undirected;

pub use directed::DirectedLouvainIndex;
pub use leiden::{UndirectedLeidenAddenda, DEFAULT_RANDOMNESS};
pub use undirected::UndirectedLouvainIndex;

use crate::indexes::weights::EdgeWeight;
use crate::storage::graph_store::Graph;
use crate::storage::types::{GraphError, Result};
use indexmap::IndexMap;

/// Construction options shared by both Louvain indices
#[derive(Debug)]
pub struct LouvainIndexOptions {
    pub weight: EdgeWeight,
    pub resolution: f64,
    /// When false, building from a graph holding self-loops is refused
    pub allow_self_loops: bool,
}

impl Default for LouvainIndexOptions {
    fn default() -> Self {
        Self {
            weight: EdgeWeight::default(),
            resolution: 1.0,
            allow_self_loops: true,
        }
    }
}

impl LouvainIndexOptions {
    pub fn unweighted() -> Self {
        Self {
            weight: EdgeWeight::Unweighted,
            ..Self::default()
        }
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }
}

/// Preconditions common to both indices
pub(crate) fn check_graph(name: &str, graph: &Graph, options: &LouvainIndexOptions) -> Result<()> {
    if graph.is_multi() {
        return Err(GraphError::usage(format!(
            "{}: multi graphs are not supported. Convert the graph to a simple one first.",
            name
        )));
    }

    if !options.allow_self_loops && graph.self_loop_count() > 0 {
        return Err(GraphError::usage(format!(
            "{}: the graph holds {} self-loop(s) but self-loops were disallowed.",
            name,
            graph.self_loop_count()
        )));
    }

    if !options.resolution.is_finite() {
        return Err(GraphError::invalid_argument(format!(
            "{}: resolution must be a finite number, got {}.",
            name, options.resolution
        )));
    }

    Ok(())
}

/// History of contractions
///
/// Level `k` maps the row ids of level `k` to the row ids of level `k + 1`.
/// Composing the first `k` levels maps original nodes to the communities
/// they belong to after `k` contractions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dendrogram {
    levels: Vec<Vec<usize>>,
    mapping: Vec<usize>,
}

impl Dendrogram {
    pub(crate) fn new(order: usize) -> Self {
        Self {
            levels: Vec::new(),
            mapping: (0..order).collect(),
        }
    }

    pub(crate) fn push(&mut self, level: Vec<usize>) {
        for community in self.mapping.iter_mut() {
            *community = level[*community];
        }
        self.levels.push(level);
    }

    /// Number of contractions recorded
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    /// Community of every original node after the last contraction
    pub fn mapping(&self) -> &[usize] {
        &self.mapping
    }

    /// Community of every original node after `level` contractions.
    /// Level 0 is the identity.
    pub fn unroll(&self, level: usize) -> Result<Vec<usize>> {
        if level > self.levels.len() {
            return Err(GraphError::invalid_argument(format!(
                "level {} does not exist, the dendrogram is {} level(s) deep",
                level,
                self.levels.len()
            )));
        }

        if level == self.levels.len() {
            return Ok(self.mapping.clone());
        }

        let mut communities: Vec<usize> = (0..self.mapping.len()).collect();
        for map in &self.levels[..level] {
            for community in communities.iter_mut() {
                *community = map[*community];
            }
        }
        Ok(communities)
    }
}

/// Renumber communities by order of first appearance among the first
/// `rows` rows, rewriting `belongings` in place. Returns the number of
/// communities and the old-to-new label table (`usize::MAX` for ids that
/// no row belonged to).
pub(crate) fn renumber(belongings: &mut [usize], rows: usize) -> (usize, Vec<usize>) {
    let mut labels = vec![usize::MAX; rows];
    let mut count = 0;

    for community in belongings[..rows].iter_mut() {
        if labels[*community] == usize::MAX {
            labels[*community] = count;
            count += 1;
        }
        *community = labels[*community];
    }
    (count, labels)
}

pub(crate) fn label_nodes(nodes: &[String], communities: Vec<usize>) -> IndexMap<String, usize> {
    nodes.iter().cloned().zip(communities).collect()
}
