// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Louvain index over undirected graphs

use super::{check_graph, label_nodes, renumber, Dendrogram, LouvainIndexOptions};
use crate::indexes::neighborhood::{assign_by_key, CsrLayout};
use crate::indexes::pointer::PointerArray;
use crate::storage::graph_store::{DegreeKind, Graph};
use crate::storage::types::{GraphError, Result};
use indexmap::IndexMap;
use log::{debug, trace};
use std::collections::BTreeMap;

/// Louvain index over an undirected graph
///
/// Every non-loop edge is stored twice, once in each endpoint's row. A
/// self-loop is not stored in the neighborhood: it is folded into the
/// row's `loops`, counted twice like any undirected degree contribution.
#[derive(Debug, Clone)]
pub struct UndirectedLouvainIndex {
    community_count: usize,
    total_weight: f64,
    entry_count: usize,
    unused_count: usize,
    resolution: f64,
    level: usize,
    nodes: Vec<String>,

    neighborhood: PointerArray,
    weights: Vec<f64>,

    loops: Vec<f64>,
    starts: PointerArray,
    belongings: Vec<usize>,

    counts: Vec<usize>,
    unused: Vec<usize>,
    total_weights: Vec<f64>,

    dendrogram: Dendrogram,
}

impl UndirectedLouvainIndex {
    pub fn new(graph: &Graph, options: &LouvainIndexOptions) -> Result<Self> {
        check_graph("UndirectedLouvainIndex", graph, options)?;

        if graph.directed_size() > 0 {
            return Err(GraphError::usage(
                "UndirectedLouvainIndex: the graph holds directed edges. Use DirectedLouvainIndex instead.",
            ));
        }

        let order = graph.order();
        let size = (graph.undirected_size() - graph.undirected_self_loop_count()) * 2;
        let ranks = graph.node_ranks();

        let mut index = Self {
            community_count: order,
            total_weight: 0.0,
            entry_count: size,
            unused_count: 0,
            resolution: options.resolution,
            level: 0,
            nodes: Vec::with_capacity(order),
            neighborhood: PointerArray::with_max_value(order, size),
            weights: vec![0.0; size],
            loops: vec![0.0; order],
            starts: PointerArray::with_max_value(size, order + 1),
            belongings: (0..order).collect(),
            counts: vec![1; order],
            unused: vec![0; order],
            total_weights: vec![0.0; order],
            dendrogram: Dendrogram::new(order),
        };

        // Rows are filled backwards from their end offset
        let mut n = 0;
        for (i, id) in graph.node_ids().enumerate() {
            index.nodes.push(graph.node_key(id).to_string());
            n += graph.compute_degree(id, DegreeKind::Undirected, false);
            index.starts.set(i, n);
        }

        for edge in graph.edge_ids() {
            let record = graph.edge_record(edge);
            let weight = options.weight.weight_of(graph.edge_entry(edge));
            let source = ranks[record.source.index()];
            let target = ranks[record.target.index()];

            index.total_weight += weight;

            if source == target {
                index.total_weights[source] += weight * 2.0;
                index.loops[source] = weight * 2.0;
                continue;
            }

            index.total_weights[source] += weight;
            index.total_weights[target] += weight;

            let start_source = index.starts.get(source) - 1;
            let start_target = index.starts.get(target) - 1;
            index.starts.set(source, start_source);
            index.starts.set(target, start_target);

            index.neighborhood.set(start_source, target);
            index.neighborhood.set(start_target, source);
            index.weights[start_source] = weight;
            index.weights[start_target] = weight;
        }

        index.starts.set(order, size);

        debug!(
            "Built undirected Louvain index: {} nodes, {} entries, total weight {}",
            order, size, index.total_weight
        );

        Ok(index)
    }

    /// Current number of rows, i.e. communities of the previous level
    pub fn community_count(&self) -> usize {
        self.community_count
    }

    /// Sum of all edge weights (`M`)
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn unused_count(&self) -> usize {
        self.unused_count
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of contractions performed so far
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights[..self.entry_count]
    }

    pub fn loops(&self) -> &[f64] {
        &self.loops[..self.community_count]
    }

    pub fn belongings(&self) -> &[usize] {
        &self.belongings[..self.community_count]
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts[..self.community_count]
    }

    /// Stack of emptied community ids
    pub fn unused(&self) -> &[usize] {
        &self.unused[..self.unused_count]
    }

    pub fn total_weights(&self) -> &[f64] {
        &self.total_weights[..self.community_count]
    }

    pub fn dendrogram(&self) -> &Dendrogram {
        &self.dendrogram
    }

    /// Give row `i` a community of its own. `degree` excludes loops.
    /// Returns the row's community afterwards.
    pub fn isolate(&mut self, i: usize, degree: f64) -> usize {
        let current = self.belongings[i];

        if self.counts[current] == 1 {
            return current;
        }

        debug_assert!(self.unused_count > 0, "no free community to isolate into");
        self.unused_count -= 1;
        let community = self.unused[self.unused_count];

        let moved = degree + self.loops[i];
        self.total_weights[current] -= moved;
        self.total_weights[community] += moved;

        self.belongings[i] = community;
        self.counts[current] -= 1;
        self.counts[community] += 1;

        community
    }

    /// Move row `i` into `target`. `degree` excludes loops.
    pub fn move_node(&mut self, i: usize, degree: f64, target: usize) {
        let current = self.belongings[i];

        let moved = degree + self.loops[i];
        self.total_weights[current] -= moved;
        self.total_weights[target] += moved;

        self.belongings[i] = target;

        self.counts[current] -= 1;
        self.counts[target] += 1;

        if self.counts[current] == 0 {
            self.unused[self.unused_count] = current;
            self.unused_count += 1;
        }
    }

    /// Weighted degree of row `i`, loops excluded
    pub fn compute_node_degree(&self, i: usize) -> f64 {
        let (start, end) = self.bounds(i);
        self.weights[start..end].iter().sum()
    }

    pub fn expensive_isolate(&mut self, i: usize) -> usize {
        let degree = self.compute_node_degree(i);
        self.isolate(i, degree)
    }

    pub fn expensive_move(&mut self, i: usize, target: usize) {
        let degree = self.compute_node_degree(i);
        self.move_node(i, degree, target);
    }

    /// Modularity gain of inserting isolated row `i` into `target`, given
    /// the weight `target_degree` linking the row to that community
    pub fn delta(&self, i: usize, degree: f64, target_degree: f64, target: usize) -> f64 {
        let m = self.total_weight;
        let degree = degree + self.loops[i];

        target_degree / m - (self.total_weights[target] * degree * self.resolution) / (2.0 * m * m)
    }

    /// Same as [`delta`](Self::delta) when `target` is the row's own
    /// community, whose total still includes the row
    pub fn delta_with_own_community(&self, i: usize, degree: f64, target_degree: f64, target: usize) -> f64 {
        let m = self.total_weight;
        let degree = degree + self.loops[i];

        target_degree / m
            - ((self.total_weights[target] - degree) * degree * self.resolution) / (2.0 * m * m)
    }

    /// [`delta`](Self::delta) scaled by `M`. Ranks targets identically.
    pub fn fast_delta(&self, i: usize, degree: f64, target_degree: f64, target: usize) -> f64 {
        let m = self.total_weight;
        let degree = degree + self.loops[i];

        target_degree - (degree * self.total_weights[target] * self.resolution) / (2.0 * m)
    }

    pub fn fast_delta_with_own_community(&self, i: usize, degree: f64, target_degree: f64, target: usize) -> f64 {
        let m = self.total_weight;
        let degree = degree + self.loops[i];

        target_degree - (degree * (self.total_weights[target] - degree) * self.resolution) / (2.0 * m)
    }

    /// Contract every community into one row. Returns the new row count.
    pub fn zoom_out(&mut self) -> usize {
        self.zoom_out_labels();
        self.community_count
    }

    /// Contract every community into one row and return, for each
    /// community id of the level just left, the row it became
    /// (`usize::MAX` for ids no row belonged to)
    pub(crate) fn zoom_out_labels(&mut self) -> Vec<usize> {
        let rows = self.community_count;
        let (count, labels) = renumber(&mut self.belongings, rows);

        let mut totals = vec![0.0; count];
        for (community, label) in labels.iter().enumerate() {
            if *label != usize::MAX {
                totals[*label] = self.total_weights[community];
            }
        }

        self.dendrogram.push(self.belongings[..rows].to_vec());

        let mut internal = vec![0.0; count];
        let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];

        for i in 0..rows {
            let ci = self.belongings[i];
            internal[ci] += self.loops[i];

            let (start, end) = self.bounds(i);
            for j in start..end {
                let cj = self.belongings[self.neighborhood.get(j)];

                if ci == cj {
                    internal[ci] += self.weights[j];
                } else {
                    *adjacency[ci].entry(cj).or_insert(0.0) += self.weights[j];
                }
            }
        }

        let mut n = 0;
        for (ci, neighbors) in adjacency.into_iter().enumerate() {
            self.total_weights[ci] = totals[ci];
            self.loops[ci] = internal[ci];
            self.counts[ci] = 1;
            self.starts.set(ci, n);
            self.belongings[ci] = ci;

            for (cj, weight) in neighbors {
                self.neighborhood.set(n, cj);
                self.weights[n] = weight;
                n += 1;
            }
        }
        self.starts.set(count, n);

        trace!(
            "Undirected Louvain zoom out: {} rows -> {} rows, {} entries",
            rows,
            count,
            n
        );

        self.community_count = count;
        self.entry_count = n;
        self.unused_count = 0;
        self.level += 1;

        labels
    }

    /// Modularity of the current partition of the current rows
    pub fn modularity(&self) -> f64 {
        let m2 = self.total_weight * 2.0;
        let mut internal = vec![0.0; self.community_count];

        for i in 0..self.community_count {
            let ci = self.belongings[i];
            internal[ci] += self.loops[i];

            let (start, end) = self.bounds(i);
            for j in start..end {
                if self.belongings[self.neighborhood.get(j)] == ci {
                    internal[ci] += self.weights[j];
                }
            }
        }

        internal
            .iter()
            .zip(&self.total_weights)
            .map(|(inside, total)| inside / m2 - (total / m2).powi(2) * self.resolution)
            .sum()
    }

    /// Community of every original node after the last contraction
    pub fn collect(&self) -> IndexMap<String, usize> {
        label_nodes(&self.nodes, self.dendrogram.mapping().to_vec())
    }

    /// Community of every original node after `level` contractions
    pub fn collect_level(&self, level: usize) -> Result<IndexMap<String, usize>> {
        Ok(label_nodes(&self.nodes, self.dendrogram.unroll(level)?))
    }

    /// Write the last level's communities onto a node attribute
    pub fn assign(&self, graph: &mut Graph, name: &str) -> Result<()> {
        assign_by_key(graph, &self.nodes, name, self.dendrogram.mapping())
    }

    pub fn assign_level(&self, graph: &mut Graph, name: &str, level: usize) -> Result<()> {
        assign_by_key(graph, &self.nodes, name, &self.dendrogram.unroll(level)?)
    }
}

impl CsrLayout for UndirectedLouvainIndex {
    fn node_keys(&self) -> &[String] {
        &self.nodes[..self.community_count]
    }

    fn starts(&self) -> &PointerArray {
        &self.starts
    }

    fn neighborhood(&self) -> &PointerArray {
        &self.neighborhood
    }
}
