// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Louvain index over directed graphs

use super::{check_graph, label_nodes, renumber, Dendrogram, LouvainIndexOptions};
use crate::indexes::neighborhood::{assign_by_key, CsrLayout};
use crate::indexes::pointer::PointerArray;
use crate::storage::graph_store::{DegreeKind, Graph};
use crate::storage::types::{GraphError, Result};
use indexmap::IndexMap;
use log::{debug, trace};
use std::collections::BTreeMap;

/// Louvain index over a directed graph
///
/// A row holds its out entries in `[starts[i], offsets[i])` followed by its
/// in entries in `[offsets[i], starts[i + 1])`. Self-loops live in `loops`
/// and count once towards both the in and the out total.
#[derive(Debug, Clone)]
pub struct DirectedLouvainIndex {
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
    offsets: PointerArray,
    belongings: Vec<usize>,

    counts: Vec<usize>,
    unused: Vec<usize>,
    total_in_weights: Vec<f64>,
    total_out_weights: Vec<f64>,

    dendrogram: Dendrogram,
}

#[derive(Default, Clone)]
struct InducedCommunity {
    internal: f64,
    out_adjacency: BTreeMap<usize, f64>,
    in_adjacency: BTreeMap<usize, f64>,
}

impl DirectedLouvainIndex {
    pub fn new(graph: &Graph, options: &LouvainIndexOptions) -> Result<Self> {
        check_graph("DirectedLouvainIndex", graph, options)?;

        if graph.undirected_size() > 0 {
            return Err(GraphError::usage(
                "DirectedLouvainIndex: the graph holds undirected edges. Use UndirectedLouvainIndex instead.",
            ));
        }

        let order = graph.order();
        let size = (graph.directed_size() - graph.directed_self_loop_count()) * 2;
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
            offsets: PointerArray::with_max_value(size, order),
            belongings: (0..order).collect(),
            counts: vec![1; order],
            unused: vec![0; order],
            total_in_weights: vec![0.0; order],
            total_out_weights: vec![0.0; order],
            dendrogram: Dendrogram::new(order),
        };

        // Out and in halves of a row are both filled backwards
        let mut n = 0;
        for (i, id) in graph.node_ids().enumerate() {
            index.nodes.push(graph.node_key(id).to_string());

            n += graph.compute_degree(id, DegreeKind::Out, false);
            index.starts.set(i, n);

            n += graph.compute_degree(id, DegreeKind::In, false);
            index.offsets.set(i, n);
        }

        for edge in graph.edge_ids() {
            let record = graph.edge_record(edge);
            let weight = options.weight.weight_of(graph.edge_entry(edge));
            let source = ranks[record.source.index()];
            let target = ranks[record.target.index()];

            index.total_weight += weight;

            if source == target {
                index.loops[source] += weight;
                index.total_in_weights[source] += weight;
                index.total_out_weights[source] += weight;
                continue;
            }

            index.total_out_weights[source] += weight;
            index.total_in_weights[target] += weight;

            let start_source = index.starts.get(source) - 1;
            let start_target = index.offsets.get(target) - 1;
            index.starts.set(source, start_source);
            index.offsets.set(target, start_target);

            index.neighborhood.set(start_source, target);
            index.neighborhood.set(start_target, source);
            index.weights[start_source] = weight;
            index.weights[start_target] = weight;
        }

        index.starts.set(order, size);

        debug!(
            "Built directed Louvain index: {} nodes, {} entries, total weight {}",
            order, size, index.total_weight
        );

        Ok(index)
    }

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

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights[..self.entry_count]
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.offsets.prefix(self.community_count)
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

    pub fn unused(&self) -> &[usize] {
        &self.unused[..self.unused_count]
    }

    pub fn total_in_weights(&self) -> &[f64] {
        &self.total_in_weights[..self.community_count]
    }

    pub fn total_out_weights(&self) -> &[f64] {
        &self.total_out_weights[..self.community_count]
    }

    pub fn dendrogram(&self) -> &Dendrogram {
        &self.dendrogram
    }

    /// Range of row `i`'s in entries
    pub fn in_bounds(&self, i: usize) -> (usize, usize) {
        (self.offsets.get(i), self.starts.get(i + 1))
    }

    /// Range of row `i`'s out entries
    pub fn out_bounds(&self, i: usize) -> (usize, usize) {
        (self.starts.get(i), self.offsets.get(i))
    }

    fn project_range<F>(&self, range: F) -> IndexMap<String, Vec<String>>
    where
        F: Fn(usize) -> (usize, usize),
    {
        let keys = self.node_keys();
        (0..self.community_count)
            .map(|i| {
                let (start, end) = range(i);
                let neighbors = (start..end)
                    .map(|j| keys[self.neighborhood.get(j)].clone())
                    .collect();
                (keys[i].clone(), neighbors)
            })
            .collect()
    }

    pub fn project_in(&self) -> IndexMap<String, Vec<String>> {
        self.project_range(|i| self.in_bounds(i))
    }

    pub fn project_out(&self) -> IndexMap<String, Vec<String>> {
        self.project_range(|i| self.out_bounds(i))
    }

    pub fn isolate(&mut self, i: usize, in_degree: f64, out_degree: f64) -> usize {
        let current = self.belongings[i];

        if self.counts[current] == 1 {
            return current;
        }

        debug_assert!(self.unused_count > 0, "no free community to isolate into");
        self.unused_count -= 1;
        let community = self.unused[self.unused_count];

        let loops = self.loops[i];
        self.total_in_weights[current] -= in_degree + loops;
        self.total_in_weights[community] += in_degree + loops;
        self.total_out_weights[current] -= out_degree + loops;
        self.total_out_weights[community] += out_degree + loops;

        self.belongings[i] = community;
        self.counts[current] -= 1;
        self.counts[community] += 1;

        community
    }

    /// Move row `i` into `target`. Degrees exclude loops.
    pub fn move_node(&mut self, i: usize, in_degree: f64, out_degree: f64, target: usize) {
        let current = self.belongings[i];
        let loops = self.loops[i];

        self.total_in_weights[current] -= in_degree + loops;
        self.total_in_weights[target] += in_degree + loops;
        self.total_out_weights[current] -= out_degree + loops;
        self.total_out_weights[target] += out_degree + loops;

        self.belongings[i] = target;

        self.counts[current] -= 1;
        self.counts[target] += 1;

        if self.counts[current] == 0 {
            self.unused[self.unused_count] = current;
            self.unused_count += 1;
        }
    }

    pub fn compute_node_in_degree(&self, i: usize) -> f64 {
        let (start, end) = self.in_bounds(i);
        self.weights[start..end].iter().sum()
    }

    pub fn compute_node_out_degree(&self, i: usize) -> f64 {
        let (start, end) = self.out_bounds(i);
        self.weights[start..end].iter().sum()
    }

    /// `(in, out)` weighted degrees of row `i`, loops excluded
    pub fn compute_node_degree(&self, i: usize) -> (f64, f64) {
        (self.compute_node_in_degree(i), self.compute_node_out_degree(i))
    }

    pub fn expensive_isolate(&mut self, i: usize) -> usize {
        let (in_degree, out_degree) = self.compute_node_degree(i);
        self.isolate(i, in_degree, out_degree)
    }

    pub fn expensive_move(&mut self, i: usize, target: usize) {
        let (in_degree, out_degree) = self.compute_node_degree(i);
        self.move_node(i, in_degree, out_degree, target);
    }

    /// Modularity gain of inserting isolated row `i` into `target`.
    /// `target_degree` sums the weights of both in and out entries linking
    /// the row to that community.
    pub fn delta(&self, i: usize, in_degree: f64, out_degree: f64, target_degree: f64, target: usize) -> f64 {
        let m = self.total_weight;
        let loops = self.loops[i];
        let in_degree = in_degree + loops;
        let out_degree = out_degree + loops;

        target_degree / m
            - (out_degree * self.total_in_weights[target] + in_degree * self.total_out_weights[target])
                * self.resolution
                / (m * m)
    }

    pub fn delta_with_own_community(
        &self,
        i: usize,
        in_degree: f64,
        out_degree: f64,
        target_degree: f64,
        target: usize,
    ) -> f64 {
        let m = self.total_weight;
        let loops = self.loops[i];
        let in_degree = in_degree + loops;
        let out_degree = out_degree + loops;

        target_degree / m
            - (out_degree * (self.total_in_weights[target] - in_degree)
                + in_degree * (self.total_out_weights[target] - out_degree))
                * self.resolution
                / (m * m)
    }

    /// Contract every community into one row. Returns the new row count.
    pub fn zoom_out(&mut self) -> usize {
        let rows = self.community_count;
        let (count, labels) = renumber(&mut self.belongings, rows);

        let mut totals = vec![(0.0, 0.0); count];
        for (community, label) in labels.iter().enumerate() {
            if *label != usize::MAX {
                totals[*label] = (
                    self.total_in_weights[community],
                    self.total_out_weights[community],
                );
            }
        }

        self.dendrogram.push(self.belongings[..rows].to_vec());

        let mut induced = vec![InducedCommunity::default(); count];

        for i in 0..rows {
            let ci = self.belongings[i];
            let offset = self.offsets.get(i);
            let community = &mut induced[ci];
            community.internal += self.loops[i];

            let (start, end) = self.bounds(i);
            for j in start..end {
                let cj = self.belongings[self.neighborhood.get(j)];
                let out = j < offset;

                if ci == cj {
                    // Each internal edge is seen from both ends; keep one
                    if out {
                        community.internal += self.weights[j];
                    }
                    continue;
                }

                let adjacency = if out {
                    &mut community.out_adjacency
                } else {
                    &mut community.in_adjacency
                };
                *adjacency.entry(cj).or_insert(0.0) += self.weights[j];
            }
        }

        let mut n = 0;
        for (ci, community) in induced.into_iter().enumerate() {
            let (total_in, total_out) = totals[ci];
            self.total_in_weights[ci] = total_in;
            self.total_out_weights[ci] = total_out;
            self.loops[ci] = community.internal;
            self.counts[ci] = 1;
            self.starts.set(ci, n);
            self.belongings[ci] = ci;

            for (cj, weight) in community.out_adjacency {
                self.neighborhood.set(n, cj);
                self.weights[n] = weight;
                n += 1;
            }

            self.offsets.set(ci, n);

            for (cj, weight) in community.in_adjacency {
                self.neighborhood.set(n, cj);
                self.weights[n] = weight;
                n += 1;
            }
        }
        self.starts.set(count, n);

        trace!(
            "Directed Louvain zoom out: {} rows -> {} rows, {} entries",
            rows,
            count,
            n
        );

        self.community_count = count;
        self.entry_count = n;
        self.unused_count = 0;
        self.level += 1;

        count
    }

    pub fn modularity(&self) -> f64 {
        let m = self.total_weight;
        let mut internal = vec![0.0; self.community_count];

        for i in 0..self.community_count {
            let ci = self.belongings[i];
            internal[ci] += self.loops[i];

            let (start, end) = self.out_bounds(i);
            for j in start..end {
                if self.belongings[self.neighborhood.get(j)] == ci {
                    internal[ci] += self.weights[j];
                }
            }
        }

        internal
            .iter()
            .enumerate()
            .map(|(c, inside)| {
                inside / m
                    - self.total_in_weights[c] * self.total_out_weights[c] / (m * m) * self.resolution
            })
            .sum()
    }

    pub fn collect(&self) -> IndexMap<String, usize> {
        label_nodes(&self.nodes, self.dendrogram.mapping().to_vec())
    }

    pub fn collect_level(&self, level: usize) -> Result<IndexMap<String, usize>> {
        Ok(label_nodes(&self.nodes, self.dendrogram.unroll(level)?))
    }

    pub fn assign(&self, graph: &mut Graph, name: &str) -> Result<()> {
        assign_by_key(graph, &self.nodes, name, self.dendrogram.mapping())
    }

    pub fn assign_level(&self, graph: &mut Graph, name: &str, level: usize) -> Result<()> {
        assign_by_key(graph, &self.nodes, name, &self.dendrogram.unroll(level)?)
    }
}

impl CsrLayout for DirectedLouvainIndex {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::indexes::louvain::fixtures::{clique, from_edges};
    use crate::indexes::louvain::UndirectedLouvainIndex;

    const DIRECTED_MOVES: [(usize, f64, f64, usize); 4] =
        [(1, 2.0, 1.0, 2), (0, 1.0, 2.0, 4), (5, 0.0, 1.0, 2), (3, 1.0, 1.0, 2)];

    fn unweighted(graph: &Graph) -> DirectedLouvainIndex {
        DirectedLouvainIndex::new(graph, &LouvainIndexOptions::unweighted()).unwrap()
    }

    fn apply_moves(index: &mut DirectedLouvainIndex) {
        for (i, in_degree, out_degree, target) in DIRECTED_MOVES {
            index.move_node(i, in_degree, out_degree, target);
        }
    }

    fn close_to(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-4, "{} is not close to {}", a, b);
    }

    #[test]
    fn test_index_layout() {
        let graph = from_edges(Graph::directed());
        let index = DirectedLouvainIndex::new(&graph, &LouvainIndexOptions::default()).unwrap();

        assert_eq!(index.total_weight(), 162.0);

        let projection = index.project();
        assert_eq!(projection["1"], vec!["5", "2", "5"]);
        assert_eq!(projection["2"], vec!["3", "4", "1"]);
        assert_eq!(projection["6"], vec!["3"]);

        let out = index.project_out();
        assert_eq!(out["1"], vec!["5", "2"]);
        assert_eq!(out["4"], vec!["2"]);

        let inbound = index.project_in();
        assert_eq!(inbound["2"], vec!["4", "1"]);
        assert_eq!(inbound["3"], vec!["6", "2"]);
        assert!(inbound["6"].is_empty());

        assert_eq!(
            index.neighborhood().to_vec(),
            vec![4, 1, 4, 2, 3, 0, 3, 5, 1, 1, 2, 0, 0, 2]
        );
        assert_eq!(
            index.weights(),
            &[1.0, 30.0, 5.0, 15.0, 1.0, 30.0, 10.0, 100.0, 15.0, 1.0, 10.0, 5.0, 1.0, 100.0]
        );
        assert_eq!(index.offsets(), vec![2, 4, 7, 10, 12, 14]);
        assert_eq!(index.total_in_weights(), &[5.0, 31.0, 115.0, 10.0, 1.0, 0.0]);
        assert_eq!(index.total_out_weights(), &[31.0, 15.0, 10.0, 1.0, 5.0, 100.0]);
    }

    #[test]
    fn test_moves() {
        let graph = from_edges(Graph::directed());
        let mut index = unweighted(&graph);

        index.move_node(0, 1.0, 2.0, 1);
        assert_eq!(index.belongings(), &[1, 1, 2, 3, 4, 5]);
        assert_eq!(index.total_in_weights(), &[0.0, 3.0, 2.0, 1.0, 1.0, 0.0]);
        assert_eq!(index.total_out_weights(), &[0.0, 3.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(index.unused(), &[0]);
    }

    #[test]
    fn test_zoom_out() {
        let graph = from_edges(Graph::directed());
        let mut index = unweighted(&graph);
        apply_moves(&mut index);

        close_to(index.modularity(), 0.3265);

        assert_eq!(index.zoom_out(), 2);
        assert_eq!(index.total_in_weights(), &[2.0, 5.0]);
        assert_eq!(index.total_out_weights(), &[3.0, 4.0]);
        assert_eq!(index.loops(), &[2.0, 4.0]);
        assert_eq!(index.project_out()["1"], vec!["2"]);
        assert!(index.project_in()["1"].is_empty());
        close_to(index.modularity(), 0.3265);

        let level_one = index.collect_level(1).unwrap();
        assert_eq!(level_one["1"], 0);
        assert_eq!(level_one["5"], 0);
        assert_eq!(level_one["3"], 1);

        index.expensive_move(0, 1);
        index.zoom_out();
        assert_eq!(index.community_count(), 1);
        assert_eq!(index.total_in_weights(), &[7.0]);
        assert!(index.collect().values().all(|community| *community == 0));
    }

    #[test]
    fn test_deltas() {
        let graph = from_edges(Graph::directed());
        let mut index = unweighted(&graph);
        apply_moves(&mut index);

        close_to(index.delta(1, 2.0, 1.0, 1.0, 4), -1.0 / 49.0);
        close_to(index.delta(0, 1.0, 2.0, 1.0, 2), -1.0 / 7.0);
    }

    #[test]
    fn test_delta_matches_modularity_difference() {
        let graph = from_edges(Graph::directed());

        for resolution in [1.0, 0.5, 2.0] {
            let options = LouvainIndexOptions::unweighted().with_resolution(resolution);

            let mut index = DirectedLouvainIndex::new(&graph, &options).unwrap();
            apply_moves(&mut index);
            let delta = index.delta(1, 2.0, 1.0, 1.0, 4);

            let mut isolated = DirectedLouvainIndex::new(&graph, &options).unwrap();
            isolated.expensive_move(0, 4);
            isolated.expensive_move(5, 2);
            isolated.expensive_move(3, 2);

            let mut elsewhere = DirectedLouvainIndex::new(&graph, &options).unwrap();
            elsewhere.expensive_move(1, 4);
            elsewhere.expensive_move(0, 4);
            elsewhere.expensive_move(5, 2);
            elsewhere.expensive_move(3, 2);

            close_to(isolated.modularity() + delta, elsewhere.modularity());

            let own = index.delta_with_own_community(1, 2.0, 1.0, 2.0, 2);
            close_to(isolated.modularity() + own, index.modularity());
            close_to(isolated.delta_with_own_community(1, 2.0, 1.0, 0.0, 1), 0.0);

            index.zoom_out();
            let mut contracted = DirectedLouvainIndex::new(&graph, &options).unwrap();
            apply_moves(&mut contracted);
            contracted.zoom_out();
            contracted.expensive_move(1, 0);

            close_to(index.delta_with_own_community(1, 1.0, 0.0, 0.0, 1), 0.0);
            close_to(index.modularity() + index.delta(1, 1.0, 0.0, 1.0, 0), contracted.modularity());
        }
    }

    #[test]
    fn test_self_loops() {
        let mut graph = from_edges(Graph::directed());
        graph.add_edge("1", "1", attrs!()).unwrap();

        let index = DirectedLouvainIndex::new(&graph, &LouvainIndexOptions::default()).unwrap();
        assert_eq!(index.loops()[0], 1.0);
        assert_eq!(index.entry_count(), 14);
    }

    #[test]
    fn test_zoom_out_with_parallel_links() {
        let mut graph = clique(Graph::directed());
        graph.add_edge("0", "0", attrs!()).unwrap();

        let mut index = unweighted(&graph);
        index.expensive_move(1, 0);
        index.expensive_move(3, 2);

        let before = index.modularity();
        index.zoom_out();

        assert_eq!(index.entry_count(), 4);
        assert_eq!(index.total_in_weights(), &[7.0, 6.0]);
        assert_eq!(index.total_out_weights(), &[7.0, 6.0]);
        close_to(index.modularity(), before);

        let mut graph = Graph::directed();
        for (source, target) in [("0", "0"), ("0", "1"), ("1", "2"), ("1", "3"), ("3", "2")] {
            graph.merge_edge(source, target, attrs!()).unwrap();
        }

        let mut index = unweighted(&graph);
        index.expensive_move(1, 0);
        index.expensive_move(3, 2);
        index.zoom_out();

        assert_eq!(index.total_weight(), 5.0);
        assert_eq!(index.total_in_weights(), &[2.0, 3.0]);
        assert_eq!(index.total_out_weights(), &[4.0, 1.0]);
    }

    #[test]
    fn test_mutual_graph_matches_undirected_modularity() {
        let undirected = from_edges(Graph::undirected());

        let mut mutual = Graph::directed();
        for node in undirected.nodes() {
            mutual.add_node(node, attrs!()).unwrap();
        }
        for entry in undirected.edge_entries() {
            mutual.merge_edge(entry.source, entry.target, attrs!()).unwrap();
            mutual.merge_edge(entry.target, entry.source, attrs!()).unwrap();
        }

        let mut undirected_index =
            UndirectedLouvainIndex::new(&undirected, &LouvainIndexOptions::unweighted()).unwrap();
        for (i, degree, target) in [(1, 3.0, 2), (0, 2.0, 4), (5, 1.0, 2), (3, 2.0, 2)] {
            undirected_index.move_node(i, degree, target);
        }
        undirected_index.zoom_out();

        let mut directed_index = unweighted(&mutual);
        directed_index.expensive_move(1, 2);
        directed_index.expensive_move(0, 4);
        directed_index.expensive_move(5, 2);
        directed_index.expensive_move(3, 2);
        directed_index.zoom_out();

        close_to(undirected_index.modularity(), directed_index.modularity());
    }

    #[test]
    fn test_rejects_undirected_edges() {
        let graph = from_edges(Graph::undirected());
        assert!(DirectedLouvainIndex::new(&graph, &LouvainIndexOptions::default())
            .unwrap_err()
            .is_usage());
    }
}
