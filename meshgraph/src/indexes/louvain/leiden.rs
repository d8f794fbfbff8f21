// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Leiden refinement on top of an undirected Louvain index
//!
//! After local moving, every community of the index (a macro community) is
//! refined into sub-communities. Each row starts alone. A row that is well
//! connected to the rest of its macro community may then join an adjacent,
//! well connected sub-community, picked at random with a probability that
//! grows exponentially with the modularity gain (`randomness` is the
//! temperature). Rows only join sub-communities they share an edge with, so
//! every refined community is connected.
//!
//! Zooming out contracts the refined communities, not the macro ones, then
//! puts the contracted rows back together in their macro community. The
//! next level therefore starts from the partition local moving found.
//!
//! A row `v` with weighted degree `k_v` is well connected to a set `S` of
//! total degree `K_S` when `E(v, S - v) >= res * k_v * (K_S - k_v) / 2M`,
//! and likewise for a sub-community `C` of `S`.

use super::undirected::UndirectedLouvainIndex;
use crate::indexes::neighborhood::CsrLayout;
use crate::indexes::sparse::SparseMap;
use log::trace;

/// Default temperature of the randomized merge
pub const DEFAULT_RANDOMNESS: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct UndirectedLeidenAddenda {
    randomness: f64,
    rows: usize,

    // Rows grouped by macro community
    macro_count: usize,
    offsets: Vec<usize>,
    sorted_rows: Vec<usize>,
    group_bounds: Vec<usize>,

    // Refined partition of the current rows
    refined_count: usize,
    refined: Vec<usize>,
    non_singleton: Vec<bool>,
    degrees: Vec<f64>,
    node_external: Vec<f64>,
    refined_weights: Vec<f64>,
    external_weights: Vec<f64>,
    neighboring: SparseMap<f64>,
    candidates: Vec<(usize, f64)>,
    cumulative: Vec<f64>,
    isolated: Vec<usize>,
    macro_communities: Vec<Vec<usize>>,
}

impl UndirectedLeidenAddenda {
    /// Work space for `index`. Later levels have fewer rows, so the
    /// capacity taken here covers the whole run.
    pub fn new(index: &UndirectedLouvainIndex, randomness: f64) -> Self {
        let capacity = index.community_count();

        Self {
            randomness,
            rows: capacity,
            macro_count: capacity,
            offsets: vec![0; capacity],
            sorted_rows: vec![0; capacity],
            group_bounds: Vec::with_capacity(capacity + 1),
            refined_count: capacity,
            refined: (0..capacity).collect(),
            non_singleton: vec![false; capacity],
            degrees: vec![0.0; capacity],
            node_external: vec![0.0; capacity],
            refined_weights: vec![0.0; capacity],
            external_weights: vec![0.0; capacity],
            neighboring: SparseMap::new(capacity),
            candidates: Vec::new(),
            cumulative: Vec::new(),
            isolated: vec![0; capacity],
            macro_communities: Vec::new(),
        }
    }

    pub fn randomness(&self) -> f64 {
        self.randomness
    }

    /// Number of non-empty communities seen by the last grouping
    pub fn macro_count(&self) -> usize {
        self.macro_count
    }

    /// Number of refined communities found by the last refinement
    pub fn refined_count(&self) -> usize {
        self.refined_count
    }

    /// Refined community of every row, named after one of its rows
    pub fn refined(&self) -> &[usize] {
        &self.refined[..self.rows]
    }

    /// Refined communities of every macro community, as of the last
    /// refinement or split
    pub fn macro_communities(&self) -> &[Vec<usize>] {
        &self.macro_communities
    }

    /// Sort the rows of `index` by community, communities in id order
    pub fn group_by_communities(&mut self, index: &UndirectedLouvainIndex) {
        let rows = index.community_count();
        let counts = index.counts();

        self.group_bounds.clear();
        let mut n = 0;
        for (community, count) in counts.iter().enumerate() {
            if *count != 0 {
                self.group_bounds.push(n);
                self.offsets[community] = n;
                n += count;
            }
        }
        self.group_bounds.push(n);

        for (i, community) in index.belongings().iter().enumerate() {
            self.sorted_rows[self.offsets[*community]] = i;
            self.offsets[*community] += 1;
        }

        self.rows = rows;
        self.macro_count = self.group_bounds.len() - 1;
    }

    /// Rows of every macro community, as of the last grouping
    pub fn communities(&self) -> Vec<Vec<usize>> {
        self.group_bounds
            .windows(2)
            .map(|bounds| self.sorted_rows[bounds[0]..bounds[1]].to_vec())
            .collect()
    }

    /// Refine every macro community of `index`
    pub fn refine_partition(&mut self, index: &UndirectedLouvainIndex, rng: &mut fastrand::Rng) {
        self.group_by_communities(index);
        self.refined_count = self.rows;
        self.macro_communities.clear();

        for group in 0..self.macro_count {
            let (start, end) = (self.group_bounds[group], self.group_bounds[group + 1]);
            let refined = self.merge_nodes_subset(index, start, end, rng);
            self.macro_communities.push(refined);
        }

        trace!(
            "Leiden refinement: {} communities refined into {}",
            self.macro_count,
            self.refined_count
        );
    }

    /// Refine the macro community whose rows sit in
    /// `sorted_rows[start..end]`. Returns its refined communities.
    fn merge_nodes_subset(
        &mut self,
        index: &UndirectedLouvainIndex,
        start: usize,
        end: usize,
        rng: &mut fastrand::Rng,
    ) -> Vec<usize> {
        let belongings = index.belongings();
        let loops = index.loops();
        let weights = index.weights();
        let neighborhood = index.neighborhood();
        let scale = index.resolution() / (2.0 * index.total_weight());

        let macro_community = belongings[self.sorted_rows[start]];
        let mut group_weight = 0.0;

        for &i in &self.sorted_rows[start..end] {
            let mut degree = 0.0;
            let mut inside = 0.0;

            let (first, last) = index.bounds(i);
            for j in first..last {
                degree += weights[j];
                if belongings[neighborhood.get(j)] == macro_community {
                    inside += weights[j];
                }
            }

            self.refined[i] = i;
            self.non_singleton[i] = false;
            self.degrees[i] = degree;
            self.node_external[i] = inside;
            self.refined_weights[i] = degree + loops[i];
            self.external_weights[i] = inside;
            group_weight += degree + loops[i];
        }

        let size = end - start;
        let offset = rng.usize(..size);

        for s in 0..size {
            let i = self.sorted_rows[start + (offset + s) % size];

            if self.refined[i] != i || self.non_singleton[i] {
                continue;
            }

            let node_weight = self.refined_weights[i];
            if self.node_external[i] < node_weight * (group_weight - node_weight) * scale {
                continue;
            }

            // Leave the singleton, which stays a candidate
            self.refined_weights[i] = 0.0;
            self.external_weights[i] = 0.0;

            self.neighboring.clear();
            self.neighboring.set(i, 0.0);

            let (first, last) = index.bounds(i);
            for j in first..last {
                let neighbor = neighborhood.get(j);
                if belongings[neighbor] == macro_community {
                    self.neighboring.accumulate(self.refined[neighbor], weights[j]);
                }
            }

            self.candidates.clear();
            for (community, link) in self.neighboring.iter() {
                let weight = self.refined_weights[community];
                if self.external_weights[community] < weight * (group_weight - weight) * scale {
                    continue;
                }

                let gain = link - node_weight * weight * scale;
                if gain >= 0.0 {
                    self.candidates.push((community, gain));
                }
            }

            let chosen = self.choose(rng).unwrap_or(i);
            let link = self.neighboring.get(chosen).unwrap_or(0.0);

            self.refined_weights[chosen] += node_weight;
            self.external_weights[chosen] += self.node_external[i] - 2.0 * link;

            if chosen != i {
                self.refined[i] = chosen;
                self.non_singleton[chosen] = true;
                self.refined_count -= 1;
            }
        }

        self.neighboring.clear();
        let mut refined = Vec::new();
        for &i in &self.sorted_rows[start..end] {
            let community = self.refined[i];
            if !self.neighboring.has(community) {
                self.neighboring.set(community, 0.0);
                refined.push(community);
            }
        }
        refined
    }

    /// Draw a candidate with probability proportional to
    /// `exp(gain / randomness)`. Gains are shifted by their maximum first so
    /// the exponentials cannot overflow.
    fn choose(&mut self, rng: &mut fastrand::Rng) -> Option<usize> {
        let best = self
            .candidates
            .iter()
            .copied()
            .fold(None, |best: Option<(usize, f64)>, candidate| match best {
                Some((_, gain)) if gain >= candidate.1 => best,
                _ => Some(candidate),
            })?;

        if self.randomness <= 0.0 {
            return Some(best.0);
        }

        self.cumulative.clear();
        let mut total = 0.0;
        for (_, gain) in &self.candidates {
            total += ((gain - best.1) / self.randomness).exp();
            self.cumulative.push(total);
        }

        let r = total * rng.f64();
        let position = self
            .cumulative
            .partition_point(|sum| *sum < r)
            .min(self.candidates.len() - 1);

        Some(self.candidates[position].0)
    }

    /// Move the rows of `index` into their refined communities
    pub fn split(&mut self, index: &mut UndirectedLouvainIndex) {
        let rows = self.rows;

        for i in 0..rows {
            if self.refined[i] == i {
                self.isolated[i] = index.isolate(i, self.degrees[i]);
            }
        }

        for i in 0..rows {
            let leader = self.refined[i];
            if leader != i {
                index.move_node(i, self.degrees[i], self.isolated[leader]);
            }
        }

        for refined in self.macro_communities.iter_mut() {
            for community in refined.iter_mut() {
                *community = self.isolated[*community];
            }
        }
    }

    /// Refine, split and contract `index`, then regroup the contracted rows
    /// by macro community. Returns the new row count.
    pub fn zoom_out(&mut self, index: &mut UndirectedLouvainIndex, rng: &mut fastrand::Rng) -> usize {
        self.refine_partition(index, rng);
        self.split(index);

        let labels = index.zoom_out_labels();

        for refined in &self.macro_communities {
            let leader = labels[refined[0]];
            for community in &refined[1..] {
                index.expensive_move(labels[*community], leader);
            }
        }

        index.community_count()
    }

    /// Whether every community of `index` holds a single row
    pub fn only_singletons(&self, index: &UndirectedLouvainIndex) -> bool {
        index.counts().iter().all(|count| *count <= 1)
    }
}
