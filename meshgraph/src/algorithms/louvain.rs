// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Louvain community detection
//!
//! Every level runs local moves over the rows of a Louvain index until no
//! row can improve modularity by changing community, then contracts the
//! communities into the rows of the next level. The algorithm stops at the
//! first level where nothing moved.
//!
//! Two traversals are available:
//! - fast local moves: every row is queued once, and the neighbors of a row
//!   that moved are queued again when they sit outside its new community
//! - classic: full passes over the rows are repeated until a pass makes no
//!   move
//!
//! Both may start at a random row (`random_walk`), drawn from a `fastrand`
//! generator seeded by `seed` when reproducible runs are needed.

use crate::algorithms::modularity::DEFAULT_COMMUNITY_ATTRIBUTE;
use crate::indexes::louvain::{
    Dendrogram, DirectedLouvainIndex, LouvainIndexOptions, UndirectedLouvainIndex,
};
use crate::indexes::neighborhood::CsrLayout;
use crate::indexes::sparse::{SparseMap, SparseQueueSet};
use crate::indexes::weights::{EdgeWeight, DEFAULT_WEIGHT_ATTRIBUTE};
use crate::storage::graph_store::Graph;
use crate::storage::types::{GraphError, Result};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Deltas closer than this are considered equal
const EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LouvainOptions {
    pub resolution: f64,
    /// Read edge weights from `weight_attribute`; otherwise every edge weighs 1
    pub weighted: bool,
    pub weight_attribute: String,
    /// Node attribute written by [`louvain_assign`]
    pub community_attribute: String,
    pub fast_local_moves: bool,
    /// Start every traversal at a random row instead of row 0
    pub random_walk: bool,
    /// Seed of the random walk. Unseeded runs draw from entropy.
    pub seed: Option<u64>,
    /// Report the community of every node at every level
    pub keep_dendrogram: bool,
    pub allow_self_loops: bool,
}

impl Default for LouvainOptions {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            weighted: false,
            weight_attribute: DEFAULT_WEIGHT_ATTRIBUTE.to_string(),
            community_attribute: DEFAULT_COMMUNITY_ATTRIBUTE.to_string(),
            fast_local_moves: true,
            random_walk: true,
            seed: None,
            keep_dendrogram: true,
            allow_self_loops: true,
        }
    }
}

impl LouvainOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(GraphError::invalid_argument(format!(
                "louvain: resolution must be a positive finite number, got {}.",
                self.resolution
            )));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn index_options(&self) -> LouvainIndexOptions {
        LouvainIndexOptions {
            weight: if self.weighted {
                EdgeWeight::Attribute(self.weight_attribute.clone())
            } else {
                EdgeWeight::Unweighted
            },
            resolution: self.resolution,
            allow_self_loops: self.allow_self_loops,
        }
    }
}

/// Moves made at every level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LouvainMoves {
    /// One count per level
    Fast(Vec<usize>),
    /// One count per pass, grouped by level
    Classic(Vec<Vec<usize>>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LouvainReport {
    pub communities: IndexMap<String, usize>,
    pub count: usize,
    pub delta_computations: usize,
    /// Community of every node after each contraction, by node order
    pub dendrogram: Option<Vec<Vec<usize>>>,
    pub level: usize,
    /// NaN when the graph has no edges
    pub modularity: f64,
    pub moves: Option<LouvainMoves>,
    pub nodes_visited: usize,
    pub resolution: f64,
}

/// Run Louvain and return the community of every node
pub fn louvain(graph: &Graph, options: &LouvainOptions) -> Result<IndexMap<String, usize>> {
    Ok(louvain_detailed(graph, options)?.communities)
}

/// Run Louvain and write communities onto `options.community_attribute`
pub fn louvain_assign(graph: &mut Graph, options: &LouvainOptions) -> Result<()> {
    let communities = louvain(graph, options)?;
    for (node, community) in communities {
        graph.set_node_attribute(&node, &options.community_attribute, community)?;
    }
    Ok(())
}

pub fn louvain_detailed(graph: &Graph, options: &LouvainOptions) -> Result<LouvainReport> {
    options.validate()?;

    if graph.directed_size() > 0 && graph.undirected_size() > 0 {
        return Err(GraphError::usage(
            "louvain: cannot run the algorithm on a true mixed graph.",
        ));
    }

    if graph.size() == 0 {
        return Ok(singletons(graph, options.resolution));
    }

    let index_options = options.index_options();
    let mut rng = match options.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };

    if graph.directed_size() > 0 {
        let mut index = DirectedLouvainIndex::new(graph, &index_options)?;
        let trace = optimize(&mut index, options, &mut rng);
        Ok(report(&index, trace, options.keep_dendrogram, options.resolution))
    } else {
        let mut index = UndirectedLouvainIndex::new(graph, &index_options)?;
        let trace = optimize(&mut index, options, &mut rng);
        Ok(report(&index, trace, options.keep_dendrogram, options.resolution))
    }
}

pub(crate) fn singletons(graph: &Graph, resolution: f64) -> LouvainReport {
    let communities: IndexMap<String, usize> = graph
        .nodes()
        .enumerate()
        .map(|(community, node)| (node.to_string(), community))
        .collect();

    LouvainReport {
        count: communities.len(),
        communities,
        delta_computations: 0,
        dendrogram: None,
        level: 0,
        modularity: f64::NAN,
        moves: None,
        nodes_visited: 0,
        resolution,
    }
}

/// Counters gathered while optimizing
pub(crate) struct Trace {
    pub(crate) delta_computations: usize,
    pub(crate) nodes_visited: usize,
    pub(crate) moves: LouvainMoves,
}

/// What the optimizer needs from an index
pub(crate) trait LocalMoving: CsrLayout {
    fn community_of(&self, row: usize) -> usize;

    /// Move row `i` to its best community. Returns the community it landed
    /// in, or `None` when it stayed put.
    fn visit(&mut self, i: usize, communities: &mut SparseMap<f64>, computations: &mut usize) -> Option<usize>;

    fn contract(&mut self) -> usize;

    fn current_level(&self) -> usize;

    fn current_modularity(&self) -> f64;

    fn history(&self) -> &Dendrogram;

    fn collect_all(&self) -> IndexMap<String, usize>;
}

/// Whether `delta` beats `best`. Near-ties keep the current community,
/// otherwise they favor the highest community id.
fn improves(best: usize, current: usize, target: usize, delta: f64, best_delta: f64) -> bool {
    if (delta - best_delta).abs() < EPSILON {
        if best == current {
            false
        } else {
            target > best
        }
    } else {
        delta > best_delta
    }
}

/// Best target among the neighboring communities gathered in `communities`
fn best_target<F>(
    communities: &SparseMap<f64>,
    current: usize,
    baseline: f64,
    computations: &mut usize,
    mut delta: F,
) -> (usize, f64)
where
    F: FnMut(usize, f64) -> f64,
{
    let mut best = current;
    let mut best_delta = baseline;

    for (target, target_degree) in communities.iter() {
        if target == current {
            continue;
        }

        *computations += 1;
        let candidate = delta(target, target_degree);

        if improves(best, current, target, candidate, best_delta) {
            best = target;
            best_delta = candidate;
        }
    }

    (best, best_delta)
}

impl LocalMoving for UndirectedLouvainIndex {
    fn community_of(&self, row: usize) -> usize {
        self.belongings()[row]
    }

    fn visit(&mut self, i: usize, communities: &mut SparseMap<f64>, computations: &mut usize) -> Option<usize> {
        communities.clear();
        let current = self.belongings()[i];
        let mut degree = 0.0;

        let (start, end) = self.bounds(i);
        for j in start..end {
            let weight = self.weights()[j];
            degree += weight;
            communities.accumulate(self.belongings()[self.neighborhood().get(j)], weight);
        }

        let own_degree = communities.get(current).unwrap_or(0.0);
        let baseline = self.fast_delta_with_own_community(i, degree, own_degree, current);
        let (best, best_delta) = best_target(communities, current, baseline, computations, |target, target_degree| {
            self.fast_delta(i, degree, target_degree, target)
        });

        if best_delta < 0.0 {
            let community = self.isolate(i, degree);
            (community != current).then_some(community)
        } else if best == current {
            None
        } else {
            self.move_node(i, degree, best);
            Some(best)
        }
    }

    fn contract(&mut self) -> usize {
        self.zoom_out()
    }

    fn current_level(&self) -> usize {
        UndirectedLouvainIndex::level(self)
    }

    fn current_modularity(&self) -> f64 {
        UndirectedLouvainIndex::modularity(self)
    }

    fn history(&self) -> &Dendrogram {
        UndirectedLouvainIndex::dendrogram(self)
    }

    fn collect_all(&self) -> IndexMap<String, usize> {
        UndirectedLouvainIndex::collect(self)
    }
}

impl LocalMoving for DirectedLouvainIndex {
    fn community_of(&self, row: usize) -> usize {
        self.belongings()[row]
    }

    fn visit(&mut self, i: usize, communities: &mut SparseMap<f64>, computations: &mut usize) -> Option<usize> {
        communities.clear();
        let current = self.belongings()[i];
        let mut in_degree = 0.0;
        let mut out_degree = 0.0;

        // Out entries come first in every row
        let (start, end) = self.bounds(i);
        let (_, offset) = self.out_bounds(i);
        for j in start..end {
            let weight = self.weights()[j];
            if j < offset {
                out_degree += weight;
            } else {
                in_degree += weight;
            }
            communities.accumulate(self.belongings()[self.neighborhood().get(j)], weight);
        }

        let own_degree = communities.get(current).unwrap_or(0.0);
        let baseline = self.delta_with_own_community(i, in_degree, out_degree, own_degree, current);
        let (best, best_delta) = best_target(communities, current, baseline, computations, |target, target_degree| {
            self.delta(i, in_degree, out_degree, target_degree, target)
        });

        if best_delta < 0.0 {
            let community = self.isolate(i, in_degree, out_degree);
            (community != current).then_some(community)
        } else if best == current {
            None
        } else {
            self.move_node(i, in_degree, out_degree, best);
            Some(best)
        }
    }

    fn contract(&mut self) -> usize {
        self.zoom_out()
    }

    fn current_level(&self) -> usize {
        DirectedLouvainIndex::level(self)
    }

    fn current_modularity(&self) -> f64 {
        DirectedLouvainIndex::modularity(self)
    }

    fn history(&self) -> &Dendrogram {
        DirectedLouvainIndex::dendrogram(self)
    }

    fn collect_all(&self) -> IndexMap<String, usize> {
        DirectedLouvainIndex::collect(self)
    }
}

/// Row a traversal of `rows` rows starts at
pub(crate) fn start_row(rng: &mut fastrand::Rng, random_walk: bool, rows: usize) -> usize {
    if random_walk && rows > 0 {
        rng.usize(..rows)
    } else {
        0
    }
}

/// One fast local-move sweep. Every row is queued once, starting at
/// `offset`, and the neighbors of a row that moved are queued again when
/// they sit outside its new community. Returns the number of moves.
pub(crate) fn fast_local_moves<I: LocalMoving>(
    index: &mut I,
    offset: usize,
    communities: &mut SparseMap<f64>,
    queue: &mut SparseQueueSet,
    delta_computations: &mut usize,
    nodes_visited: &mut usize,
) -> usize {
    let rows = index.rows();
    let mut moves = 0;

    for s in 0..rows {
        queue.enqueue((offset + s) % rows);
    }

    while let Some(i) = queue.dequeue() {
        *nodes_visited += 1;

        let Some(community) = index.visit(i, communities, delta_computations) else {
            continue;
        };

        moves += 1;

        for j in index.row(i) {
            if index.community_of(j) != community {
                queue.enqueue(j);
            }
        }
    }

    moves
}

fn optimize<I: LocalMoving>(index: &mut I, options: &LouvainOptions, rng: &mut fastrand::Rng) -> Trace {
    let capacity = index.rows();
    let mut communities = SparseMap::new(capacity);
    let mut queue = SparseQueueSet::new(capacity);

    let mut delta_computations = 0;
    let mut nodes_visited = 0;
    let mut fast_moves = Vec::new();
    let mut classic_moves = Vec::new();

    loop {
        let rows = index.rows();
        let mut move_was_made = false;

        if options.fast_local_moves {
            let offset = start_row(rng, options.random_walk, rows);
            let level_moves = fast_local_moves(
                index,
                offset,
                &mut communities,
                &mut queue,
                &mut delta_computations,
                &mut nodes_visited,
            );

            move_was_made = level_moves > 0;
            fast_moves.push(level_moves);
        } else {
            let mut passes = Vec::new();

            loop {
                let mut pass_moves = 0;

                let offset = start_row(rng, options.random_walk, rows);
                for s in 0..rows {
                    nodes_visited += 1;
                    let i = (offset + s) % rows;
                    if index.visit(i, &mut communities, &mut delta_computations).is_some() {
                        pass_moves += 1;
                    }
                }

                passes.push(pass_moves);
                if pass_moves == 0 {
                    break;
                }
                move_was_made = true;
            }

            classic_moves.push(passes);
        }

        if !move_was_made {
            break;
        }

        let contracted = index.contract();
        debug!(
            "Louvain level {}: {} rows contracted into {}",
            index.current_level(),
            rows,
            contracted
        );
    }

    Trace {
        delta_computations,
        nodes_visited,
        moves: if options.fast_local_moves {
            LouvainMoves::Fast(fast_moves)
        } else {
            LouvainMoves::Classic(classic_moves)
        },
    }
}

pub(crate) fn report<I: LocalMoving>(
    index: &I,
    trace: Trace,
    keep_dendrogram: bool,
    resolution: f64,
) -> LouvainReport {
    let history = index.history();
    let dendrogram = keep_dendrogram.then(|| {
        (1..=history.depth())
            .filter_map(|level| history.unroll(level).ok())
            .collect()
    });

    let report = LouvainReport {
        communities: index.collect_all(),
        count: index.rows(),
        delta_computations: trace.delta_computations,
        dendrogram,
        level: index.current_level(),
        modularity: index.current_modularity(),
        moves: Some(trace.moves),
        nodes_visited: trace.nodes_visited,
        resolution,
    };

    info!(
        "Found {} communities over {} level(s), Q = {}",
        report.count, report.level, report.modularity
    );

    report
}
