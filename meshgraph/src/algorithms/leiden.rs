// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Leiden community detection
//!
//! Every level runs fast local moves like Louvain, then refines each
//! community before contracting, so that only connected sub-communities
//! become rows of the next level. The contracted rows start the next level
//! grouped by the community local moving put them in.
//!
//! A level that makes no move ends the run, after a last plain contraction
//! of whatever the previous refinement regrouped. Only undirected graphs
//! are supported.

use crate::algorithms::louvain::{
    fast_local_moves, report, singletons, start_row, LouvainMoves, LouvainReport, Trace,
};
use crate::algorithms::modularity::DEFAULT_COMMUNITY_ATTRIBUTE;
use crate::indexes::louvain::{
    LouvainIndexOptions, UndirectedLeidenAddenda, UndirectedLouvainIndex, DEFAULT_RANDOMNESS,
};
use crate::indexes::neighborhood::CsrLayout;
use crate::indexes::sparse::{SparseMap, SparseQueueSet};
use crate::indexes::weights::{EdgeWeight, DEFAULT_WEIGHT_ATTRIBUTE};
use crate::storage::graph_store::Graph;
use crate::storage::types::{GraphError, Result};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeidenOptions {
    pub resolution: f64,
    /// Temperature of the randomized refinement. Lower values favor the
    /// merge with the best modularity gain.
    pub randomness: f64,
    pub weighted: bool,
    pub weight_attribute: String,
    /// Node attribute written by [`leiden_assign`]
    pub community_attribute: String,
    pub random_walk: bool,
    /// Seed of the random walk and of the refinement
    pub seed: Option<u64>,
    pub keep_dendrogram: bool,
    pub allow_self_loops: bool,
}

impl Default for LeidenOptions {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            randomness: DEFAULT_RANDOMNESS,
            weighted: false,
            weight_attribute: DEFAULT_WEIGHT_ATTRIBUTE.to_string(),
            community_attribute: DEFAULT_COMMUNITY_ATTRIBUTE.to_string(),
            random_walk: true,
            seed: None,
            keep_dendrogram: true,
            allow_self_loops: true,
        }
    }
}

impl LeidenOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(GraphError::invalid_argument(format!(
                "leiden: resolution must be a positive finite number, got {}.",
                self.resolution
            )));
        }
        if !self.randomness.is_finite() || self.randomness <= 0.0 {
            return Err(GraphError::invalid_argument(format!(
                "leiden: randomness must be a positive finite number, got {}.",
                self.randomness
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

/// Run Leiden and return the community of every node
pub fn leiden(graph: &Graph, options: &LeidenOptions) -> Result<IndexMap<String, usize>> {
    Ok(leiden_detailed(graph, options)?.communities)
}

/// Run Leiden and write communities onto `options.community_attribute`
pub fn leiden_assign(graph: &mut Graph, options: &LeidenOptions) -> Result<()> {
    let communities = leiden(graph, options)?;
    for (node, community) in communities {
        graph.set_node_attribute(&node, &options.community_attribute, community)?;
    }
    Ok(())
}

/// Run Leiden and report its counters. `moves` holds one count per level.
pub fn leiden_detailed(graph: &Graph, options: &LeidenOptions) -> Result<LouvainReport> {
    options.validate()?;

    if graph.directed_size() > 0 {
        if graph.undirected_size() > 0 {
            return Err(GraphError::usage(
                "leiden: cannot run the algorithm on a true mixed graph.",
            ));
        }
        return Err(GraphError::usage(
            "leiden: the algorithm is not implemented for directed graphs.",
        ));
    }

    if graph.size() == 0 {
        return Ok(singletons(graph, options.resolution));
    }

    let mut rng = match options.seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };

    let mut index = UndirectedLouvainIndex::new(graph, &options.index_options())?;
    let mut addenda = UndirectedLeidenAddenda::new(&index, options.randomness);

    let capacity = index.rows();
    let mut communities = SparseMap::new(capacity);
    let mut queue = SparseQueueSet::new(capacity);

    let mut delta_computations = 0;
    let mut nodes_visited = 0;
    let mut moves = Vec::new();

    loop {
        let rows = index.rows();
        let offset = start_row(&mut rng, options.random_walk, rows);
        let level_moves = fast_local_moves(
            &mut index,
            offset,
            &mut communities,
            &mut queue,
            &mut delta_computations,
            &mut nodes_visited,
        );
        moves.push(level_moves);

        if level_moves == 0 {
            if !addenda.only_singletons(&index) {
                index.zoom_out();
            }
            break;
        }

        if addenda.only_singletons(&index) {
            break;
        }

        let contracted = addenda.zoom_out(&mut index, &mut rng);
        debug!(
            "Leiden level {}: {} rows refined into {}, {} macro communities",
            index.level(),
            rows,
            contracted,
            addenda.macro_count()
        );

        // Refinement merged nothing, so another level would replay this one
        if contracted == rows {
            index.zoom_out();
            break;
        }
    }

    let trace = Trace {
        delta_computations,
        nodes_visited,
        moves: LouvainMoves::Fast(moves),
    };
    Ok(report(&index, trace, options.keep_dendrogram, options.resolution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::modularity::{modularity_from_partition, ModularityOptions};
    use crate::attrs;
    use crate::storage::value::Value;

    /// Triangles `0, 1, 2` and `3, 4, 5` linked by `2 - 4`
    fn double_clique() -> Graph {
        let mut graph = Graph::undirected();
        for (source, target) in [("0", "1"), ("0", "2"), ("1", "2"), ("3", "4"), ("3", "5"), ("4", "5"), ("2", "4")] {
            graph.merge_edge(source, target, attrs!()).unwrap();
        }
        graph
    }

    #[test]
    fn test_double_clique() {
        let graph = double_clique();

        for seed in [1, 2, 3, 4] {
            let report = leiden_detailed(&graph, &LeidenOptions::default().with_seed(seed)).unwrap();
            let communities = &report.communities;

            assert_eq!(communities["0"], communities["1"]);
            assert_eq!(communities["1"], communities["2"]);
            assert_eq!(communities["3"], communities["4"]);
            assert_eq!(communities["4"], communities["5"]);
            assert_ne!(communities["0"], communities["3"]);
            assert_eq!(report.count, 2);

            let partition = communities.iter().map(|(k, v)| (k.clone(), *v)).collect();
            let expected = modularity_from_partition(&graph, &partition, &ModularityOptions::default()).unwrap();
            assert!((report.modularity - expected).abs() < 1e-9);
            assert!((report.modularity - 5.0 / 14.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_moves_are_counted_per_level() {
        let report = leiden_detailed(&double_clique(), &LeidenOptions::default().with_seed(8)).unwrap();

        let Some(LouvainMoves::Fast(moves)) = report.moves else {
            panic!("expected one move count per level");
        };
        assert!(moves[0] > 0);
        assert!(report.nodes_visited >= 6);
        assert!(report.delta_computations > 0);
        assert_eq!(report.dendrogram.map(|levels| levels.len()), Some(report.level));
    }

    #[test]
    fn test_rejections() {
        let options = LeidenOptions::default();

        let mut directed = Graph::directed();
        directed.merge_edge("1", "2", attrs!()).unwrap();
        assert!(leiden(&directed, &options).unwrap_err().is_usage());

        let mut mixed = Graph::new();
        mixed.merge_undirected_edge("1", "2", attrs!()).unwrap();
        mixed.merge_directed_edge("2", "3", attrs!()).unwrap();
        assert!(leiden(&mixed, &options).unwrap_err().is_usage());

        for randomness in [0.0, -0.5, f64::NAN] {
            let invalid = LeidenOptions {
                randomness,
                ..LeidenOptions::default()
            };
            assert!(leiden(&double_clique(), &invalid).unwrap_err().is_invalid_argument());
        }

        let invalid = LeidenOptions {
            resolution: 0.0,
            ..LeidenOptions::default()
        };
        assert!(leiden(&double_clique(), &invalid).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_edgeless_graph_gives_singletons() {
        let mut graph = Graph::undirected();
        for node in ["a", "b", "c"] {
            graph.add_node(node, attrs!()).unwrap();
        }

        let report = leiden_detailed(&graph, &LeidenOptions::default()).unwrap();
        assert_eq!(report.count, 3);
        assert!(report.modularity.is_nan());
        assert_eq!(report.communities["c"], 2);
    }

    #[test]
    fn test_assign() {
        let mut graph = double_clique();
        let options = LeidenOptions {
            community_attribute: "cluster".to_string(),
            ..LeidenOptions::default().with_seed(5)
        };

        leiden_assign(&mut graph, &options).unwrap();
        let first = graph.get_node_attribute("0", "cluster").unwrap().cloned();
        assert!(matches!(first, Some(Value::Number(_))));
        assert_eq!(graph.get_node_attribute("2", "cluster").unwrap().cloned(), first);
    }

    #[test]
    fn test_options_json() {
        let options: LeidenOptions =
            serde_json::from_str(r#"{"randomness": 0.5, "randomWalk": false, "seed": 9}"#).unwrap();

        assert_eq!(options.randomness, 0.5);
        assert!(!options.random_walk);
        assert_eq!(options.seed, Some(9));
        assert_eq!(options.resolution, 1.0);
        assert_eq!(options.weight_attribute, "weight");
    }
}
