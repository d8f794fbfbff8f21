// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! meshgraph - An in-memory graph store with CSR and Louvain indices
//!
//! meshgraph holds nodes and edges carrying arbitrary attributes and turns
//! them into flat, typed arrays for repeated traversal and community
//! detection.
//!
//! # Features
//!
//! - **Graph store**: directed, undirected and mixed graphs, simple or multi
//! - **Neighbor iteration**: seven adjacency shapes from `in` to `mixed`
//! - **Observers**: typed events for every mutation
//! - **Snapshots**: serde (de)serialization of the whole graph
//! - **CSR indices**: compressed neighborhoods with the narrowest pointer width
//! - **Louvain**: fast or classic local moves, contraction and dendrogram
//! - **Leiden**: Louvain with a refinement step keeping communities connected
//! - **Modularity**: sparse and dense Newman modularity
//!
//! # Usage
//!
//! ```ignore
//! use meshgraph::{attrs, louvain, Graph, LouvainOptions};
//!
//! let mut graph = Graph::undirected();
//! graph.merge_edge("a", "b", attrs!("weight" => 2.0))?;
//! graph.merge_edge("b", "c", attrs!())?;
//!
//! let communities = louvain(&graph, &LouvainOptions::default().with_seed(7))?;
//! ```

pub mod algorithms;
pub mod indexes;
pub mod storage;

pub use algorithms::{
    dense_modularity, leiden, leiden_assign, leiden_detailed, louvain, louvain_assign,
    louvain_detailed, modularity, modularity_from_partition, LeidenOptions, LouvainMoves,
    LouvainOptions, LouvainReport, ModularityOptions,
};
pub use indexes::{
    CsrLayout, Dendrogram, DirectedLouvainIndex, EdgeWeight, LouvainIndexOptions,
    NeighborhoodIndex, NeighborhoodMethod, PointerArray, PointerWidth, UndirectedLeidenAddenda,
    UndirectedLouvainIndex, WeightedNeighborhoodIndex,
};
pub use storage::{
    Attributes, DegreeKind, EdgeEntry, Graph, GraphError, GraphEvent, GraphOptions, GraphType,
    MergeEdgeOutcome, Result, SerializedGraph, Shape, Subscription, Value,
};

/// meshgraph version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// meshgraph crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
