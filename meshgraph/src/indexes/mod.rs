// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read-mostly indices derived from a graph
//!
//! This module provides:
//! - Pointer arrays sized to the largest offset they must hold
//! - Sparse maps and queue sets used by the optimizers
//! - Edge weight resolution
//! - CSR neighborhood indices, plain and weighted
//! - Undirected and directed Louvain indices
//!
//! Indices copy what they need out of the graph when built. They do not
//! follow later mutations.

pub mod louvain;
pub mod neighborhood;
pub mod pointer;
pub mod sparse;
pub mod weights;

pub use louvain::{
    Dendrogram, DirectedLouvainIndex, LouvainIndexOptions, UndirectedLeidenAddenda,
    UndirectedLouvainIndex, DEFAULT_RANDOMNESS,
};
pub use neighborhood::{
    CsrLayout, NeighborhoodIndex, NeighborhoodMethod, WeightedNeighborhoodIndex,
};
pub use pointer::{PointerArray, PointerWidth};
pub use sparse::{SparseMap, SparseQueueSet};
pub use weights::{EdgeWeight, DEFAULT_WEIGHT_ATTRIBUTE};
