// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Community detection and quality metrics

pub mod leiden;
pub mod louvain;
pub mod modularity;

pub use leiden::{leiden, leiden_assign, leiden_detailed, LeidenOptions};
pub use louvain::{
    louvain, louvain_assign, louvain_detailed, LouvainMoves, LouvainOptions, LouvainReport,
};
pub use modularity::{
    dense_modularity, dense_modularity_from_partition, directed_modularity_delta, modularity,
    modularity_from_partition, undirected_modularity_delta, ModularityOptions,
    DEFAULT_COMMUNITY_ATTRIBUTE,
};
