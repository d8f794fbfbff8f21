// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory graph storage
//!
//! This module provides:
//! - Value type and attribute bags for nodes, edges and the graph
//! - The graph store with directed, undirected and mixed adjacency
//! - Mutation, attribute and iteration operations
//! - Typed mutation events
//! - Snapshot (de)serialization

mod arena;
mod attribute_ops;
pub mod attributes;
pub mod config;
pub mod events;
pub mod graph_store;
pub mod iteration;
pub mod mutation;
pub mod serialization;
pub mod types;
pub mod value;

pub use attributes::Attributes;
pub use config::GraphOptions;
pub use events::{AttributeUpdate, GraphEvent, Subscription};
pub use graph_store::{DegreeKind, Graph};
pub use iteration::{NeighborEntries, Shape};
pub use mutation::MergeEdgeOutcome;
pub use serialization::{SerializedEdge, SerializedGraph, SerializedNode};
pub use types::{EdgeEntry, EdgeId, GraphError, GraphType, NodeId, Result};
pub use value::Value;
