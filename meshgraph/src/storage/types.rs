// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph data structures and error types
//!
//! Defines the node and edge records owned by the graph store,
//! their integer handles, and the error taxonomy shared by the store
//! and the derived indices.

use crate::storage::attributes::Attributes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error types for graph operations
///
/// Every error is raised before any mutation takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Malformed options or arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing node or edge reference
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation incompatible with the graph configuration
    #[error("Usage error: {0}")]
    Usage(String),
}

impl GraphError {
    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a usage error
    pub fn usage<S: Into<String>>(msg: S) -> Self {
        Self::Usage(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// Result alias used across the crate
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

/// Kind of edges a graph may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    Directed,
    Undirected,
    #[default]
    Mixed,
}

impl GraphType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphType::Directed => "directed",
            GraphType::Undirected => "undirected",
            GraphType::Mixed => "mixed",
        }
    }

    /// Whether a graph of this type accepts directed edges
    pub fn accepts_directed(&self) -> bool {
        !matches!(self, GraphType::Undirected)
    }

    /// Whether a graph of this type accepts undirected edges
    pub fn accepts_undirected(&self) -> bool {
        !matches!(self, GraphType::Directed)
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GraphType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "directed" => Ok(GraphType::Directed),
            "undirected" => Ok(GraphType::Undirected),
            "mixed" => Ok(GraphType::Mixed),
            other => Err(GraphError::invalid_argument(format!(
                "invalid graph type \"{}\", expecting one of \"mixed\", \"directed\" or \"undirected\"",
                other
            ))),
        }
    }
}

/// Stable handle of a node inside the store's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Stable handle of an edge inside the store's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Parallel edges linking a node to one neighbor. Simple graphs hold one.
pub(crate) type EdgeBucket = SmallVec<[EdgeId; 1]>;

/// Neighbor handle -> edges, in neighbor insertion order
pub(crate) type AdjacencyMap = IndexMap<NodeId, EdgeBucket>;

/// Node record owned by the graph store
#[derive(Debug, Clone)]
pub(crate) struct NodeRecord {
    pub key: String,
    pub attributes: Attributes,
    pub inbound: AdjacencyMap,
    pub outbound: AdjacencyMap,
    pub undirected: AdjacencyMap,
    pub in_degree: usize,
    pub out_degree: usize,
    pub undirected_degree: usize,
    pub directed_self_loops: usize,
    pub undirected_self_loops: usize,
}

impl NodeRecord {
    pub fn new(key: String, attributes: Attributes) -> Self {
        Self {
            key,
            attributes,
            inbound: AdjacencyMap::new(),
            outbound: AdjacencyMap::new(),
            undirected: AdjacencyMap::new(),
            in_degree: 0,
            out_degree: 0,
            undirected_degree: 0,
            directed_self_loops: 0,
            undirected_self_loops: 0,
        }
    }

    /// Forget every edge while keeping key and attributes
    pub fn clear_adjacency(&mut self) {
        self.inbound.clear();
        self.outbound.clear();
        self.undirected.clear();
        self.in_degree = 0;
        self.out_degree = 0;
        self.undirected_degree = 0;
        self.directed_self_loops = 0;
        self.undirected_self_loops = 0;
    }
}

/// Edge record owned by the graph store
#[derive(Debug, Clone)]
pub(crate) struct EdgeRecord {
    pub key: String,
    pub source: NodeId,
    pub target: NodeId,
    pub attributes: Attributes,
    pub undirected: bool,
    pub generated_key: bool,
}

impl EdgeRecord {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// The endpoint on the other side of `node`
    pub fn opposite(&self, node: NodeId) -> NodeId {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }
}

/// Borrowed view of one edge handed to iteration callbacks and weight getters
#[derive(Debug, Clone, Copy)]
pub struct EdgeEntry<'a> {
    pub key: &'a str,
    pub attributes: &'a Attributes,
    pub source: &'a str,
    pub target: &'a str,
    pub source_attributes: &'a Attributes,
    pub target_attributes: &'a Attributes,
    pub undirected: bool,
    pub generated_key: bool,
}

impl EdgeEntry<'_> {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
