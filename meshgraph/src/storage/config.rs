// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Graph construction options

use crate::storage::types::{GraphError, GraphType, Result};
use serde::{Deserialize, Serialize};

/// Configuration fixed at graph construction time
///
/// `graph_type` and `multi` may later be upgraded (never downgraded) through
/// `Graph::upgrade_to_mixed` and `Graph::upgrade_to_multi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphOptions {
    /// Kind of edges the graph accepts
    #[serde(rename = "type")]
    pub graph_type: GraphType,

    /// Whether parallel edges are allowed
    pub multi: bool,

    /// Whether an edge may link a node to itself
    pub allow_self_loops: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            graph_type: GraphType::Mixed,
            multi: false,
            allow_self_loops: true,
        }
    }
}

impl GraphOptions {
    /// Options for a simple directed graph
    pub fn directed() -> Self {
        Self {
            graph_type: GraphType::Directed,
            ..Self::default()
        }
    }

    /// Options for a simple undirected graph
    pub fn undirected() -> Self {
        Self {
            graph_type: GraphType::Undirected,
            ..Self::default()
        }
    }

    /// Options for a simple mixed graph
    pub fn mixed() -> Self {
        Self::default()
    }

    pub fn with_multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    pub fn with_self_loops(mut self, allow_self_loops: bool) -> Self {
        self.allow_self_loops = allow_self_loops;
        self
    }

    /// Parse options from their JSON form, e.g.
    /// `{"type": "undirected", "multi": true}`. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| GraphError::invalid_argument(format!("invalid graph options: {}", e)))
    }
}
