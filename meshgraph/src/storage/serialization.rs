// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Serialized graph shape exchanged with format readers and writers

use crate::storage::attributes::Attributes;
use crate::storage::config::GraphOptions;
use crate::storage::graph_store::Graph;
use crate::storage::types::{EdgeId, GraphError, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// Serialized node: `{key, attributes}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub key: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

/// Serialized edge: `{key?, source, target, attributes, undirected}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub undirected: bool,
}

/// Whole-graph snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    #[serde(default)]
    pub options: GraphOptions,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub nodes: Vec<SerializedNode>,
    #[serde(default)]
    pub edges: Vec<SerializedEdge>,
}

impl SerializedGraph {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            GraphError::invalid_argument(format!(
                "could not serialize graph: {}",
                e
            ))
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            GraphError::invalid_argument(format!(
                "invalid serialized graph: {}",
                e
            ))
        })
    }
}

impl Graph {
    /// Build a graph from a snapshot, using the snapshot's options
    pub fn from_snapshot(snapshot: &SerializedGraph) -> Result<Self> {
        let mut graph = Graph::with_options(snapshot.options);
        graph.import(snapshot, false)?;
        Ok(graph)
    }

    pub fn export_node(&self, node: &str) -> Result<SerializedNode> {
        let id = self.require_node("export_node", node)?;
        let record = self.node_record(id);
        Ok(SerializedNode {
            key: record.key.clone(),
            attributes: record.attributes.clone(),
        })
    }

    pub fn export_edge(&self, edge: &str) -> Result<SerializedEdge> {
        let id = self.require_edge("export_edge", edge)?;
        Ok(self.serialize_edge(id))
    }

    fn serialize_edge(&self, id: EdgeId) -> SerializedEdge {
        let record = self.edge_record(id);
        SerializedEdge {
            key: (!record.generated_key).then(|| record.key.clone()),
            source: self.node_key(record.source).to_string(),
            target: self.node_key(record.target).to_string(),
            attributes: record.attributes.clone(),
            undirected: record.undirected,
        }
    }

    /// Snapshot of the whole graph. Generated edge keys are left out.
    pub fn export(&self) -> SerializedGraph {
        SerializedGraph {
            options: self.options,
            attributes: self.attributes.clone(),
            nodes: self
                .node_entries()
                .map(|(key, attributes)| SerializedNode {
                    key: key.to_string(),
                    attributes: attributes.clone(),
                })
                .collect(),
            edges: self
                .edge_index
                .values()
                .map(|id| self.serialize_edge(*id))
                .collect(),
        }
    }

    /// Load a snapshot into this graph. With `merge`, existing nodes and
    /// edges absorb the snapshot's attributes; without it, collisions fail.
    /// Nothing is applied unless the whole snapshot is accepted.
    ///
    /// Observers see one event per applied mutation, in snapshot order.
    pub fn import(&mut self, snapshot: &SerializedGraph, merge: bool) -> Result<()> {
        let mut staged = self.clone();
        staged.apply_snapshot(snapshot, merge)?;

        if self.observers.is_empty() {
            let observers = std::mem::take(&mut self.observers);
            *self = staged;
            self.observers = observers;
        } else {
            // The staged run accepted the snapshot, so replaying it here
            // cannot fail halfway
            self.apply_snapshot(snapshot, merge)?;
        }

        debug!(
            "Imported {} nodes and {} edges (merge={})",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            merge
        );
        Ok(())
    }

    fn apply_snapshot(&mut self, snapshot: &SerializedGraph, merge: bool) -> Result<()> {
        if !snapshot.attributes.is_empty() {
            if merge {
                self.merge_attributes(snapshot.attributes.clone());
            } else {
                self.replace_attributes(snapshot.attributes.clone());
            }
        }

        for node in &snapshot.nodes {
            if merge {
                self.merge_node(node.key.clone(), node.attributes.clone());
            } else {
                self.add_node(node.key.clone(), node.attributes.clone())?;
            }
        }

        for edge in &snapshot.edges {
            let attributes = edge.attributes.clone();
            let (source, target) = (edge.source.as_str(), edge.target.as_str());

            match (&edge.key, edge.undirected, merge) {
                (Some(key), true, true) => {
                    self.merge_undirected_edge_with_key(key.clone(), source, target, attributes)?;
                }
                (Some(key), false, true) => {
                    self.merge_directed_edge_with_key(key.clone(), source, target, attributes)?;
                }
                (Some(key), true, false) => {
                    self.add_undirected_edge_with_key(key.clone(), source, target, attributes)?;
                }
                (Some(key), false, false) => {
                    self.add_directed_edge_with_key(key.clone(), source, target, attributes)?;
                }
                (None, true, true) => {
                    self.merge_undirected_edge(source, target, attributes)?;
                }
                (None, false, true) => {
                    self.merge_directed_edge(source, target, attributes)?;
                }
                (None, true, false) => {
                    self.add_undirected_edge(source, target, attributes)?;
                }
                (None, false, false) => {
                    self.add_directed_edge(source, target, attributes)?;
                }
            }
        }

        Ok(())
    }

    /// Deep copy without observers
    pub fn copy(&self) -> Graph {
        self.clone()
    }

    /// Copy of the nodes and graph attributes, without any edge
    pub fn empty_copy(&self) -> Graph {
        let mut copy = self.clone();
        copy.clear_edges();
        copy
    }

    /// Copy carrying different options. Fails if the current content does
    /// not fit them.
    pub fn copy_with_options(&self, options: GraphOptions) -> Result<Graph> {
        let mut snapshot = self.export();
        snapshot.options = options;
        for (edge, id) in snapshot.edges.iter_mut().zip(self.edge_index.values()) {
            edge.key = Some(self.edge_record(*id).key.clone());
        }
        Graph::from_snapshot(&snapshot)
    }
}
