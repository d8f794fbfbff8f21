// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Structural mutations of the graph store
//!
//! Every operation validates its preconditions first and only then touches
//! the arenas and adjacency maps, so a failed call leaves the graph intact.

use crate::storage::attributes::Attributes;
use crate::storage::events::{AttributeUpdate, GraphEvent};
use crate::storage::graph_store::Graph;
use crate::storage::types::{
    AdjacencyMap, EdgeId, EdgeRecord, GraphError, GraphType, NodeId, NodeRecord, Result,
};
use log::{debug, trace};
use uuid::Uuid;

/// Outcome of an edge merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeEdgeOutcome {
    pub key: String,
    pub edge_added: bool,
    pub source_added: bool,
    pub target_added: bool,
}

/// Fully described edge insertion shared by every add/merge variant
struct EdgeRequest<'a> {
    method: &'static str,
    key: Option<String>,
    source: &'a str,
    target: &'a str,
    attributes: Attributes,
    undirected: bool,
    merge: bool,
}

impl Graph {
    // ---------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------

    /// Add a node. Fails with a usage error if the key is taken.
    pub fn add_node(&mut self, key: impl Into<String>, attributes: Attributes) -> Result<String> {
        let key = key.into();

        if self.has_node(&key) {
            return Err(GraphError::usage(format!(
                "Graph.add_node: the \"{}\" node already exist in the graph.",
                key
            )));
        }

        self.insert_node(key.clone(), attributes);
        Ok(key)
    }

    /// Add a node or merge attributes into the existing one.
    /// Returns the key and whether the node was created.
    pub fn merge_node(&mut self, key: impl Into<String>, attributes: Attributes) -> (String, bool) {
        let key = key.into();

        match self.node_id(&key) {
            Some(id) => {
                self.node_record_mut(id).attributes.merge(attributes);
                self.observers
                    .emit_with(|| GraphEvent::NodeAttributesUpdated {
                        key: key.clone(),
                        kind: AttributeUpdate::Merge,
                        name: None,
                    });
                (key, false)
            }
            None => {
                self.insert_node(key.clone(), attributes);
                (key, true)
            }
        }
    }

    fn insert_node(&mut self, key: String, attributes: Attributes) -> NodeId {
        let id = NodeId(self.nodes.insert(NodeRecord::new(key.clone(), attributes)));
        self.node_index.insert(key.clone(), id);

        trace!("Added node {} as {:?}", key, id);
        self.observers.emit_with(|| GraphEvent::NodeAdded { key });
        id
    }

    /// Drop a node together with every edge attached to it
    pub fn drop_node(&mut self, key: &str) -> Result<()> {
        let id = self.require_node("drop_node", key)?;

        let record = self.node_record(id);
        let mut incident: Vec<EdgeId> = Vec::with_capacity(
            record.in_degree + record.out_degree + record.undirected_degree,
        );
        incident.extend(record.outbound.values().flatten().copied());
        incident.extend(
            record
                .inbound
                .iter()
                .filter(|(neighbor, _)| **neighbor != id)
                .flat_map(|(_, bucket)| bucket.iter().copied()),
        );
        incident.extend(record.undirected.values().flatten().copied());

        for edge in &incident {
            self.remove_edge(*edge);
        }

        self.node_index.shift_remove(key);
        self.nodes.remove(id.0);

        debug!("Dropped node {} and {} incident edges", key, incident.len());
        self.observers.emit_with(|| GraphEvent::NodeDropped {
            key: key.to_string(),
        });
        Ok(())
    }

    /// Drop several nodes. Fails before dropping anything if one is missing.
    pub fn drop_nodes<'k, I>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = &'k str>,
    {
        let keys: Vec<&str> = keys.into_iter().collect();
        for key in &keys {
            self.require_node("drop_nodes", key)?;
        }

        for key in keys {
            if self.has_node(key) {
                self.drop_node(key)?;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Edges
    // ---------------------------------------------------------------------

    /// Add an edge whose directedness follows the graph type:
    /// undirected for undirected graphs, directed otherwise.
    pub fn add_edge(&mut self, source: &str, target: &str, attributes: Attributes) -> Result<String> {
        let undirected = self.graph_type() == GraphType::Undirected;
        self.add(EdgeRequest {
            method: "add_edge",
            key: None,
            source,
            target,
            attributes,
            undirected,
            merge: false,
        })
    }

    pub fn add_directed_edge(
        &mut self,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<String> {
        self.add(EdgeRequest {
            method: "add_directed_edge",
            key: None,
            source,
            target,
            attributes,
            undirected: false,
            merge: false,
        })
    }

    pub fn add_undirected_edge(
        &mut self,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<String> {
        self.add(EdgeRequest {
            method: "add_undirected_edge",
            key: None,
            source,
            target,
            attributes,
            undirected: true,
            merge: false,
        })
    }

    pub fn add_edge_with_key(
        &mut self,
        key: impl Into<String>,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<String> {
        let undirected = self.graph_type() == GraphType::Undirected;
        self.add(EdgeRequest {
            method: "add_edge_with_key",
            key: Some(key.into()),
            source,
            target,
            attributes,
            undirected,
            merge: false,
        })
    }

    pub fn add_directed_edge_with_key(
        &mut self,
        key: impl Into<String>,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<String> {
        self.add(EdgeRequest {
            method: "add_directed_edge_with_key",
            key: Some(key.into()),
            source,
            target,
            attributes,
            undirected: false,
            merge: false,
        })
    }

    pub fn add_undirected_edge_with_key(
        &mut self,
        key: impl Into<String>,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<String> {
        self.add(EdgeRequest {
            method: "add_undirected_edge_with_key",
            key: Some(key.into()),
            source,
            target,
            attributes,
            undirected: true,
            merge: false,
        })
    }

    fn add(&mut self, request: EdgeRequest<'_>) -> Result<String> {
        self.insert_edge(request).map(|outcome| outcome.key)
    }

    /// Add an edge or merge attributes into the existing one. Missing
    /// endpoints are created. On multi graphs a keyless merge always adds.
    pub fn merge_edge(
        &mut self,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<MergeEdgeOutcome> {
        let undirected = self.graph_type() == GraphType::Undirected;
        self.insert_edge(EdgeRequest {
            method: "merge_edge",
            key: None,
            source,
            target,
            attributes,
            undirected,
            merge: true,
        })
    }

    pub fn merge_directed_edge(
        &mut self,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<MergeEdgeOutcome> {
        self.insert_edge(EdgeRequest {
            method: "merge_directed_edge",
            key: None,
            source,
            target,
            attributes,
            undirected: false,
            merge: true,
        })
    }

    pub fn merge_undirected_edge(
        &mut self,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<MergeEdgeOutcome> {
        self.insert_edge(EdgeRequest {
            method: "merge_undirected_edge",
            key: None,
            source,
            target,
            attributes,
            undirected: true,
            merge: true,
        })
    }

    pub fn merge_edge_with_key(
        &mut self,
        key: impl Into<String>,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<MergeEdgeOutcome> {
        let undirected = self.graph_type() == GraphType::Undirected;
        self.insert_edge(EdgeRequest {
            method: "merge_edge_with_key",
            key: Some(key.into()),
            source,
            target,
            attributes,
            undirected,
            merge: true,
        })
    }

    pub fn merge_directed_edge_with_key(
        &mut self,
        key: impl Into<String>,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<MergeEdgeOutcome> {
        self.insert_edge(EdgeRequest {
            method: "merge_directed_edge_with_key",
            key: Some(key.into()),
            source,
            target,
            attributes,
            undirected: false,
            merge: true,
        })
    }

    pub fn merge_undirected_edge_with_key(
        &mut self,
        key: impl Into<String>,
        source: &str,
        target: &str,
        attributes: Attributes,
    ) -> Result<MergeEdgeOutcome> {
        self.insert_edge(EdgeRequest {
            method: "merge_undirected_edge_with_key",
            key: Some(key.into()),
            source,
            target,
            attributes,
            undirected: true,
            merge: true,
        })
    }

    fn insert_edge(&mut self, request: EdgeRequest<'_>) -> Result<MergeEdgeOutcome> {
        let EdgeRequest {
            method,
            key,
            source,
            target,
            attributes,
            undirected,
            merge,
        } = request;

        let graph_type = self.graph_type();
        if undirected && !graph_type.accepts_undirected() {
            return Err(GraphError::usage(format!(
                "Graph.{}: you cannot add an undirected edge to a directed graph. Use the Graph::with_options(GraphOptions::mixed()) or upgrade_to_mixed instead.",
                method
            )));
        }
        if !undirected && !graph_type.accepts_directed() {
            return Err(GraphError::usage(format!(
                "Graph.{}: you cannot add a directed edge to an undirected graph. Use the Graph::with_options(GraphOptions::mixed()) or upgrade_to_mixed instead.",
                method
            )));
        }

        if !self.allows_self_loops() && source == target {
            return Err(GraphError::usage(format!(
                "Graph.{}: source & target are the same (\"{}\"), thus creating a loop explicitly forbidden by this graph 'allow_self_loops' option.",
                method, source
            )));
        }

        let source_id = self.node_id(source);
        let target_id = self.node_id(target);

        if !merge {
            if source_id.is_none() {
                return Err(GraphError::not_found(format!(
                    "Graph.{}: source node \"{}\" not found.",
                    method, source
                )));
            }
            if target_id.is_none() {
                return Err(GraphError::not_found(format!(
                    "Graph.{}: target node \"{}\" not found.",
                    method, target
                )));
            }
        }

        if let Some(key) = key.as_deref() {
            if let Some(existing) = self.edge_id(key) {
                if !merge {
                    return Err(GraphError::usage(format!(
                        "Graph.{}: the \"{}\" edge already exists in the graph.",
                        method, key
                    )));
                }

                self.check_merge_consistency(method, existing, source_id, target_id, undirected)?;
                self.merge_into_edge(existing, attributes);
                return Ok(MergeEdgeOutcome {
                    key: key.to_string(),
                    edge_added: false,
                    source_added: false,
                    target_added: false,
                });
            }
        }

        if !self.is_multi() {
            if let (Some(s), Some(t)) = (source_id, target_id) {
                let existing = if undirected {
                    first_edge(&self.node_record(s).undirected, t)
                } else {
                    first_edge(&self.node_record(s).outbound, t)
                };

                if let Some(existing) = existing {
                    if !merge {
                        return Err(GraphError::usage(format!(
                            "Graph.{}: an edge linking \"{}\" to \"{}\" already exists. If you really want to add multiple edges linking those nodes, you should create a multi graph by using the 'multi' option.",
                            method, source, target
                        )));
                    }

                    if let Some(key) = key.as_deref() {
                        if self.edge_record(existing).key != key {
                            return Err(GraphError::usage(format!(
                                "Graph.{}: inconsistency detected when attempting to merge the \"{}\" edge with \"{}\" source & \"{}\" target vs. ({}, {}).",
                                method,
                                key,
                                source,
                                target,
                                self.node_key(self.edge_record(existing).source),
                                self.node_key(self.edge_record(existing).target)
                            )));
                        }
                    }

                    self.merge_into_edge(existing, attributes);
                    return Ok(MergeEdgeOutcome {
                        key: self.edge_record(existing).key.clone(),
                        edge_added: false,
                        source_added: false,
                        target_added: false,
                    });
                }
            }
        }

        // Validation done: from here on the graph is mutated.
        let source_added = source_id.is_none();
        let source_id = match source_id {
            Some(id) => id,
            None => self.insert_node(source.to_string(), Attributes::new()),
        };

        let target_added = target_id.is_none() && source != target;
        let target_id = match self.node_id(target) {
            Some(id) => id,
            None => self.insert_node(target.to_string(), Attributes::new()),
        };

        let (key, generated_key) = match key {
            Some(key) => (key, false),
            None => (self.generate_edge_key(), true),
        };

        let record = EdgeRecord {
            key: key.clone(),
            source: source_id,
            target: target_id,
            attributes,
            undirected,
            generated_key,
        };
        let edge = EdgeId(self.edges.insert(record));
        self.edge_index.insert(key.clone(), edge);
        self.link_edge(edge);

        trace!("Added edge {} ({} -> {}, undirected={})", key, source, target, undirected);
        self.observers.emit_with(|| GraphEvent::EdgeAdded {
            key: key.clone(),
            source: source.to_string(),
            target: target.to_string(),
            undirected,
        });

        Ok(MergeEdgeOutcome {
            key,
            edge_added: true,
            source_added,
            target_added,
        })
    }

    fn check_merge_consistency(
        &self,
        method: &str,
        existing: EdgeId,
        source: Option<NodeId>,
        target: Option<NodeId>,
        undirected: bool,
    ) -> Result<()> {
        let record = self.edge_record(existing);
        let same = |a: Option<NodeId>, b: NodeId| a == Some(b);

        let consistent = record.undirected == undirected
            && ((same(source, record.source) && same(target, record.target))
                || (undirected && same(source, record.target) && same(target, record.source)));

        if consistent {
            Ok(())
        } else {
            Err(GraphError::usage(format!(
                "Graph.{}: inconsistency detected when attempting to merge the \"{}\" edge with different endpoints or directedness.",
                method, record.key
            )))
        }
    }

    fn merge_into_edge(&mut self, edge: EdgeId, attributes: Attributes) {
        let record = self.edge_record_mut(edge);
        record.attributes.merge(attributes);
        let key = record.key.clone();

        self.observers
            .emit_with(|| GraphEvent::EdgeAttributesUpdated {
                key,
                kind: AttributeUpdate::Merge,
                name: None,
            });
    }

    fn generate_edge_key(&self) -> String {
        loop {
            let key = Uuid::new_v4().to_string();
            if !self.edge_index.contains_key(&key) {
                return key;
            }
        }
    }

    /// Register an already stored edge in its endpoints' adjacency
    fn link_edge(&mut self, edge: EdgeId) {
        let record = self.edge_record(edge);
        let (source, target, undirected) = (record.source, record.target, record.undirected);
        let self_loop = source == target;

        if undirected {
            self.node_record_mut(source)
                .undirected
                .entry(target)
                .or_default()
                .push(edge);

            if self_loop {
                self.node_record_mut(source).undirected_self_loops += 1;
                self.undirected_self_loops += 1;
            } else {
                self.node_record_mut(target)
                    .undirected
                    .entry(source)
                    .or_default()
                    .push(edge);
                self.node_record_mut(source).undirected_degree += 1;
                self.node_record_mut(target).undirected_degree += 1;
            }
            self.undirected_size += 1;
        } else {
            self.node_record_mut(source)
                .outbound
                .entry(target)
                .or_default()
                .push(edge);
            self.node_record_mut(target)
                .inbound
                .entry(source)
                .or_default()
                .push(edge);

            if self_loop {
                self.node_record_mut(source).directed_self_loops += 1;
                self.directed_self_loops += 1;
            } else {
                self.node_record_mut(source).out_degree += 1;
                self.node_record_mut(target).in_degree += 1;
            }
            self.directed_size += 1;
        }
    }

    /// Detach an edge from its endpoints and free its slot
    fn remove_edge(&mut self, edge: EdgeId) -> Option<EdgeRecord> {
        let record = self.edges.remove(edge.0)?;
        self.edge_index.shift_remove(&record.key);

        let (source, target) = (record.source, record.target);
        let self_loop = source == target;

        if record.undirected {
            unlink(&mut self.node_record_mut(source).undirected, target, edge);

            if self_loop {
                self.node_record_mut(source).undirected_self_loops -= 1;
                self.undirected_self_loops -= 1;
            } else {
                unlink(&mut self.node_record_mut(target).undirected, source, edge);
                self.node_record_mut(source).undirected_degree -= 1;
                self.node_record_mut(target).undirected_degree -= 1;
            }
            self.undirected_size -= 1;
        } else {
            unlink(&mut self.node_record_mut(source).outbound, target, edge);
            unlink(&mut self.node_record_mut(target).inbound, source, edge);

            if self_loop {
                self.node_record_mut(source).directed_self_loops -= 1;
                self.directed_self_loops -= 1;
            } else {
                self.node_record_mut(source).out_degree -= 1;
                self.node_record_mut(target).in_degree -= 1;
            }
            self.directed_size -= 1;
        }

        if !self.observers.is_empty() {
            let event = GraphEvent::EdgeDropped {
                key: record.key.clone(),
                source: self.node_key(source).to_string(),
                target: self.node_key(target).to_string(),
                undirected: record.undirected,
            };
            self.observers.emit_with(|| event);
        }

        Some(record)
    }

    /// Drop one edge by key
    pub fn drop_edge(&mut self, key: &str) -> Result<()> {
        let edge = self.require_edge("drop_edge", key)?;
        self.remove_edge(edge);
        trace!("Dropped edge {}", key);
        Ok(())
    }

    /// Drop one edge linking `source` to `target`, directed first.
    /// On multi graphs only one of the parallel edges is removed.
    /// Returns the key of the dropped edge.
    pub fn drop_edge_between(&mut self, source: &str, target: &str) -> Result<String> {
        let s = self.require_node("drop_edge_between", source)?;
        let t = self.require_node("drop_edge_between", target)?;

        let record = self.node_record(s);
        let edge = first_edge(&record.outbound, t)
            .or_else(|| first_edge(&record.undirected, t))
            .ok_or_else(|| {
                GraphError::not_found(format!(
                    "Graph.drop_edge_between: could not find an edge from \"{}\" to \"{}\" in the graph.",
                    source, target
                ))
            })?;

        let key = self.edge_record(edge).key.clone();
        self.remove_edge(edge);
        trace!("Dropped edge {} between {} and {}", key, source, target);
        Ok(key)
    }

    // ---------------------------------------------------------------------
    // Bulk
    // ---------------------------------------------------------------------

    /// Remove every node and edge. Graph attributes are kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.node_index.clear();
        self.edge_index.clear();
        self.reset_edge_counters();

        debug!("Cleared graph");
        self.observers.emit_with(|| GraphEvent::Cleared);
    }

    /// Remove every edge, keeping nodes and their attributes
    pub fn clear_edges(&mut self) {
        let ids: Vec<NodeId> = self.node_ids().collect();
        for id in ids {
            self.node_record_mut(id).clear_adjacency();
        }

        self.edges.clear();
        self.edge_index.clear();
        self.reset_edge_counters();

        debug!("Cleared edges of graph with {} nodes", self.order());
        self.observers.emit_with(|| GraphEvent::EdgesCleared);
    }

    fn reset_edge_counters(&mut self) {
        self.directed_size = 0;
        self.undirected_size = 0;
        self.directed_self_loops = 0;
        self.undirected_self_loops = 0;
    }

    // ---------------------------------------------------------------------
    // Upgrades
    // ---------------------------------------------------------------------

    /// Let the graph hold both directed and undirected edges. Irreversible.
    pub fn upgrade_to_mixed(&mut self) {
        if self.options.graph_type == GraphType::Mixed {
            return;
        }

        debug!("Upgrading {} graph to mixed", self.options.graph_type);
        self.options.graph_type = GraphType::Mixed;
    }

    /// Let the graph hold parallel edges. Irreversible.
    pub fn upgrade_to_multi(&mut self) {
        if self.options.multi {
            return;
        }

        debug!("Upgrading simple graph to multi");
        self.options.multi = true;
    }
}

fn first_edge(map: &AdjacencyMap, neighbor: NodeId) -> Option<EdgeId> {
    map.get(&neighbor).and_then(|bucket| bucket.first().copied())
}

fn unlink(map: &mut AdjacencyMap, neighbor: NodeId, edge: EdgeId) {
    let now_empty = match map.get_mut(&neighbor) {
        Some(bucket) => {
            bucket.retain(|candidate| *candidate != edge);
            bucket.is_empty()
        }
        None => false,
    };

    if now_empty {
        map.shift_remove(&neighbor);
    }
}
