// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Attribute operations on nodes, edges and the graph itself
//!
//! Reads of an unset attribute return `None`. Every operation fails with
//! `NotFound` when the node or edge does not exist.

use crate::storage::attributes::Attributes;
use crate::storage::events::{AttributeUpdate, GraphEvent};
use crate::storage::graph_store::Graph;
use crate::storage::types::{EdgeEntry, EdgeId, NodeId, Result};
use crate::storage::value::Value;

impl Graph {
    // ---------------------------------------------------------------------
    // Graph attributes
    // ---------------------------------------------------------------------

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.has(name)
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        let previous = self.attributes.set(name, value);
        self.emit_graph_update(AttributeUpdate::Set, Some(name));
        previous
    }

    pub fn update_attribute<F>(&mut self, name: &str, updater: F) -> Value
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let value = self.attributes.update(name, updater).clone();
        self.emit_graph_update(AttributeUpdate::Update, Some(name));
        value
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        let previous = self.attributes.remove(name);
        self.emit_graph_update(AttributeUpdate::Remove, Some(name));
        previous
    }

    pub fn replace_attributes(&mut self, attributes: Attributes) -> Attributes {
        let previous = self.attributes.replace(attributes);
        self.emit_graph_update(AttributeUpdate::Replace, None);
        previous
    }

    pub fn merge_attributes(&mut self, attributes: Attributes) {
        self.attributes.merge(attributes);
        self.emit_graph_update(AttributeUpdate::Merge, None);
    }

    fn emit_graph_update(&mut self, kind: AttributeUpdate, name: Option<&str>) {
        self.observers.emit_with(|| GraphEvent::GraphAttributesUpdated {
            kind,
            name: name.map(str::to_string),
        });
    }

    // ---------------------------------------------------------------------
    // Node attributes
    // ---------------------------------------------------------------------

    pub fn get_node_attributes(&self, node: &str) -> Result<&Attributes> {
        let id = self.require_node("get_node_attributes", node)?;
        Ok(&self.node_record(id).attributes)
    }

    pub fn get_node_attribute(&self, node: &str, name: &str) -> Result<Option<&Value>> {
        let id = self.require_node("get_node_attribute", node)?;
        Ok(self.node_record(id).attributes.get(name))
    }

    pub fn has_node_attribute(&self, node: &str, name: &str) -> Result<bool> {
        let id = self.require_node("has_node_attribute", node)?;
        Ok(self.node_record(id).attributes.has(name))
    }

    pub fn set_node_attribute(
        &mut self,
        node: &str,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        let id = self.require_node("set_node_attribute", node)?;
        let previous = self.node_record_mut(id).attributes.set(name, value);
        self.emit_node_update(id, AttributeUpdate::Set, Some(name));
        Ok(previous)
    }

    /// Functional update of one node attribute; returns the new value
    pub fn update_node_attribute<F>(&mut self, node: &str, name: &str, updater: F) -> Result<Value>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let id = self.require_node("update_node_attribute", node)?;
        let value = self
            .node_record_mut(id)
            .attributes
            .update(name, updater)
            .clone();
        self.emit_node_update(id, AttributeUpdate::Update, Some(name));
        Ok(value)
    }

    pub fn remove_node_attribute(&mut self, node: &str, name: &str) -> Result<Option<Value>> {
        let id = self.require_node("remove_node_attribute", node)?;
        let previous = self.node_record_mut(id).attributes.remove(name);
        self.emit_node_update(id, AttributeUpdate::Remove, Some(name));
        Ok(previous)
    }

    pub fn replace_node_attributes(&mut self, node: &str, attributes: Attributes) -> Result<Attributes> {
        let id = self.require_node("replace_node_attributes", node)?;
        let previous = self.node_record_mut(id).attributes.replace(attributes);
        self.emit_node_update(id, AttributeUpdate::Replace, None);
        Ok(previous)
    }

    pub fn merge_node_attributes(&mut self, node: &str, attributes: Attributes) -> Result<()> {
        let id = self.require_node("merge_node_attributes", node)?;
        self.node_record_mut(id).attributes.merge(attributes);
        self.emit_node_update(id, AttributeUpdate::Merge, None);
        Ok(())
    }

    /// Functional update of the whole attribute bag of a node
    pub fn update_node_attributes<F>(&mut self, node: &str, updater: F) -> Result<()>
    where
        F: FnOnce(&str, Attributes) -> Attributes,
    {
        let id = self.require_node("update_node_attributes", node)?;
        let record = self.node_record_mut(id);
        let current = std::mem::take(&mut record.attributes);
        record.attributes = updater(&record.key, current);
        self.emit_node_update(id, AttributeUpdate::Update, None);
        Ok(())
    }

    /// Rewrite the attributes of every node in insertion order
    pub fn update_each_node_attributes<F>(&mut self, mut updater: F)
    where
        F: FnMut(&str, Attributes) -> Attributes,
    {
        let ids: Vec<NodeId> = self.node_ids().collect();
        for id in ids {
            let record = self.node_record_mut(id);
            let current = std::mem::take(&mut record.attributes);
            record.attributes = updater(&record.key, current);
        }

        for id in self.node_ids().collect::<Vec<_>>() {
            self.emit_node_update(id, AttributeUpdate::Update, None);
        }
    }

    fn emit_node_update(&mut self, id: NodeId, kind: AttributeUpdate, name: Option<&str>) {
        if self.observers.is_empty() {
            return;
        }

        let key = self.node_key(id).to_string();
        self.observers
            .emit_with(|| GraphEvent::NodeAttributesUpdated {
                key,
                kind,
                name: name.map(str::to_string),
            });
    }

    // ---------------------------------------------------------------------
    // Edge attributes
    // ---------------------------------------------------------------------

    pub fn get_edge_attributes(&self, edge: &str) -> Result<&Attributes> {
        let id = self.require_edge("get_edge_attributes", edge)?;
        Ok(&self.edge_record(id).attributes)
    }

    pub fn get_edge_attribute(&self, edge: &str, name: &str) -> Result<Option<&Value>> {
        let id = self.require_edge("get_edge_attribute", edge)?;
        Ok(self.edge_record(id).attributes.get(name))
    }

    pub fn has_edge_attribute(&self, edge: &str, name: &str) -> Result<bool> {
        let id = self.require_edge("has_edge_attribute", edge)?;
        Ok(self.edge_record(id).attributes.has(name))
    }

    pub fn set_edge_attribute(
        &mut self,
        edge: &str,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        let id = self.require_edge("set_edge_attribute", edge)?;
        let previous = self.edge_record_mut(id).attributes.set(name, value);
        self.emit_edge_update(id, AttributeUpdate::Set, Some(name));
        Ok(previous)
    }

    pub fn update_edge_attribute<F>(&mut self, edge: &str, name: &str, updater: F) -> Result<Value>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let id = self.require_edge("update_edge_attribute", edge)?;
        let value = self
            .edge_record_mut(id)
            .attributes
            .update(name, updater)
            .clone();
        self.emit_edge_update(id, AttributeUpdate::Update, Some(name));
        Ok(value)
    }

    pub fn remove_edge_attribute(&mut self, edge: &str, name: &str) -> Result<Option<Value>> {
        let id = self.require_edge("remove_edge_attribute", edge)?;
        let previous = self.edge_record_mut(id).attributes.remove(name);
        self.emit_edge_update(id, AttributeUpdate::Remove, Some(name));
        Ok(previous)
    }

    pub fn replace_edge_attributes(&mut self, edge: &str, attributes: Attributes) -> Result<Attributes> {
        let id = self.require_edge("replace_edge_attributes", edge)?;
        let previous = self.edge_record_mut(id).attributes.replace(attributes);
        self.emit_edge_update(id, AttributeUpdate::Replace, None);
        Ok(previous)
    }

    pub fn merge_edge_attributes(&mut self, edge: &str, attributes: Attributes) -> Result<()> {
        let id = self.require_edge("merge_edge_attributes", edge)?;
        self.edge_record_mut(id).attributes.merge(attributes);
        self.emit_edge_update(id, AttributeUpdate::Merge, None);
        Ok(())
    }

    /// Rewrite the attributes of every edge in insertion order. The updater
    /// sees the edge as it was before the rewrite.
    pub fn update_each_edge_attributes<F>(&mut self, mut updater: F)
    where
        F: FnMut(EdgeEntry<'_>) -> Attributes,
    {
        let ids: Vec<EdgeId> = self.edge_index.values().copied().collect();
        for id in &ids {
            let next = updater(self.edge_entry(*id));
            self.edge_record_mut(*id).attributes = next;
        }

        for id in ids {
            self.emit_edge_update(id, AttributeUpdate::Update, None);
        }
    }

    fn emit_edge_update(&mut self, id: EdgeId, kind: AttributeUpdate, name: Option<&str>) {
        if self.observers.is_empty() {
            return;
        }

        let key = self.edge_record(id).key.clone();
        self.observers
            .emit_with(|| GraphEvent::EdgeAttributesUpdated {
                key,
                kind,
                name: name.map(str::to_string),
            });
    }

    /// Borrowed view of one edge
    pub(crate) fn edge_entry(&self, id: EdgeId) -> EdgeEntry<'_> {
        let record = self.edge_record(id);
        let source = self.node_record(record.source);
        let target = self.node_record(record.target);

        EdgeEntry {
            key: &record.key,
            attributes: &record.attributes,
            source: &source.key,
            target: &target.key,
            source_attributes: &source.attributes,
            target_attributes: &target.attributes,
            undirected: record.undirected,
            generated_key: record.generated_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_unset_attribute_is_none_missing_node_is_error() {
        let mut graph = Graph::new();
        graph.add_node("a", attrs!("age" => 3)).unwrap();

        assert_eq!(graph.get_node_attribute("a", "age").unwrap(), Some(&Value::Number(3.0)));
        assert_eq!(graph.get_node_attribute("a", "name").unwrap(), None);
        assert!(graph.get_node_attribute("b", "age").unwrap_err().is_not_found());
        assert!(graph.set_node_attribute("b", "age", 1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_functional_update() {
        let mut graph = Graph::new();
        graph.add_node("a", attrs!()).unwrap();

        let incr = |v: Option<&Value>| Value::from(v.and_then(Value::as_number).unwrap_or(0.0) + 1.0);
        graph.update_node_attribute("a", "count", incr).unwrap();
        let value = graph.update_node_attribute("a", "count", incr).unwrap();
        assert_eq!(value, Value::Number(2.0));
    }

    #[test]
    fn test_update_each_edge_attributes_sees_endpoints() {
        let mut graph = Graph::directed();
        graph.merge_edge_with_key("e", "a", "b", attrs!("weight" => 2)).unwrap();

        graph.update_each_edge_attributes(|entry| {
            let mut next = entry.attributes.clone();
            next.set("label", format!("{}->{}", entry.source, entry.target));
            next
        });

        assert_eq!(
            graph.get_edge_attribute("e", "label").unwrap().and_then(Value::as_str),
            Some("a->b")
        );
        assert!(graph.has_edge_attribute("e", "weight").unwrap());
    }

    #[test]
    fn test_attribute_events() {
        let mut graph = Graph::new();
        graph.add_node("a", attrs!()).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = graph.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        graph.set_node_attribute("a", "x", 1).unwrap();
        graph.set_attribute("name", "g");
        graph.unsubscribe(subscription);
        graph.set_node_attribute("a", "x", 2).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0],
            GraphEvent::NodeAttributesUpdated {
                key: "a".to_string(),
                kind: AttributeUpdate::Set,
                name: Some("x".to_string()),
            }
        );
    }
}
