//! `RelationSet`: an immutable snapshot of the four graph relations.
//!
//! This is the unit the matcher evaluates against and the unit a view
//! resolution produces. It carries a petgraph [`DiGraph`] for direction-indexed
//! adjacency next to label indexes and insertion-ordered fact lists, so
//! candidate lookups (`nodes_with_label`, `out_edges`, ...) never scan the
//! whole relation.
//!
//! A `RelationSet` is value-like: the base store clones its current set as a
//! query snapshot, and view evaluation builds fresh sets from binding rows.

use std::collections::{BTreeMap, HashMap};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::fact::{EdgeFact, EdgeId, NodeFact, NodeId};

/// One graph's worth of relations, indexed for matching.
#[derive(Debug, Clone, Default)]
pub struct RelationSet {
    graph: DiGraph<NodeId, EdgeId>,
    node_index: HashMap<NodeId, NodeIndex>,
    node_labels: HashMap<NodeId, String>,
    edges: HashMap<EdgeId, EdgeFact>,
    node_props: HashMap<NodeId, BTreeMap<String, String>>,
    edge_props: HashMap<EdgeId, BTreeMap<String, String>>,
    nodes_by_label: HashMap<String, Vec<NodeId>>,
    edges_by_label: HashMap<String, Vec<EdgeId>>,
    node_order: Vec<NodeId>,
    edge_order: Vec<EdgeId>,
}

impl RelationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node fact. Returns `false` (and changes nothing) if the id is
    /// already present — first insertion wins.
    pub fn add_node(&mut self, fact: NodeFact) -> bool {
        if self.node_labels.contains_key(&fact.id) {
            return false;
        }
        let idx = self.graph.add_node(fact.id);
        self.node_index.insert(fact.id, idx);
        self.nodes_by_label
            .entry(fact.label.clone())
            .or_default()
            .push(fact.id);
        self.node_order.push(fact.id);
        self.node_labels.insert(fact.id, fact.label);
        true
    }

    /// Add an edge fact. Returns `false` if the edge id is already present or
    /// either endpoint node is absent — callers add endpoints first.
    pub fn add_edge(&mut self, fact: EdgeFact) -> bool {
        if self.edges.contains_key(&fact.id) {
            return false;
        }
        let (Some(&from_idx), Some(&to_idx)) = (
            self.node_index.get(&fact.from),
            self.node_index.get(&fact.to),
        ) else {
            return false;
        };
        self.graph.add_edge(from_idx, to_idx, fact.id);
        self.edges_by_label
            .entry(fact.label.clone())
            .or_default()
            .push(fact.id);
        self.edge_order.push(fact.id);
        self.edges.insert(fact.id, fact);
        true
    }

    /// Set a node property, overwriting any previous value for the key.
    /// Returns `false` if the node is absent.
    pub fn set_node_prop(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        if !self.node_labels.contains_key(&id) {
            return false;
        }
        self.node_props
            .entry(id)
            .or_default()
            .insert(key.into(), value.into());
        true
    }

    /// Set an edge property, overwriting any previous value for the key.
    /// Returns `false` if the edge is absent.
    pub fn set_edge_prop(
        &mut self,
        id: EdgeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        if !self.edges.contains_key(&id) {
            return false;
        }
        self.edge_props
            .entry(id)
            .or_default()
            .insert(key.into(), value.into());
        true
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Whether a raw id is taken by either a node or an edge.
    pub fn contains_id(&self, raw: u64) -> bool {
        self.node_labels.contains_key(&NodeId::new(raw)) || self.edges.contains_key(&EdgeId::new(raw))
    }

    pub fn node_label(&self, id: NodeId) -> Option<&str> {
        self.node_labels.get(&id).map(String::as_str)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&EdgeFact> {
        self.edges.get(&id)
    }

    /// Candidate nodes for a label constraint (`None` = any label),
    /// in insertion order.
    pub fn nodes_with_label(&self, label: Option<&str>) -> Vec<NodeId> {
        match label {
            None => self.node_order.clone(),
            Some(l) => self.nodes_by_label.get(l).cloned().unwrap_or_default(),
        }
    }

    /// Candidate edges for a label constraint (`None` = any label),
    /// in insertion order.
    pub fn edges_with_label(&self, label: Option<&str>) -> Vec<&EdgeFact> {
        match label {
            None => self
                .edge_order
                .iter()
                .filter_map(|id| self.edges.get(id))
                .collect(),
            Some(l) => self
                .edges_by_label
                .get(l)
                .into_iter()
                .flatten()
                .filter_map(|id| self.edges.get(id))
                .collect(),
        }
    }

    /// Edges leaving `from`, optionally restricted by label.
    pub fn out_edges(&self, from: NodeId, label: Option<&str>) -> Vec<&EdgeFact> {
        let Some(&idx) = self.node_index.get(&from) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|e| self.edges.get(e.weight()))
            .filter(|fact| label.is_none_or(|l| fact.label == l))
            .collect()
    }

    /// Edges arriving at `to`, optionally restricted by label.
    pub fn in_edges(&self, to: NodeId, label: Option<&str>) -> Vec<&EdgeFact> {
        let Some(&idx) = self.node_index.get(&to) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter_map(|e| self.edges.get(e.weight()))
            .filter(|fact| label.is_none_or(|l| fact.label == l))
            .collect()
    }

    pub fn node_prop(&self, id: NodeId, key: &str) -> Option<&str> {
        self.node_props.get(&id)?.get(key).map(String::as_str)
    }

    pub fn edge_prop(&self, id: EdgeId, key: &str) -> Option<&str> {
        self.edge_props.get(&id)?.get(key).map(String::as_str)
    }

    /// All properties of a node, if any are set.
    pub fn node_properties(&self, id: NodeId) -> Option<&BTreeMap<String, String>> {
        self.node_props.get(&id)
    }

    /// All properties of an edge, if any are set.
    pub fn edge_properties(&self, id: EdgeId) -> Option<&BTreeMap<String, String>> {
        self.edge_props.get(&id)
    }

    /// Nodes in insertion order as `(id, label)`.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &str)> {
        self.node_order
            .iter()
            .filter_map(|id| self.node_labels.get(id).map(|l| (*id, l.as_str())))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeFact> {
        self.edge_order.iter().filter_map(|id| self.edges.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_order.is_empty() && self.edge_order.is_empty()
    }

    // -----------------------------------------------------------------------
    // Union
    // -----------------------------------------------------------------------

    /// Union another set into this one, keyed by id.
    ///
    /// Existing facts keep their identity; `other`'s properties overlay this
    /// set's per key. Used for default-map view output (matched ∪ constructed,
    /// with constructed assignments winning on property collisions).
    pub fn union_with(&mut self, other: &RelationSet) {
        for (id, label) in other.nodes() {
            self.add_node(NodeFact::new(id, label));
        }
        for fact in other.edges() {
            self.add_edge(fact.clone());
        }
        for (id, props) in &other.node_props {
            if self.node_labels.contains_key(id) {
                let slot = self.node_props.entry(*id).or_default();
                for (k, v) in props {
                    slot.insert(k.clone(), v.clone());
                }
            }
        }
        for (id, props) in &other.edge_props {
            if self.edges.contains_key(id) {
                let slot = self.edge_props.entry(*id).or_default();
                for (k, v) in props {
                    slot.insert(k.clone(), v.clone());
                }
            }
        }
    }
}
