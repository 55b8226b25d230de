//! Graph relation store: the mutable base facts of one graph instance.
//!
//! Holds the declared schema and the base `RelationSet` behind reader-writer
//! locks. Mutations are validated first and applied only if every check
//! passes, so a failed insert leaves the store untouched. Writers are
//! serialized per instance; readers take whole-set snapshots, giving every
//! query a consistent view regardless of concurrent inserts.

pub mod durable;

use std::sync::RwLock;

use tracing::debug;

use crate::error::{PgViewResult, SchemaError, StoreError};
use crate::fact::{EdgeFact, EdgeId, NodeFact, NodeId};
use crate::relation::RelationSet;
use crate::schema::GraphSchema;

/// Result alias for store-level operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The mutable base store of one graph instance.
#[derive(Debug, Default)]
pub struct GraphStore {
    schema: RwLock<GraphSchema>,
    rels: RwLock<RelationSet>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted state, bypassing insert-time checks —
    /// the facts were validated when first inserted.
    pub fn restore(schema: GraphSchema, rels: RelationSet) -> Self {
        Self {
            schema: RwLock::new(schema),
            rels: RwLock::new(rels),
        }
    }

    // -----------------------------------------------------------------------
    // Schema mutation
    // -----------------------------------------------------------------------

    /// Declare a node label (additive; redeclaration is a no-op).
    pub fn declare_node_label(&self, label: &str) {
        let mut schema = self.schema.write().expect("schema lock poisoned");
        schema.declare_node_label(label);
        debug!(label, "declared node label");
    }

    /// Declare an edge label with endpoint labels.
    pub fn declare_edge_label(&self, label: &str, from: &str, to: &str) -> PgViewResult<()> {
        let mut schema = self.schema.write().expect("schema lock poisoned");
        schema.declare_edge_label(label, from, to)?;
        debug!(label, from, to, "declared edge label");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fact insertion
    // -----------------------------------------------------------------------

    /// Insert a node fact: `N(id, label)`.
    pub fn insert_node(&self, id: u64, label: &str) -> PgViewResult<()> {
        let schema = self.schema.read().expect("schema lock poisoned");
        let mut rels = self.rels.write().expect("relation lock poisoned");
        if rels.contains_id(id) {
            return Err(StoreError::DuplicateIdentity { id }.into());
        }
        schema.check_node(label)?;
        rels.add_node(NodeFact::new(NodeId::new(id), label));
        Ok(())
    }

    /// Insert an edge fact: `E(id, from, to, label)`.
    ///
    /// Both endpoints must already exist and carry the labels the edge schema
    /// declares; the id must be fresh across the shared node/edge id space.
    pub fn insert_edge(&self, id: u64, from: u64, to: u64, label: &str) -> PgViewResult<()> {
        let schema = self.schema.read().expect("schema lock poisoned");
        let mut rels = self.rels.write().expect("relation lock poisoned");
        if rels.contains_id(id) {
            return Err(StoreError::DuplicateIdentity { id }.into());
        }
        let from_id = NodeId::new(from);
        let to_id = NodeId::new(to);
        let from_label = rels
            .node_label(from_id)
            .ok_or_else(|| SchemaError::MissingEndpoint {
                edge_label: label.to_string(),
                node_id: from,
            })?
            .to_string();
        let to_label = rels
            .node_label(to_id)
            .ok_or_else(|| SchemaError::MissingEndpoint {
                edge_label: label.to_string(),
                node_id: to,
            })?
            .to_string();
        schema.check_edge(label, from, &from_label, to, &to_label)?;
        rels.add_edge(EdgeFact::new(EdgeId::new(id), from_id, to_id, label));
        Ok(())
    }

    /// Upsert a node property: `NP(id, key, value)`, last write wins.
    pub fn set_node_property(&self, id: u64, key: &str, value: &str) -> PgViewResult<()> {
        let mut rels = self.rels.write().expect("relation lock poisoned");
        if !rels.set_node_prop(NodeId::new(id), key, value) {
            return Err(SchemaError::DanglingProperty { id }.into());
        }
        Ok(())
    }

    /// Upsert an edge property: `EP(id, key, value)`, last write wins.
    pub fn set_edge_property(&self, id: u64, key: &str, value: &str) -> PgViewResult<()> {
        let mut rels = self.rels.write().expect("relation lock poisoned");
        if !rels.set_edge_prop(EdgeId::new(id), key, value) {
            return Err(SchemaError::DanglingProperty { id }.into());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// A consistent snapshot of the base relations, taken under one read lock.
    pub fn snapshot(&self) -> RelationSet {
        self.rels.read().expect("relation lock poisoned").clone()
    }

    /// A copy of the declared schema.
    pub fn schema_snapshot(&self) -> GraphSchema {
        self.schema.read().expect("schema lock poisoned").clone()
    }

    /// The `schema` command listing.
    pub fn schema_render(&self) -> String {
        self.schema.read().expect("schema lock poisoned").render()
    }

    pub fn node_count(&self) -> usize {
        self.rels.read().expect("relation lock poisoned").node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.rels.read().expect("relation lock poisoned").edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PgViewError;

    fn people_store() -> GraphStore {
        let store = GraphStore::new();
        store.declare_node_label("Person");
        store.declare_node_label("Company");
        store.declare_edge_label("Knows", "Person", "Person").unwrap();
        store.declare_edge_label("WorksAt", "Person", "Company").unwrap();
        store.insert_node(1, "Person").unwrap();
        store.insert_node(2, "Person").unwrap();
        store.insert_node(3, "Company").unwrap();
        store
    }

    #[test]
    fn valid_inserts_accumulate() {
        let store = people_store();
        store.insert_edge(10, 1, 2, "Knows").unwrap();
        store.insert_edge(11, 1, 3, "WorksAt").unwrap();
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn undeclared_label_is_schema_violation() {
        let store = people_store();
        let err = store.insert_node(4, "Robot").unwrap_err();
        assert!(matches!(
            err,
            PgViewError::Schema(SchemaError::UndeclaredNodeLabel { .. })
        ));
        assert_eq!(store.node_count(), 3);
    }

    #[test]
    fn endpoint_mismatch_leaves_store_unchanged() {
        let store = people_store();
        let err = store.insert_edge(10, 1, 3, "Knows").unwrap_err();
        assert!(matches!(
            err,
            PgViewError::Schema(SchemaError::EndpointMismatch { .. })
        ));
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn missing_endpoint_is_schema_violation() {
        let store = people_store();
        let err = store.insert_edge(10, 1, 99, "Knows").unwrap_err();
        assert!(matches!(
            err,
            PgViewError::Schema(SchemaError::MissingEndpoint { node_id: 99, .. })
        ));
    }

    #[test]
    fn duplicate_identity_across_node_and_edge_space() {
        let store = people_store();
        store.insert_edge(10, 1, 2, "Knows").unwrap();
        // Node id reused as node.
        let err = store.insert_node(1, "Person").unwrap_err();
        assert!(matches!(
            err,
            PgViewError::Store(StoreError::DuplicateIdentity { id: 1 })
        ));
        // Edge id reused as node, and node id reused as edge.
        let err = store.insert_node(10, "Person").unwrap_err();
        assert!(matches!(
            err,
            PgViewError::Store(StoreError::DuplicateIdentity { id: 10 })
        ));
        let err = store.insert_edge(2, 1, 2, "Knows").unwrap_err();
        assert!(matches!(
            err,
            PgViewError::Store(StoreError::DuplicateIdentity { id: 2 })
        ));
    }

    #[test]
    fn property_upsert_overwrites() {
        let store = people_store();
        store.set_node_property(1, "type", "engineer").unwrap();
        store.set_node_property(1, "type", "manager").unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.node_prop(NodeId::new(1), "type"), Some("manager"));
    }

    #[test]
    fn property_on_unknown_id_is_rejected() {
        let store = people_store();
        let err = store.set_node_property(99, "k", "v").unwrap_err();
        assert!(matches!(
            err,
            PgViewError::Schema(SchemaError::DanglingProperty { id: 99 })
        ));
        // An edge id is not a node id.
        store.insert_edge(10, 1, 2, "Knows").unwrap();
        assert!(store.set_node_property(10, "k", "v").is_err());
        assert!(store.set_edge_property(10, "since", "2019").is_ok());
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let store = people_store();
        let snap = store.snapshot();
        store.insert_node(4, "Person").unwrap();
        assert_eq!(snap.node_count(), 3);
        assert_eq!(store.node_count(), 4);
    }
}
