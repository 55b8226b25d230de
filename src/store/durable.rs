//! ACID-durable persistence backed by redb.
//!
//! When the engine is configured with a data directory, every catalog mutation
//! writes the affected graph instance back as one bincode-encoded blob: schema,
//! base facts, and view definition texts (views are re-parsed on open, so the
//! on-disk format stays independent of the in-memory AST). All writes go
//! through transactions; reads use redb's MVCC snapshots.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::fact::{EdgeFact, EdgeId, NodeFact, NodeId};
use crate::relation::RelationSet;
use crate::schema::GraphSchema;
use crate::store::{GraphStore, StoreResult};

/// Table for engine state (string keys → binary values).
const META_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("meta");

const GRAPH_LIST_KEY: &[u8] = b"catalog/graphs";
const CURRENT_KEY: &[u8] = b"catalog/current";

fn graph_key(name: &str) -> Vec<u8> {
    format!("graph/{name}").into_bytes()
}

/// One graph instance's durable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedGraph {
    pub schema: GraphSchema,
    pub nodes: Vec<NodeFact>,
    pub edges: Vec<EdgeFact>,
    pub node_props: Vec<(u64, String, String)>,
    pub edge_props: Vec<(u64, String, String)>,
    /// View definition texts in creation order.
    pub views: Vec<String>,
}

impl PersistedGraph {
    /// Capture a store's current state together with its view texts.
    pub fn capture(store: &GraphStore, views: Vec<String>) -> Self {
        let rels = store.snapshot();
        let nodes = rels
            .nodes()
            .map(|(id, label)| NodeFact::new(id, label))
            .collect();
        let edges = rels.edges().cloned().collect();
        let mut node_props = Vec::new();
        for (id, _) in rels.nodes() {
            if let Some(props) = rels.node_properties(id) {
                for (k, v) in props {
                    node_props.push((id.get(), k.clone(), v.clone()));
                }
            }
        }
        let mut edge_props = Vec::new();
        for edge in rels.edges() {
            if let Some(props) = rels.edge_properties(edge.id) {
                for (k, v) in props {
                    edge_props.push((edge.id.get(), k.clone(), v.clone()));
                }
            }
        }
        Self {
            schema: store.schema_snapshot(),
            nodes,
            edges,
            node_props,
            edge_props,
            views,
        }
    }

    /// Rebuild the store side of this state (views are re-parsed by the engine).
    pub fn into_store(self) -> GraphStore {
        let mut rels = RelationSet::new();
        for node in self.nodes {
            rels.add_node(node);
        }
        for edge in self.edges {
            rels.add_edge(edge);
        }
        for (id, k, v) in self.node_props {
            rels.set_node_prop(NodeId::new(id), k, v);
        }
        for (id, k, v) in self.edge_props {
            rels.set_edge_prop(EdgeId::new(id), k, v);
        }
        GraphStore::restore(self.schema, rels)
    }
}

/// ACID-durable store using redb.
///
/// All writes go through transactions. Reads use MVCC snapshots.
pub struct DurableStore {
    db: Arc<Database>,
}

impl DurableStore {
    /// Open or create a durable store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join("pgview.redb");
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Store a key-value pair with full ACID guarantees.
    pub fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut table = txn.open_table(META_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            table.insert(key, value).map_err(|e| StoreError::Redb {
                message: format!("insert failed: {e}"),
            })?;
        }
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(())
    }

    /// Read a value by key. Returns `Ok(None)` if the key doesn't exist.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = match txn.open_table(META_TABLE) {
            Ok(table) => table,
            // First read before any write: the table doesn't exist yet.
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => {
                return Err(StoreError::Redb {
                    message: format!("open_table failed: {e}"),
                });
            }
        };
        let result = table.get(key).map_err(|e| StoreError::Redb {
            message: format!("get failed: {e}"),
        })?;
        Ok(result.map(|guard| guard.value().to_vec()))
    }

    /// Delete a key. Returns whether the key existed.
    pub fn remove(&self, key: &[u8]) -> StoreResult<bool> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        let existed = {
            let mut table = txn.open_table(META_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            let result = table.remove(key).map_err(|e| StoreError::Redb {
                message: format!("remove failed: {e}"),
            })?;
            result.is_some()
        };
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(existed)
    }

    // -----------------------------------------------------------------------
    // Typed helpers
    // -----------------------------------------------------------------------

    fn put_encoded<T: Serialize>(&self, key: &[u8], value: &T) -> StoreResult<()> {
        let bytes = bincode::serialize(value).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;
        self.put(key, &bytes)
    }

    fn get_decoded<T: for<'de> Deserialize<'de>>(&self, key: &[u8]) -> StoreResult<Option<T>> {
        match self.get(key)? {
            None => Ok(None),
            Some(bytes) => {
                bincode::deserialize(&bytes)
                    .map(Some)
                    .map_err(|e| StoreError::Serialization {
                        message: e.to_string(),
                    })
            }
        }
    }

    /// Persist one graph instance's state.
    pub fn save_graph(&self, name: &str, state: &PersistedGraph) -> StoreResult<()> {
        self.put_encoded(&graph_key(name), state)
    }

    /// Load one graph instance's state, if present.
    pub fn load_graph(&self, name: &str) -> StoreResult<Option<PersistedGraph>> {
        self.get_decoded(&graph_key(name))
    }

    /// Remove a dropped graph's state.
    pub fn remove_graph(&self, name: &str) -> StoreResult<bool> {
        self.remove(&graph_key(name))
    }

    /// Persist the catalog's graph names in creation order.
    pub fn save_graph_list(&self, names: &[String]) -> StoreResult<()> {
        self.put_encoded(GRAPH_LIST_KEY, &names.to_vec())
    }

    /// Load the catalog's graph names.
    pub fn load_graph_list(&self) -> StoreResult<Vec<String>> {
        Ok(self.get_decoded(GRAPH_LIST_KEY)?.unwrap_or_default())
    }

    /// Persist the current-graph selection.
    pub fn save_current(&self, name: &str) -> StoreResult<()> {
        self.put_encoded(CURRENT_KEY, &name.to_string())
    }

    /// Load the current-graph selection, if one was saved.
    pub fn load_current(&self) -> StoreResult<Option<String>> {
        self.get_decoded(CURRENT_KEY)
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn put_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();

        store.put(b"hello", b"world").unwrap();
        assert_eq!(store.get(b"hello").unwrap(), Some(b"world".to_vec()));

        assert!(store.remove(b"hello").unwrap());
        assert_eq!(store.get(b"hello").unwrap(), None);
    }

    #[test]
    fn get_before_first_write_is_none() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        assert_eq!(store.get(b"anything").unwrap(), None);
    }

    #[test]
    fn graph_state_roundtrip() {
        let dir = TempDir::new().unwrap();
        let durable = DurableStore::open(dir.path()).unwrap();

        let store = GraphStore::new();
        store.declare_node_label("Person");
        store.insert_node(1, "Person").unwrap();
        store.set_node_property(1, "name", "ada").unwrap();

        let state = PersistedGraph::capture(&store, vec!["CREATE VIEW V1 ON g ( ... )".into()]);
        durable.save_graph("default", &state).unwrap();

        let loaded = durable.load_graph("default").unwrap().unwrap();
        assert_eq!(loaded.nodes.len(), 1);
        assert_eq!(loaded.views.len(), 1);

        let restored = loaded.into_store();
        assert_eq!(restored.node_count(), 1);
        let snap = restored.snapshot();
        assert_eq!(snap.node_prop(NodeId::new(1), "name"), Some("ada"));
    }

    #[test]
    fn persistence_across_reopens() {
        let dir = TempDir::new().unwrap();

        {
            let store = DurableStore::open(dir.path()).unwrap();
            store
                .save_graph_list(&["default".into(), "q1".into()])
                .unwrap();
            store.save_current("q1").unwrap();
        }

        let store = DurableStore::open(dir.path()).unwrap();
        assert_eq!(
            store.load_graph_list().unwrap(),
            vec!["default".to_string(), "q1".to_string()]
        );
        assert_eq!(store.load_current().unwrap(), Some("q1".to_string()));
    }

    #[test]
    fn remove_nonexistent_graph() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path()).unwrap();
        store.put(b"seed", b"x").unwrap();
        assert!(!store.remove_graph("nope").unwrap());
    }
}
