//! Graph catalog: named graph instances and the current selection.
//!
//! Uses `DashMap` so instance lookup never blocks behind writers of other
//! instances; creation order is tracked separately for `list` output. The
//! current selection can never be dropped, so `current()` always resolves.

use std::sync::{Arc, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::error::{CatalogError, PgViewResult};
use crate::store::GraphStore;
use crate::view::ViewRegistry;

/// One named graph: its fact store plus its registered views.
#[derive(Debug)]
pub struct GraphInstance {
    pub name: String,
    pub store: GraphStore,
    pub views: ViewRegistry,
}

impl GraphInstance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: GraphStore::new(),
            views: ViewRegistry::new(),
        }
    }

    /// Rebuild an instance from restored parts.
    pub fn restored(name: impl Into<String>, store: GraphStore, views: ViewRegistry) -> Self {
        Self {
            name: name.into(),
            store,
            views,
        }
    }
}

/// All graph instances known to an engine.
#[derive(Debug)]
pub struct GraphCatalog {
    graphs: DashMap<String, Arc<GraphInstance>>,
    /// Names in creation order, for `list` output.
    order: RwLock<Vec<String>>,
    current: RwLock<String>,
}

impl GraphCatalog {
    /// A catalog seeded with one instance, which starts as the current
    /// selection.
    pub fn new(initial: &str) -> Self {
        let catalog = Self {
            graphs: DashMap::new(),
            order: RwLock::new(Vec::new()),
            current: RwLock::new(initial.to_string()),
        };
        catalog
            .graphs
            .insert(initial.to_string(), Arc::new(GraphInstance::new(initial)));
        catalog
            .order
            .write()
            .expect("catalog lock poisoned")
            .push(initial.to_string());
        catalog
    }

    pub fn create(&self, name: &str) -> PgViewResult<Arc<GraphInstance>> {
        match self.graphs.entry(name.to_string()) {
            Entry::Occupied(_) => Err(CatalogError::AlreadyExists {
                name: name.to_string(),
            }
            .into()),
            Entry::Vacant(slot) => {
                let instance = Arc::new(GraphInstance::new(name));
                slot.insert(Arc::clone(&instance));
                self.order
                    .write()
                    .expect("catalog lock poisoned")
                    .push(name.to_string());
                info!(graph = %name, "created graph");
                Ok(instance)
            }
        }
    }

    /// Reinsert a restored instance, keeping creation order stable.
    pub fn install(&self, instance: Arc<GraphInstance>) {
        let name = instance.name.clone();
        let mut order = self.order.write().expect("catalog lock poisoned");
        if !order.contains(&name) {
            order.push(name.clone());
        }
        self.graphs.insert(name, instance);
    }

    pub fn get(&self, name: &str) -> Option<Arc<GraphInstance>> {
        self.graphs.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn require(&self, name: &str) -> PgViewResult<Arc<GraphInstance>> {
        self.get(name).ok_or_else(|| {
            CatalogError::NotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Switch the current selection.
    pub fn use_graph(&self, name: &str) -> PgViewResult<Arc<GraphInstance>> {
        let instance = self.require(name)?;
        *self.current.write().expect("catalog lock poisoned") = name.to_string();
        info!(graph = %name, "switched current graph");
        Ok(instance)
    }

    pub fn drop_graph(&self, name: &str) -> PgViewResult<()> {
        if *self.current.read().expect("catalog lock poisoned") == name {
            return Err(CatalogError::DropCurrent {
                name: name.to_string(),
            }
            .into());
        }
        if self.graphs.remove(name).is_none() {
            return Err(CatalogError::NotFound {
                name: name.to_string(),
            }
            .into());
        }
        self.order
            .write()
            .expect("catalog lock poisoned")
            .retain(|n| n != name);
        info!(graph = %name, "dropped graph");
        Ok(())
    }

    pub fn current_name(&self) -> String {
        self.current.read().expect("catalog lock poisoned").clone()
    }

    /// The current instance. The current selection cannot be dropped, so
    /// this always resolves.
    pub fn current(&self) -> Arc<GraphInstance> {
        let name = self.current_name();
        self.get(&name)
            .expect("current graph missing from catalog")
    }

    /// Names in creation order.
    pub fn names(&self) -> Vec<String> {
        self.order.read().expect("catalog lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_the_initial_graph_selected() {
        let catalog = GraphCatalog::new("default");
        assert_eq!(catalog.current_name(), "default");
        assert_eq!(catalog.current().name, "default");
        assert_eq!(catalog.names(), vec!["default"]);
    }

    #[test]
    fn create_and_switch() {
        let catalog = GraphCatalog::new("default");
        catalog.create("social").unwrap();
        assert_eq!(catalog.current_name(), "default");
        catalog.use_graph("social").unwrap();
        assert_eq!(catalog.current_name(), "social");
        assert_eq!(catalog.names(), vec!["default", "social"]);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let catalog = GraphCatalog::new("default");
        catalog.create("social").unwrap();
        let err = catalog.create("social").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn unknown_use_is_rejected() {
        let catalog = GraphCatalog::new("default");
        assert!(catalog.use_graph("nosuch").is_err());
    }

    #[test]
    fn cannot_drop_the_current_graph() {
        let catalog = GraphCatalog::new("default");
        let err = catalog.drop_graph("default").unwrap_err();
        assert!(err.to_string().contains("current"));
    }

    #[test]
    fn drop_removes_the_instance() {
        let catalog = GraphCatalog::new("default");
        catalog.create("scratch").unwrap();
        catalog.drop_graph("scratch").unwrap();
        assert!(catalog.get("scratch").is_none());
        assert_eq!(catalog.names(), vec!["default"]);
    }

    #[test]
    fn instances_are_isolated() {
        let catalog = GraphCatalog::new("default");
        catalog.create("a").unwrap();
        catalog.create("b").unwrap();
        let a = catalog.get("a").unwrap();
        a.store.declare_node_label("Person");
        a.store.insert_node(1, "Person").unwrap();
        let b = catalog.get("b").unwrap();
        assert_eq!(a.store.node_count(), 1);
        assert_eq!(b.store.node_count(), 0);
    }
}
