//! View registry: named transformations layered over a base graph.
//!
//! A view is a stored `MATCH`/`CONSTRUCT` statement whose source is either
//! the instance's base graph or another view, so definitions form chains
//! that always bottom out at the base graph. Views are strictly virtual:
//! registering one stores only its definition, and every query against it
//! re-evaluates the chain against the current facts (see [`eval`]).
//!
//! Registration is the only place cycles could enter the chain, and the
//! source of a new view must already exist, so the sole cycle shape that
//! can ever be attempted is a view naming itself; it is rejected with
//! [`ViewError::CyclicViewReference`].

pub mod eval;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{PgViewResult, ViewError};
use crate::query::ast::{ConstructClause, Pattern, Predicate, ViewStmt};

pub use eval::{Resolved, ViewResolver};

/// Where a view draws its input from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewSource {
    /// The instance's base graph.
    Base,
    /// Another registered view.
    View(String),
}

/// A registered view definition. Immutable once registered; shared via
/// `Arc` so evaluation never holds the registry lock.
#[derive(Debug, Clone)]
pub struct ViewDefinition {
    pub name: String,
    pub is_virtual: bool,
    pub source: ViewSource,
    pub default_map: bool,
    pub pattern: Pattern,
    pub predicate: Option<Predicate>,
    pub construct: Option<ConstructClause>,
    /// The statement as written, for `views` listings and persistence.
    pub text: String,
}

impl ViewDefinition {
    /// Whether this view derives new facts (vs selecting existing ones).
    pub fn is_construction(&self) -> bool {
        self.construct.is_some()
    }
}

#[derive(Debug, Default)]
struct Inner {
    views: HashMap<String, Arc<ViewDefinition>>,
    /// Names in creation order, for listings and persistence.
    order: Vec<String>,
}

/// The per-instance view registry.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    inner: RwLock<Inner>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed view statement. `base` is the name the instance's
    /// base graph answers to; a source equal to it resolves to
    /// [`ViewSource::Base`], any other source must be a registered view.
    pub fn register(&self, stmt: ViewStmt, base: &str) -> PgViewResult<Arc<ViewDefinition>> {
        let mut inner = self.inner.write().expect("view registry lock poisoned");
        if inner.views.contains_key(&stmt.name) {
            return Err(ViewError::DuplicateViewName { name: stmt.name }.into());
        }
        let source = if stmt.source == base {
            ViewSource::Base
        } else if inner.views.contains_key(&stmt.source) {
            ViewSource::View(stmt.source.clone())
        } else if stmt.source == stmt.name {
            return Err(ViewError::CyclicViewReference { name: stmt.name }.into());
        } else {
            return Err(ViewError::UnknownGraph {
                name: stmt.source.clone(),
            }
            .into());
        };
        debug!(view = %stmt.name, source = %stmt.source, "registering view");
        let definition = Arc::new(ViewDefinition {
            name: stmt.name.clone(),
            is_virtual: stmt.is_virtual,
            source,
            default_map: stmt.default_map,
            pattern: stmt.pattern,
            predicate: stmt.predicate,
            construct: stmt.construct,
            text: stmt.text,
        });
        inner.order.push(stmt.name.clone());
        inner.views.insert(stmt.name, Arc::clone(&definition));
        Ok(definition)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ViewDefinition>> {
        self.inner
            .read()
            .expect("view registry lock poisoned")
            .views
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .read()
            .expect("view registry lock poisoned")
            .views
            .contains_key(name)
    }

    /// Remove a view. Refused while another view still draws from it.
    pub fn drop_view(&self, name: &str) -> PgViewResult<()> {
        let mut inner = self.inner.write().expect("view registry lock poisoned");
        if !inner.views.contains_key(name) {
            return Err(ViewError::UnknownGraph {
                name: name.to_string(),
            }
            .into());
        }
        let dependent = inner.views.values().find_map(|def| match &def.source {
            ViewSource::View(src) if src == name => Some(def.name.clone()),
            _ => None,
        });
        if let Some(dependent) = dependent {
            return Err(ViewError::ViewInUse {
                name: name.to_string(),
                dependent,
            }
            .into());
        }
        inner.views.remove(name);
        inner.order.retain(|n| n != name);
        debug!(view = %name, "dropped view");
        Ok(())
    }

    /// Definitions in creation order.
    pub fn list(&self) -> Vec<Arc<ViewDefinition>> {
        let inner = self.inner.read().expect("view registry lock poisoned");
        inner
            .order
            .iter()
            .filter_map(|name| inner.views.get(name).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("view registry lock poisoned")
            .views
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::Command;
    use crate::query::parse_command;

    fn stmt(src: &str) -> ViewStmt {
        match parse_command(src).unwrap() {
            Command::CreateView(v) => v,
            other => panic!("expected a view statement, got {other:?}"),
        }
    }

    #[test]
    fn register_resolves_base_source() {
        let reg = ViewRegistry::new();
        let def = reg
            .register(stmt("create view adults on g ( match (p:Person) )"), "g")
            .unwrap();
        assert_eq!(def.source, ViewSource::Base);
        assert!(reg.contains("adults"));
    }

    #[test]
    fn register_chains_on_existing_view() {
        let reg = ViewRegistry::new();
        reg.register(stmt("create view a on g ( match (p:Person) )"), "g")
            .unwrap();
        let def = reg
            .register(stmt("create view b on a ( match (p:Person) )"), "g")
            .unwrap();
        assert_eq!(def.source, ViewSource::View("a".into()));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let reg = ViewRegistry::new();
        reg.register(stmt("create view a on g ( match (p:Person) )"), "g")
            .unwrap();
        let err = reg
            .register(stmt("create view a on g ( match (q:Person) )"), "g")
            .unwrap_err();
        assert!(err.to_string().contains("duplicate view name"));
    }

    #[test]
    fn self_reference_is_cyclic() {
        let reg = ViewRegistry::new();
        let err = reg
            .register(stmt("create view a on a ( match (p:Person) )"), "g")
            .unwrap_err();
        assert!(err.to_string().contains("cyclic view reference"));
    }

    #[test]
    fn unknown_source_is_rejected() {
        let reg = ViewRegistry::new();
        let err = reg
            .register(stmt("create view a on nosuch ( match (p:Person) )"), "g")
            .unwrap_err();
        assert!(err.to_string().contains("unknown graph"));
    }

    #[test]
    fn drop_refuses_while_dependents_exist() {
        let reg = ViewRegistry::new();
        reg.register(stmt("create view a on g ( match (p:Person) )"), "g")
            .unwrap();
        reg.register(stmt("create view b on a ( match (p:Person) )"), "g")
            .unwrap();
        let err = reg.drop_view("a").unwrap_err();
        assert!(err.to_string().contains("in use"));
        reg.drop_view("b").unwrap();
        reg.drop_view("a").unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn list_keeps_creation_order() {
        let reg = ViewRegistry::new();
        reg.register(stmt("create view b on g ( match (p:Person) )"), "g")
            .unwrap();
        reg.register(stmt("create view a on g ( match (p:Person) )"), "g")
            .unwrap();
        let names: Vec<_> = reg.list().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
