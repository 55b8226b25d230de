//! Graph schema: declared node labels and edge labels with endpoint constraints.
//!
//! Declarations are additive only — the observed surface has no drop/alter.
//! Redeclaring an identical label is a no-op; redeclaring an edge label with
//! different endpoints is rejected. Endpoint constraints are checked at edge
//! insertion time, never retroactively on schema change.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Result alias for schema checks.
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Declared endpoint labels for an edge label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEndpoints {
    pub from: String,
    pub to: String,
}

/// The declared schema of one graph instance.
///
/// Uses ordered maps so the `schema` listing renders deterministically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSchema {
    node_labels: BTreeSet<String>,
    edge_labels: BTreeMap<String, EdgeEndpoints>,
}

impl GraphSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node label. Identical redeclaration is a no-op.
    pub fn declare_node_label(&mut self, label: &str) {
        self.node_labels.insert(label.to_string());
    }

    /// Declare an edge label with its endpoint labels.
    ///
    /// Both endpoint labels must already be declared node labels. Redeclaring
    /// with the same endpoints is a no-op; different endpoints are rejected.
    pub fn declare_edge_label(&mut self, label: &str, from: &str, to: &str) -> SchemaResult<()> {
        for endpoint in [from, to] {
            if !self.node_labels.contains(endpoint) {
                return Err(SchemaError::UnknownEndpointLabel {
                    edge_label: label.to_string(),
                    label: endpoint.to_string(),
                });
            }
        }
        if let Some(existing) = self.edge_labels.get(label) {
            if existing.from != from || existing.to != to {
                return Err(SchemaError::ConflictingEdgeLabel {
                    label: label.to_string(),
                    declared_from: existing.from.clone(),
                    declared_to: existing.to.clone(),
                });
            }
            return Ok(());
        }
        self.edge_labels.insert(
            label.to_string(),
            EdgeEndpoints {
                from: from.to_string(),
                to: to.to_string(),
            },
        );
        Ok(())
    }

    /// Whether a node label is declared.
    pub fn has_node_label(&self, label: &str) -> bool {
        self.node_labels.contains(label)
    }

    /// Endpoint constraints of a declared edge label, if any.
    pub fn edge_endpoints(&self, label: &str) -> Option<&EdgeEndpoints> {
        self.edge_labels.get(label)
    }

    /// Check that a node insertion carries a declared label.
    pub fn check_node(&self, label: &str) -> SchemaResult<()> {
        if self.has_node_label(label) {
            Ok(())
        } else {
            Err(SchemaError::UndeclaredNodeLabel {
                label: label.to_string(),
            })
        }
    }

    /// Check an edge insertion against the declared endpoint labels.
    ///
    /// `from_label`/`to_label` are the labels of the actual endpoint nodes.
    pub fn check_edge(
        &self,
        label: &str,
        from_id: u64,
        from_label: &str,
        to_id: u64,
        to_label: &str,
    ) -> SchemaResult<()> {
        let endpoints = self
            .edge_endpoints(label)
            .ok_or_else(|| SchemaError::UndeclaredEdgeLabel {
                label: label.to_string(),
            })?;
        if endpoints.from != from_label {
            return Err(SchemaError::EndpointMismatch {
                edge_label: label.to_string(),
                slot: "from",
                expected: endpoints.from.clone(),
                actual: from_label.to_string(),
                node_id: from_id,
            });
        }
        if endpoints.to != to_label {
            return Err(SchemaError::EndpointMismatch {
                edge_label: label.to_string(),
                slot: "to",
                expected: endpoints.to.clone(),
                actual: to_label.to_string(),
                node_id: to_id,
            });
        }
        Ok(())
    }

    /// Declared node labels in sorted order.
    pub fn node_labels(&self) -> impl Iterator<Item = &str> {
        self.node_labels.iter().map(String::as_str)
    }

    /// Declared edge labels with endpoints, in sorted order.
    pub fn edge_labels(&self) -> impl Iterator<Item = (&str, &EdgeEndpoints)> {
        self.edge_labels.iter().map(|(l, e)| (l.as_str(), e))
    }

    /// Human-readable listing for the `schema` command.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for label in &self.node_labels {
            let _ = writeln!(out, "node {label}");
        }
        for (label, ep) in &self.edge_labels {
            let _ = writeln!(out, "edge {label}({} -> {})", ep.from, ep.to);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_schema() -> GraphSchema {
        let mut s = GraphSchema::new();
        s.declare_node_label("Person");
        s.declare_node_label("Company");
        s.declare_edge_label("Knows", "Person", "Person").unwrap();
        s.declare_edge_label("WorksAt", "Person", "Company").unwrap();
        s
    }

    #[test]
    fn node_label_checks() {
        let s = people_schema();
        assert!(s.check_node("Person").is_ok());
        assert!(matches!(
            s.check_node("Robot"),
            Err(SchemaError::UndeclaredNodeLabel { .. })
        ));
    }

    #[test]
    fn edge_label_requires_declared_endpoints() {
        let mut s = GraphSchema::new();
        s.declare_node_label("Person");
        let err = s.declare_edge_label("WorksAt", "Person", "Company").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownEndpointLabel { .. }));
    }

    #[test]
    fn identical_redeclaration_is_noop() {
        let mut s = people_schema();
        s.declare_node_label("Person");
        assert!(s.declare_edge_label("Knows", "Person", "Person").is_ok());
    }

    #[test]
    fn conflicting_edge_redeclaration_fails() {
        let mut s = people_schema();
        let err = s.declare_edge_label("Knows", "Person", "Company").unwrap_err();
        assert!(matches!(err, SchemaError::ConflictingEdgeLabel { .. }));
    }

    #[test]
    fn edge_endpoint_label_enforcement() {
        let s = people_schema();
        assert!(s.check_edge("Knows", 1, "Person", 2, "Person").is_ok());
        let err = s.check_edge("Knows", 1, "Person", 2, "Company").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::EndpointMismatch { slot: "to", .. }
        ));
        let err = s.check_edge("Likes", 1, "Person", 2, "Person").unwrap_err();
        assert!(matches!(err, SchemaError::UndeclaredEdgeLabel { .. }));
    }

    #[test]
    fn render_is_deterministic() {
        let s = people_schema();
        let text = s.render();
        assert_eq!(
            text,
            "node Company\nnode Person\nedge Knows(Person -> Person)\nedge WorksAt(Person -> Company)\n"
        );
    }
}
