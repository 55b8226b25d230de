//! Core fact types: identifiers and the base relation rows.
//!
//! A property graph is encoded as four relations — `N` (nodes), `E` (edges),
//! `NP` (node properties), `EP` (edge properties). Node and edge ids share one
//! id space per graph instance: an id used by a node can never be reused by an
//! edge, and vice versa. Ids are supplied by the caller for base facts and
//! derived by the skolemizer for constructed facts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a node within a graph instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an edge within a graph instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(u64);

impl EdgeId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of the `N` relation: `(id, label)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFact {
    pub id: NodeId,
    pub label: String,
}

impl NodeFact {
    pub fn new(id: NodeId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// A row of the `E` relation: `(id, from, to, label)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFact {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub label: String,
}

impl EdgeFact {
    pub fn new(id: EdgeId, from: NodeId, to: NodeId, label: impl Into<String>) -> Self {
        Self {
            id,
            from,
            to,
            label: label.into(),
        }
    }
}

/// The four base relations of the graph encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Nodes: `N(id, label)`.
    Node,
    /// Edges: `E(id, from, to, label)`.
    Edge,
    /// Node properties: `NP(id, key, value)`.
    NodeProp,
    /// Edge properties: `EP(id, key, value)`.
    EdgeProp,
}

impl Relation {
    /// The relation's tag as it appears in `insert` commands and program listings.
    pub const fn tag(self) -> &'static str {
        match self {
            Relation::Node => "N",
            Relation::Edge => "E",
            Relation::NodeProp => "NP",
            Relation::EdgeProp => "EP",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Relation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("N") => Ok(Relation::Node),
            s if s.eq_ignore_ascii_case("E") => Ok(Relation::Edge),
            s if s.eq_ignore_ascii_case("NP") => Ok(Relation::NodeProp),
            s if s.eq_ignore_ascii_case("EP") => Ok(Relation::EdgeProp),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip_raw_values() {
        assert_eq!(NodeId::new(42).get(), 42);
        assert_eq!(EdgeId::new(7).get(), 7);
        assert_eq!(NodeId::new(42).to_string(), "42");
    }

    #[test]
    fn relation_tags_parse_case_insensitively() {
        assert_eq!("n".parse::<Relation>(), Ok(Relation::Node));
        assert_eq!("NP".parse::<Relation>(), Ok(Relation::NodeProp));
        assert_eq!("ep".parse::<Relation>(), Ok(Relation::EdgeProp));
        assert!("X".parse::<Relation>().is_err());
    }

    #[test]
    fn edge_fact_carries_endpoints() {
        let e = EdgeFact::new(EdgeId::new(10), NodeId::new(1), NodeId::new(2), "Knows");
        assert_eq!(e.from.get(), 1);
        assert_eq!(e.to.get(), 2);
        assert_eq!(e.label, "Knows");
    }
}
