//! Skolem functions: deterministic identity for derived facts.
//!
//! A construction view fabricates nodes and edges that have no caller-supplied
//! id. Their identity comes from a **skolem functor**: `SK("expertise", p, t)`
//! names the derived element by hashing the functor together with the ordered,
//! type-tagged argument values. Equal inputs always produce the same id —
//! across repeated evaluations and across process restarts — so re-running a
//! view never duplicates derived state. Auto-incrementing counters must never
//! be used here; they are not idempotent across re-evaluation.
//!
//! ## Example
//!
//! Matching `(p)-[r]->(t)` twice with the same bindings derives the same edge:
//! `derive("expertise", [Node(1), Node(3)])` is a pure function of its inputs.
//!
//! ## Collision bound
//!
//! Ids are the first 8 bytes of a BLAKE3 hash under a fixed domain prefix. For
//! `n` distinct derivations the collision probability is about `n²/2⁶⁵` —
//! negligible at any realistic derivation count (≈ 10⁻¹⁰ at ten million).

use blake3::Hasher;

use crate::fact::{EdgeId, NodeId};

/// Domain prefix so skolem ids can never collide with other hash uses.
const DOMAIN: &[u8] = b"pgview.skolem.v1";

// Type tags keep `SK("f", Node(1))` and `SK("f", Int(1))` distinct.
const TAG_NODE: u8 = 0x01;
const TAG_EDGE: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_STR: u8 = 0x04;

/// One bound argument of a skolem functor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SkolemArg {
    Node(NodeId),
    Edge(EdgeId),
    Int(i64),
    Str(String),
}

impl From<NodeId> for SkolemArg {
    fn from(id: NodeId) -> Self {
        SkolemArg::Node(id)
    }
}

impl From<EdgeId> for SkolemArg {
    fn from(id: EdgeId) -> Self {
        SkolemArg::Edge(id)
    }
}

impl From<i64> for SkolemArg {
    fn from(v: i64) -> Self {
        SkolemArg::Int(v)
    }
}

impl From<&str> for SkolemArg {
    fn from(v: &str) -> Self {
        SkolemArg::Str(v.to_string())
    }
}

/// Derive a stable id from a functor name and its ordered arguments.
///
/// Pure and total: equal `(functor, args)` always yield equal ids; argument
/// order is significant. Strings and the functor are length-prefixed so
/// adjacent values cannot alias.
pub fn derive(functor: &str, args: &[SkolemArg]) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(DOMAIN);
    hasher.update(&(functor.len() as u64).to_le_bytes());
    hasher.update(functor.as_bytes());
    for arg in args {
        match arg {
            SkolemArg::Node(id) => {
                hasher.update(&[TAG_NODE]);
                hasher.update(&id.get().to_le_bytes());
            }
            SkolemArg::Edge(id) => {
                hasher.update(&[TAG_EDGE]);
                hasher.update(&id.get().to_le_bytes());
            }
            SkolemArg::Int(v) => {
                hasher.update(&[TAG_INT]);
                hasher.update(&v.to_le_bytes());
            }
            SkolemArg::Str(s) => {
                hasher.update(&[TAG_STR]);
                hasher.update(&(s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            }
        }
    }
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Derive a node identity.
pub fn derive_node(functor: &str, args: &[SkolemArg]) -> NodeId {
    NodeId::new(derive(functor, args))
}

/// Derive an edge identity.
pub fn derive_edge(functor: &str, args: &[SkolemArg]) -> EdgeId {
    EdgeId::new(derive(functor, args))
}
