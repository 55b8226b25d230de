// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # pgview
//!
//! A property-graph query and view-materialization engine: graphs are stored
//! as typed relations (nodes, edges, properties), queried with `MATCH`
//! patterns, and extended through virtual views whose `CONSTRUCT` rules
//! derive new facts with hash-based skolem identities.
//!
//! ## Architecture
//!
//! - **Relations** (`relation`, `fact`, `schema`): the four base relations
//!   with label and adjacency indexes over a petgraph topology
//! - **Query front end** (`query`): hand-rolled lexer/parser, worklist-based
//!   pattern matcher with rayon collection
//! - **Views** (`view`): registry + chain resolver; selection and
//!   construction views, recomputed per query
//! - **Identity** (`skolem`): BLAKE3-derived stable ids for constructed facts
//! - **Catalog & storage** (`catalog`, `store`): named instances over a
//!   `DashMap`, optional redb-backed durability
//!
//! ## Library usage
//!
//! ```no_run
//! use pgview::engine::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! engine.declare_node_label("Person").unwrap();
//! engine.declare_edge_label("Knows", "Person", "Person").unwrap();
//! engine.insert_node(1, "Person").unwrap();
//! engine.insert_node(2, "Person").unwrap();
//! engine.insert_edge(10, 1, 2, "Knows").unwrap();
//! let result = engine
//!     .query("match (a:Person)-[x:Knows]->(b:Person) from g return (a), (b)")
//!     .unwrap();
//! println!("{}", result.result_info());
//! ```

pub mod catalog;
pub mod engine;
pub mod error;
pub mod export;
pub mod fact;
pub mod query;
pub mod relation;
pub mod schema;
pub mod skolem;
pub mod store;
pub mod view;
