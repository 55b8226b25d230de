//! Rich diagnostic error types for the pgview engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so users know exactly what went wrong and
//! how to fix it. The taxonomy mirrors the engine's contract: schema violations,
//! duplicate identity, view-registry failures, and query-language failures each
//! keep their kind end to end.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the pgview engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum PgViewError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Schema errors (the SchemaViolation family)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("schema violation: node label {label:?} is not declared")]
    #[diagnostic(
        code(pgview::schema::undeclared_node_label),
        help("Declare the label first with `create node {label}`.")
    )]
    UndeclaredNodeLabel { label: String },

    #[error("schema violation: edge label {label:?} is not declared")]
    #[diagnostic(
        code(pgview::schema::undeclared_edge_label),
        help("Declare the label first with `create edge {label}(<FromLabel> -> <ToLabel>)`.")
    )]
    UndeclaredEdgeLabel { label: String },

    #[error(
        "schema violation: edge label {edge_label:?} references undeclared endpoint label {label:?}"
    )]
    #[diagnostic(
        code(pgview::schema::unknown_endpoint_label),
        help("Endpoint labels must be declared node labels. Run `create node {label}` first.")
    )]
    UnknownEndpointLabel { edge_label: String, label: String },

    #[error(
        "schema violation: edge label {label:?} is already declared with different endpoints \
         ({declared_from} -> {declared_to})"
    )]
    #[diagnostic(
        code(pgview::schema::conflicting_edge_label),
        help(
            "Schema declarations are additive; an edge label cannot change its endpoint \
             labels. Use a new edge label for the new endpoint pair."
        )
    )]
    ConflictingEdgeLabel {
        label: String,
        declared_from: String,
        declared_to: String,
    },

    #[error(
        "schema violation: edge {edge_label:?} expects {slot} label {expected:?}, \
         but node {node_id} has label {actual:?}"
    )]
    #[diagnostic(
        code(pgview::schema::endpoint_mismatch),
        help(
            "The edge schema fixes both endpoint labels. Insert the edge between nodes \
             carrying the declared labels, or declare a separate edge label."
        )
    )]
    EndpointMismatch {
        edge_label: String,
        slot: &'static str,
        expected: String,
        actual: String,
        node_id: u64,
    },

    #[error("schema violation: edge {edge_label:?} references nonexistent node {node_id}")]
    #[diagnostic(
        code(pgview::schema::missing_endpoint),
        help("Both endpoints must exist before the edge is inserted. Insert the node first.")
    )]
    MissingEndpoint { edge_label: String, node_id: u64 },

    #[error("schema violation: property references nonexistent element {id}")]
    #[diagnostic(
        code(pgview::schema::dangling_property),
        help("Properties attach to existing nodes or edges. Insert the element first.")
    )]
    DanglingProperty { id: u64 },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("duplicate identity: id {id} is already taken in this graph")]
    #[diagnostic(
        code(pgview::store::duplicate_identity),
        help(
            "Node and edge ids share one id space per graph instance. \
             Pick an unused id, or use a property upsert if you meant to update."
        )
    )]
    DuplicateIdentity { id: u64 },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(pgview::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(pgview::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             This may indicate corruption — try running with a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(pgview::store::serde),
        help(
            "Failed to serialize or deserialize persisted graph state. \
             This usually means the stored format changed between versions."
        )
    )]
    Serialization { message: String },
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("syntax error at offset {offset}: {message}")]
    #[diagnostic(
        code(pgview::query::syntax_error),
        help(
            "The command could not be parsed. Queries follow \
             `MATCH <pattern> FROM <graph> [WHERE <predicate>] RETURN <items>`; \
             view definitions follow \
             `CREATE [virtual] VIEW <name> ON <graph> [WITH DEFAULT MAP] ( ... )`."
        )
    )]
    Syntax { message: String, offset: usize },

    #[error("unbound variable: {var:?} is not declared in the MATCH pattern")]
    #[diagnostic(
        code(pgview::query::unbound_variable),
        help(
            "Every variable used in WHERE, RETURN, CONSTRUCT, SET, or SK(...) must be \
             declared in the pattern, e.g. `(x:Label)` or `-[x:Label]->`."
        )
    )]
    UnboundVariable { var: String },

    #[error("type mismatch: {message}")]
    #[diagnostic(
        code(pgview::query::type_mismatch),
        help(
            "Ordering comparisons (< <= > >=) need numeric operands, and SK(...) \
             identities can only be assigned to fresh CONSTRUCT variables."
        )
    )]
    TypeMismatch { message: String },

    #[error("row budget exceeded: more than {limit} rows")]
    #[diagnostic(
        code(pgview::query::row_budget),
        help(
            "The pattern enumerated more rows than the configured budget allows. \
             Tighten the pattern or raise `max_rows` in the engine configuration."
        )
    )]
    RowBudgetExceeded { limit: usize },
}

// ---------------------------------------------------------------------------
// View errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ViewError {
    #[error("duplicate view name: {name:?}")]
    #[diagnostic(
        code(pgview::view::duplicate_view_name),
        help("A view with this name already exists. Drop it first or pick another name.")
    )]
    DuplicateViewName { name: String },

    #[error("cyclic view reference: {name:?} would depend on itself")]
    #[diagnostic(
        code(pgview::view::cyclic_view_reference),
        help(
            "A view's source chain must end at the base graph. \
             Point the view at the base graph or at a view that does not reach {name}."
        )
    )]
    CyclicViewReference { name: String },

    #[error("unknown graph: {name:?}")]
    #[diagnostic(
        code(pgview::view::unknown_graph),
        help(
            "No base graph or view with this name exists in the current graph instance. \
             Check `views` for registered views; the base graph is addressed as `g`."
        )
    )]
    UnknownGraph { name: String },

    #[error("view {name:?} is in use as the source of view {dependent:?}")]
    #[diagnostic(
        code(pgview::view::view_in_use),
        help("Drop the dependent view first, then retry.")
    )]
    ViewInUse { name: String, dependent: String },
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("graph already exists: {name:?}")]
    #[diagnostic(
        code(pgview::catalog::already_exists),
        help("Use `use {name}` to switch to it, or pick another name.")
    )]
    AlreadyExists { name: String },

    #[error("graph not found: {name:?}")]
    #[diagnostic(
        code(pgview::catalog::not_found),
        help("Create it first with `create graph {name}`, or run `list` to see graphs.")
    )]
    NotFound { name: String },

    #[error("cannot drop {name:?}: it is the current graph")]
    #[diagnostic(
        code(pgview::catalog::drop_current),
        help("Switch to another graph with `use <name>` before dropping this one.")
    )]
    DropCurrent { name: String },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(pgview::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("data directory error: {path}")]
    #[diagnostic(
        code(pgview::engine::data_dir),
        help(
            "The data directory could not be accessed. \
             Ensure the path exists and has read/write permissions."
        )
    )]
    DataDir { path: String },
}

/// Convenience alias for functions returning pgview results.
pub type PgViewResult<T> = std::result::Result<T, PgViewError>;
