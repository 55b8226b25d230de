//! Engine facade: top-level API for the pgview system.
//!
//! The `Engine` owns the graph catalog and the optional durable store, and
//! provides the public interface for executing console commands, running
//! queries, and exporting graph state. All mutations write through to the
//! durable store when one is configured.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{GraphCatalog, GraphInstance};
use crate::error::{EngineError, PgViewResult, QueryError, StoreError, ViewError};
use crate::export::{render_program, GraphExport};
use crate::query::ast::{Command, MatchQuery, ReturnItem};
use crate::query::matcher::{Binding, BindingRow, PatternMatcher};
use crate::query::{parse_command, parse_script, validate_query, validate_view};
use crate::relation::RelationSet;
use crate::store::durable::{DurableStore, PersistedGraph};
use crate::view::eval::ViewResolver;
use crate::view::ViewRegistry;

/// Configuration for the pgview engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Data directory for persistence. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Name that refers to the current instance's base facts in `FROM`
    /// clauses and view sources (default: `g`).
    pub base_graph: String,
    /// Name of the instance created at engine start (default: `default`).
    pub default_graph: String,
    /// Maximum rows a single query may produce. `None` for unbounded.
    pub max_rows: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            base_graph: "g".into(),
            default_graph: "default".into(),
            max_rows: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn load(path: &Path) -> PgViewResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::InvalidConfig {
            message: format!("failed to read config {}: {e}", path.display()),
        })?;
        let config = toml::from_str(&text).map_err(|e| EngineError::InvalidConfig {
            message: format!("invalid config {}: {e}", path.display()),
        })?;
        Ok(config)
    }
}

/// One projected cell of a query result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    /// A bound node element.
    Node { id: u64, label: String },
    /// A bound edge element with its endpoints.
    Edge {
        id: u64,
        from: u64,
        to: u64,
        label: String,
    },
    /// A property value.
    Text(String),
    /// A property access on an element that lacks the key.
    Null,
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Node { id, label } => write!(f, "({id}:{label})"),
            CellValue::Edge {
                id,
                from,
                to,
                label,
            } => write!(f, "[{id}:{label} {from}->{to}]"),
            CellValue::Text(s) => write!(f, "{s:?}"),
            CellValue::Null => write!(f, "null"),
        }
    }
}

/// A labeled cell: the `RETURN` item as written plus its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The return item, e.g. `(a)` or `a.name`.
    pub item: String,
    /// The projected value.
    pub value: CellValue,
}

/// One query result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", cell.item, cell.value)?;
        }
        Ok(())
    }
}

/// Projected rows plus the execution summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Wall-clock evaluation time in milliseconds.
    pub elapsed_ms: u64,
    /// View layers traversed to resolve the source (minimum 1).
    pub rule_count: usize,
}

impl QueryResult {
    /// The one-line result summary.
    pub fn result_info(&self) -> String {
        format!(
            "query result #: {} etime[{}] #ofRules: {}",
            self.rows.len(),
            self.elapsed_ms,
            self.rule_count
        )
    }
}

/// Outcome of executing one console command.
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    /// Statement acknowledged with a short status line.
    Ack(String),
    /// Query rows plus the result summary.
    Rows(QueryResult),
    /// Rendered schema listing.
    Schema(String),
    /// Registered views as `(name, definition text)` pairs.
    Views(Vec<(String, String)>),
    /// Graph instance names and the current selection.
    Graphs { names: Vec<String>, current: String },
    /// Logic-program rendering of the current instance.
    Program(String),
}

impl ExecOutcome {
    /// Render the outcome for console display.
    pub fn render(&self) -> String {
        match self {
            ExecOutcome::Ack(line) => line.clone(),
            ExecOutcome::Rows(result) => {
                let mut out = String::new();
                for row in &result.rows {
                    out.push_str(&row.to_string());
                    out.push('\n');
                }
                out.push_str(&result.result_info());
                out
            }
            ExecOutcome::Schema(text) => {
                if text.is_empty() {
                    "no declarations".into()
                } else {
                    text.trim_end().to_string()
                }
            }
            ExecOutcome::Views(views) => {
                if views.is_empty() {
                    "no views".into()
                } else {
                    views
                        .iter()
                        .map(|(name, text)| format!("{name}: {text}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            ExecOutcome::Graphs { names, current } => names
                .iter()
                .map(|name| {
                    if name == current {
                        format!("* {name}")
                    } else {
                        format!("  {name}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
            ExecOutcome::Program(text) => text.trim_end().to_string(),
        }
    }
}

/// The pgview query and view-materialization engine.
///
/// Owns the instance catalog and the optional durable store. Cheap to
/// share behind an `Arc`; all methods take `&self`.
pub struct Engine {
    config: EngineConfig,
    catalog: GraphCatalog,
    durable: Option<DurableStore>,
}

impl Engine {
    /// Create a new engine with the given configuration, restoring any
    /// durable state found under the configured data directory.
    pub fn new(config: EngineConfig) -> PgViewResult<Self> {
        if config.base_graph.is_empty() {
            return Err(EngineError::InvalidConfig {
                message: "base_graph must not be empty".into(),
            }
            .into());
        }
        if config.default_graph.is_empty() {
            return Err(EngineError::InvalidConfig {
                message: "default_graph must not be empty".into(),
            }
            .into());
        }
        if config.default_graph == config.base_graph {
            return Err(EngineError::InvalidConfig {
                message: format!(
                    "default_graph `{}` collides with the base graph alias",
                    config.default_graph
                ),
            }
            .into());
        }

        info!(
            base = %config.base_graph,
            persistent = config.data_dir.is_some(),
            "initializing pgview engine"
        );

        let durable = match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|_| EngineError::DataDir {
                    path: dir.display().to_string(),
                })?;
                Some(DurableStore::open(dir)?)
            }
            None => None,
        };

        let catalog = GraphCatalog::new(&config.default_graph);
        if let Some(store) = &durable {
            let names = store.load_graph_list()?;
            for name in &names {
                if let Some(state) = store.load_graph(name)? {
                    let instance = Self::restore_instance(name, state, &config.base_graph)?;
                    catalog.install(Arc::new(instance));
                }
            }
            if let Some(current) = store.load_current()? {
                if catalog.get(&current).is_some() {
                    catalog.use_graph(&current)?;
                }
            }
            if !names.is_empty() {
                info!(graphs = catalog.len(), "restored durable state");
            }
        }

        let engine = Self {
            config,
            catalog,
            durable,
        };
        engine.persist_catalog()?;
        engine.persist_instance(&engine.catalog.current())?;
        Ok(engine)
    }

    /// Rebuild one instance from its persisted state, re-parsing the
    /// stored view definition texts.
    fn restore_instance(
        name: &str,
        state: PersistedGraph,
        base: &str,
    ) -> PgViewResult<GraphInstance> {
        let texts = state.views.clone();
        let store = state.into_store();
        let views = ViewRegistry::new();
        for text in texts {
            match parse_command(&text)? {
                Command::CreateView(stmt) => {
                    views.register(stmt, base)?;
                }
                _ => {
                    return Err(StoreError::Serialization {
                        message: format!("stored view definition is not a view: {text}"),
                    }
                    .into());
                }
            }
        }
        Ok(GraphInstance::restored(name, store, views))
    }

    /// Execute one console command.
    pub fn execute(&self, input: &str) -> PgViewResult<ExecOutcome> {
        let command = parse_command(input)?;
        self.run(command)
    }

    /// Execute a `;`-separated script, stopping at the first failure.
    pub fn execute_script(&self, input: &str) -> PgViewResult<Vec<ExecOutcome>> {
        let commands = parse_script(input)?;
        commands.into_iter().map(|c| self.run(c)).collect()
    }

    fn run(&self, command: Command) -> PgViewResult<ExecOutcome> {
        match command {
            Command::CreateGraph { name } => {
                let instance = self.catalog.create(&name)?;
                self.persist_catalog()?;
                self.persist_instance(&instance)?;
                Ok(ExecOutcome::Ack(format!("created graph {name}")))
            }
            Command::UseGraph { name } => {
                self.catalog.use_graph(&name)?;
                self.persist_catalog()?;
                Ok(ExecOutcome::Ack(format!("using graph {name}")))
            }
            Command::DropGraph { name } => {
                self.catalog.drop_graph(&name)?;
                if let Some(durable) = &self.durable {
                    durable.remove_graph(&name)?;
                }
                self.persist_catalog()?;
                Ok(ExecOutcome::Ack(format!("dropped graph {name}")))
            }
            Command::ListGraphs => Ok(ExecOutcome::Graphs {
                names: self.catalog.names(),
                current: self.catalog.current_name(),
            }),
            Command::DeclareNode { label } => {
                let instance = self.catalog.current();
                instance.store.declare_node_label(&label);
                self.persist_instance(&instance)?;
                Ok(ExecOutcome::Ack(format!("declared node label {label}")))
            }
            Command::DeclareEdge { label, from, to } => {
                let instance = self.catalog.current();
                instance.store.declare_edge_label(&label, &from, &to)?;
                self.persist_instance(&instance)?;
                Ok(ExecOutcome::Ack(format!(
                    "declared edge label {label}({from} -> {to})"
                )))
            }
            Command::InsertNode { id, label } => {
                let instance = self.catalog.current();
                instance.store.insert_node(id, &label)?;
                self.persist_instance(&instance)?;
                Ok(ExecOutcome::Ack(format!("inserted node {id}")))
            }
            Command::InsertEdge {
                id,
                from,
                to,
                label,
            } => {
                let instance = self.catalog.current();
                instance.store.insert_edge(id, from, to, &label)?;
                self.persist_instance(&instance)?;
                Ok(ExecOutcome::Ack(format!("inserted edge {id}")))
            }
            Command::InsertNodeProp { id, key, value } => {
                let instance = self.catalog.current();
                instance.store.set_node_property(id, &key, &value)?;
                self.persist_instance(&instance)?;
                Ok(ExecOutcome::Ack(format!("set node {id}.{key}")))
            }
            Command::InsertEdgeProp { id, key, value } => {
                let instance = self.catalog.current();
                instance.store.set_edge_property(id, &key, &value)?;
                self.persist_instance(&instance)?;
                Ok(ExecOutcome::Ack(format!("set edge {id}.{key}")))
            }
            Command::Query(query) => Ok(ExecOutcome::Rows(self.run_query(query)?)),
            Command::CreateView(stmt) => {
                if stmt.name == self.config.base_graph {
                    return Err(ViewError::DuplicateViewName { name: stmt.name }.into());
                }
                validate_view(&stmt)?;
                let name = stmt.name.clone();
                let instance = self.catalog.current();
                instance.views.register(stmt, &self.config.base_graph)?;
                self.persist_instance(&instance)?;
                Ok(ExecOutcome::Ack(format!("created view {name}")))
            }
            Command::DropView { name } => {
                let instance = self.catalog.current();
                instance.views.drop_view(&name)?;
                self.persist_instance(&instance)?;
                Ok(ExecOutcome::Ack(format!("dropped view {name}")))
            }
            Command::ShowSchema => {
                Ok(ExecOutcome::Schema(self.catalog.current().store.schema_render()))
            }
            Command::ShowViews => {
                let views = self
                    .catalog
                    .current()
                    .views
                    .list()
                    .iter()
                    .map(|def| (def.name.clone(), def.text.clone()))
                    .collect();
                Ok(ExecOutcome::Views(views))
            }
            Command::ShowProgram => {
                let instance = self.catalog.current();
                let schema = instance.store.schema_snapshot();
                let rels = instance.store.snapshot();
                let views = instance.views.list();
                Ok(ExecOutcome::Program(render_program(
                    &instance.name,
                    &schema,
                    &rels,
                    &views,
                )))
            }
        }
    }

    fn run_query(&self, query: MatchQuery) -> PgViewResult<QueryResult> {
        validate_query(&query)?;
        let instance = self.catalog.current();
        let started = Instant::now();
        let snapshot = instance.store.snapshot();
        let resolver = ViewResolver::new(
            &snapshot,
            &self.config.base_graph,
            &instance.views,
            self.config.max_rows,
        );
        let resolved = resolver.resolve(&query.source)?;
        let matcher = PatternMatcher::new(
            &resolved.rels,
            &query.pattern,
            query.predicate.as_ref(),
            self.config.max_rows,
        )?;
        let rows = matcher.collect_rows_parallel()?;
        let projected = rows
            .iter()
            .map(|row| project_row(&query.returns, row, &resolved.rels))
            .collect::<Vec<_>>();
        let result = QueryResult {
            rows: projected,
            elapsed_ms: started.elapsed().as_millis() as u64,
            rule_count: resolved.layers.max(1),
        };
        debug!(
            source = %query.source,
            rows = result.rows.len(),
            rules = result.rule_count,
            "query complete"
        );
        Ok(result)
    }

    // -----------------------------------------------------------------
    // Typed helpers
    // -----------------------------------------------------------------

    /// Run a `MATCH` query and return its rows and summary.
    pub fn query(&self, text: &str) -> PgViewResult<QueryResult> {
        match parse_command(text)? {
            Command::Query(query) => self.run_query(query),
            _ => Err(QueryError::Syntax {
                message: "expected a match query".into(),
                offset: 0,
            }
            .into()),
        }
    }

    /// Register a view from its definition text on the current instance.
    pub fn create_view(&self, definition: &str) -> PgViewResult<()> {
        match parse_command(definition)? {
            Command::CreateView(stmt) => {
                self.run(Command::CreateView(stmt))?;
                Ok(())
            }
            _ => Err(QueryError::Syntax {
                message: "expected a view definition".into(),
                offset: 0,
            }
            .into()),
        }
    }

    pub fn declare_node_label(&self, label: &str) -> PgViewResult<()> {
        self.run(Command::DeclareNode {
            label: label.into(),
        })?;
        Ok(())
    }

    pub fn declare_edge_label(&self, label: &str, from: &str, to: &str) -> PgViewResult<()> {
        self.run(Command::DeclareEdge {
            label: label.into(),
            from: from.into(),
            to: to.into(),
        })?;
        Ok(())
    }

    pub fn insert_node(&self, id: u64, label: &str) -> PgViewResult<()> {
        self.run(Command::InsertNode {
            id,
            label: label.into(),
        })?;
        Ok(())
    }

    pub fn insert_edge(&self, id: u64, from: u64, to: u64, label: &str) -> PgViewResult<()> {
        self.run(Command::InsertEdge {
            id,
            from,
            to,
            label: label.into(),
        })?;
        Ok(())
    }

    pub fn set_node_property(&self, id: u64, key: &str, value: &str) -> PgViewResult<()> {
        self.run(Command::InsertNodeProp {
            id,
            key: key.into(),
            value: value.into(),
        })?;
        Ok(())
    }

    pub fn set_edge_property(&self, id: u64, key: &str, value: &str) -> PgViewResult<()> {
        self.run(Command::InsertEdgeProp {
            id,
            key: key.into(),
            value: value.into(),
        })?;
        Ok(())
    }

    /// Export a graph instance's state. `None` exports the current one.
    pub fn export_graph(&self, name: Option<&str>) -> PgViewResult<GraphExport> {
        let instance = match name {
            Some(name) => self.catalog.require(name)?,
            None => self.catalog.current(),
        };
        let schema = instance.store.schema_snapshot();
        let rels = instance.store.snapshot();
        let views = instance.views.list();
        Ok(GraphExport::capture(&instance.name, &schema, &rels, &views))
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the instance catalog handle.
    pub fn catalog(&self) -> &GraphCatalog {
        &self.catalog
    }

    /// Get summary information about the engine state.
    pub fn info(&self) -> EngineInfo {
        let instance = self.catalog.current();
        EngineInfo {
            graphs: self.catalog.len(),
            current: instance.name.clone(),
            nodes: instance.store.node_count(),
            edges: instance.store.edge_count(),
            views: instance.views.len(),
            persistent: self.config.data_dir.is_some(),
        }
    }

    // -----------------------------------------------------------------
    // Persistence write-through
    // -----------------------------------------------------------------

    fn persist_instance(&self, instance: &GraphInstance) -> PgViewResult<()> {
        if let Some(durable) = &self.durable {
            let texts = instance
                .views
                .list()
                .iter()
                .map(|def| def.text.clone())
                .collect();
            let state = PersistedGraph::capture(&instance.store, texts);
            durable.save_graph(&instance.name, &state)?;
        }
        Ok(())
    }

    fn persist_catalog(&self) -> PgViewResult<()> {
        if let Some(durable) = &self.durable {
            durable.save_graph_list(&self.catalog.names())?;
            durable.save_current(&self.catalog.current_name())?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("graphs", &self.catalog.len())
            .finish()
    }
}

/// Project one binding row through the `RETURN` items.
fn project_row(items: &[ReturnItem], row: &BindingRow, rels: &RelationSet) -> Row {
    let cells = items
        .iter()
        .map(|item| {
            let value = match item {
                ReturnItem::Element { var } => match row.get(var) {
                    Some(Binding::Node(id)) => CellValue::Node {
                        id: id.get(),
                        label: rels.node_label(*id).unwrap_or_default().to_string(),
                    },
                    Some(Binding::Edge(id)) => match rels.edge(*id) {
                        Some(fact) => CellValue::Edge {
                            id: fact.id.get(),
                            from: fact.from.get(),
                            to: fact.to.get(),
                            label: fact.label.clone(),
                        },
                        None => CellValue::Null,
                    },
                    None => CellValue::Null,
                },
                ReturnItem::Property(p) => {
                    let value = match row.get(&p.var) {
                        Some(Binding::Node(id)) => rels.node_prop(*id, &p.key),
                        Some(Binding::Edge(id)) => rels.edge_prop(*id, &p.key),
                        None => None,
                    };
                    value.map_or(CellValue::Null, |v| CellValue::Text(v.to_string()))
                }
            };
            Cell {
                item: item.to_string(),
                value,
            }
        })
        .collect();
    Row { cells }
}

/// Summary information about the engine state.
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub graphs: usize,
    pub current: String,
    pub nodes: usize,
    pub edges: usize,
    pub views: usize,
    pub persistent: bool,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "pgview engine info")?;
        writeln!(f, "  graphs:      {}", self.graphs)?;
        writeln!(f, "  current:     {}", self.current)?;
        writeln!(f, "  nodes:       {}", self.nodes)?;
        writeln!(f, "  edges:       {}", self.edges)?;
        writeln!(f, "  views:       {}", self.views)?;
        writeln!(f, "  persistent:  {}", self.persistent)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Engine {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine
            .execute_script(
                "create node Person; \
                 create edge Knows(Person -> Person); \
                 insert N(1, \"Person\"); \
                 insert N(2, \"Person\"); \
                 insert E(10, 1, 2, \"Knows\"); \
                 insert NP(1, \"name\", \"ada\");",
            )
            .unwrap();
        engine
    }

    #[test]
    fn memory_only_engine_starts_on_default_graph() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let info = engine.info();
        assert_eq!(info.current, "default");
        assert_eq!(info.graphs, 1);
        assert!(!info.persistent);
    }

    #[test]
    fn base_alias_collision_rejected() {
        let result = Engine::new(EngineConfig {
            default_graph: "g".into(),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn query_reports_rows_and_summary() {
        let engine = seeded();
        let result = engine
            .query("match (a:Person)-[x:Knows]->(b:Person) from g return (a), (x), (b)")
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rule_count, 1);
        let info = result.result_info();
        assert!(info.starts_with("query result #: 1 etime["));
        assert!(info.ends_with("] #ofRules: 1"));
        let row = &result.rows[0];
        assert_eq!(row.cells[0].item, "(a)");
        assert_eq!(
            row.cells[0].value,
            CellValue::Node {
                id: 1,
                label: "Person".into()
            }
        );
        assert_eq!(
            row.cells[1].value,
            CellValue::Edge {
                id: 10,
                from: 1,
                to: 2,
                label: "Knows".into()
            }
        );
    }

    #[test]
    fn property_projection_returns_text_or_null() {
        let engine = seeded();
        let result = engine
            .query("match (a:Person) from g return a.name")
            .unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].cells[0].value, CellValue::Text("ada".into()));
        assert_eq!(result.rows[1].cells[0].value, CellValue::Null);
    }

    #[test]
    fn view_query_counts_layers() {
        let engine = seeded();
        engine
            .create_view("create view pals on g ( match (a:Person)-[x:Knows]->(b:Person) )")
            .unwrap();
        let result = engine.query("match (a:Person) from pals return (a)").unwrap();
        assert_eq!(result.rule_count, 1);
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn exec_outcomes_render() {
        let engine = seeded();
        let schema = engine.execute("schema").unwrap();
        assert!(schema.render().contains("node Person"));

        let views = engine.execute("views").unwrap();
        assert_eq!(views.render(), "no views");

        let graphs = engine.execute("list").unwrap();
        assert_eq!(graphs.render(), "* default");

        let program = engine.execute("program").unwrap();
        assert!(program.render().contains("N(1, \"Person\")."));
    }

    #[test]
    fn graph_lifecycle_through_commands() {
        let engine = seeded();
        engine.execute("create graph q1").unwrap();
        engine.execute("use q1").unwrap();
        assert_eq!(engine.info().current, "q1");
        assert_eq!(engine.info().nodes, 0);
        engine.execute("use default").unwrap();
        engine.execute("drop graph q1").unwrap();
        assert_eq!(engine.info().graphs, 1);
    }

    #[test]
    fn view_named_after_base_alias_rejected() {
        let engine = seeded();
        let result = engine.create_view("create view g on g ( match (a:Person) )");
        assert!(result.is_err());
    }

    #[test]
    fn export_captures_current_instance() {
        let engine = seeded();
        let export = engine.export_graph(None).unwrap();
        assert_eq!(export.name, "default");
        assert_eq!(export.nodes.len(), 2);
        assert_eq!(export.edges.len(), 1);
    }

    #[test]
    fn row_budget_applies_to_queries() {
        let engine = Engine::new(EngineConfig {
            max_rows: Some(1),
            ..Default::default()
        })
        .unwrap();
        engine
            .execute_script(
                "create node Person; \
                 insert N(1, \"Person\"); \
                 insert N(2, \"Person\");",
            )
            .unwrap();
        let result = engine.query("match (a:Person) from g return (a)");
        assert!(result.is_err());
    }
}
