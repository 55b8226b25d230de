//! View evaluation: resolve a `FROM` target to concrete facts.
//!
//! Resolution walks a view's source chain down to the base graph, then
//! folds back up, evaluating one definition per layer against the layer
//! below. A selection view keeps the subgraph its pattern matched; a
//! construction view instantiates its `CONSTRUCT` pattern once per match
//! row, deriving element identities with skolem functions so the same
//! match always derives the same facts. With `DEFAULT MAP` the derived
//! facts are unioned with the matched subgraph.
//!
//! Carried variables (bound by `MATCH`) keep their identity and label from
//! the input layer; their properties travel only through `DEFAULT MAP` or
//! an explicit `SET`.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::{PgViewResult, QueryError, ViewError};
use crate::fact::{EdgeFact, NodeFact};
use crate::query::ast::{ConstructClause, Literal, PatternStep, SetAssign, SetValue, SkArg, VarKind};
use crate::query::matcher::{Binding, BindingRow, PatternMatcher};
use crate::relation::RelationSet;
use crate::skolem::{self, SkolemArg};

use super::{ViewDefinition, ViewRegistry, ViewSource};

/// The outcome of resolving a source name.
#[derive(Debug)]
pub struct Resolved {
    pub rels: RelationSet,
    /// View layers traversed; the base graph alone contributes none.
    pub layers: usize,
}

/// Resolves `FROM` targets against a snapshot of the base graph.
pub struct ViewResolver<'a> {
    base: &'a RelationSet,
    base_name: &'a str,
    registry: &'a ViewRegistry,
    max_rows: Option<usize>,
}

impl<'a> ViewResolver<'a> {
    pub fn new(
        base: &'a RelationSet,
        base_name: &'a str,
        registry: &'a ViewRegistry,
        max_rows: Option<usize>,
    ) -> Self {
        Self {
            base,
            base_name,
            registry,
            max_rows,
        }
    }

    /// Resolve a graph or view name to its facts.
    pub fn resolve(&self, name: &str) -> PgViewResult<Resolved> {
        if name == self.base_name {
            return Ok(Resolved {
                rels: self.base.clone(),
                layers: 0,
            });
        }

        let mut chain = Vec::new();
        let mut cursor = name.to_string();
        loop {
            let def = self.registry.get(&cursor).ok_or(ViewError::UnknownGraph {
                name: cursor.clone(),
            })?;
            let next = match &def.source {
                ViewSource::Base => None,
                ViewSource::View(v) => Some(v.clone()),
            };
            chain.push(def);
            match next {
                Some(v) => cursor = v,
                None => break,
            }
            if chain.len() > self.registry.len() {
                return Err(ViewError::CyclicViewReference {
                    name: name.to_string(),
                }
                .into());
            }
        }

        let mut rels = self.base.clone();
        let mut layers = 0;
        for def in chain.iter().rev() {
            rels = self.evaluate(def, &rels)?;
            layers += 1;
        }
        Ok(Resolved { rels, layers })
    }

    /// Evaluate one view definition against its input layer.
    fn evaluate(&self, def: &ViewDefinition, input: &RelationSet) -> PgViewResult<RelationSet> {
        let matcher =
            PatternMatcher::new(input, &def.pattern, def.predicate.as_ref(), self.max_rows)?;
        let rows = matcher.collect_rows_parallel()?;
        debug!(view = %def.name, rows = rows.len(), "evaluated view layer");
        match &def.construct {
            None => Ok(matched_subgraph(input, &rows)),
            Some(construct) => {
                let derived = construct_facts(input, construct, &rows)?;
                if def.default_map {
                    let mut out = matched_subgraph(input, &rows);
                    out.union_with(&derived);
                    Ok(out)
                } else {
                    Ok(derived)
                }
            }
        }
    }
}

/// The subgraph a set of match rows touched: every bound node and edge,
/// with labels and properties copied from the input layer.
fn matched_subgraph(input: &RelationSet, rows: &[BindingRow]) -> RelationSet {
    let mut node_ids = BTreeSet::new();
    let mut edge_ids = BTreeSet::new();
    for row in rows {
        for binding in row.values() {
            match binding {
                Binding::Node(id) => {
                    node_ids.insert(*id);
                }
                Binding::Edge(id) => {
                    edge_ids.insert(*id);
                }
            }
        }
    }
    for id in &edge_ids {
        if let Some(fact) = input.edge(*id) {
            node_ids.insert(fact.from);
            node_ids.insert(fact.to);
        }
    }

    let mut out = RelationSet::new();
    for id in node_ids {
        if let Some(label) = input.node_label(id) {
            out.add_node(NodeFact::new(id, label));
            if let Some(props) = input.node_properties(id) {
                for (key, value) in props {
                    out.set_node_prop(id, key.clone(), value.clone());
                }
            }
        }
    }
    for id in edge_ids {
        if let Some(fact) = input.edge(id) {
            out.add_edge(fact.clone());
            if let Some(props) = input.edge_properties(id) {
                for (key, value) in props {
                    out.set_edge_prop(id, key.clone(), value.clone());
                }
            }
        }
    }
    out
}

/// Instantiate a construct pattern once per match row. Identities come
/// from skolem derivation (or are carried from the match), so repeated
/// derivations of the same facts collapse via first-write-wins inserts.
fn construct_facts(
    input: &RelationSet,
    construct: &ConstructClause,
    rows: &[BindingRow],
) -> Result<RelationSet, QueryError> {
    let mut out = RelationSet::new();
    for row in rows {
        let ids = identity_map(input, construct, row)?;

        // Nodes first so edge endpoints exist when the edges land.
        for step in &construct.pattern.steps {
            let PatternStep::Node(np) = step else {
                continue;
            };
            let Some(id) = ids.get(np.var.as_str()).and_then(|b| b.as_node()) else {
                continue;
            };
            let label = if row.contains_key(np.var.as_str()) {
                input.node_label(id).map(str::to_string)
            } else {
                construct.pattern.label_of(&np.var).map(str::to_string)
            };
            let Some(label) = label else {
                continue;
            };
            out.add_node(NodeFact::new(id, label));
        }

        for step in &construct.pattern.steps {
            let PatternStep::Edge(ep) = step else {
                continue;
            };
            let Some(id) = ids.get(ep.var.as_str()).and_then(|b| b.as_edge()) else {
                continue;
            };
            let Some(from) = ids.get(ep.from.as_str()).and_then(|b| b.as_node()) else {
                continue;
            };
            let Some(to) = ids.get(ep.to.as_str()).and_then(|b| b.as_node()) else {
                continue;
            };
            let label = if row.contains_key(ep.var.as_str()) {
                input.edge(id).map(|f| f.label.clone())
            } else {
                construct.pattern.label_of(&ep.var).map(str::to_string)
            };
            let Some(label) = label else {
                continue;
            };
            out.add_edge(EdgeFact::new(id, from, to, label));
        }

        for assign in &construct.assigns {
            let SetAssign::Property { target, value } = assign else {
                continue;
            };
            let Some(binding) = ids.get(target.var.as_str()) else {
                continue;
            };
            let resolved = match value {
                SetValue::Lit(lit) => Some(lit.canonical()),
                SetValue::Prop(p) => row
                    .get(p.var.as_str())
                    .and_then(|b| prop_of(input, *b, &p.key))
                    .map(str::to_string),
            };
            // An absent source property assigns nothing.
            let Some(value) = resolved else {
                continue;
            };
            match binding {
                Binding::Node(id) => {
                    out.set_node_prop(*id, target.key.clone(), value);
                }
                Binding::Edge(id) => {
                    out.set_edge_prop(*id, target.key.clone(), value);
                }
            }
        }
    }
    Ok(out)
}

/// Bind every construct variable to an identity: carried variables take
/// their match binding, fresh ones get a skolem-derived id.
fn identity_map(
    input: &RelationSet,
    construct: &ConstructClause,
    row: &BindingRow,
) -> Result<HashMap<String, Binding>, QueryError> {
    let mut ids: HashMap<String, Binding> = HashMap::new();
    for var in construct.pattern.vars() {
        if let Some(b) = row.get(var) {
            ids.insert(var.to_string(), *b);
        }
    }
    for assign in &construct.assigns {
        let SetAssign::Identity { var, functor, args } = assign else {
            continue;
        };
        let mut sk_args = Vec::with_capacity(args.len());
        for arg in args {
            sk_args.push(match arg {
                SkArg::Lit(Literal::Int(v)) => SkolemArg::Int(*v),
                SkArg::Lit(Literal::Str(s)) => SkolemArg::Str(s.clone()),
                SkArg::Var(v) => match row.get(v.as_str()) {
                    Some(Binding::Node(id)) => SkolemArg::Node(*id),
                    Some(Binding::Edge(id)) => SkolemArg::Edge(*id),
                    None => {
                        return Err(QueryError::UnboundVariable { var: v.clone() });
                    }
                },
                SkArg::Prop(p) => {
                    let value = row
                        .get(p.var.as_str())
                        .and_then(|b| prop_of(input, *b, &p.key));
                    match value {
                        Some(v) => SkolemArg::Str(v.to_string()),
                        None => {
                            return Err(QueryError::TypeMismatch {
                                message: format!(
                                    "skolem argument {p} is missing on a matched row"
                                ),
                            });
                        }
                    }
                }
            });
        }
        let binding = match construct.pattern.var_kind(var) {
            Some(VarKind::Edge) => Binding::Edge(skolem::derive_edge(functor, &sk_args)),
            _ => Binding::Node(skolem::derive_node(functor, &sk_args)),
        };
        ids.insert(var.clone(), binding);
    }
    Ok(ids)
}

fn prop_of<'r>(input: &'r RelationSet, binding: Binding, key: &str) -> Option<&'r str> {
    match binding {
        Binding::Node(id) => input.node_prop(id, key),
        Binding::Edge(id) => input.edge_prop(id, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{EdgeId, NodeId};
    use crate::query::ast::Command;
    use crate::query::parse_command;
    use crate::query::ViewStmt;

    /// Two authors, two docs, one subject: ada wrote both docs, bob wrote
    /// one; both docs are tagged with the same subject.
    fn library() -> RelationSet {
        let mut r = RelationSet::new();
        r.add_node(NodeFact::new(NodeId::new(1), "Person"));
        r.add_node(NodeFact::new(NodeId::new(2), "Person"));
        r.add_node(NodeFact::new(NodeId::new(3), "Doc"));
        r.add_node(NodeFact::new(NodeId::new(4), "Doc"));
        r.add_node(NodeFact::new(NodeId::new(5), "Subject"));
        r.set_node_prop(NodeId::new(1), "name", "ada");
        r.set_node_prop(NodeId::new(2), "name", "bob");
        r.set_node_prop(NodeId::new(5), "name", "graphs");
        r.add_edge(EdgeFact::new(
            EdgeId::new(10),
            NodeId::new(1),
            NodeId::new(3),
            "Authored",
        ));
        r.add_edge(EdgeFact::new(
            EdgeId::new(11),
            NodeId::new(1),
            NodeId::new(4),
            "Authored",
        ));
        r.add_edge(EdgeFact::new(
            EdgeId::new(12),
            NodeId::new(2),
            NodeId::new(4),
            "Authored",
        ));
        r.add_edge(EdgeFact::new(
            EdgeId::new(13),
            NodeId::new(3),
            NodeId::new(5),
            "Tagged",
        ));
        r.add_edge(EdgeFact::new(
            EdgeId::new(14),
            NodeId::new(4),
            NodeId::new(5),
            "Tagged",
        ));
        r
    }

    fn stmt(src: &str) -> ViewStmt {
        match parse_command(src).unwrap() {
            Command::CreateView(v) => v,
            other => panic!("expected a view statement, got {other:?}"),
        }
    }

    const EXPERTISE: &str = "create view expertise on g ( \
        match (p:Person)-[a:Authored]->(d:Doc)-[t:Tagged]->(s:Subject) \
        construct (p)-[x:ExpertIn]->(s) \
        set x = SK(\"expert\", p, s), x.source = \"derived\" \
      )";

    #[test]
    fn base_name_resolves_without_layers() {
        let base = library();
        let reg = ViewRegistry::new();
        let resolver = ViewResolver::new(&base, "g", &reg, None);
        let resolved = resolver.resolve("g").unwrap();
        assert_eq!(resolved.layers, 0);
        assert_eq!(resolved.rels.node_count(), 5);
        assert_eq!(resolved.rels.edge_count(), 5);
    }

    #[test]
    fn unknown_source_is_an_error() {
        let base = library();
        let reg = ViewRegistry::new();
        let resolver = ViewResolver::new(&base, "g", &reg, None);
        let err = resolver.resolve("nosuch").unwrap_err();
        assert!(err.to_string().contains("unknown graph"));
    }

    #[test]
    fn selection_view_keeps_matched_subgraph() {
        let base = library();
        let reg = ViewRegistry::new();
        reg.register(
            stmt(
                "create view ada_docs on g ( \
                   match (p:Person)-[a:Authored]->(d:Doc) where p.name = \"ada\" \
                 )",
            ),
            "g",
        )
        .unwrap();
        let resolver = ViewResolver::new(&base, "g", &reg, None);
        let resolved = resolver.resolve("ada_docs").unwrap();
        assert_eq!(resolved.layers, 1);
        // ada plus her two docs; bob and the subject are out.
        assert_eq!(resolved.rels.node_count(), 3);
        assert_eq!(resolved.rels.edge_count(), 2);
        // Selection carries properties.
        assert_eq!(resolved.rels.node_prop(NodeId::new(1), "name"), Some("ada"));
    }

    #[test]
    fn construction_without_default_map_holds_only_derived_facts() {
        let base = library();
        let reg = ViewRegistry::new();
        reg.register(stmt(EXPERTISE), "g").unwrap();
        let resolver = ViewResolver::new(&base, "g", &reg, None);
        let resolved = resolver.resolve("expertise").unwrap();

        // Carried endpoints (ada, bob, the subject) plus one derived edge
        // per author; docs and the Authored/Tagged edges are gone.
        assert_eq!(resolved.rels.node_count(), 3);
        assert_eq!(resolved.rels.edge_count(), 2);
        let labels: BTreeSet<_> = resolved.rels.edges().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, BTreeSet::from(["ExpertIn"]));
        for edge in resolved.rels.edges() {
            assert_eq!(resolved.rels.edge_prop(edge.id, "source"), Some("derived"));
            assert_eq!(edge.to, NodeId::new(5));
        }
        // Carried elements keep identity and label but not properties.
        assert_eq!(resolved.rels.node_label(NodeId::new(1)), Some("Person"));
        assert_eq!(resolved.rels.node_prop(NodeId::new(1), "name"), None);
    }

    #[test]
    fn repeated_derivation_is_idempotent() {
        // ada reaches the subject through both docs, yet SK gives both
        // rows the same edge identity.
        let base = library();
        let reg = ViewRegistry::new();
        reg.register(stmt(EXPERTISE), "g").unwrap();
        let resolver = ViewResolver::new(&base, "g", &reg, None);
        let resolved = resolver.resolve("expertise").unwrap();
        let ada_edges: Vec<_> = resolved
            .rels
            .edges()
            .filter(|e| e.from == NodeId::new(1))
            .collect();
        assert_eq!(ada_edges.len(), 1);
    }

    #[test]
    fn default_map_unions_matched_and_derived() {
        let base = library();
        let reg = ViewRegistry::new();
        reg.register(
            stmt(
                "create view expertise on g with default map ( \
                   match (p:Person)-[a:Authored]->(d:Doc)-[t:Tagged]->(s:Subject) \
                   construct (p)-[x:ExpertIn]->(s) \
                   set x = SK(\"expert\", p, s) \
                 )",
            ),
            "g",
        )
        .unwrap();
        let resolver = ViewResolver::new(&base, "g", &reg, None);
        let resolved = resolver.resolve("expertise").unwrap();
        // All five base nodes are matched; derived edges add to the five
        // matched base edges.
        assert_eq!(resolved.rels.node_count(), 5);
        assert_eq!(resolved.rels.edge_count(), 7);
        // Matched facts keep their properties in default-map mode.
        assert_eq!(resolved.rels.node_prop(NodeId::new(1), "name"), Some("ada"));
    }

    #[test]
    fn chained_views_count_layers() {
        let base = library();
        let reg = ViewRegistry::new();
        reg.register(stmt(EXPERTISE), "g").unwrap();
        reg.register(
            stmt(
                "create view expert_pairs on expertise ( \
                   match (p:Person)-[x:ExpertIn]->(s:Subject) \
                 )",
            ),
            "g",
        )
        .unwrap();
        let resolver = ViewResolver::new(&base, "g", &reg, None);
        let resolved = resolver.resolve("expert_pairs").unwrap();
        assert_eq!(resolved.layers, 2);
        assert_eq!(resolved.rels.edge_count(), 2);
    }

    #[test]
    fn derivation_is_deterministic_across_evaluations() {
        let base = library();
        let reg = ViewRegistry::new();
        reg.register(stmt(EXPERTISE), "g").unwrap();
        let resolver = ViewResolver::new(&base, "g", &reg, None);
        let first: BTreeSet<u64> = resolver
            .resolve("expertise")
            .unwrap()
            .rels
            .edges()
            .map(|e| e.id.get())
            .collect();
        let second: BTreeSet<u64> = resolver
            .resolve("expertise")
            .unwrap()
            .rels
            .edges()
            .map(|e| e.id.get())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn carried_property_travels_through_explicit_set() {
        let base = library();
        let reg = ViewRegistry::new();
        reg.register(
            stmt(
                "create view named on g ( \
                   match (p:Person) \
                   construct (p) \
                   set p.name = p.name \
                 )",
            ),
            "g",
        )
        .unwrap();
        let resolver = ViewResolver::new(&base, "g", &reg, None);
        let resolved = resolver.resolve("named").unwrap();
        assert_eq!(resolved.rels.node_prop(NodeId::new(1), "name"), Some("ada"));
        assert_eq!(resolved.rels.node_prop(NodeId::new(2), "name"), Some("bob"));
    }
}
