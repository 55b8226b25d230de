//! Export types for serializing graph state.
//!
//! These types provide label-resolved representations of nodes, edges, and
//! view definitions suitable for JSON export, plus the logic-program
//! rendering behind the `program` command: base facts appear as ground
//! `N`/`E`/`NP`/`EP` atoms, each view contributes one rule per fact shape
//! it produces, and skolem identities render as `sk(...)` terms.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::query::ast::{
    CompareOp, ConstructClause, Literal, Operand, Pattern, PatternStep, Predicate, PropRef,
    SetAssign, SetValue, SkArg, VarKind,
};
use crate::relation::RelationSet;
use crate::schema::GraphSchema;
use crate::view::{ViewDefinition, ViewSource};

/// Exported node with its properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExport {
    /// Numeric node identity.
    pub id: u64,
    /// Declared node label.
    pub label: String,
    /// Properties in key order.
    pub properties: BTreeMap<String, String>,
}

/// Exported edge with endpoints and properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeExport {
    /// Numeric edge identity.
    pub id: u64,
    /// Source node identity.
    pub from: u64,
    /// Target node identity.
    pub to: u64,
    /// Declared edge label.
    pub label: String,
    /// Properties in key order.
    pub properties: BTreeMap<String, String>,
}

/// Exported edge label declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeLabelExport {
    /// Edge label name.
    pub label: String,
    /// Required source node label.
    pub from: String,
    /// Required target node label.
    pub to: String,
}

/// Exported view definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewExport {
    /// View name.
    pub name: String,
    /// `selection` or `construction`.
    pub kind: String,
    /// Source graph or view name (`base` for the instance itself).
    pub source: String,
    /// Whether the view was declared `virtual`.
    pub is_virtual: bool,
    /// Whether matched base facts are unioned into the result.
    pub default_map: bool,
    /// The definition as written.
    pub definition: String,
}

impl From<&ViewDefinition> for ViewExport {
    fn from(def: &ViewDefinition) -> Self {
        Self {
            name: def.name.clone(),
            kind: if def.is_construction() {
                "construction".into()
            } else {
                "selection".into()
            },
            source: match &def.source {
                ViewSource::Base => "base".into(),
                ViewSource::View(v) => v.clone(),
            },
            is_virtual: def.is_virtual,
            default_map: def.default_map,
            definition: def.text.clone(),
        }
    }
}

/// A whole graph instance: schema, facts, and registered views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphExport {
    /// Instance name.
    pub name: String,
    /// Declared node labels in order.
    pub node_labels: Vec<String>,
    /// Declared edge labels with endpoint constraints.
    pub edge_labels: Vec<EdgeLabelExport>,
    /// Node facts in insertion order.
    pub nodes: Vec<NodeExport>,
    /// Edge facts in insertion order.
    pub edges: Vec<EdgeExport>,
    /// Registered views in creation order.
    pub views: Vec<ViewExport>,
}

impl GraphExport {
    pub fn capture(
        name: &str,
        schema: &GraphSchema,
        rels: &RelationSet,
        views: &[Arc<ViewDefinition>],
    ) -> Self {
        let nodes = rels
            .nodes()
            .map(|(id, label)| NodeExport {
                id: id.get(),
                label: label.to_string(),
                properties: rels.node_properties(id).cloned().unwrap_or_default(),
            })
            .collect();
        let edges = rels
            .edges()
            .map(|fact| EdgeExport {
                id: fact.id.get(),
                from: fact.from.get(),
                to: fact.to.get(),
                label: fact.label.clone(),
                properties: rels.edge_properties(fact.id).cloned().unwrap_or_default(),
            })
            .collect();
        Self {
            name: name.to_string(),
            node_labels: schema.node_labels().map(str::to_string).collect(),
            edge_labels: schema
                .edge_labels()
                .map(|(label, ends)| EdgeLabelExport {
                    label: label.to_string(),
                    from: ends.from.clone(),
                    to: ends.to.clone(),
                })
                .collect(),
            nodes,
            edges,
            views: views
                .iter()
                .map(|def| ViewExport::from(def.as_ref()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Program rendering
// ---------------------------------------------------------------------------

/// Render a graph instance as a logic program: schema as comments, base
/// facts as ground atoms, views as rules over their source's relations.
pub fn render_program(
    name: &str,
    schema: &GraphSchema,
    rels: &RelationSet,
    views: &[Arc<ViewDefinition>],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "% program for graph {name}");

    let schema_text = schema.render();
    if !schema_text.is_empty() {
        let _ = writeln!(out, "% schema");
        for line in schema_text.lines() {
            let _ = writeln!(out, "%   {line}");
        }
    }

    let _ = writeln!(out, "% facts");
    for (id, label) in rels.nodes() {
        let _ = writeln!(out, "N({}, {label:?}).", id.get());
    }
    for fact in rels.edges() {
        let _ = writeln!(
            out,
            "E({}, {}, {}, {:?}).",
            fact.id.get(),
            fact.from.get(),
            fact.to.get(),
            fact.label
        );
    }
    for (id, _) in rels.nodes() {
        if let Some(props) = rels.node_properties(id) {
            for (key, value) in props {
                let _ = writeln!(out, "NP({}, {key:?}, {value:?}).", id.get());
            }
        }
    }
    for fact in rels.edges() {
        if let Some(props) = rels.edge_properties(fact.id) {
            for (key, value) in props {
                let _ = writeln!(out, "EP({}, {key:?}, {value:?}).", fact.id.get());
            }
        }
    }

    for def in views {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "% view {} ({} on {})",
            def.name,
            if def.is_construction() {
                "construction"
            } else {
                "selection"
            },
            match &def.source {
                ViewSource::Base => name,
                ViewSource::View(v) => v,
            }
        );
        render_view_rules(&mut out, def);
    }

    out
}

/// Relation-name suffix for atoms over a view's source.
fn source_tag(source: &ViewSource) -> String {
    match source {
        ViewSource::Base => String::new(),
        ViewSource::View(v) => format!("_{v}"),
    }
}

fn render_view_rules(out: &mut String, def: &ViewDefinition) {
    let tag = source_tag(&def.source);
    let body = rule_body(&def.pattern, def.predicate.as_ref(), &tag);

    match &def.construct {
        None => {
            let vars: Vec<String> = def.pattern.vars().iter().map(|v| var_term(v)).collect();
            let _ = writeln!(out, "{}({}) :- {body}.", def.name, vars.join(", "));
        }
        Some(construct) => {
            for step in &construct.pattern.steps {
                match step {
                    PatternStep::Node(np) => {
                        let id = id_term(&np.var, construct);
                        let label = construct
                            .pattern
                            .label_of(&np.var)
                            .map_or("_".to_string(), |l| format!("{l:?}"));
                        let _ = writeln!(out, "N_{}({id}, {label}) :- {body}.", def.name);
                    }
                    PatternStep::Edge(ep) => {
                        let id = id_term(&ep.var, construct);
                        let from = id_term(&ep.from, construct);
                        let to = id_term(&ep.to, construct);
                        let label = construct
                            .pattern
                            .label_of(&ep.var)
                            .map_or("_".to_string(), |l| format!("{l:?}"));
                        let _ = writeln!(
                            out,
                            "E_{}({id}, {from}, {to}, {label}) :- {body}.",
                            def.name
                        );
                    }
                }
            }
            for assign in &construct.assigns {
                let SetAssign::Property { target, value } = assign else {
                    continue;
                };
                let rel = match construct.pattern.var_kind(&target.var) {
                    Some(VarKind::Edge) => "EP",
                    _ => "NP",
                };
                let id = id_term(&target.var, construct);
                let value = match value {
                    SetValue::Lit(lit) => literal_term(lit),
                    SetValue::Prop(p) => prop_term(p),
                };
                let _ = writeln!(
                    out,
                    "{rel}_{}({id}, {:?}, {value}) :- {body}.",
                    def.name, target.key
                );
            }
        }
    }
}

/// Body atoms for a view's pattern and predicate over its source.
fn rule_body(pattern: &Pattern, predicate: Option<&Predicate>, tag: &str) -> String {
    let mut atoms = Vec::new();
    for step in &pattern.steps {
        match step {
            PatternStep::Node(np) => {
                let label = np
                    .label
                    .as_ref()
                    .map_or("_".to_string(), |l| format!("{l:?}"));
                atoms.push(format!("N{tag}({}, {label})", var_term(&np.var)));
            }
            PatternStep::Edge(ep) => {
                let label = ep
                    .label
                    .as_ref()
                    .map_or("_".to_string(), |l| format!("{l:?}"));
                atoms.push(format!(
                    "E{tag}({}, {}, {}, {label})",
                    var_term(&ep.var),
                    var_term(&ep.from),
                    var_term(&ep.to)
                ));
            }
        }
    }
    if let Some(pred) = predicate {
        for (i, cmp) in pred.clauses.iter().enumerate() {
            let value_var = format!("V{i}");
            let rel = prop_relation(pattern, &cmp.lhs.var);
            atoms.push(format!(
                "{rel}{tag}({}, {:?}, {value_var})",
                var_term(&cmp.lhs.var),
                cmp.lhs.key
            ));
            let rhs = match &cmp.rhs {
                Operand::Lit(lit) => literal_term(lit),
                Operand::Prop(p) => {
                    let rhs_var = format!("V{i}b");
                    let rel = prop_relation(pattern, &p.var);
                    atoms.push(format!(
                        "{rel}{tag}({}, {:?}, {rhs_var})",
                        var_term(&p.var),
                        p.key
                    ));
                    rhs_var
                }
            };
            atoms.push(format!("{value_var} {} {rhs}", op_term(cmp.op)));
        }
    }
    atoms.join(", ")
}

fn prop_relation(pattern: &Pattern, var: &str) -> &'static str {
    match pattern.var_kind(var) {
        Some(VarKind::Edge) => "EP",
        _ => "NP",
    }
}

/// Identity term for a construct variable: carried variables stay
/// variables, fresh ones render their skolem derivation.
fn id_term(var: &str, construct: &ConstructClause) -> String {
    for assign in &construct.assigns {
        if let SetAssign::Identity {
            var: v,
            functor,
            args,
        } = assign
        {
            if v == var {
                let mut parts = vec![format!("{functor:?}")];
                parts.extend(args.iter().map(sk_arg_term));
                return format!("sk({})", parts.join(", "));
            }
        }
    }
    var_term(var)
}

fn sk_arg_term(arg: &SkArg) -> String {
    match arg {
        SkArg::Lit(lit) => literal_term(lit),
        SkArg::Var(v) => var_term(v),
        SkArg::Prop(p) => prop_term(p),
    }
}

fn prop_term(p: &PropRef) -> String {
    format!("prop({}, {:?})", var_term(&p.var), p.key)
}

fn literal_term(lit: &Literal) -> String {
    match lit {
        Literal::Int(v) => v.to_string(),
        Literal::Str(s) => format!("{s:?}"),
    }
}

/// Logic variables render uppercase.
fn var_term(var: &str) -> String {
    var.to_ascii_uppercase()
}

fn op_term(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}
