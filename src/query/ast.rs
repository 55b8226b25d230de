//! Abstract syntax of the command language.
//!
//! Everything the parser produces lives here: graph patterns, predicates,
//! queries, view statements, and the console commands (catalog management,
//! schema declaration, fact insertion, introspection).

use std::fmt;

/// A literal value in queries and inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Str(String),
}

impl Literal {
    /// The canonical string form used for property storage and equality
    /// comparison (`25` and `"25"` compare equal).
    pub fn canonical(&self) -> String {
        match self {
            Literal::Int(v) => v.to_string(),
            Literal::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Str(s) => write!(f, "{s:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// A node variable declaration: `(var)` or `(var:Label)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePattern {
    pub var: String,
    pub label: Option<String>,
}

/// An edge variable declaration: `-[var]->` or `-[var:Label]->`, with the
/// endpoint variables taken from the surrounding chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePattern {
    pub var: String,
    pub label: Option<String>,
    pub from: String,
    pub to: String,
}

/// One declaration in a pattern, in textual order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternStep {
    Node(NodePattern),
    Edge(EdgePattern),
}

/// Whether a variable names a node or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Node,
    Edge,
}

/// A graph pattern: chained paths over shared variables, kept in declaration
/// order. Repeated occurrences of a variable are consistency checks, not new
/// declarations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    pub steps: Vec<PatternStep>,
}

impl Pattern {
    /// Distinct variables in declaration order.
    pub fn vars(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for step in &self.steps {
            let var = match step {
                PatternStep::Node(n) => n.var.as_str(),
                PatternStep::Edge(e) => e.var.as_str(),
            };
            if !seen.contains(&var) {
                seen.push(var);
            }
        }
        seen
    }

    pub fn declares(&self, var: &str) -> bool {
        self.vars().contains(&var)
    }

    /// The kind of a variable's first declaration.
    pub fn var_kind(&self, var: &str) -> Option<VarKind> {
        for step in &self.steps {
            match step {
                PatternStep::Node(n) if n.var == var => return Some(VarKind::Node),
                PatternStep::Edge(e) if e.var == var => return Some(VarKind::Edge),
                _ => {}
            }
        }
        None
    }

    /// The first label constraint attached to a variable, if any.
    pub fn label_of(&self, var: &str) -> Option<&str> {
        for step in &self.steps {
            match step {
                PatternStep::Node(n) if n.var == var => {
                    if let Some(l) = &n.label {
                        return Some(l);
                    }
                }
                PatternStep::Edge(e) if e.var == var => {
                    if let Some(l) = &e.label {
                        return Some(l);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// A property access: `var.key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropRef {
    pub var: String,
    pub key: String,
}

impl fmt::Display for PropRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.var, self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Whether this operator orders numerically (vs string equality).
    pub fn is_ordering(self) -> bool {
        matches!(self, CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        })
    }
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Lit(Literal),
    Prop(PropRef),
}

/// One predicate clause: `var.key OP operand`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub lhs: PropRef,
    pub op: CompareOp,
    pub rhs: Operand,
}

impl Comparison {
    /// Variables this clause references.
    pub fn vars(&self) -> Vec<&str> {
        let mut vars = vec![self.lhs.var.as_str()];
        if let Operand::Prop(p) = &self.rhs {
            if !vars.contains(&p.var.as_str()) {
                vars.push(&p.var);
            }
        }
        vars
    }
}

/// An AND-conjunction of comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub clauses: Vec<Comparison>,
}

impl Predicate {
    pub fn vars(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        for clause in &self.clauses {
            for v in clause.vars() {
                if !vars.contains(&v) {
                    vars.push(v);
                }
            }
        }
        vars
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// One `RETURN` entry: an element variable or a property access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnItem {
    Element { var: String },
    Property(PropRef),
}

impl ReturnItem {
    pub fn var(&self) -> &str {
        match self {
            ReturnItem::Element { var } => var,
            ReturnItem::Property(p) => &p.var,
        }
    }
}

impl fmt::Display for ReturnItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnItem::Element { var } => write!(f, "({var})"),
            ReturnItem::Property(p) => write!(f, "{p}"),
        }
    }
}

/// `MATCH <pattern> FROM <graph> [WHERE <predicate>] RETURN <items>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    pub pattern: Pattern,
    pub source: String,
    pub predicate: Option<Predicate>,
    pub returns: Vec<ReturnItem>,
}

// ---------------------------------------------------------------------------
// View statements
// ---------------------------------------------------------------------------

/// An argument of a skolem functor: literal, element variable, or property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkArg {
    Lit(Literal),
    Var(String),
    Prop(PropRef),
}

/// The value side of a `SET var.key = ...` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValue {
    Lit(Literal),
    Prop(PropRef),
}

/// One `SET` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetAssign {
    /// `x = SK("functor", args...)` — identity for a constructed element.
    Identity {
        var: String,
        functor: String,
        args: Vec<SkArg>,
    },
    /// `x.key = value` — a property on a constructed or carried element.
    Property { target: PropRef, value: SetValue },
}

/// `CONSTRUCT <pattern> SET <assignments>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructClause {
    pub pattern: Pattern,
    pub assigns: Vec<SetAssign>,
}

/// `CREATE [virtual] VIEW <name> ON <source> [WITH DEFAULT MAP] ( ... )`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewStmt {
    pub name: String,
    pub is_virtual: bool,
    pub source: String,
    pub default_map: bool,
    pub pattern: Pattern,
    pub predicate: Option<Predicate>,
    pub construct: Option<ConstructClause>,
    /// The statement as written, kept for `views` listings and persistence.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Every statement the console accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateGraph { name: String },
    UseGraph { name: String },
    DropGraph { name: String },
    ListGraphs,
    DeclareNode { label: String },
    DeclareEdge { label: String, from: String, to: String },
    InsertNode { id: u64, label: String },
    InsertEdge { id: u64, from: u64, to: u64, label: String },
    InsertNodeProp { id: u64, key: String, value: String },
    InsertEdgeProp { id: u64, key: String, value: String },
    Query(MatchQuery),
    CreateView(ViewStmt),
    DropView { name: String },
    ShowSchema,
    ShowViews,
    ShowProgram,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Pattern {
        Pattern {
            steps: vec![
                PatternStep::Node(NodePattern {
                    var: "a".into(),
                    label: Some("Person".into()),
                }),
                PatternStep::Edge(EdgePattern {
                    var: "e".into(),
                    label: Some("Knows".into()),
                    from: "a".into(),
                    to: "b".into(),
                }),
                PatternStep::Node(NodePattern {
                    var: "b".into(),
                    label: None,
                }),
            ],
        }
    }

    #[test]
    fn vars_are_distinct_and_ordered() {
        assert_eq!(chain().vars(), vec!["a", "e", "b"]);
    }

    #[test]
    fn var_kinds_follow_first_declaration() {
        let p = chain();
        assert_eq!(p.var_kind("a"), Some(VarKind::Node));
        assert_eq!(p.var_kind("e"), Some(VarKind::Edge));
        assert_eq!(p.var_kind("z"), None);
    }

    #[test]
    fn label_of_skips_unlabeled_occurrences() {
        let p = chain();
        assert_eq!(p.label_of("a"), Some("Person"));
        assert_eq!(p.label_of("b"), None);
    }

    #[test]
    fn literal_canonical_form() {
        assert_eq!(Literal::Int(25).canonical(), "25");
        assert_eq!(Literal::Str("25".into()).canonical(), "25");
    }

    #[test]
    fn comparison_vars_cover_both_sides() {
        let c = Comparison {
            lhs: PropRef {
                var: "a".into(),
                key: "age".into(),
            },
            op: CompareOp::Lt,
            rhs: Operand::Prop(PropRef {
                var: "b".into(),
                key: "age".into(),
            }),
        };
        assert_eq!(c.vars(), vec!["a", "b"]);
    }
}
