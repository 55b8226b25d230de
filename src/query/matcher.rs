//! Pattern matcher: binds pattern variables against a relation set.
//!
//! Matching walks the pattern's declarations in textual order with an
//! explicit worklist of partial bindings, so pattern depth never touches
//! the call stack. Binding an edge also binds its endpoint variables when
//! they are still free; the endpoints' own node steps then reduce to label
//! checks. Predicate clauses run as soon as every variable they mention is
//! bound, pruning partial rows before they fan out.
//!
//! Row order is deterministic: candidates are explored in insertion order,
//! and the rayon-backed [`PatternMatcher::collect_rows_parallel`] shards on
//! the first step's candidates and concatenates shard results in that same
//! order, so it returns exactly what the sequential walk returns.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::error::QueryError;
use crate::fact::{EdgeId, NodeId};
use crate::relation::RelationSet;

use super::ast::{
    CompareOp, Comparison, Operand, Pattern, PatternStep, Predicate, PropRef, VarKind,
};

/// A bound pattern variable: a node or an edge of the matched set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Node(NodeId),
    Edge(EdgeId),
}

impl Binding {
    /// The underlying identity, regardless of kind.
    pub fn raw(self) -> u64 {
        match self {
            Binding::Node(id) => id.get(),
            Binding::Edge(id) => id.get(),
        }
    }

    pub fn as_node(self) -> Option<NodeId> {
        match self {
            Binding::Node(id) => Some(id),
            Binding::Edge(_) => None,
        }
    }

    pub fn as_edge(self) -> Option<EdgeId> {
        match self {
            Binding::Edge(id) => Some(id),
            Binding::Node(_) => None,
        }
    }
}

/// One complete match: variable name → bound element.
pub type BindingRow = HashMap<String, Binding>;

/// A compiled pattern plus pushed-down predicate checks.
#[derive(Debug)]
pub struct PatternMatcher<'a> {
    rels: &'a RelationSet,
    steps: &'a [PatternStep],
    checks: Vec<Check<'a>>,
    max_rows: Option<usize>,
}

/// A predicate clause and the variables it needs before it can run.
#[derive(Debug)]
struct Check<'a> {
    cmp: &'a Comparison,
    vars: Vec<&'a str>,
}

/// A partial match on the worklist.
#[derive(Clone)]
struct State {
    row: BindingRow,
    step: usize,
    /// Which predicate checks have already passed for this row.
    done: Vec<bool>,
}

impl State {
    fn initial(checks: usize) -> Self {
        Self {
            row: BindingRow::new(),
            step: 0,
            done: vec![false; checks],
        }
    }
}

impl<'a> PatternMatcher<'a> {
    /// Compile a pattern and optional predicate against a relation set.
    ///
    /// Rejects variables used as both node and edge, and predicate
    /// variables the pattern never declares.
    pub fn new(
        rels: &'a RelationSet,
        pattern: &'a Pattern,
        predicate: Option<&'a Predicate>,
        max_rows: Option<usize>,
    ) -> Result<Self, QueryError> {
        let mut kinds: HashMap<&str, VarKind> = HashMap::new();
        for step in &pattern.steps {
            let (var, kind) = match step {
                PatternStep::Node(n) => (n.var.as_str(), VarKind::Node),
                PatternStep::Edge(e) => (e.var.as_str(), VarKind::Edge),
            };
            if let Some(prev) = kinds.insert(var, kind) {
                if prev != kind {
                    return Err(QueryError::TypeMismatch {
                        message: format!(
                            "variable `{var}` is used as both a node and an edge"
                        ),
                    });
                }
            }
        }

        let mut checks = Vec::new();
        if let Some(pred) = predicate {
            for cmp in &pred.clauses {
                let vars = cmp.vars();
                for v in &vars {
                    if !kinds.contains_key(v) {
                        return Err(QueryError::UnboundVariable {
                            var: (*v).to_string(),
                        });
                    }
                }
                checks.push(Check { cmp, vars });
            }
        }

        Ok(Self {
            rels,
            steps: &pattern.steps,
            checks,
            max_rows,
        })
    }

    /// Lazy row iterator. Stops after the first error.
    pub fn rows(&self) -> Rows<'_, 'a> {
        Rows {
            matcher: self,
            stack: vec![State::initial(self.checks.len())],
            emitted: 0,
            failed: false,
        }
    }

    /// All rows, depth-first in candidate order.
    pub fn collect_rows(&self) -> Result<Vec<BindingRow>, QueryError> {
        self.rows().collect()
    }

    /// All rows, sharded across the first step's candidates. Falls back to
    /// the sequential walk when a row budget is set, since the budget
    /// counts rows in emission order.
    pub fn collect_rows_parallel(&self) -> Result<Vec<BindingRow>, QueryError> {
        if self.max_rows.is_some() || self.steps.len() <= 1 {
            return self.collect_rows();
        }
        let seeds = self.extend(&State::initial(self.checks.len()))?;
        let shards = seeds
            .into_par_iter()
            .map(|seed| self.run_from(seed))
            .collect::<Result<Vec<_>, QueryError>>()?;
        Ok(shards.into_iter().flatten().collect())
    }

    fn run_from(&self, seed: State) -> Result<Vec<BindingRow>, QueryError> {
        let mut rows = Vec::new();
        let mut stack = vec![seed];
        while let Some(state) = stack.pop() {
            if state.step == self.steps.len() {
                rows.push(state.row);
                continue;
            }
            let mut children = self.extend(&state)?;
            children.reverse();
            stack.append(&mut children);
        }
        Ok(rows)
    }

    /// Produce the successor states of one partial match.
    fn extend(&self, state: &State) -> Result<Vec<State>, QueryError> {
        let mut deltas: Vec<Vec<(String, Binding)>> = Vec::new();
        match &self.steps[state.step] {
            PatternStep::Node(np) => match state.row.get(np.var.as_str()) {
                Some(Binding::Node(id)) => {
                    // Revisit of a bound variable: only the label remains
                    // to be checked.
                    let ok = match &np.label {
                        Some(l) => self.rels.node_label(*id) == Some(l.as_str()),
                        None => true,
                    };
                    if ok {
                        deltas.push(Vec::new());
                    }
                }
                Some(Binding::Edge(_)) => {}
                None => {
                    for id in self.rels.nodes_with_label(np.label.as_deref()) {
                        deltas.push(vec![(np.var.clone(), Binding::Node(id))]);
                    }
                }
            },
            PatternStep::Edge(ep) => {
                let from = match state.row.get(ep.from.as_str()) {
                    Some(b) => match b.as_node() {
                        Some(id) => Some(id),
                        None => return Ok(Vec::new()),
                    },
                    None => None,
                };
                let to = match state.row.get(ep.to.as_str()) {
                    Some(b) => match b.as_node() {
                        Some(id) => Some(id),
                        None => return Ok(Vec::new()),
                    },
                    None => None,
                };
                let label = ep.label.as_deref();
                let candidates = if let Some(b) = state.row.get(ep.var.as_str()) {
                    match b.as_edge().and_then(|id| self.rels.edge(id)) {
                        Some(fact) => vec![fact],
                        None => Vec::new(),
                    }
                } else {
                    match (from, to) {
                        (Some(f), _) => self.rels.out_edges(f, label),
                        (None, Some(t)) => self.rels.in_edges(t, label),
                        (None, None) => self.rels.edges_with_label(label),
                    }
                };
                for fact in candidates {
                    if let Some(l) = label {
                        if fact.label != l {
                            continue;
                        }
                    }
                    let mut delta = Vec::new();
                    if unify(&state.row, &mut delta, &ep.var, Binding::Edge(fact.id))
                        && unify(&state.row, &mut delta, &ep.from, Binding::Node(fact.from))
                        && unify(&state.row, &mut delta, &ep.to, Binding::Node(fact.to))
                    {
                        deltas.push(delta);
                    }
                }
            }
        }

        let mut children = Vec::with_capacity(deltas.len());
        'deltas: for delta in deltas {
            let mut child = State {
                row: state.row.clone(),
                step: state.step + 1,
                done: state.done.clone(),
            };
            for (var, binding) in delta {
                child.row.insert(var, binding);
            }
            for (i, check) in self.checks.iter().enumerate() {
                if child.done[i] {
                    continue;
                }
                if check.vars.iter().all(|v| child.row.contains_key(*v)) {
                    if self.eval(check.cmp, &child.row)? {
                        child.done[i] = true;
                    } else {
                        continue 'deltas;
                    }
                }
            }
            children.push(child);
        }
        Ok(children)
    }

    /// Evaluate one comparison against a row where all its variables are
    /// bound. A missing property makes the clause false; a non-numeric
    /// value under an ordering operator is an error.
    fn eval(&self, cmp: &Comparison, row: &BindingRow) -> Result<bool, QueryError> {
        let Some(lhs) = self.prop_value(row, &cmp.lhs) else {
            return Ok(false);
        };
        let rhs = match &cmp.rhs {
            Operand::Lit(lit) => lit.canonical(),
            Operand::Prop(p) => match self.prop_value(row, p) {
                Some(v) => v.to_string(),
                None => return Ok(false),
            },
        };
        match cmp.op {
            CompareOp::Eq => Ok(lhs == rhs),
            CompareOp::Ne => Ok(lhs != rhs),
            op => {
                let l = numeric(lhs, &cmp.lhs.to_string())?;
                let r = match &cmp.rhs {
                    Operand::Lit(lit) => numeric(&rhs, &lit.to_string())?,
                    Operand::Prop(p) => numeric(&rhs, &p.to_string())?,
                };
                Ok(match op {
                    CompareOp::Lt => l < r,
                    CompareOp::Le => l <= r,
                    CompareOp::Gt => l > r,
                    CompareOp::Ge => l >= r,
                    CompareOp::Eq | CompareOp::Ne => false,
                })
            }
        }
    }

    fn prop_value<'r>(&'r self, row: &BindingRow, prop: &PropRef) -> Option<&'r str> {
        match row.get(prop.var.as_str())? {
            Binding::Node(id) => self.rels.node_prop(*id, &prop.key),
            Binding::Edge(id) => self.rels.edge_prop(*id, &prop.key),
        }
    }
}

fn numeric(value: &str, place: &str) -> Result<i64, QueryError> {
    value.parse::<i64>().map_err(|_| QueryError::TypeMismatch {
        message: format!(
            "{place} has non-numeric value {value:?}; ordering comparisons need integers"
        ),
    })
}

/// Reconcile a variable against the row and the bindings already staged in
/// this delta. Returns `false` on conflict, records the binding when free.
fn unify(
    row: &BindingRow,
    delta: &mut Vec<(String, Binding)>,
    var: &str,
    value: Binding,
) -> bool {
    let existing = row
        .get(var)
        .copied()
        .or_else(|| delta.iter().find(|(v, _)| v == var).map(|(_, b)| *b));
    match existing {
        Some(bound) => bound == value,
        None => {
            delta.push((var.to_string(), value));
            true
        }
    }
}

/// Lazy row iterator over a compiled matcher.
pub struct Rows<'m, 'a> {
    matcher: &'m PatternMatcher<'a>,
    stack: Vec<State>,
    emitted: usize,
    failed: bool,
}

impl Iterator for Rows<'_, '_> {
    type Item = Result<BindingRow, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while let Some(state) = self.stack.pop() {
            if state.step == self.matcher.steps.len() {
                self.emitted += 1;
                if let Some(limit) = self.matcher.max_rows {
                    if self.emitted > limit {
                        self.failed = true;
                        return Some(Err(QueryError::RowBudgetExceeded { limit }));
                    }
                }
                return Some(Ok(state.row));
            }
            match self.matcher.extend(&state) {
                Ok(mut children) => {
                    children.reverse();
                    self.stack.append(&mut children);
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{EdgeFact, NodeFact};
    use crate::query::ast::{Command, MatchQuery};
    use crate::query::parser::parse_command;

    fn q(src: &str) -> MatchQuery {
        match parse_command(src).unwrap() {
            Command::Query(q) => q,
            other => panic!("expected a query, got {other:?}"),
        }
    }

    /// Three people, a knows-chain 1→2→3, and a self-loop on 3.
    fn sample() -> RelationSet {
        let mut r = RelationSet::new();
        r.add_node(NodeFact::new(NodeId::new(1), "Person"));
        r.add_node(NodeFact::new(NodeId::new(2), "Person"));
        r.add_node(NodeFact::new(NodeId::new(3), "Person"));
        r.add_edge(EdgeFact::new(
            EdgeId::new(10),
            NodeId::new(1),
            NodeId::new(2),
            "Knows",
        ));
        r.add_edge(EdgeFact::new(
            EdgeId::new(11),
            NodeId::new(2),
            NodeId::new(3),
            "Knows",
        ));
        r.add_edge(EdgeFact::new(
            EdgeId::new(12),
            NodeId::new(3),
            NodeId::new(3),
            "Knows",
        ));
        r.set_node_prop(NodeId::new(1), "age", "25");
        r.set_node_prop(NodeId::new(1), "name", "ada");
        r.set_node_prop(NodeId::new(2), "age", "35");
        r.set_edge_prop(EdgeId::new(10), "since", "1999");
        r
    }

    fn rows_for(rels: &RelationSet, src: &str) -> Vec<BindingRow> {
        let query = q(src);
        let m = PatternMatcher::new(rels, &query.pattern, query.predicate.as_ref(), None)
            .unwrap();
        m.collect_rows().unwrap()
    }

    #[test]
    fn label_scan() {
        let rels = sample();
        let rows = rows_for(&rels, "match (a:Person) from g return (a)");
        assert_eq!(rows.len(), 3);
        let ids: Vec<u64> = rows.iter().map(|r| r["a"].raw()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn unlabeled_variable_scans_all_nodes() {
        let rels = sample();
        let rows = rows_for(&rels, "match (a) from g return (a)");
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn chain_match_binds_endpoints() {
        let rels = sample();
        let rows = rows_for(
            &rels,
            "match (a:Person)-[e:Knows]->(b:Person) from g return (a), (b)",
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["a"].raw(), 1);
        assert_eq!(rows[0]["e"].raw(), 10);
        assert_eq!(rows[0]["b"].raw(), 2);
    }

    #[test]
    fn self_loop_requires_same_endpoint() {
        let rels = sample();
        let rows = rows_for(&rels, "match (a:Person)-[e:Knows]->(a) from g return (a)");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["e"].raw(), 12);
    }

    #[test]
    fn shared_variable_joins_paths() {
        let rels = sample();
        let rows = rows_for(
            &rels,
            "match (a)-[e:Knows]->(b), (b)-[f:Knows]->(c) from g return (a), (c)",
        );
        // 1→2→3, 2→3→3 (via the loop), 3→3→3.
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn predicate_filters_and_missing_property_drops_row() {
        let rels = sample();
        let rows = rows_for(
            &rels,
            "match (a:Person) from g where a.age < 30 return (a)",
        );
        // Node 2 fails the comparison, node 3 has no age at all.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["a"].raw(), 1);
    }

    #[test]
    fn equality_is_canonical_across_literal_forms() {
        let rels = sample();
        let int_lit = rows_for(&rels, "match (a:Person) from g where a.age = 25 return (a)");
        let str_lit = rows_for(
            &rels,
            "match (a:Person) from g where a.age = \"25\" return (a)",
        );
        assert_eq!(int_lit.len(), 1);
        assert_eq!(str_lit.len(), 1);
        assert_eq!(int_lit[0]["a"], str_lit[0]["a"]);
    }

    #[test]
    fn property_to_property_comparison() {
        let rels = sample();
        let rows = rows_for(
            &rels,
            "match (a:Person)-[e:Knows]->(b:Person) from g where a.age < b.age return (a), (b)",
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["a"].raw(), 1);
        assert_eq!(rows[0]["b"].raw(), 2);
    }

    #[test]
    fn ordering_on_non_numeric_value_is_an_error() {
        let rels = sample();
        let query = q("match (a:Person) from g where a.name > 5 return (a)");
        let m =
            PatternMatcher::new(&rels, &query.pattern, query.predicate.as_ref(), None).unwrap();
        let err = m.collect_rows().unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }

    #[test]
    fn predicate_variable_must_be_declared() {
        let rels = sample();
        let query = q("match (a:Person) from g where z.age = 1 return (a)");
        let err = PatternMatcher::new(&rels, &query.pattern, query.predicate.as_ref(), None)
            .unwrap_err();
        match err {
            QueryError::UnboundVariable { var } => assert_eq!(var, "z"),
            other => panic!("expected unbound variable, got {other:?}"),
        }
    }

    #[test]
    fn row_budget_is_enforced() {
        let rels = sample();
        let query = q("match (a:Person) from g return (a)");
        let m =
            PatternMatcher::new(&rels, &query.pattern, query.predicate.as_ref(), Some(2))
                .unwrap();
        let err = m.collect_rows().unwrap_err();
        match err {
            QueryError::RowBudgetExceeded { limit } => assert_eq!(limit, 2),
            other => panic!("expected row budget error, got {other:?}"),
        }
    }

    #[test]
    fn budget_covering_all_rows_passes() {
        let rels = sample();
        let query = q("match (a:Person) from g return (a)");
        let m =
            PatternMatcher::new(&rels, &query.pattern, query.predicate.as_ref(), Some(3))
                .unwrap();
        assert_eq!(m.collect_rows().unwrap().len(), 3);
    }

    #[test]
    fn parallel_collection_matches_sequential() {
        let rels = sample();
        let query = q(
            "match (a:Person)-[e:Knows]->(b:Person) from g where a.age < 99 return (a), (b)",
        );
        let m =
            PatternMatcher::new(&rels, &query.pattern, query.predicate.as_ref(), None).unwrap();
        assert_eq!(m.collect_rows().unwrap(), m.collect_rows_parallel().unwrap());
    }

    #[test]
    fn edge_label_constrains_candidates() {
        let mut rels = sample();
        rels.add_edge(EdgeFact::new(
            EdgeId::new(13),
            NodeId::new(1),
            NodeId::new(3),
            "Manages",
        ));
        let knows = rows_for(&rels, "match (a)-[e:Knows]->(b) from g return (a)");
        let manages = rows_for(&rels, "match (a)-[e:Manages]->(b) from g return (a)");
        let any = rows_for(&rels, "match (a)-[e]->(b) from g return (a)");
        assert_eq!(knows.len(), 3);
        assert_eq!(manages.len(), 1);
        assert_eq!(any.len(), 4);
    }
}
