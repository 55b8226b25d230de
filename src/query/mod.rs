//! Query front end: lexing, parsing, validation, and pattern matching.
//!
//! [`parse_command`] turns one statement into a [`Command`]; [`parse_script`]
//! handles `;`-separated batches. Queries and view statements are validated
//! against their own patterns before execution so that unbound variables and
//! malformed constructions fail at submission time, not mid-scan.

pub mod ast;
pub mod lexer;
pub mod matcher;
pub mod parser;

use std::collections::HashMap;

use crate::error::QueryError;

pub use ast::{Command, MatchQuery, ViewStmt};
pub use matcher::{Binding, BindingRow, PatternMatcher, Rows};
pub use parser::{parse_command, parse_script};

use ast::{PatternStep, SetAssign, SetValue, SkArg};

/// Check a query's clauses against its pattern: every `RETURN` item and
/// every `WHERE` variable must be declared by `MATCH`.
pub fn validate_query(query: &MatchQuery) -> Result<(), QueryError> {
    if let Some(pred) = &query.predicate {
        for var in pred.vars() {
            if !query.pattern.declares(var) {
                return Err(QueryError::UnboundVariable {
                    var: var.to_string(),
                });
            }
        }
    }
    for item in &query.returns {
        if !query.pattern.declares(item.var()) {
            return Err(QueryError::UnboundVariable {
                var: item.var().to_string(),
            });
        }
    }
    Ok(())
}

/// Check a view statement at creation time.
///
/// Carried variables (bound by `MATCH`) keep their matched identity in the
/// output; fresh ones need exactly one skolem assignment and a label. A
/// carried edge must keep the endpoints it matched with.
pub fn validate_view(stmt: &ViewStmt) -> Result<(), QueryError> {
    if let Some(pred) = &stmt.predicate {
        for var in pred.vars() {
            if !stmt.pattern.declares(var) {
                return Err(QueryError::UnboundVariable {
                    var: var.to_string(),
                });
            }
        }
    }
    let Some(construct) = &stmt.construct else {
        return Ok(());
    };

    let mut identities: HashMap<&str, usize> = HashMap::new();
    for assign in &construct.assigns {
        match assign {
            SetAssign::Identity { var, args, .. } => {
                if !construct.pattern.declares(var) {
                    return Err(QueryError::UnboundVariable { var: var.clone() });
                }
                if stmt.pattern.declares(var) {
                    return Err(QueryError::TypeMismatch {
                        message: format!(
                            "`{var}` is bound by MATCH; a skolem identity would shadow it"
                        ),
                    });
                }
                *identities.entry(var.as_str()).or_default() += 1;
                for arg in args {
                    let used = match arg {
                        SkArg::Var(v) => Some(v.as_str()),
                        SkArg::Prop(p) => Some(p.var.as_str()),
                        SkArg::Lit(_) => None,
                    };
                    if let Some(v) = used {
                        if !stmt.pattern.declares(v) {
                            return Err(QueryError::UnboundVariable {
                                var: v.to_string(),
                            });
                        }
                    }
                }
            }
            SetAssign::Property { target, value } => {
                if !construct.pattern.declares(&target.var) {
                    return Err(QueryError::UnboundVariable {
                        var: target.var.clone(),
                    });
                }
                if let SetValue::Prop(p) = value {
                    if !stmt.pattern.declares(&p.var) {
                        return Err(QueryError::UnboundVariable {
                            var: p.var.clone(),
                        });
                    }
                }
            }
        }
    }

    for (var, count) in &identities {
        if *count > 1 {
            return Err(QueryError::TypeMismatch {
                message: format!("`{var}` has {count} skolem identities; exactly one is allowed"),
            });
        }
    }

    for var in construct.pattern.vars() {
        if stmt.pattern.declares(var) {
            if construct.pattern.var_kind(var) != stmt.pattern.var_kind(var) {
                return Err(QueryError::TypeMismatch {
                    message: format!(
                        "`{var}` changes kind between MATCH and CONSTRUCT"
                    ),
                });
            }
            continue;
        }
        if !identities.contains_key(var) {
            return Err(QueryError::UnboundVariable {
                var: var.to_string(),
            });
        }
        if construct.pattern.label_of(var).is_none() {
            return Err(QueryError::TypeMismatch {
                message: format!("constructed element `{var}` must declare a label"),
            });
        }
    }

    // A carried edge keeps its matched endpoints.
    for step in &construct.pattern.steps {
        let PatternStep::Edge(ce) = step else {
            continue;
        };
        if !stmt.pattern.declares(&ce.var) {
            continue;
        }
        let matched = stmt.pattern.steps.iter().find_map(|s| match s {
            PatternStep::Edge(me) if me.var == ce.var => Some(me),
            _ => None,
        });
        if let Some(me) = matched {
            if me.from != ce.from || me.to != ce.to {
                return Err(QueryError::TypeMismatch {
                    message: format!(
                        "carried edge `{}` cannot be rewired from ({} -> {}) to ({} -> {})",
                        ce.var, me.from, me.to, ce.from, ce.to
                    ),
                });
            }
        }
    }

    Ok(())
}
