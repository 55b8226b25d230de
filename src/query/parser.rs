//! Recursive descent parser: token stream → [`Command`] values.
//!
//! The parser is hand-rolled (no external parser combinator dependency) for
//! full control over error offsets and the small fixed grammar. Keywords are
//! matched case-insensitively; clause order after a pattern is flexible
//! (`FROM` and `WHERE` may appear in either order before `RETURN`); a
//! trailing `;` is tolerated everywhere.

use crate::error::QueryError;
use crate::fact::Relation;

use super::ast::{
    Command, CompareOp, Comparison, ConstructClause, EdgePattern, Literal, MatchQuery,
    NodePattern, Operand, Pattern, PatternStep, Predicate, PropRef, ReturnItem, SetAssign,
    SetValue, SkArg, ViewStmt,
};
use super::lexer::{self, Token, TokenKind};

/// Parse exactly one statement. Trailing semicolons are accepted; any other
/// trailing input is an error.
pub fn parse_command(src: &str) -> Result<Command, QueryError> {
    let mut parser = Parser::new(src)?;
    while parser.eat(&TokenKind::Semicolon) {}
    let command = parser.parse_one()?;
    while parser.eat(&TokenKind::Semicolon) {}
    if !parser.at_end() {
        return Err(parser.err("unexpected trailing input"));
    }
    Ok(command)
}

/// Parse a `;`-separated script into statements. Empty statements are
/// skipped, so doubled semicolons and trailing ones are harmless.
pub fn parse_script(src: &str) -> Result<Vec<Command>, QueryError> {
    let mut parser = Parser::new(src)?;
    let mut commands = Vec::new();
    while !parser.at_end() {
        while parser.eat(&TokenKind::Semicolon) {}
        if parser.at_end() {
            break;
        }
        commands.push(parser.parse_one()?);
        if !parser.at_end() {
            parser.expect(&TokenKind::Semicolon, "`;` between statements")?;
        }
    }
    Ok(commands)
}

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> Result<Self, QueryError> {
        Ok(Self {
            src,
            tokens: lexer::tokenize(src)?,
            pos: 0,
        })
    }

    // -- cursor helpers -----------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek2(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    /// Byte offset of the current token, or end of input.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.src.len(), |t| t.span.start)
    }

    /// Byte offset just past the most recently consumed token.
    fn last_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn err(&self, message: impl Into<String>) -> QueryError {
        QueryError::Syntax {
            message: message.into(),
            offset: self.offset(),
        }
    }

    fn eat(&mut self, want: &TokenKind) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: &TokenKind, what: &str) -> Result<(), QueryError> {
        if self.eat(want) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> QueryError {
        match self.peek() {
            Some(kind) => self.err(format!("expected {what}, found {}", kind.describe())),
            None => self.err(format!("expected {what}, found end of input")),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, QueryError> {
        match self.peek() {
            Some(TokenKind::Ident(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(TokenKind::Ident(s)) if s.eq_ignore_ascii_case(kw))
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.peek_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), QueryError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{kw}`")))
        }
    }

    /// A fact identity: non-negative integer literal.
    fn expect_id(&mut self, what: &str) -> Result<u64, QueryError> {
        match self.peek() {
            Some(TokenKind::Int(v)) => {
                let v = *v;
                if v < 0 {
                    return Err(self.err(format!("{what} must be non-negative, got {v}")));
                }
                self.pos += 1;
                Ok(v as u64)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// A label or key: quoted string or bare identifier.
    fn expect_name(&mut self, what: &str) -> Result<String, QueryError> {
        match self.peek() {
            Some(TokenKind::Str(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            Some(TokenKind::Ident(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// A property value: string, integer (canonicalized), or bare identifier.
    fn expect_value(&mut self, what: &str) -> Result<String, QueryError> {
        match self.peek() {
            Some(TokenKind::Int(v)) => {
                let v = *v;
                self.pos += 1;
                Ok(v.to_string())
            }
            _ => self.expect_name(what),
        }
    }

    // -- statements ---------------------------------------------------------

    fn parse_one(&mut self) -> Result<Command, QueryError> {
        let start = self.offset();
        let head = self.expect_ident("a command")?;
        match head.to_ascii_lowercase().as_str() {
            "create" => self.parse_create(start),
            "use" => Ok(Command::UseGraph {
                name: self.expect_ident("a graph name")?,
            }),
            "drop" => self.parse_drop(),
            "list" => {
                self.eat_keyword("graphs");
                Ok(Command::ListGraphs)
            }
            "insert" => self.parse_insert(),
            "match" => Ok(Command::Query(self.parse_match()?)),
            "schema" => Ok(Command::ShowSchema),
            "views" => Ok(Command::ShowViews),
            "program" => Ok(Command::ShowProgram),
            other => Err(QueryError::Syntax {
                message: format!("unknown command `{other}`"),
                offset: start,
            }),
        }
    }

    fn parse_create(&mut self, start: usize) -> Result<Command, QueryError> {
        if self.eat_keyword("graph") {
            return Ok(Command::CreateGraph {
                name: self.expect_ident("a graph name")?,
            });
        }
        if self.eat_keyword("node") {
            return Ok(Command::DeclareNode {
                label: self.expect_ident("a node label")?,
            });
        }
        if self.eat_keyword("edge") {
            let label = self.expect_ident("an edge label")?;
            self.expect(&TokenKind::LParen, "`(`")?;
            let from = self.expect_ident("a source node label")?;
            self.expect(&TokenKind::Arrow, "`->`")?;
            let to = self.expect_ident("a target node label")?;
            self.expect(&TokenKind::RParen, "`)`")?;
            return Ok(Command::DeclareEdge { label, from, to });
        }
        let is_virtual = self.eat_keyword("virtual");
        if self.eat_keyword("view") {
            return Ok(Command::CreateView(self.parse_view(is_virtual, start)?));
        }
        Err(self.unexpected("`graph`, `node`, `edge`, or `view`"))
    }

    fn parse_drop(&mut self) -> Result<Command, QueryError> {
        if self.eat_keyword("graph") {
            return Ok(Command::DropGraph {
                name: self.expect_ident("a graph name")?,
            });
        }
        if self.eat_keyword("view") {
            return Ok(Command::DropView {
                name: self.expect_ident("a view name")?,
            });
        }
        Err(self.unexpected("`graph` or `view`"))
    }

    fn parse_insert(&mut self) -> Result<Command, QueryError> {
        let at = self.offset();
        let tag = self.expect_ident("a relation name (N, E, NP, EP)")?;
        let relation: Relation = tag.parse().map_err(|_| QueryError::Syntax {
            message: format!("unknown relation `{tag}`, expected N, E, NP, or EP"),
            offset: at,
        })?;
        self.expect(&TokenKind::LParen, "`(`")?;
        let command = match relation {
            Relation::Node => {
                let id = self.expect_id("a node identity")?;
                self.expect(&TokenKind::Comma, "`,`")?;
                let label = self.expect_name("a node label")?;
                Command::InsertNode { id, label }
            }
            Relation::Edge => {
                let id = self.expect_id("an edge identity")?;
                self.expect(&TokenKind::Comma, "`,`")?;
                let from = self.expect_id("a source node identity")?;
                self.expect(&TokenKind::Comma, "`,`")?;
                let to = self.expect_id("a target node identity")?;
                self.expect(&TokenKind::Comma, "`,`")?;
                let label = self.expect_name("an edge label")?;
                Command::InsertEdge {
                    id,
                    from,
                    to,
                    label,
                }
            }
            Relation::NodeProp => {
                let id = self.expect_id("a node identity")?;
                self.expect(&TokenKind::Comma, "`,`")?;
                let key = self.expect_name("a property key")?;
                self.expect(&TokenKind::Comma, "`,`")?;
                let value = self.expect_value("a property value")?;
                Command::InsertNodeProp { id, key, value }
            }
            Relation::EdgeProp => {
                let id = self.expect_id("an edge identity")?;
                self.expect(&TokenKind::Comma, "`,`")?;
                let key = self.expect_name("a property key")?;
                self.expect(&TokenKind::Comma, "`,`")?;
                let value = self.expect_value("a property value")?;
                Command::InsertEdgeProp { id, key, value }
            }
        };
        self.expect(&TokenKind::RParen, "`)`")?;
        Ok(command)
    }

    // -- queries ------------------------------------------------------------

    fn parse_match(&mut self) -> Result<MatchQuery, QueryError> {
        let pattern = self.parse_pattern()?;
        let mut source: Option<String> = None;
        let mut predicate: Option<Predicate> = None;
        loop {
            if self.eat_keyword("from") {
                if source.is_some() {
                    return Err(self.err("duplicate FROM clause"));
                }
                source = Some(self.expect_ident("a graph or view name")?);
            } else if self.eat_keyword("where") {
                if predicate.is_some() {
                    return Err(self.err("duplicate WHERE clause"));
                }
                predicate = Some(self.parse_predicate()?);
            } else if self.eat_keyword("return") {
                break;
            } else {
                return Err(self.unexpected("`FROM`, `WHERE`, or `RETURN`"));
            }
        }
        let returns = self.parse_return_items()?;
        let source = source.ok_or_else(|| self.err("query needs a FROM clause"))?;
        Ok(MatchQuery {
            pattern,
            source,
            predicate,
            returns,
        })
    }

    fn parse_return_items(&mut self) -> Result<Vec<ReturnItem>, QueryError> {
        let mut items = vec![self.parse_return_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_return_item()?);
        }
        Ok(items)
    }

    fn parse_return_item(&mut self) -> Result<ReturnItem, QueryError> {
        if self.eat(&TokenKind::LParen) {
            let var = self.expect_ident("a variable")?;
            self.expect(&TokenKind::RParen, "`)`")?;
            return Ok(ReturnItem::Element { var });
        }
        let var = self.expect_ident("a variable or property reference")?;
        if self.eat(&TokenKind::Dot) {
            let key = self.expect_ident("a property key")?;
            return Ok(ReturnItem::Property(PropRef { var, key }));
        }
        Ok(ReturnItem::Element { var })
    }

    // -- patterns -----------------------------------------------------------

    fn parse_pattern(&mut self) -> Result<Pattern, QueryError> {
        let mut steps = Vec::new();
        self.parse_path(&mut steps)?;
        // A comma continues the pattern only when another path opens; in
        // RETURN or SET position the comma belongs to the item list.
        while self.peek() == Some(&TokenKind::Comma) && self.peek2() == Some(&TokenKind::LParen) {
            self.pos += 1;
            self.parse_path(&mut steps)?;
        }
        Ok(Pattern { steps })
    }

    fn parse_path(&mut self, steps: &mut Vec<PatternStep>) -> Result<(), QueryError> {
        let mut prev = self.parse_node_pattern()?;
        steps.push(PatternStep::Node(prev.clone()));
        while self.peek() == Some(&TokenKind::Dash) {
            self.pos += 1;
            self.expect(&TokenKind::LBracket, "`[`")?;
            let var = self.expect_ident("an edge variable")?;
            let label = if self.eat(&TokenKind::Colon) {
                Some(self.expect_ident("an edge label")?)
            } else {
                None
            };
            self.expect(&TokenKind::RBracket, "`]`")?;
            self.expect(&TokenKind::Arrow, "`->`")?;
            let next = self.parse_node_pattern()?;
            steps.push(PatternStep::Edge(EdgePattern {
                var,
                label,
                from: prev.var.clone(),
                to: next.var.clone(),
            }));
            steps.push(PatternStep::Node(next.clone()));
            prev = next;
        }
        Ok(())
    }

    fn parse_node_pattern(&mut self) -> Result<NodePattern, QueryError> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let var = self.expect_ident("a node variable")?;
        let label = if self.eat(&TokenKind::Colon) {
            Some(self.expect_ident("a node label")?)
        } else {
            None
        };
        self.expect(&TokenKind::RParen, "`)`")?;
        Ok(NodePattern { var, label })
    }

    // -- predicates ---------------------------------------------------------

    fn parse_predicate(&mut self) -> Result<Predicate, QueryError> {
        let mut clauses = vec![self.parse_comparison()?];
        while self.eat_keyword("and") {
            clauses.push(self.parse_comparison()?);
        }
        Ok(Predicate { clauses })
    }

    fn parse_comparison(&mut self) -> Result<Comparison, QueryError> {
        let lhs = self.parse_prop_ref()?;
        let op = match self.peek() {
            Some(TokenKind::Eq) => CompareOp::Eq,
            Some(TokenKind::Ne) => CompareOp::Ne,
            Some(TokenKind::Lt) => CompareOp::Lt,
            Some(TokenKind::Le) => CompareOp::Le,
            Some(TokenKind::Gt) => CompareOp::Gt,
            Some(TokenKind::Ge) => CompareOp::Ge,
            _ => return Err(self.unexpected("a comparison operator")),
        };
        self.pos += 1;
        let rhs = match self.peek() {
            Some(TokenKind::Int(v)) => {
                let v = *v;
                self.pos += 1;
                Operand::Lit(Literal::Int(v))
            }
            Some(TokenKind::Str(s)) => {
                let s = s.clone();
                self.pos += 1;
                Operand::Lit(Literal::Str(s))
            }
            Some(TokenKind::Ident(_)) => Operand::Prop(self.parse_prop_ref()?),
            _ => return Err(self.unexpected("a literal or property reference")),
        };
        Ok(Comparison { lhs, op, rhs })
    }

    fn parse_prop_ref(&mut self) -> Result<PropRef, QueryError> {
        let var = self.expect_ident("a variable")?;
        self.expect(&TokenKind::Dot, "`.`")?;
        let key = self.expect_ident("a property key")?;
        Ok(PropRef { var, key })
    }

    // -- view statements ----------------------------------------------------

    fn parse_view(&mut self, is_virtual: bool, start: usize) -> Result<ViewStmt, QueryError> {
        let name = self.expect_ident("a view name")?;
        self.expect_keyword("on")?;
        let source = self.expect_ident("a source graph or view name")?;
        let default_map = if self.eat_keyword("with") {
            self.expect_keyword("default")?;
            self.expect_keyword("map")?;
            true
        } else {
            false
        };
        self.expect(&TokenKind::LParen, "`(`")?;
        self.expect_keyword("match")?;
        let pattern = self.parse_pattern()?;
        let predicate = if self.eat_keyword("where") {
            Some(self.parse_predicate()?)
        } else {
            None
        };
        let construct = if self.eat_keyword("construct") {
            let cpattern = self.parse_pattern()?;
            self.expect_keyword("set")?;
            let assigns = self.parse_assigns()?;
            Some(ConstructClause {
                pattern: cpattern,
                assigns,
            })
        } else {
            None
        };
        self.expect(&TokenKind::RParen, "`)`")?;
        let text = self.src[start..self.last_end()].trim().to_string();
        Ok(ViewStmt {
            name,
            is_virtual,
            source,
            default_map,
            pattern,
            predicate,
            construct,
            text,
        })
    }

    fn parse_assigns(&mut self) -> Result<Vec<SetAssign>, QueryError> {
        let mut assigns = vec![self.parse_assign()?];
        while self.eat(&TokenKind::Comma) {
            assigns.push(self.parse_assign()?);
        }
        Ok(assigns)
    }

    fn parse_assign(&mut self) -> Result<SetAssign, QueryError> {
        let var = self.expect_ident("a variable")?;
        if self.eat(&TokenKind::Dot) {
            let key = self.expect_ident("a property key")?;
            self.expect(&TokenKind::Eq, "`=`")?;
            let value = match self.peek() {
                Some(TokenKind::Int(v)) => {
                    let v = *v;
                    self.pos += 1;
                    SetValue::Lit(Literal::Int(v))
                }
                Some(TokenKind::Str(s)) => {
                    let s = s.clone();
                    self.pos += 1;
                    SetValue::Lit(Literal::Str(s))
                }
                Some(TokenKind::Ident(_)) => SetValue::Prop(self.parse_prop_ref()?),
                _ => return Err(self.unexpected("a literal or property reference")),
            };
            return Ok(SetAssign::Property {
                target: PropRef { var, key },
                value,
            });
        }
        self.expect(&TokenKind::Eq, "`=`")?;
        self.expect_keyword("sk")?;
        self.expect(&TokenKind::LParen, "`(`")?;
        let functor = match self.peek() {
            Some(TokenKind::Str(s)) => {
                let s = s.clone();
                self.pos += 1;
                s
            }
            _ => return Err(self.unexpected("a quoted functor name")),
        };
        let mut args = Vec::new();
        while self.eat(&TokenKind::Comma) {
            args.push(self.parse_sk_arg()?);
        }
        self.expect(&TokenKind::RParen, "`)`")?;
        Ok(SetAssign::Identity { var, functor, args })
    }

    fn parse_sk_arg(&mut self) -> Result<SkArg, QueryError> {
        match self.peek() {
            Some(TokenKind::Int(v)) => {
                let v = *v;
                self.pos += 1;
                Ok(SkArg::Lit(Literal::Int(v)))
            }
            Some(TokenKind::Str(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(SkArg::Lit(Literal::Str(s)))
            }
            Some(TokenKind::Ident(_)) => {
                let var = self.expect_ident("a variable")?;
                if self.eat(&TokenKind::Dot) {
                    let key = self.expect_ident("a property key")?;
                    Ok(SkArg::Prop(PropRef { var, key }))
                } else {
                    Ok(SkArg::Var(var))
                }
            }
            _ => Err(self.unexpected("a skolem argument")),
        }
    }
}
