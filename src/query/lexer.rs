//! Lexer: command text → token stream with byte spans.
//!
//! The scanner is a single forward pass. Keywords are not distinguished
//! here — they arrive as `Ident` tokens and the parser matches them
//! case-insensitively, so `MATCH`, `match`, and `Match` all work.
//!
//! Disambiguation rules for `-`: followed by `>` it is the arrow of an
//! edge chain, followed by a digit it opens a negative integer literal,
//! otherwise it is the dash that opens `-[e]->`.

use crate::error::QueryError;

/// Byte-level source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword, case preserved.
    Ident(String),
    /// Integer literal; identifiers of facts are checked non-negative by
    /// the parser.
    Int(i64),
    /// Double-quoted string with `\"` and `\\` escapes resolved.
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    /// `->`
    Arrow,
    /// `-` opening an edge bracket.
    Dash,
    Eq,
    /// `!=` or `<>`.
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl TokenKind {
    /// Short human name used in parse error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("`{s}`"),
            TokenKind::Int(v) => format!("`{v}`"),
            TokenKind::Str(s) => format!("{s:?}"),
            TokenKind::LParen => "`(`".into(),
            TokenKind::RParen => "`)`".into(),
            TokenKind::LBracket => "`[`".into(),
            TokenKind::RBracket => "`]`".into(),
            TokenKind::Comma => "`,`".into(),
            TokenKind::Dot => "`.`".into(),
            TokenKind::Colon => "`:`".into(),
            TokenKind::Semicolon => "`;`".into(),
            TokenKind::Arrow => "`->`".into(),
            TokenKind::Dash => "`-`".into(),
            TokenKind::Eq => "`=`".into(),
            TokenKind::Ne => "`!=`".into(),
            TokenKind::Lt => "`<`".into(),
            TokenKind::Le => "`<=`".into(),
            TokenKind::Gt => "`>`".into(),
            TokenKind::Ge => "`>=`".into(),
        }
    }
}

/// Tokenize command text. `#` starts a comment running to end of line,
/// so script files can annotate themselves.
pub fn tokenize(src: &str) -> Result<Vec<Token>, QueryError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
            }
            b'#' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            b'(' => {
                tokens.push(tok(TokenKind::LParen, start, start + 1));
                pos += 1;
            }
            b')' => {
                tokens.push(tok(TokenKind::RParen, start, start + 1));
                pos += 1;
            }
            b'[' => {
                tokens.push(tok(TokenKind::LBracket, start, start + 1));
                pos += 1;
            }
            b']' => {
                tokens.push(tok(TokenKind::RBracket, start, start + 1));
                pos += 1;
            }
            b',' => {
                tokens.push(tok(TokenKind::Comma, start, start + 1));
                pos += 1;
            }
            b'.' => {
                tokens.push(tok(TokenKind::Dot, start, start + 1));
                pos += 1;
            }
            b':' => {
                tokens.push(tok(TokenKind::Colon, start, start + 1));
                pos += 1;
            }
            b';' => {
                tokens.push(tok(TokenKind::Semicolon, start, start + 1));
                pos += 1;
            }
            b'=' => {
                tokens.push(tok(TokenKind::Eq, start, start + 1));
                pos += 1;
            }
            b'!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(tok(TokenKind::Ne, start, start + 2));
                    pos += 2;
                } else {
                    return Err(unexpected(c, start));
                }
            }
            b'<' => match bytes.get(pos + 1) {
                Some(b'=') => {
                    tokens.push(tok(TokenKind::Le, start, start + 2));
                    pos += 2;
                }
                Some(b'>') => {
                    tokens.push(tok(TokenKind::Ne, start, start + 2));
                    pos += 2;
                }
                _ => {
                    tokens.push(tok(TokenKind::Lt, start, start + 1));
                    pos += 1;
                }
            },
            b'>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(tok(TokenKind::Ge, start, start + 2));
                    pos += 2;
                } else {
                    tokens.push(tok(TokenKind::Gt, start, start + 1));
                    pos += 1;
                }
            }
            b'-' => match bytes.get(pos + 1) {
                Some(b'>') => {
                    tokens.push(tok(TokenKind::Arrow, start, start + 2));
                    pos += 2;
                }
                Some(d) if d.is_ascii_digit() => {
                    pos = lex_int(src, pos, &mut tokens)?;
                }
                _ => {
                    tokens.push(tok(TokenKind::Dash, start, start + 1));
                    pos += 1;
                }
            },
            b'"' => {
                pos = lex_string(src, pos, &mut tokens)?;
            }
            d if d.is_ascii_digit() => {
                pos = lex_int(src, pos, &mut tokens)?;
            }
            a if a.is_ascii_alphabetic() || a == b'_' => {
                let mut end = pos + 1;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                tokens.push(tok(TokenKind::Ident(src[pos..end].to_string()), pos, end));
                pos = end;
            }
            other => return Err(unexpected(other, start)),
        }
    }

    Ok(tokens)
}

fn tok(kind: TokenKind, start: usize, end: usize) -> Token {
    Token {
        kind,
        span: Span { start, end },
    }
}

fn unexpected(byte: u8, offset: usize) -> QueryError {
    QueryError::Syntax {
        message: format!("unexpected character `{}`", byte as char),
        offset,
    }
}

fn lex_int(src: &str, start: usize, tokens: &mut Vec<Token>) -> Result<usize, QueryError> {
    let bytes = src.as_bytes();
    let mut end = start;
    if bytes[end] == b'-' {
        end += 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let text = &src[start..end];
    let value = text.parse::<i64>().map_err(|_| QueryError::Syntax {
        message: format!("integer literal `{text}` out of range"),
        offset: start,
    })?;
    tokens.push(tok(TokenKind::Int(value), start, end));
    Ok(end)
}

fn lex_string(src: &str, start: usize, tokens: &mut Vec<Token>) -> Result<usize, QueryError> {
    let bytes = src.as_bytes();
    let mut out = String::new();
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => {
                tokens.push(tok(TokenKind::Str(out), start, pos + 1));
                return Ok(pos + 1);
            }
            b'\\' => match bytes.get(pos + 1) {
                Some(b'"') => {
                    out.push('"');
                    pos += 2;
                }
                Some(b'\\') => {
                    out.push('\\');
                    pos += 2;
                }
                Some(b'n') => {
                    out.push('\n');
                    pos += 2;
                }
                _ => {
                    return Err(QueryError::Syntax {
                        message: "invalid escape in string literal".into(),
                        offset: pos,
                    });
                }
            },
            _ => {
                // Multi-byte UTF-8 passes through untouched.
                let ch_len = src[pos..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&src[pos..pos + ch_len]);
                pos += ch_len;
            }
        }
    }
    Err(QueryError::Syntax {
        message: "unterminated string literal".into(),
        offset: start,
    })
}
