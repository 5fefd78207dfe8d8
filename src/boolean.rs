//! Boolean expression parser and evaluator over named leaves (`spec.md`
//! §4.9).
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr   := term ('|' term)*
//! term   := factor ('&' factor)*
//! factor := '!'? (IDENT | '(' expr ')')
//! ```
//!
//! `IDENT` is a pattern id (`spec.md` §3 "Pattern.id"), matching
//! `[A-Za-z0-9_]+`. Whitespace between tokens is insignificant.

use std::collections::HashMap;
use std::fmt;

use crate::Error;

/// A parsed boolean expression tree over leaf pattern ids.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Leaf(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Leaf(id) => write!(f, "{id}"),
            Expr::Not(e) => write!(f, "!{}", Atom(e)),
            Expr::And(a, b) => write!(f, "{} & {}", Atom(a), Atom(b)),
            Expr::Or(a, b) => write!(f, "{} | {}", Atom(a), Atom(b)),
        }
    }
}

/// Wraps a sub-expression in parentheses when its precedence requires it.
struct Atom<'a>(&'a Expr);

impl fmt::Display for Atom<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expr::Leaf(_) | Expr::Not(_) => write!(f, "{}", self.0),
            Expr::And(_, _) | Expr::Or(_, _) => write!(f, "({})", self.0),
        }
    }
}

impl Expr {
    /// Evaluate against a lookup of leaf id to truth value. Unknown leaf ids
    /// are treated as `false`.
    #[must_use]
    pub fn eval(&self, values: &HashMap<String, bool>) -> bool {
        match self {
            Expr::Leaf(id) => values.get(id).copied().unwrap_or(false),
            Expr::Not(e) => !e.eval(values),
            Expr::And(a, b) => a.eval(values) && b.eval(values),
            Expr::Or(a, b) => a.eval(values) || b.eval(values),
        }
    }

    /// Every leaf id referenced, in first-occurrence order.
    #[must_use]
    pub fn leaf_ids(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_leaf_ids(&mut out);
        out
    }

    fn collect_leaf_ids(&self, out: &mut Vec<String>) {
        match self {
            Expr::Leaf(id) => {
                if !out.contains(id) {
                    out.push(id.clone());
                }
            }
            Expr::Not(e) => e.collect_leaf_ids(out),
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.collect_leaf_ids(out);
                b.collect_leaf_ids(out);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    And,
    Or,
    Not,
    LParen,
    RParen,
}

struct Lexeme<'a> {
    kind: TokenKind,
    text: &'a str,
    position: usize,
}

fn lex(input: &str) -> Result<Vec<Lexeme<'_>>, Error> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }
            '&' => {
                out.push(Lexeme { kind: TokenKind::And, text: "&", position: i });
                i += 1;
            }
            '|' => {
                out.push(Lexeme { kind: TokenKind::Or, text: "|", position: i });
                i += 1;
            }
            '!' => {
                out.push(Lexeme { kind: TokenKind::Not, text: "!", position: i });
                i += 1;
            }
            '(' => {
                out.push(Lexeme { kind: TokenKind::LParen, text: "(", position: i });
                i += 1;
            }
            ')' => {
                out.push(Lexeme { kind: TokenKind::RParen, text: ")", position: i });
                i += 1;
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < bytes.len() {
                    let c = bytes[i] as char;
                    if c.is_alphanumeric() || c == '_' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                out.push(Lexeme {
                    kind: TokenKind::Ident,
                    text: &input[start..i],
                    position: start,
                });
            }
            other => {
                return Err(Error::Parse {
                    message: format!("unexpected character '{other}'"),
                    position: i,
                });
            }
        }
    }

    Ok(out)
}

struct Parser<'a> {
    tokens: Vec<Lexeme<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Lexeme<'a>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Lexeme<'a>> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn end_position(&self) -> usize {
        self.tokens.last().map(|t| t.position + t.text.len()).unwrap_or(0)
    }

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_term()?;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::Or) {
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_factor()?;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::And) {
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, Error> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Not => {
                self.advance();
                let inner = self.parse_factor()?;
                Ok(Expr::Not(Box::new(inner)))
            }
            Some(t) if t.kind == TokenKind::LParen => {
                let open_pos = t.position;
                self.advance();
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some(t) if t.kind == TokenKind::RParen => Ok(inner),
                    Some(t) => Err(Error::Parse {
                        message: format!("expected ')', found '{}'", t.text),
                        position: t.position,
                    }),
                    None => Err(Error::Parse {
                        message: "unterminated '('".to_string(),
                        position: open_pos,
                    }),
                }
            }
            Some(t) if t.kind == TokenKind::Ident => {
                let text = t.text.to_string();
                self.advance();
                Ok(Expr::Leaf(text))
            }
            Some(t) => Err(Error::Parse {
                message: format!("unexpected token '{}'", t.text),
                position: t.position,
            }),
            None => Err(Error::Parse {
                message: "unexpected end of expression".to_string(),
                position: self.end_position(),
            }),
        }
    }
}

/// Parse a boolean expression string into an `Expr` tree.
pub fn parse(input: &str) -> Result<Expr, Error> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    if let Some(tok) = parser.peek() {
        return Err(Error::Parse {
            message: format!("unexpected trailing token '{}'", tok.text),
            position: tok.position,
        });
    }
    Ok(expr)
}
