//! The parser.
//!
//! A small hand-written recursive-descent parser over the token stream
//! produced by [`super::lex`]. The teacher's own parser was left as a
//! `todo!()`; this fills it in with a grammar that covers every surface
//! form spec.md §3 lists (integers, booleans, tuples, `if`, `while`,
//! short-circuit `and`/`or`, the `if`-expression ternary used in spec.md
//! §8 scenario 6, subscripting, `len`, `input_int`, `print`).

use std::fmt::Debug;

use derive_more::derive::Display;

use super::ast::*;
use super::lex::{Lexer, Token, TokenKind};
use crate::common::Id;

#[derive(Display)]
#[display("Parse error: {}", self.0)]
pub struct ParseError(String);

impl Debug for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl From<super::lex::LexError> for ParseError {
    fn from(e: super::lex::LexError) -> Self {
        ParseError(e.to_string())
    }
}

impl std::error::Error for ParseError {}

struct Parser<'src> {
    toks: Vec<Token<'src>>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<TokenKind> {
        self.toks.get(self.pos).map(|t| t.kind)
    }

    fn peek_text(&self) -> Option<&'src str> {
        self.toks.get(self.pos).map(|t| t.text)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn bump(&mut self) -> Option<Token<'src>> {
        let t = self.toks.get(self.pos).copied();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token<'src>> {
        match self.bump() {
            Some(t) if t.kind == kind => Ok(t),
            Some(t) => Err(ParseError(format!("expected {kind}, found {}", t.kind))),
            None => Err(ParseError(format!("expected {kind}, found end of input"))),
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // program := stmt*
    fn parse_program(&mut self) -> PResult<Program> {
        let mut stmts = Vec::new();
        while self.pos < self.toks.len() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Program { stmts })
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        match self.peek() {
            Some(TokenKind::Print) => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                let e = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(Expr::Print(Box::new(e))))
            }
            Some(TokenKind::If) => {
                self.bump();
                let test = self.parse_expr()?;
                let then = self.parse_block()?;
                let or_else = if self.eat(TokenKind::Else) {
                    self.parse_block()?
                } else {
                    Vec::new()
                };
                Ok(Stmt::If { test, then, or_else })
            }
            Some(TokenKind::While) => {
                self.bump();
                let test = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt::While { test, body })
            }
            Some(TokenKind::Id) => {
                let name_tok = self.bump().unwrap();
                let name: Id = internment::Intern::new(name_tok.text.to_string());
                if self.eat(TokenKind::LBracket) {
                    let idx = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    self.expect(TokenKind::Assign)?;
                    let rhs = self.parse_expr()?;
                    self.expect(TokenKind::Semicolon)?;
                    Ok(Stmt::SubscriptAssign(Expr::Var(name), idx, rhs))
                } else {
                    self.expect(TokenKind::Assign)?;
                    let rhs = self.parse_expr()?;
                    self.expect(TokenKind::Semicolon)?;
                    Ok(Stmt::Assign(name, rhs))
                }
            }
            Some(k) => Err(ParseError(format!("unexpected token {k} at start of statement"))),
            None => Err(ParseError("unexpected end of input in statement".into())),
        }
    }

    // expr := ternary
    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_ternary()
    }

    // ternary := or_expr ('if' or_expr 'else' ternary)?
    fn parse_ternary(&mut self) -> PResult<Expr> {
        let e = self.parse_or()?;
        if self.eat(TokenKind::If) {
            let test = self.parse_or()?;
            self.expect(TokenKind::Else)?;
            let or_else = self.parse_ternary()?;
            Ok(Expr::If {
                test: Box::new(test),
                then: Box::new(e),
                or_else: Box::new(or_else),
            })
        } else {
            Ok(e)
        }
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut e = self.parse_and()?;
        while self.eat(TokenKind::Or) {
            let rhs = self.parse_and()?;
            e = Expr::Or(Box::new(e), Box::new(rhs));
        }
        Ok(e)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut e = self.parse_not()?;
        while self.eat(TokenKind::And) {
            let rhs = self.parse_not()?;
            e = Expr::And(Box::new(e), Box::new(rhs));
        }
        Ok(e)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.eat(TokenKind::Not) {
            let e = self.parse_not()?;
            Ok(Expr::Not(Box::new(e)))
        } else {
            self.parse_cmp()
        }
    }

    // cmp := add (cmp_op add)?  -- non-associative, as in the source language
    fn parse_cmp(&mut self) -> PResult<Expr> {
        let lhs = self.parse_add()?;
        let op = match self.peek() {
            Some(TokenKind::EqEq) => Some(CmpOp::Eq),
            Some(TokenKind::Lt) => Some(CmpOp::Lt),
            Some(TokenKind::Le) => Some(CmpOp::Le),
            Some(TokenKind::Gt) => Some(CmpOp::Gt),
            Some(TokenKind::Ge) => Some(CmpOp::Ge),
            _ => None,
        };
        match op {
            Some(op) => {
                self.bump();
                let rhs = self.parse_add()?;
                Ok(Expr::Compare {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            }
            None => Ok(lhs),
        }
    }

    fn parse_add(&mut self) -> PResult<Expr> {
        let mut e = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            e = Expr::BinOp {
                op,
                lhs: Box::new(e),
                rhs: Box::new(rhs),
            };
        }
        Ok(e)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if self.eat(TokenKind::Minus) {
            let e = self.parse_unary()?;
            Ok(Expr::Neg(Box::new(e)))
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut e = self.parse_primary()?;
        while self.eat(TokenKind::LBracket) {
            let idx = self.parse_expr()?;
            self.expect(TokenKind::RBracket)?;
            e = Expr::Subscript(Box::new(e), Box::new(idx));
        }
        Ok(e)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        match self.peek() {
            Some(TokenKind::Num) => {
                let text = self.peek_text().unwrap();
                let v: i64 = text
                    .parse()
                    .map_err(|_| ParseError(format!("invalid integer literal {text:?}")))?;
                self.bump();
                Ok(Expr::Int(v))
            }
            Some(TokenKind::True) => {
                self.bump();
                Ok(Expr::Bool(true))
            }
            Some(TokenKind::False) => {
                self.bump();
                Ok(Expr::Bool(false))
            }
            Some(TokenKind::InputInt) => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::InputInt)
            }
            Some(TokenKind::Len) => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                let e = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Len(Box::new(e)))
            }
            Some(TokenKind::Id) => {
                let text = self.peek_text().unwrap();
                self.bump();
                Ok(Expr::Var(internment::Intern::new(text.to_string())))
            }
            Some(TokenKind::LParen) => {
                self.bump();
                if self.eat(TokenKind::RParen) {
                    // `()` — the empty tuple.
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let first = self.parse_expr()?;
                if self.at(TokenKind::Comma) {
                    let mut elems = vec![first];
                    while self.eat(TokenKind::Comma) {
                        if self.at(TokenKind::RParen) {
                            break; // trailing comma
                        }
                        elems.push(self.parse_expr()?);
                    }
                    self.expect(TokenKind::RParen)?;
                    Ok(Expr::Tuple(elems))
                } else {
                    self.expect(TokenKind::RParen)?;
                    Ok(first)
                }
            }
            Some(k) => Err(ParseError(format!("unexpected token {k} in expression"))),
            None => Err(ParseError("unexpected end of input in expression".into())),
        }
    }
}

pub fn parse(input: &str) -> Result<Program, ParseError> {
    let toks = super::lex::lex_all(input)?;
    let mut parser = Parser { toks, pos: 0 };
    let prog = parser.parse_program()?;
    if parser.pos != parser.toks.len() {
        return Err(ParseError(format!(
            "trailing input starting at token {}",
            parser.pos
        )));
    }
    Ok(prog)
}
