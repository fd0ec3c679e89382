//! The surface abstract syntax tree.
//!
//! This is a closed sum type per IR level, as called for in spec.md §9
//! ("Re-architect each IR level as a closed sum type"): every shape the
//! original teaching compiler matched on dynamically-typed `ast.expr`/
//! `ast.stmt` nodes (see `examples/original_source/src/iup/compiler/
//! compiler.py`) becomes an explicit, exhaustively-matched Rust variant
//! here. Passes that would have raised `Exception('unexpected ' + repr(e))`
//! on the Python side instead fail to compile if a match is non-exhaustive.

use crate::common::Id;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Assign(Id, Expr),
    /// `t[i] = v`. Only ever targets a tuple produced by `Allocate`.
    SubscriptAssign(Expr, Expr, Expr),
    Expr(Expr),
    If {
        test: Expr,
        then: Vec<Stmt>,
        or_else: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    /// A garbage-collection hint inserted by expose-allocation; carries the
    /// number of bytes about to be allocated.
    Collect(i64),
    Return(Expr),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Var(Id),
    Int(i64),
    Bool(bool),
    BinOp {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Present only before [`crate::front::shrink`] runs; eliminated by it.
    And(Box<Expr>, Box<Expr>),
    /// Present only before [`crate::front::shrink`] runs; eliminated by it.
    Or(Box<Expr>, Box<Expr>),
    If {
        test: Box<Expr>,
        then: Box<Expr>,
        or_else: Box<Expr>,
    },
    InputInt,
    Print(Box<Expr>),
    Tuple(Vec<Expr>),
    Subscript(Box<Expr>, Box<Expr>),
    Len(Box<Expr>),
    /// Introduced by expose-allocation; never appears in parsed source.
    Allocate { len: usize, ty: Type },
    /// Introduced by expose-allocation; references a runtime global such as
    /// `free_ptr` or `fromspace_end`.
    GlobalValue(&'static str),
    /// A local-effect sequence threaded through an expression position,
    /// produced by desugaring tuple allocation (spec.md §3) and by hoisting
    /// in RCO. `stmts` execute in order for effect, then `value` is the
    /// result of the whole `Begin`.
    Begin(Vec<Stmt>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        write!(f, "{s}")
    }
}

/// Structural types, as would be produced by an external type checker and
/// consumed by expose-allocation (spec.md §4.3). See
/// [`crate::front::typecheck`] for the minimal in-crate checker that
/// supplies these annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Bool,
    Tuple(Vec<Type>),
}
