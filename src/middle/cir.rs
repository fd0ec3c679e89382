//! The CFG intermediate representation (spec.md §3's "CLike" form).
//!
//! A program is a mapping from label to statement list; each block ends
//! with exactly one terminator: unconditional `goto`, conditional
//! `if cmp(a,b) then goto L1 else goto L2`, or `return value`.
//! Non-terminator statements are straight-line assignments and
//! effect-only expressions (print, collect, allocate).

use crate::common::{Id, Label, Map};
use crate::front::ast::{BinOp, CmpOp, Type};
use std::fmt;

#[derive(Debug, Clone)]
pub struct Program {
    pub blocks: Map<Label, Block>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub term: Terminator,
}

/// An atomic operand: either a constant or a name. Every CFG-IR statement
/// is built entirely out of these plus the compound RHS forms RCO allows
/// (spec.md §4.4's "allowed compound form" list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    Int(i64),
    Bool(bool),
    Var(Id),
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Int(n) => write!(f, "{n}"),
            Atom::Bool(b) => write!(f, "{b}"),
            Atom::Var(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(Id, Rhs),
    SubscriptAssign(Atom, Atom, Atom),
    Print(Atom),
    /// `input_int()` evaluated purely for effect (its result discarded).
    InputIntEffect,
    Collect(i64),
}

/// The grammar of allowed assignment right-hand-sides post-RCO
/// (spec.md §4.4).
#[derive(Debug, Clone, PartialEq)]
pub enum Rhs {
    Atom(Atom),
    BinOp(Atom, BinOp, Atom),
    Neg(Atom),
    Not(Atom),
    Compare(Atom, CmpOp, Atom),
    InputInt,
    Allocate { len: usize, ty: Type },
    GlobalValue(&'static str),
    Subscript(Atom, Atom),
    Len(Atom),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Goto(Label),
    If {
        lhs: Atom,
        op: CmpOp,
        rhs: Atom,
        then: Label,
        or_else: Label,
    },
    Return(Atom),
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, block) in &self.blocks {
            writeln!(f, "{label}:")?;
            for s in &block.stmts {
                writeln!(f, "    {s}")?;
            }
            writeln!(f, "    {}", block.term)?;
        }
        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign(id, rhs) => write!(f, "{id} = {rhs}"),
            Stmt::SubscriptAssign(t, i, v) => write!(f, "{t}[{i}] = {v}"),
            Stmt::Print(a) => write!(f, "print({a})"),
            Stmt::InputIntEffect => write!(f, "input_int()"),
            Stmt::Collect(n) => write!(f, "collect({n})"),
        }
    }
}

impl fmt::Display for Rhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rhs::Atom(a) => write!(f, "{a}"),
            Rhs::BinOp(l, op, r) => {
                let sym = match op {
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                };
                write!(f, "{l} {sym} {r}")
            }
            Rhs::Neg(a) => write!(f, "-{a}"),
            Rhs::Not(a) => write!(f, "not {a}"),
            Rhs::Compare(l, op, r) => write!(f, "{l} {op} {r}"),
            Rhs::InputInt => write!(f, "input_int()"),
            Rhs::Allocate { len, .. } => write!(f, "allocate({len})"),
            Rhs::GlobalValue(g) => write!(f, "{g}"),
            Rhs::Subscript(t, i) => write!(f, "{t}[{i}]"),
            Rhs::Len(a) => write!(f, "len({a})"),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Goto(l) => write!(f, "goto {l}"),
            Terminator::If { lhs, op, rhs, then, or_else } => {
                write!(f, "if {lhs} {op} {rhs} then goto {then} else goto {or_else}")
            }
            Terminator::Return(a) => write!(f, "return {a}"),
        }
    }
}

/// spec.md §8 property 3: every block ends with exactly one terminator;
/// every goto target is an existing block label; `start` is a label and is
/// reachable from itself (trivially, since it's a map key) and every
/// referenced label resolves.
pub fn well_formed(prog: &Program) -> bool {
    use crate::common::label_name;
    let start = label_name(crate::common::START_LABEL);
    if !prog.blocks.contains_key(&start) {
        return false;
    }
    prog.blocks.values().all(|b| match &b.term {
        Terminator::Goto(l) => prog.blocks.contains_key(l),
        Terminator::If { then, or_else, .. } => {
            prog.blocks.contains_key(then) && prog.blocks.contains_key(or_else)
        }
        Terminator::Return(_) => true,
    })
}
