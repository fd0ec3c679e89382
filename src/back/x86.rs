//! Pseudo- and real-x86-64 IR (spec.md §3, §4.6-§4.11).
//!
//! A program is always the post-explicate, block-mapped form here: this
//! pipeline explicates control before selecting instructions, so the
//! "single instruction list" shape spec.md §3 allows for an early,
//! pre-explicate pipeline stage never arises (noted in DESIGN.md).
//! `Arg::Var` survives until [`crate::back::regalloc`] runs; after that no
//! variable remains anywhere in the program (spec.md §3's post-allocate
//! invariant).

use crate::common::{Id, Label, Map};
use crate::front::ast::CmpOp;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Register {
    // Reserved, fixed negative colors (spec.md §3).
    Rax,
    Rsp,
    Rbp,
    R11,
    R15,
    // Allocatable, in the fixed order that fills colors 0..10.
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    R8,
    R9,
    R10,
    Rbx,
    R12,
    R13,
    R14,
}

impl Register {
    /// The eleven allocatable registers in the fixed order spec.md §3 lists;
    /// index into this array is the register's color.
    pub const ALLOCATABLE: [Register; 11] = [
        Register::Rcx,
        Register::Rdx,
        Register::Rsi,
        Register::Rdi,
        Register::R8,
        Register::R9,
        Register::R10,
        Register::Rbx,
        Register::R12,
        Register::R13,
        Register::R14,
    ];

    /// The register's fixed pre-color, or `None` if it is not one of the
    /// reserved/allocatable registers the allocator knows about.
    pub fn precolor(self) -> i64 {
        match self {
            Register::Rax => -1,
            Register::Rsp => -2,
            Register::Rbp => -3,
            Register::R11 => -4,
            Register::R15 => -5,
            other => Self::ALLOCATABLE
                .iter()
                .position(|&r| r == other)
                .expect("every non-reserved Register is in ALLOCATABLE") as i64,
        }
    }

    pub fn is_callee_saved(self) -> bool {
        matches!(
            self,
            Register::Rbx | Register::R12 | Register::R13 | Register::R14 | Register::R15
        )
    }

    pub fn is_caller_saved(self) -> bool {
        matches!(
            self,
            Register::Rax
                | Register::Rcx
                | Register::Rdx
                | Register::Rsi
                | Register::Rdi
                | Register::R8
                | Register::R9
                | Register::R10
                | Register::R11
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Rax => "rax",
            Register::Rsp => "rsp",
            Register::Rbp => "rbp",
            Register::R11 => "r11",
            Register::R15 => "r15",
            Register::Rcx => "rcx",
            Register::Rdx => "rdx",
            Register::Rsi => "rsi",
            Register::Rdi => "rdi",
            Register::R8 => "r8",
            Register::R9 => "r9",
            Register::R10 => "r10",
            Register::Rbx => "rbx",
            Register::R12 => "r12",
            Register::R13 => "r13",
            Register::R14 => "r14",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.name())
    }
}

/// The calling convention's first-argument register, used for `arity <= 1`
/// calls (spec.md §4.7: "the core supports arity≤1, so `{rdi}` suffices").
pub const ARG_REGS: [Register; 1] = [Register::Rdi];

pub const CALLER_SAVED: [Register; 9] = [
    Register::Rax,
    Register::Rcx,
    Register::Rdx,
    Register::Rsi,
    Register::Rdi,
    Register::R8,
    Register::R9,
    Register::R10,
    Register::R11,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Imm(i64),
    Reg(Register),
    Deref(Register, i64),
    Var(Id),
    /// A reference to a runtime global (`free_ptr`, `fromspace_end`),
    /// rendered as RIP-relative per the platform assembler's convention.
    Global(&'static str),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Imm(n) => write!(f, "${n}"),
            Arg::Reg(r) => write!(f, "{r}"),
            Arg::Deref(r, off) => write!(f, "{off}({r})"),
            Arg::Var(id) => write!(f, "{id}"),
            Arg::Global(g) => write!(f, "{g}(%rip)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cc {
    E,
    L,
    Le,
    G,
    Ge,
}

impl From<CmpOp> for Cc {
    fn from(op: CmpOp) -> Cc {
        match op {
            CmpOp::Eq => Cc::E,
            CmpOp::Lt => Cc::L,
            CmpOp::Le => Cc::Le,
            CmpOp::Gt => Cc::G,
            CmpOp::Ge => Cc::Ge,
        }
    }
}

impl fmt::Display for Cc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cc::E => "e",
            Cc::L => "l",
            Cc::Le => "le",
            Cc::G => "g",
            Cc::Ge => "ge",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub enum Instr {
    /// A plain opcode with its AT&T-order argument list, e.g.
    /// `Op("addq", [a, x])` renders as `addq a, x`.
    Op(&'static str, Vec<Arg>),
    /// `set<cc> %al`. Modeled as reading/writing `%rax` for liveness and
    /// interference purposes, since sub-registers aren't modeled separately.
    SetCc(Cc),
    Callq(&'static str, usize),
    Jump(Label),
    JumpIf(Cc, Label),
    Retq,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Op(op, args) => {
                let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{op} {}", rendered.join(", "))
            }
            Instr::SetCc(cc) => write!(f, "set{cc} %al"),
            Instr::Callq(sym, _) => write!(f, "callq {sym}"),
            Instr::Jump(l) => write!(f, "jmp {l}"),
            Instr::JumpIf(cc, l) => write!(f, "j{cc} {l}"),
            Instr::Retq => write!(f, "retq"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub blocks: Map<Label, Vec<Instr>>,
    /// Bytes used for spills, not yet 16-aligned (spec.md §3).
    pub stack_space: i64,
    /// Callee-saved registers actually written, in allocation order.
    pub used_callee: Vec<Register>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, instrs) in &self.blocks {
            writeln!(f, "{label}:")?;
            for i in instrs {
                writeln!(f, "    {i}")?;
            }
        }
        Ok(())
    }
}

/// A location liveness and interference track: a variable or a physical
/// register. Compared by value, never by identity (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    Reg(Register),
    Var(Id),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Reg(r) => write!(f, "{r}"),
            Location::Var(id) => write!(f, "{id}"),
        }
    }
}

pub fn arg_location(a: &Arg) -> Option<Location> {
    match a {
        Arg::Reg(r) => Some(Location::Reg(*r)),
        Arg::Var(id) => Some(Location::Var(*id)),
        Arg::Imm(_) | Arg::Deref(..) | Arg::Global(_) => None,
    }
}
