//! Instruction Selection (spec.md §4.6): pattern-directed lowering of the
//! CFG IR into pseudo-x86, including the in-place `x = x + a` / `x = x − a`
//! patterns and the condition-code table.
//!
//! Grounded on `SelectInstrPass.select_stmt` in
//! `examples/original_source/src/iup/compiler/compiler.py` for the scalar
//! core (its `match` arms cover exactly spec.md §4.6's table: in-place
//! add/sub, unary neg/not, compare-and-setcc, `print`/`input_int`, the
//! tail forms). Tuple operations (`allocate`, `subscript`, `len`) are not
//! in spec.md §4.6's table and have no counterpart in `compiler.py` either
//! — that file never mentions a tuple, a subscript, or a scratch register.
//! They're a direct extension of the data model in spec.md §3, original
//! work: routing indexed addressing through the reserved, never-allocated
//! scratch register `%r11` is the only way to address through a tuple
//! pointer before register allocation has run, since an x86 `Deref` can
//! only name a register, never a variable.

use super::x86::{Arg, Cc, Instr, Program, Register};
use crate::common::{label_name, Label, Map, CONCLUSION_LABEL};
use crate::error::{CompileError, Result};
use crate::front::ast::BinOp;
use crate::middle::cir;

/// Byte offset of element `i` within a tuple, skipping the one-word tag.
fn tuple_offset(i: i64) -> i64 {
    8 * (i + 1)
}

fn select_atom(a: &cir::Atom) -> Arg {
    match a {
        cir::Atom::Int(n) => Arg::Imm(*n),
        cir::Atom::Bool(b) => Arg::Imm(if *b { 1 } else { 0 }),
        cir::Atom::Var(id) => Arg::Var(*id),
    }
}

fn is_var(a: &cir::Atom, x: crate::common::Id) -> bool {
    matches!(a, cir::Atom::Var(id) if *id == x)
}

fn select_assign(x: crate::common::Id, rhs: cir::Rhs, out: &mut Vec<Instr>) -> Result<()> {
    let dst = Arg::Var(x);
    match rhs {
        cir::Rhs::Atom(a) => out.push(Instr::Op("movq", vec![select_atom(&a), dst])),
        cir::Rhs::BinOp(lhs, BinOp::Add, rhs) => {
            if is_var(&lhs, x) {
                out.push(Instr::Op("addq", vec![select_atom(&rhs), dst]));
            } else if is_var(&rhs, x) {
                out.push(Instr::Op("addq", vec![select_atom(&lhs), dst]));
            } else {
                out.push(Instr::Op("movq", vec![select_atom(&rhs), dst.clone()]));
                out.push(Instr::Op("addq", vec![select_atom(&lhs), dst]));
            }
        }
        cir::Rhs::BinOp(lhs, BinOp::Sub, rhs) => {
            if is_var(&lhs, x) {
                out.push(Instr::Op("subq", vec![select_atom(&rhs), dst]));
            } else {
                out.push(Instr::Op("movq", vec![select_atom(&lhs), dst.clone()]));
                out.push(Instr::Op("subq", vec![select_atom(&rhs), dst]));
            }
        }
        cir::Rhs::Neg(a) => {
            out.push(Instr::Op("movq", vec![select_atom(&a), dst.clone()]));
            out.push(Instr::Op("negq", vec![dst]));
        }
        cir::Rhs::Not(a) => {
            if is_var(&a, x) {
                out.push(Instr::Op("xorq", vec![Arg::Imm(1), dst]));
            } else {
                out.push(Instr::Op("movq", vec![select_atom(&a), dst.clone()]));
                out.push(Instr::Op("xorq", vec![Arg::Imm(1), dst]));
            }
        }
        cir::Rhs::Compare(lhs, op, rhs) => {
            out.push(Instr::Op("cmpq", vec![select_atom(&rhs), select_atom(&lhs)]));
            out.push(Instr::SetCc(op.into()));
            out.push(Instr::Op("movzbq", vec![Arg::Reg(Register::Rax), dst]));
        }
        cir::Rhs::InputInt => {
            out.push(Instr::Callq("read_int", 0));
            out.push(Instr::Op("movq", vec![Arg::Reg(Register::Rax), dst]));
        }
        cir::Rhs::Allocate { len, .. } => {
            let bytes = 8 * (len as i64 + 1);
            out.push(Instr::Op("movq", vec![Arg::Global("free_ptr"), dst.clone()]));
            out.push(Instr::Op(
                "addq",
                vec![Arg::Imm(bytes), Arg::Global("free_ptr")],
            ));
            out.push(Instr::Op("movq", vec![dst, Arg::Reg(Register::R11)]));
            let tag = (len as i64) << 1 | 1;
            out.push(Instr::Op(
                "movq",
                vec![Arg::Imm(tag), Arg::Deref(Register::R11, 0)],
            ));
        }
        cir::Rhs::GlobalValue(g) => out.push(Instr::Op("movq", vec![Arg::Global(g), dst])),
        cir::Rhs::Subscript(tup, idx) => {
            let off = match idx {
                cir::Atom::Int(n) => tuple_offset(n),
                other => {
                    return Err(CompileError::Unsupported {
                        pass: "select_instructions",
                        detail: format!("non-constant tuple index: {other:?}"),
                    })
                }
            };
            out.push(Instr::Op(
                "movq",
                vec![select_atom(&tup), Arg::Reg(Register::R11)],
            ));
            out.push(Instr::Op(
                "movq",
                vec![Arg::Deref(Register::R11, off), dst],
            ));
        }
        cir::Rhs::Len(tup) => {
            out.push(Instr::Op(
                "movq",
                vec![select_atom(&tup), Arg::Reg(Register::R11)],
            ));
            out.push(Instr::Op(
                "movq",
                vec![Arg::Deref(Register::R11, 0), dst.clone()],
            ));
            out.push(Instr::Op("sarq", vec![Arg::Imm(1), dst]));
        }
    }
    Ok(())
}

fn select_stmt(s: cir::Stmt, out: &mut Vec<Instr>) -> Result<()> {
    match s {
        cir::Stmt::Assign(x, rhs) => select_assign(x, rhs, out),
        cir::Stmt::SubscriptAssign(tup, idx, value) => {
            let off = match idx {
                cir::Atom::Int(n) => tuple_offset(n),
                other => {
                    return Err(CompileError::Unsupported {
                        pass: "select_instructions",
                        detail: format!("non-constant tuple index: {other:?}"),
                    })
                }
            };
            out.push(Instr::Op(
                "movq",
                vec![select_atom(&tup), Arg::Reg(Register::R11)],
            ));
            out.push(Instr::Op(
                "movq",
                vec![select_atom(&value), Arg::Deref(Register::R11, off)],
            ));
            Ok(())
        }
        cir::Stmt::Print(a) => {
            out.push(Instr::Op("movq", vec![select_atom(&a), Arg::Reg(Register::Rdi)]));
            out.push(Instr::Callq("print_int", 1));
            Ok(())
        }
        cir::Stmt::InputIntEffect => {
            out.push(Instr::Callq("read_int", 0));
            Ok(())
        }
        cir::Stmt::Collect(n) => {
            out.push(Instr::Op("movq", vec![Arg::Imm(n), Arg::Reg(Register::Rdi)]));
            out.push(Instr::Callq("collect", 1));
            Ok(())
        }
    }
}

fn select_term(t: cir::Terminator, out: &mut Vec<Instr>) {
    match t {
        cir::Terminator::Goto(l) => out.push(Instr::Jump(l)),
        cir::Terminator::If { lhs, op, rhs, then, or_else } => {
            out.push(Instr::Op("cmpq", vec![select_atom(&rhs), select_atom(&lhs)]));
            out.push(Instr::JumpIf(op.into(), then));
            out.push(Instr::Jump(or_else));
        }
        cir::Terminator::Return(a) => {
            out.push(Instr::Op("movq", vec![select_atom(&a), Arg::Reg(Register::Rax)]));
            out.push(Instr::Jump(label_name(CONCLUSION_LABEL)));
        }
    }
}

pub fn select_program(prog: cir::Program) -> Result<Program> {
    let mut blocks: Map<Label, Vec<Instr>> = Map::new();
    for (label, block) in prog.blocks {
        let mut instrs = Vec::new();
        for s in block.stmts {
            select_stmt(s, &mut instrs)?;
        }
        select_term(block.term, &mut instrs);
        blocks.insert(label, instrs);
    }
    Ok(Program { blocks, stack_space: 0, used_callee: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::NameGen;

    #[test]
    fn in_place_add_uses_addq_not_movq() {
        let mut gen = NameGen::new();
        let x = gen.fresh("_t");
        let mut out = Vec::new();
        select_assign(
            x,
            cir::Rhs::BinOp(cir::Atom::Var(x), BinOp::Add, cir::Atom::Int(1)),
            &mut out,
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Instr::Op("addq", _)));
    }

    #[test]
    fn general_add_moves_then_adds() {
        let mut gen = NameGen::new();
        let x = gen.fresh("_t");
        let mut out = Vec::new();
        select_assign(
            x,
            cir::Rhs::BinOp(cir::Atom::Int(1), BinOp::Add, cir::Atom::Int(2)),
            &mut out,
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], Instr::Op("movq", _)));
        assert!(matches!(&out[1], Instr::Op("addq", _)));
    }

    #[test]
    fn compare_lowers_to_cmp_setcc_movzbq() {
        let mut gen = NameGen::new();
        let x = gen.fresh("_t");
        let mut out = Vec::new();
        select_assign(
            x,
            cir::Rhs::Compare(cir::Atom::Int(1), crate::front::ast::CmpOp::Lt, cir::Atom::Int(2)),
            &mut out,
        )
        .unwrap();
        assert_eq!(out.len(), 3);
        assert!(matches!(&out[0], Instr::Op("cmpq", _)));
        assert!(matches!(&out[1], Instr::SetCc(Cc::L)));
        assert!(matches!(&out[2], Instr::Op("movzbq", _)));
    }

    #[test]
    fn return_moves_into_rax_then_jumps_conclusion() {
        let mut out = Vec::new();
        select_term(cir::Terminator::Return(cir::Atom::Int(0)), &mut out);
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[1], Instr::Jump(_)));
    }
}
