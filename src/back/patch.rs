//! Instruction Patching (spec.md §4.10): eliminate two-memory-operand
//! instructions, oversized immediates coexisting with a memory operand, and
//! `cmpq`'s immediate-second-operand constraint; then drop identity moves.

use super::x86::{Arg, Instr, Program, Register};
use crate::common::Map;

const IMM_LIMIT: i64 = 1 << 16;

fn is_deref(a: &Arg) -> bool {
    matches!(a, Arg::Deref(..))
}

fn is_oversized_imm(a: &Arg) -> bool {
    matches!(a, Arg::Imm(n) if n.abs() > IMM_LIMIT)
}

/// Apply the legality rewrites to one instruction, in priority order
/// (first match wins).
fn patch_one(i: Instr, out: &mut Vec<Instr>) {
    match i {
        Instr::Op(op, args) if args.len() == 2 && is_deref(&args[0]) && is_deref(&args[1]) => {
            out.push(Instr::Op("movq", vec![args[0].clone(), Arg::Reg(Register::Rax)]));
            out.push(Instr::Op(op, vec![Arg::Reg(Register::Rax), args[1].clone()]));
        }
        Instr::Op(op, args)
            if args.len() == 2 && is_oversized_imm(&args[0]) && is_deref(&args[1]) =>
        {
            out.push(Instr::Op("movq", vec![args[0].clone(), Arg::Reg(Register::Rax)]));
            out.push(Instr::Op(op, vec![Arg::Reg(Register::Rax), args[1].clone()]));
        }
        Instr::Op(op, args)
            if args.len() == 2 && is_deref(&args[0]) && is_oversized_imm(&args[1]) =>
        {
            out.push(Instr::Op("movq", vec![args[1].clone(), Arg::Reg(Register::Rax)]));
            out.push(Instr::Op(op, vec![args[0].clone(), Arg::Reg(Register::Rax)]));
        }
        Instr::Op("cmpq", args) if args.len() == 2 && matches!(args[1], Arg::Imm(_)) => {
            out.push(Instr::Op("movq", vec![args[1].clone(), Arg::Reg(Register::Rax)]));
            out.push(Instr::Op("cmpq", vec![args[0].clone(), Arg::Reg(Register::Rax)]));
        }
        other => out.push(other),
    }
}

fn is_identity_movq(i: &Instr) -> bool {
    matches!(i, Instr::Op("movq", args) if args.len() == 2 && args[0] == args[1])
}

pub fn patch_program(prog: Program) -> Program {
    let mut blocks = Map::new();
    for (label, instrs) in prog.blocks {
        let mut patched = Vec::new();
        for i in instrs {
            patch_one(i, &mut patched);
        }
        patched.retain(|i| !is_identity_movq(i));
        blocks.insert(label, patched);
    }
    Program { blocks, stack_space: prog.stack_space, used_callee: prog.used_callee }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_deref_operands_route_through_rax() {
        let mut out = Vec::new();
        patch_one(
            Instr::Op("movq", vec![Arg::Deref(Register::Rbp, -8), Arg::Deref(Register::Rbp, -16)]),
            &mut out,
        );
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], Instr::Op("movq", a) if a[1] == Arg::Reg(Register::Rax)));
        assert!(matches!(&out[1], Instr::Op("movq", a) if a[0] == Arg::Reg(Register::Rax)));
    }

    #[test]
    fn cmpq_with_immediate_second_operand_is_rewritten() {
        let mut out = Vec::new();
        patch_one(Instr::Op("cmpq", vec![Arg::Reg(Register::Rbx), Arg::Imm(5)]), &mut out);
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[1], Instr::Op("cmpq", a) if !matches!(a[1], Arg::Imm(_))));
    }

    #[test]
    fn identity_movq_is_dropped() {
        assert!(is_identity_movq(&Instr::Op("movq", vec![Arg::Reg(Register::Rax), Arg::Reg(Register::Rax)])));
        assert!(!is_identity_movq(&Instr::Op("movq", vec![Arg::Reg(Register::Rax), Arg::Reg(Register::Rbx)])));
    }
}
