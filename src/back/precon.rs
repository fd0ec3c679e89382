//! Prelude & Conclusion synthesis (spec.md §4.11): frame setup honoring
//! callee-saved registers and 16-byte stack alignment.

use super::x86::{Arg, Instr, Program, Register};
use crate::common::{align, label_name, CONCLUSION_LABEL, MAIN_LABEL, START_LABEL};

pub fn add_prelude_and_conclusion(mut prog: Program) -> Program {
    let s = align(prog.stack_space, 16) - 8 * prog.used_callee.len() as i64;

    let mut main = vec![
        Instr::Op("pushq", vec![Arg::Reg(Register::Rbp)]),
        Instr::Op("movq", vec![Arg::Reg(Register::Rsp), Arg::Reg(Register::Rbp)]),
    ];
    for r in &prog.used_callee {
        main.push(Instr::Op("pushq", vec![Arg::Reg(*r)]));
    }
    if s > 0 {
        main.push(Instr::Op("subq", vec![Arg::Imm(s), Arg::Reg(Register::Rsp)]));
    }
    main.push(Instr::Jump(label_name(START_LABEL)));

    let mut conclusion = Vec::new();
    if s > 0 {
        conclusion.push(Instr::Op("addq", vec![Arg::Imm(s), Arg::Reg(Register::Rsp)]));
    }
    for r in prog.used_callee.iter().rev() {
        conclusion.push(Instr::Op("popq", vec![Arg::Reg(*r)]));
    }
    conclusion.push(Instr::Op("popq", vec![Arg::Reg(Register::Rbp)]));
    conclusion.push(Instr::Retq);

    prog.blocks.insert(label_name(MAIN_LABEL), main);
    prog.blocks.insert(label_name(CONCLUSION_LABEL), conclusion);
    prog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Map;

    #[test]
    fn frame_push_pop_counts_balance() {
        let prog = Program {
            blocks: Map::new(),
            stack_space: 24,
            used_callee: vec![Register::Rbx, Register::R12],
        };
        let prog = add_prelude_and_conclusion(prog);
        let main = &prog.blocks[&label_name(MAIN_LABEL)];
        let conclusion = &prog.blocks[&label_name(CONCLUSION_LABEL)];
        let pushes = main.iter().filter(|i| matches!(i, Instr::Op("pushq", _))).count();
        let pops = conclusion.iter().filter(|i| matches!(i, Instr::Op("popq", _))).count();
        assert_eq!(pushes, pops);
    }

    #[test]
    fn no_subq_addq_when_stack_space_and_callee_cancel_out() {
        let prog = Program { blocks: Map::new(), stack_space: 0, used_callee: vec![] };
        let prog = add_prelude_and_conclusion(prog);
        let main = &prog.blocks[&label_name(MAIN_LABEL)];
        assert!(!main.iter().any(|i| matches!(i, Instr::Op("subq", _))));
    }
}
