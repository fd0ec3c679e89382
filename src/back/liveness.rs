//! Liveness Analysis (spec.md §4.7): backward dataflow to a fixpoint over
//! the pseudo-x86 CFG.
//!
//! One detail spec.md leaves implicit: for read-modify-write arithmetic
//! (`addq`/`subq`/`xorq`, selected in place per spec.md §4.6), the
//! destination operand is both read and written — its prior value is a true
//! input, not an inert write-only target the way `movq`'s destination is.
//! Treating the destination of these as write-only (a literal reading of
//! "binary op reads its first operand... writes its second") would drop
//! live ranges the in-place selection patterns depend on, so it's read here
//! too. This implementation also folds the acyclic fast path into the
//! general fixpoint loop rather than special-casing reverse-topological
//! order: both compute the same least fixpoint, just with different
//! iteration counts on loop-free CFGs.

use super::x86::{Arg, Instr, Register, CALLER_SAVED};
use crate::common::{Label, Map, Set};

/// Live-after sets, one [`Set`] per instruction in program order, keyed by
/// block label.
pub struct Liveness {
    pub live_after: Map<Label, Vec<Set<super::x86::Location>>>,
}

type Loc = super::x86::Location;

fn arg_loc(a: &Arg) -> Option<Loc> {
    super::x86::arg_location(a)
}

/// `read_set(i)`: the locations instruction `i` reads.
fn read_set(i: &Instr) -> Set<Loc> {
    let mut s = Set::new();
    match i {
        Instr::Op("movq", args) | Instr::Op("movzbq", args) => {
            if let [src, _dst] = args.as_slice() {
                if let Some(l) = arg_loc(src) {
                    s.insert(l);
                }
            }
        }
        Instr::Op("negq", args) => {
            if let [x] = args.as_slice() {
                if let Some(l) = arg_loc(x) {
                    s.insert(l);
                }
            }
        }
        Instr::Op("cmpq", args) => {
            for a in args {
                if let Some(l) = arg_loc(a) {
                    s.insert(l);
                }
            }
        }
        // Read-modify-write binary ops: addq/subq/xorq/sarq read both
        // operands (the destination's prior value included).
        Instr::Op(_, args) => {
            for a in args {
                if let Some(l) = arg_loc(a) {
                    s.insert(l);
                }
            }
        }
        Instr::SetCc(_) => {}
        Instr::Callq(_, arity) => {
            for r in super::x86::ARG_REGS.iter().take(*arity) {
                s.insert(Loc::Reg(*r));
            }
        }
        Instr::Jump(_) | Instr::JumpIf(..) | Instr::Retq => {}
    }
    s
}

/// `write_set(i)`: the locations instruction `i` writes.
fn write_set(i: &Instr) -> Set<Loc> {
    let mut s = Set::new();
    match i {
        Instr::Op("cmpq", _) => {}
        Instr::Op(_, args) => {
            if let Some(dst) = args.last() {
                if let Some(l) = arg_loc(dst) {
                    s.insert(l);
                }
            }
        }
        Instr::SetCc(_) => {
            s.insert(Loc::Reg(Register::Rax));
        }
        Instr::Callq(_, _) => {
            for r in CALLER_SAVED {
                s.insert(Loc::Reg(r));
            }
        }
        Instr::Jump(_) | Instr::JumpIf(..) | Instr::Retq => {}
    }
    s
}

fn successors(instrs: &[Instr]) -> Vec<Label> {
    match instrs {
        [.., Instr::JumpIf(_, l1), Instr::Jump(l2)] => vec![*l1, *l2],
        [.., Instr::Jump(l)] => vec![*l],
        _ => vec![],
    }
}

pub fn analyze(prog: &super::x86::Program) -> Liveness {
    let mut live_before: Map<Label, Set<Loc>> =
        prog.blocks.keys().map(|l| (*l, Set::new())).collect();
    let mut live_after: Map<Label, Vec<Set<Loc>>> = Map::new();

    loop {
        let mut changed = false;
        for (label, instrs) in &prog.blocks {
            let succs = successors(instrs);
            let mut cur: Set<Loc> = Set::new();
            for s in &succs {
                if let Some(lb) = live_before.get(s) {
                    cur.extend(lb.iter().cloned());
                }
            }

            let mut afters = vec![Set::new(); instrs.len()];
            for (idx, instr) in instrs.iter().enumerate().rev() {
                afters[idx] = cur.clone();
                let w = write_set(instr);
                let r = read_set(instr);
                for l in &w {
                    cur.remove(l);
                }
                cur.extend(r);
            }

            if live_before.get(label) != Some(&cur) {
                changed = true;
                live_before.insert(*label, cur);
            }
            live_after.insert(*label, afters);
        }
        if !changed {
            break;
        }
    }

    Liveness { live_after }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::back::x86::{Arg, Program, Register};
    use crate::common::label_name;

    #[test]
    fn in_place_add_keeps_destination_live_before() {
        // x = 1; x = x + 1; print x   -- x must be live across the addq.
        let label = label_name("start");
        let instrs = vec![
            Instr::Op("movq", vec![Arg::Imm(1), Arg::Var(intern("x"))]),
            Instr::Op("addq", vec![Arg::Imm(1), Arg::Var(intern("x"))]),
            Instr::Op("movq", vec![Arg::Var(intern("x")), Arg::Reg(Register::Rdi)]),
            Instr::Callq("print_int", 1),
            Instr::Jump(label_name("conclusion")),
        ];
        let mut blocks = Map::new();
        blocks.insert(label, instrs);
        let prog = Program { blocks, stack_space: 0, used_callee: vec![] };
        let live = analyze(&prog);
        let afters = &live.live_after[&label];
        // live-after the movq (index 0) must include x, since addq reads it.
        assert!(afters[0].contains(&Loc::Var(intern("x"))));
    }

    fn intern(s: &str) -> crate::common::Id {
        internment::Intern::new(s.to_string())
    }
}
