//! Interference Graph Construction (spec.md §4.8), including the `movq`/
//! `movzbq` exemption rule that enables later move coalescing.

use super::graph::UndirectedAdjList;
use super::liveness::Liveness;
use super::x86::{arg_location, Arg, Instr, Location};

fn write_set_args(i: &Instr) -> Vec<Location> {
    match i {
        Instr::Op("cmpq", _) => vec![],
        Instr::Op(_, args) => args.last().and_then(arg_location).into_iter().collect(),
        Instr::SetCc(_) => vec![Location::Reg(super::x86::Register::Rax)],
        Instr::Callq(..) => super::x86::CALLER_SAVED.iter().map(|r| Location::Reg(*r)).collect(),
        Instr::Jump(_) | Instr::JumpIf(..) | Instr::Retq => vec![],
    }
}

fn is_move(i: &Instr) -> Option<(Arg, Arg)> {
    match i {
        Instr::Op("movq", args) | Instr::Op("movzbq", args) => {
            if let [s, d] = args.as_slice() {
                Some((s.clone(), d.clone()))
            } else {
                None
            }
        }
        _ => None,
    }
}

pub fn build(prog: &super::x86::Program, liveness: &Liveness) -> UndirectedAdjList<Location> {
    let mut g = UndirectedAdjList::new();

    for (label, instrs) in &prog.blocks {
        let afters = &liveness.live_after[label];
        for (idx, instr) in instrs.iter().enumerate() {
            let live = &afters[idx];
            if let Some((s, d)) = is_move(instr) {
                let (s_loc, d_loc) = (arg_location(&s), arg_location(&d));
                if let Some(d_loc) = d_loc {
                    g.add_vertex(d_loc);
                    for l in live {
                        if Some(*l) == s_loc || *l == d_loc {
                            continue;
                        }
                        g.add_edge(d_loc, *l);
                    }
                }
            } else {
                for w in write_set_args(instr) {
                    g.add_vertex(w);
                    for l in live {
                        if *l == w {
                            continue;
                        }
                        g.add_edge(w, *l);
                    }
                }
            }
        }
    }

    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::back::liveness;
    use crate::back::x86::{Program, Register};
    use crate::common::{label_name, Map};

    fn id(s: &str) -> crate::common::Id {
        internment::Intern::new(s.to_string())
    }

    #[test]
    fn move_source_does_not_interfere_with_destination() {
        let label = label_name("start");
        let instrs = vec![
            Instr::Op("movq", vec![Arg::Var(id("a")), Arg::Var(id("b"))]),
            Instr::Op("movq", vec![Arg::Var(id("b")), Arg::Reg(Register::Rdi)]),
            Instr::Callq("print_int", 1),
            Instr::Jump(label_name("conclusion")),
        ];
        let mut blocks = Map::new();
        blocks.insert(label, instrs);
        let prog = Program { blocks, stack_space: 0, used_callee: vec![] };
        let live = liveness::analyze(&prog);
        let g = build(&prog, &live);
        // a and b coexist in the live-after set of the first movq, but the
        // exemption rule means they must not interfere.
        assert!(!g.neighbors(&Location::Var(id("b"))).contains(&Location::Var(id("a"))));
    }
}
