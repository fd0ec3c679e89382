//! Register Allocation via DSATUR saturation-ordered greedy coloring
//! (spec.md §4.9).

use super::bimap::color_to_register;
use super::graph::UndirectedAdjList;
use super::pqueue::SaturationQueue;
use super::x86::{Arg, Instr, Location, Program, Register};
use crate::common::{Id, Map};
use crate::error::Result;

/// All sixteen registers the allocator precolors (reserved + allocatable),
/// so that a variable live across a hard-coded register use is never
/// assigned that same register.
const ALL_REGISTERS: [Register; 16] = [
    Register::Rax,
    Register::Rsp,
    Register::Rbp,
    Register::R11,
    Register::R15,
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

fn distinct_colored_neighbor_colors(
    v: &Location,
    g: &UndirectedAdjList<Location>,
    colors: &Map<Location, i64>,
) -> crate::common::Set<i64> {
    g.neighbors(v).iter().filter_map(|n| colors.get(n).copied()).collect()
}

/// Color every variable vertex in `g`; physical registers are pre-colored.
/// Variables not seen in `var_order` (e.g. unreachable dead code) are
/// colored last, in encounter order from the graph's own key order.
fn color_graph(g: &UndirectedAdjList<Location>, var_order: &[Id]) -> Map<Location, i64> {
    let mut colors: Map<Location, i64> = Map::new();
    for r in ALL_REGISTERS {
        colors.insert(Location::Reg(r), r.precolor());
    }

    let mut queue: SaturationQueue<Location> = SaturationQueue::new();
    for id in var_order {
        if g.contains(&Location::Var(*id)) {
            queue.push(Location::Var(*id));
        }
    }
    // Any variable vertex the order list missed (shouldn't normally happen
    // since var_order is built from the same program) still gets colored.
    for v in g.vertices() {
        if matches!(v, Location::Var(_)) {
            queue.push(*v);
        }
    }

    while let Some(v) = queue.pop_max() {
        let used: crate::common::Set<i64> =
            g.neighbors(&v).iter().filter_map(|n| colors.get(n).copied()).collect();
        let mut color = 0i64;
        while used.contains(&color) {
            color += 1;
        }
        colors.insert(v, color);
        for n in g.neighbors(&v) {
            if let Location::Var(_) = n {
                let sat = distinct_colored_neighbor_colors(&n, g, &colors).len();
                queue.bump(&n, sat);
            }
        }
    }

    colors
}

fn rewrite_arg(a: &Arg, colors: &Map<Location, i64>) -> Arg {
    match a {
        Arg::Var(id) => {
            let color = colors[&Location::Var(*id)];
            if color < 11 {
                Arg::Reg(color_to_register(color).expect("color < 11 maps to an allocatable register"))
            } else {
                Arg::Deref(Register::Rbp, -8 * (color - 10))
            }
        }
        other => other.clone(),
    }
}

fn rewrite_instr(i: Instr, colors: &Map<Location, i64>) -> Instr {
    match i {
        Instr::Op(op, args) => Instr::Op(op, args.iter().map(|a| rewrite_arg(a, colors)).collect()),
        other => other,
    }
}

fn writes_register(i: &Instr, r: Register) -> bool {
    match i {
        Instr::Op(_, args) => matches!(args.last(), Some(Arg::Reg(x)) if *x == r),
        Instr::SetCc(_) => r == Register::Rax,
        Instr::Callq(..) => super::x86::CALLER_SAVED.contains(&r),
        Instr::Jump(_) | Instr::JumpIf(..) | Instr::Retq => false,
    }
}

/// Collect program variables in first-encounter order (deterministic given
/// the `BTreeMap<Label, _>` block order and in-block instruction order).
fn variable_order(prog: &Program) -> Vec<Id> {
    let mut seen = crate::common::Set::new();
    let mut order = Vec::new();
    for instrs in prog.blocks.values() {
        for i in instrs {
            if let Instr::Op(_, args) = i {
                for a in args {
                    if let Arg::Var(id) = a {
                        if seen.insert(*id) {
                            order.push(*id);
                        }
                    }
                }
            }
        }
    }
    order
}

pub fn allocate(
    prog: Program,
    interference: &UndirectedAdjList<Location>,
) -> Result<Program> {
    let var_order = variable_order(&prog);
    let colors = color_graph(interference, &var_order);

    let spilled = var_order.iter().filter(|id| colors[&Location::Var(**id)] >= 11).count();

    let mut blocks = Map::new();
    for (label, instrs) in prog.blocks {
        blocks.insert(label, instrs.into_iter().map(|i| rewrite_instr(i, &colors)).collect());
    }

    let used_callee: Vec<Register> = Register::ALLOCATABLE
        .iter()
        .chain(std::iter::once(&Register::R15))
        .filter(|r| r.is_callee_saved())
        .filter(|r| blocks.values().any(|instrs| instrs.iter().any(|i| writes_register(i, **r))))
        .copied()
        .collect();

    let stack_space = 8 * (spilled as i64 + used_callee.len() as i64);

    Ok(Program { blocks, stack_space, used_callee })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_variable_survives_allocation() {
        let mut g: UndirectedAdjList<Location> = UndirectedAdjList::new();
        let x = internment::Intern::new("x".to_string());
        let y = internment::Intern::new("y".to_string());
        g.add_edge(Location::Var(x), Location::Var(y));
        let colors = color_graph(&g, &[x, y]);
        assert_ne!(colors[&Location::Var(x)], colors[&Location::Var(y)]);
    }

    #[test]
    fn interfering_variables_get_different_colors() {
        let mut g: UndirectedAdjList<Location> = UndirectedAdjList::new();
        let vars: Vec<Id> = (0..13)
            .map(|i| internment::Intern::new(format!("v{i}")))
            .collect();
        for i in 0..vars.len() {
            for j in (i + 1)..vars.len() {
                g.add_edge(Location::Var(vars[i]), Location::Var(vars[j]));
            }
        }
        let colors = color_graph(&g, &vars);
        let mut seen = std::collections::HashSet::new();
        for v in &vars {
            assert!(seen.insert(colors[&Location::Var(*v)]));
        }
        // 13 mutually interfering variables: at least two must spill
        // (colors >= 11) since only 11 registers are allocatable.
        assert!(vars.iter().filter(|v| colors[&Location::Var(**v)] >= 11).count() >= 2);
    }
}
