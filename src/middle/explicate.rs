//! Explicate Control (spec.md §4.5): translate structured `if`/`while`/
//! `if`-expressions into a labeled basic-block CFG with explicit gotos,
//! tail returns, and short-circuited predicates.
//!
//! Grounded on `ExplicateControlPass` in
//! `examples/original_source/src/iup/compiler/compiler.py`, whose three
//! mutually recursive continuations (`explicate_effect`,
//! `explicate_assign`, `explicate_pred`) drive the translation backward
//! over statements. That implementation represents a "continuation" as a
//! bare `list[ast.stmt]` that may end in a control node (`Goto`/`If`/
//! `Return`); here a continuation is the strongly-typed equivalent: the
//! straight-line statements already accumulated plus the terminator they
//! fall into — which is exactly a [`crate::middle::cir::Block`] without
//! its label.
//!
//! One deliberate departure from the Python source: its `while`-loop case
//! relies on mutating a statement list already stored in the block map (so
//! that later appending to it updates the stored block in place — a literal
//! shared-mutable-list alias, impossible to express as a closed sum type
//! per spec.md §9's Design Notes). spec.md §4.5 itself describes the
//! simpler, non-aliased form ("a fresh `loop_head` label is reserved before
//! emitting the body so the body can `goto loop_head`"), which is what is
//! implemented below: a dedicated header block tested once per iteration,
//! with the loop body ending in an explicit back-edge to that header.

use super::cir::{Atom, Block, Program, Rhs, Stmt, Terminator};
use crate::common::{label_name, Label, Map, NameGen, START_LABEL};
use crate::error::{CompileError, Result};
use crate::front::ast as ast;

/// The straight-line statements gathered so far, plus the terminator they
/// currently fall into.
type Cont = (Vec<Stmt>, Terminator);

fn atom(e: &ast::Expr) -> Result<Atom> {
    match e {
        ast::Expr::Var(id) => Ok(Atom::Var(*id)),
        ast::Expr::Int(n) => Ok(Atom::Int(*n)),
        ast::Expr::Bool(b) => Ok(Atom::Bool(*b)),
        _ => Err(CompileError::MalformedIr {
            pass: "explicate_control",
            shape: format!("expected an atomic operand, found {e:?}"),
        }),
    }
}

fn to_rhs(e: &ast::Expr) -> Result<Rhs> {
    match e {
        ast::Expr::Var(_) | ast::Expr::Int(_) | ast::Expr::Bool(_) => Ok(Rhs::Atom(atom(e)?)),
        ast::Expr::BinOp { op, lhs, rhs } => Ok(Rhs::BinOp(atom(lhs)?, *op, atom(rhs)?)),
        ast::Expr::Neg(v) => Ok(Rhs::Neg(atom(v)?)),
        ast::Expr::Not(v) => Ok(Rhs::Not(atom(v)?)),
        ast::Expr::Compare { op, lhs, rhs } => Ok(Rhs::Compare(atom(lhs)?, *op, atom(rhs)?)),
        ast::Expr::InputInt => Ok(Rhs::InputInt),
        ast::Expr::Allocate { len, ty } => Ok(Rhs::Allocate { len: *len, ty: ty.clone() }),
        ast::Expr::GlobalValue(g) => Ok(Rhs::GlobalValue(g)),
        ast::Expr::Subscript(t, i) => Ok(Rhs::Subscript(atom(t)?, atom(i)?)),
        ast::Expr::Len(t) => Ok(Rhs::Len(atom(t)?)),
        other => Err(CompileError::MalformedIr {
            pass: "explicate_control",
            shape: format!("not an allowed assignment RHS after RCO: {other:?}"),
        }),
    }
}

struct Ctx<'a> {
    blocks: &'a mut Map<Label, Block>,
    gen: &'a mut NameGen,
}

/// Intern `stmts`/`term` as a new block, unless `stmts` is empty and `term`
/// is already a bare `goto` — in which case no new block is minted and the
/// existing goto is returned unchanged (spec.md §4.5's `create_block`).
fn create_block(cont: Cont, ctx: &mut Ctx) -> Terminator {
    let (stmts, term) = cont;
    if stmts.is_empty() {
        if let Terminator::Goto(_) = &term {
            return term;
        }
    }
    let label = ctx.gen.fresh_label("block");
    ctx.blocks.insert(label, Block { stmts, term });
    Terminator::Goto(label)
}

fn label_of(term: &Terminator) -> Label {
    match term {
        Terminator::Goto(l) => *l,
        _ => unreachable!("create_block always returns a Goto"),
    }
}

/// `curr` is cloned before being consumed by the `then` arm so the `or_else`
/// arm can reuse it, matching the Python source's reuse of the same `curr`
/// list object for both branches.
fn explicate_effect(e: ast::Expr, cont: Cont, ctx: &mut Ctx) -> Result<Cont> {
    match e {
        ast::Expr::If { test, then, or_else } => {
            let curr = create_block(cont, ctx);
            let new_body = explicate_effect(*then, (Vec::new(), curr.clone()), ctx)?;
            let new_orelse = explicate_effect(*or_else, (Vec::new(), curr), ctx)?;
            explicate_pred(*test, new_body, new_orelse, ctx)
        }
        ast::Expr::Print(arg) => {
            let (mut stmts, term) = cont;
            stmts.insert(0, Stmt::Print(atom(&arg)?));
            Ok((stmts, term))
        }
        ast::Expr::InputInt => {
            let (mut stmts, term) = cont;
            stmts.insert(0, Stmt::InputIntEffect);
            Ok((stmts, term))
        }
        ast::Expr::Begin(body, _result) => {
            let mut cont = cont;
            for s in body.into_iter().rev() {
                cont = explicate_stmt(s, cont, ctx)?;
            }
            Ok(cont)
        }
        // An effect-only atomic expression with no side effect: drop it.
        _ => Ok(cont),
    }
}

fn explicate_assign(rhs: ast::Expr, lhs: crate::common::Id, cont: Cont, ctx: &mut Ctx) -> Result<Cont> {
    match rhs {
        ast::Expr::If { test, then, or_else } => {
            let curr = create_block(cont, ctx);
            let new_body = explicate_assign(*then, lhs, (Vec::new(), curr.clone()), ctx)?;
            let new_orelse = explicate_assign(*or_else, lhs, (Vec::new(), curr), ctx)?;
            explicate_pred(*test, new_body, new_orelse, ctx)
        }
        ast::Expr::Begin(body, result) => {
            let (mut stmts, term) = cont;
            stmts.insert(0, Stmt::Assign(lhs, to_rhs(&result)?));
            let mut cont = (stmts, term);
            for s in body.into_iter().rev() {
                cont = explicate_stmt(s, cont, ctx)?;
            }
            Ok(cont)
        }
        other => {
            let (mut stmts, term) = cont;
            stmts.insert(0, Stmt::Assign(lhs, to_rhs(&other)?));
            Ok((stmts, term))
        }
    }
}

fn explicate_pred(cnd: ast::Expr, thn: Cont, els: Cont, ctx: &mut Ctx) -> Result<Cont> {
    match cnd {
        ast::Expr::Compare { op, lhs, rhs } => {
            let goto_thn = create_block(thn, ctx);
            let goto_els = create_block(els, ctx);
            Ok((
                Vec::new(),
                Terminator::If {
                    lhs: atom(&lhs)?,
                    op,
                    rhs: atom(&rhs)?,
                    then: label_of(&goto_thn),
                    or_else: label_of(&goto_els),
                },
            ))
        }
        ast::Expr::Bool(true) => Ok(thn),
        ast::Expr::Bool(false) => Ok(els),
        ast::Expr::Not(operand) => explicate_pred(*operand, els, thn, ctx),
        ast::Expr::If { test, then, or_else } => {
            let goto_thn = explicate_pred(*then, thn.clone(), els.clone(), ctx)?;
            let goto_els = explicate_pred(*or_else, thn, els, ctx)?;
            explicate_pred(*test, goto_thn, goto_els, ctx)
        }
        ast::Expr::Begin(body, result) => {
            let mut cont = explicate_pred(*result, thn, els, ctx)?;
            for s in body.into_iter().rev() {
                cont = explicate_stmt(s, cont, ctx)?;
            }
            Ok(cont)
        }
        other => {
            let goto_els = create_block(els, ctx);
            let goto_thn = create_block(thn, ctx);
            Ok((
                Vec::new(),
                Terminator::If {
                    lhs: atom(&other)?,
                    op: ast::CmpOp::Eq,
                    rhs: Atom::Bool(false),
                    then: label_of(&goto_els),
                    or_else: label_of(&goto_thn),
                },
            ))
        }
    }
}

fn explicate_stmt(s: ast::Stmt, cont: Cont, ctx: &mut Ctx) -> Result<Cont> {
    match s {
        ast::Stmt::Assign(id, rhs) => explicate_assign(rhs, id, cont, ctx),
        ast::Stmt::Expr(e) => explicate_effect(e, cont, ctx),
        ast::Stmt::SubscriptAssign(tup, idx, value) => {
            let (mut stmts, term) = cont;
            stmts.insert(0, Stmt::SubscriptAssign(atom(&tup)?, atom(&idx)?, atom(&value)?));
            Ok((stmts, term))
        }
        ast::Stmt::Collect(n) => {
            let (mut stmts, term) = cont;
            stmts.insert(0, Stmt::Collect(n));
            Ok((stmts, term))
        }
        ast::Stmt::If { test, then, or_else } => {
            let curr = create_block(cont, ctx);
            let mut new_body = (Vec::new(), curr.clone());
            for s in then.into_iter().rev() {
                new_body = explicate_stmt(s, new_body, ctx)?;
            }
            let mut new_orelse = (Vec::new(), curr);
            for s in or_else.into_iter().rev() {
                new_orelse = explicate_stmt(s, new_orelse, ctx)?;
            }
            explicate_pred(test, new_body, new_orelse, ctx)
        }
        ast::Stmt::While { test, body } => explicate_while(test, body, cont, ctx),
        ast::Stmt::Return(e) => {
            // A `return` mid-program discards whatever continuation
            // follows it and transfers straight to `conclusion`'s tail.
            let _ = cont;
            Ok((Vec::new(), Terminator::Return(atom(&e)?)))
        }
    }
}

/// spec.md §4.5: "a fresh `loop_head` label is reserved before emitting the
/// body so the body can `goto loop_head`; the header is the pred expansion
/// of `test` over `goto body_label` / `goto cont_label`."
fn explicate_while(test: ast::Expr, body: Vec<ast::Stmt>, cont: Cont, ctx: &mut Ctx) -> Result<Cont> {
    let curr = create_block(cont, ctx);
    let loop_head_label = ctx.gen.fresh_label("block");

    let mut body_cont: Cont = (Vec::new(), Terminator::Goto(loop_head_label));
    for s in body.into_iter().rev() {
        body_cont = explicate_stmt(s, body_cont, ctx)?;
    }
    let body_entry = create_block(body_cont, ctx);

    let header = explicate_pred(test, (Vec::new(), body_entry), (Vec::new(), curr), ctx)?;
    ctx.blocks.insert(loop_head_label, Block { stmts: header.0, term: header.1 });

    Ok((Vec::new(), Terminator::Goto(loop_head_label)))
}

/// Translate a post-RCO program into the labeled-block CFG form. The
/// program ends with an implicit `return 0` (spec.md §4.5).
pub fn explicate_control(prog: ast::Program, gen: &mut NameGen) -> Result<Program> {
    let mut blocks = Map::new();
    let mut ctx = Ctx { blocks: &mut blocks, gen };
    let mut cont: Cont = (Vec::new(), Terminator::Return(Atom::Int(0)));
    for s in prog.stmts.into_iter().rev() {
        cont = explicate_stmt(s, cont, &mut ctx)?;
    }
    let start = label_name(START_LABEL);
    blocks.insert(start, Block { stmts: cont.0, term: cont.1 });
    Ok(Program { blocks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Id;
    use internment::Intern;

    fn var(name: &str) -> Id {
        Intern::new(name.to_string())
    }

    #[test]
    fn straight_line_program_ends_in_implicit_return_zero() {
        let prog = ast::Program {
            stmts: vec![ast::Stmt::Expr(ast::Expr::Print(Box::new(ast::Expr::Int(42))))],
        };
        let mut gen = NameGen::new();
        let cir = explicate_control(prog, &mut gen).unwrap();
        let start = cir.blocks.get(&label_name(START_LABEL)).unwrap();
        assert_eq!(start.stmts, vec![Stmt::Print(Atom::Int(42))]);
        assert_eq!(start.term, Terminator::Return(Atom::Int(0)));
    }

    #[test]
    fn if_else_produces_a_shared_continuation_block() {
        // if x < 1 { y := 1; } else { y := 2; } print(y);
        let y = var("y");
        let prog = ast::Program {
            stmts: vec![
                ast::Stmt::If {
                    test: ast::Expr::Compare {
                        op: ast::CmpOp::Lt,
                        lhs: Box::new(ast::Expr::Var(var("x"))),
                        rhs: Box::new(ast::Expr::Int(1)),
                    },
                    then: vec![ast::Stmt::Assign(y, ast::Expr::Int(1))],
                    or_else: vec![ast::Stmt::Assign(y, ast::Expr::Int(2))],
                },
                ast::Stmt::Expr(ast::Expr::Print(Box::new(ast::Expr::Var(y)))),
            ],
        };
        let mut gen = NameGen::new();
        let cir = explicate_control(prog, &mut gen).unwrap();

        // start block ends in the If terminator.
        let start = cir.blocks.get(&label_name(START_LABEL)).unwrap();
        let (then_label, else_label) = match &start.term {
            Terminator::If { then, or_else, .. } => (*then, *or_else),
            other => panic!("expected If terminator, found {other:?}"),
        };

        // Both branches assign y, then goto the same shared continuation
        // block (which prints y) — so there are exactly 3 blocks total.
        assert_eq!(cir.blocks.len(), 3);

        let then_block = cir.blocks.get(&then_label).unwrap();
        let else_block = cir.blocks.get(&else_label).unwrap();
        let then_goto = match then_block.term {
            Terminator::Goto(l) => l,
            _ => panic!("then branch should fall into a shared continuation"),
        };
        let else_goto = match else_block.term {
            Terminator::Goto(l) => l,
            _ => panic!("else branch should fall into a shared continuation"),
        };
        assert_eq!(then_goto, else_goto, "both arms must share one continuation block");
    }

    #[test]
    fn while_loop_has_a_header_with_a_back_edge_from_the_body() {
        // x := 0; while x < 3 { print(x); x := x + 1; }
        let x = var("x");
        let prog = ast::Program {
            stmts: vec![
                ast::Stmt::Assign(x, ast::Expr::Int(0)),
                ast::Stmt::While {
                    test: ast::Expr::Compare {
                        op: ast::CmpOp::Lt,
                        lhs: Box::new(ast::Expr::Var(x)),
                        rhs: Box::new(ast::Expr::Int(3)),
                    },
                    body: vec![
                        ast::Stmt::Expr(ast::Expr::Print(Box::new(ast::Expr::Var(x)))),
                        ast::Stmt::Assign(
                            x,
                            ast::Expr::BinOp {
                                op: ast::BinOp::Add,
                                lhs: Box::new(ast::Expr::Var(x)),
                                rhs: Box::new(ast::Expr::Int(1)),
                            },
                        ),
                    ],
                },
            ],
        };
        let mut gen = NameGen::new();
        let cir = explicate_control(prog, &mut gen).unwrap();

        let start = cir.blocks.get(&label_name(START_LABEL)).unwrap();
        let loop_head = match start.term {
            Terminator::Goto(l) => l,
            _ => panic!("program start should fall straight through to the loop header"),
        };
        let header = cir.blocks.get(&loop_head).unwrap();
        let body_label = match header.term {
            Terminator::If { then, .. } => then,
            _ => panic!("loop header must end in the loop test"),
        };
        let body = cir.blocks.get(&body_label).unwrap();
        assert_eq!(
            body.term,
            Terminator::Goto(loop_head),
            "loop body must end with a back-edge to its own header"
        );
    }

    #[test]
    fn short_circuiting_bool_literal_predicates_picks_a_branch_without_a_compare() {
        let mut blocks = Map::new();
        let mut gen = NameGen::new();
        let mut ctx = Ctx { blocks: &mut blocks, gen: &mut gen };
        let thn: Cont = (vec![Stmt::Print(Atom::Int(1))], Terminator::Return(Atom::Int(0)));
        let els: Cont = (vec![Stmt::Print(Atom::Int(2))], Terminator::Return(Atom::Int(0)));
        let picked = explicate_pred(ast::Expr::Bool(true), thn.clone(), els, &mut ctx).unwrap();
        assert_eq!(picked, thn);
    }

    #[test]
    fn not_swaps_branches() {
        let mut blocks = Map::new();
        let mut gen = NameGen::new();
        let mut ctx = Ctx { blocks: &mut blocks, gen: &mut gen };
        let thn: Cont = (vec![Stmt::Print(Atom::Int(1))], Terminator::Return(Atom::Int(0)));
        let els: Cont = (vec![Stmt::Print(Atom::Int(2))], Terminator::Return(Atom::Int(0)));
        let picked =
            explicate_pred(ast::Expr::Not(Box::new(ast::Expr::Bool(true))), thn, els.clone(), &mut ctx)
                .unwrap();
        assert_eq!(picked, els);
    }
}
