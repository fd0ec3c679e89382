//! Expose Allocation: lower tuple literals into explicit heap checks,
//! `allocate`, and element stores (spec.md §4.3).
//!
//! Grounded on `ExposeAllocationPass` in
//! `examples/original_source/src/iup/compiler/compiler.py`. Each tuple
//! literal `(e1, .., en)` expands to:
//!
//! ```text
//! t1 = e1; ...; tn = en
//! if free_ptr + (n+1)*8 < fromspace_end then nop else collect(bytes)
//! v = allocate(n, type)
//! v[0] = t1; ...; v[n-1] = tn
//! produce v          -- all of the above wrapped in a Begin
//! ```
//!
//! Contract (spec.md §4.3): `allocate` immediately follows a sufficient
//! heap check; element assignments follow `allocate` with no intervening
//! allocation. The element type list comes from the structural type
//! checker (spec.md §4.0a / [`super::typecheck`]), threaded through as a
//! small environment so nested tuples get their real element types rather
//! than a placeholder.

use super::ast::*;
use super::typecheck::infer_type;
use crate::common::{Id, Map, NameGen};

const WORD_SIZE: i64 = 8;

pub fn expose_program(prog: Program, gen: &mut NameGen) -> Program {
    let mut env = Map::new();
    Program {
        stmts: prog
            .stmts
            .into_iter()
            .map(|s| expose_stmt(s, gen, &mut env))
            .collect(),
    }
}

fn expose_stmt(s: Stmt, gen: &mut NameGen, env: &mut Map<Id, Type>) -> Stmt {
    match s {
        Stmt::Assign(id, value) => {
            // Infer before exposing: exposing rewrites tuple literals into
            // `Begin` forms that no longer carry a `Type`.
            if let Ok(ty) = infer_type(&value, env) {
                env.insert(id, ty);
            }
            Stmt::Assign(id, expose_expr(value, gen, env))
        }
        Stmt::SubscriptAssign(tup, idx, value) => Stmt::SubscriptAssign(
            expose_expr(tup, gen, env),
            expose_expr(idx, gen, env),
            expose_expr(value, gen, env),
        ),
        Stmt::Expr(e) => Stmt::Expr(expose_expr(e, gen, env)),
        Stmt::If { test, then, or_else } => Stmt::If {
            test: expose_expr(test, gen, env),
            then: then.into_iter().map(|s| expose_stmt(s, gen, env)).collect(),
            or_else: or_else.into_iter().map(|s| expose_stmt(s, gen, env)).collect(),
        },
        Stmt::While { test, body } => Stmt::While {
            test: expose_expr(test, gen, env),
            body: body.into_iter().map(|s| expose_stmt(s, gen, env)).collect(),
        },
        Stmt::Collect(n) => Stmt::Collect(n),
        Stmt::Return(e) => Stmt::Return(expose_expr(e, gen, env)),
    }
}

fn expose_expr(e: Expr, gen: &mut NameGen, env: &mut Map<Id, Type>) -> Expr {
    match e {
        Expr::Var(id) => Expr::Var(id),
        Expr::Int(n) => Expr::Int(n),
        Expr::Bool(b) => Expr::Bool(b),
        Expr::BinOp { op, lhs, rhs } => Expr::BinOp {
            op,
            lhs: Box::new(expose_expr(*lhs, gen, env)),
            rhs: Box::new(expose_expr(*rhs, gen, env)),
        },
        Expr::Neg(e) => Expr::Neg(Box::new(expose_expr(*e, gen, env))),
        Expr::Not(e) => Expr::Not(Box::new(expose_expr(*e, gen, env))),
        Expr::Compare { op, lhs, rhs } => Expr::Compare {
            op,
            lhs: Box::new(expose_expr(*lhs, gen, env)),
            rhs: Box::new(expose_expr(*rhs, gen, env)),
        },
        // And/Or should already be shrunk away by the time this pass runs;
        // recurse structurally in case it runs standalone in tests.
        Expr::And(l, r) => Expr::And(
            Box::new(expose_expr(*l, gen, env)),
            Box::new(expose_expr(*r, gen, env)),
        ),
        Expr::Or(l, r) => Expr::Or(
            Box::new(expose_expr(*l, gen, env)),
            Box::new(expose_expr(*r, gen, env)),
        ),
        Expr::If { test, then, or_else } => Expr::If {
            test: Box::new(expose_expr(*test, gen, env)),
            then: Box::new(expose_expr(*then, gen, env)),
            or_else: Box::new(expose_expr(*or_else, gen, env)),
        },
        Expr::InputInt => Expr::InputInt,
        Expr::Print(e) => Expr::Print(Box::new(expose_expr(*e, gen, env))),
        Expr::Tuple(es) => {
            let elem_tys: Vec<Type> = es
                .iter()
                .map(|e| infer_type(e, env).unwrap_or(Type::Int))
                .collect();
            expose_tuple(es, Type::Tuple(elem_tys), gen, env)
        }
        Expr::Subscript(t, i) => Expr::Subscript(
            Box::new(expose_expr(*t, gen, env)),
            Box::new(expose_expr(*i, gen, env)),
        ),
        Expr::Len(e) => Expr::Len(Box::new(expose_expr(*e, gen, env))),
        Expr::Allocate { len, ty } => Expr::Allocate { len, ty },
        Expr::GlobalValue(g) => Expr::GlobalValue(g),
        Expr::Begin(stmts, val) => Expr::Begin(
            stmts.into_iter().map(|s| expose_stmt(s, gen, env)).collect(),
            Box::new(expose_expr(*val, gen, env)),
        ),
    }
}

/// Expand a tuple literal per spec.md §4.3's contract.
fn expose_tuple(es: Vec<Expr>, ty: Type, gen: &mut NameGen, env: &mut Map<Id, Type>) -> Expr {
    let len = es.len();
    let bytes = (len as i64 + 1) * WORD_SIZE;

    let mut inits: Vec<Stmt> = Vec::new();
    let mut xs: Vec<Id> = Vec::new();
    for e in es {
        let x = gen.fresh("init.");
        xs.push(x);
        inits.push(Stmt::Assign(x, expose_expr(e, gen, env)));
    }

    inits.push(Stmt::If {
        test: Expr::Compare {
            op: CmpOp::Lt,
            lhs: Box::new(Expr::BinOp {
                op: BinOp::Add,
                lhs: Box::new(Expr::GlobalValue("free_ptr")),
                rhs: Box::new(Expr::Int(bytes)),
            }),
            rhs: Box::new(Expr::GlobalValue("fromspace_end")),
        },
        then: Vec::new(),
        or_else: vec![Stmt::Collect(bytes)],
    });

    let v = gen.fresh("alloc.");
    inits.push(Stmt::Assign(v, Expr::Allocate { len, ty }));

    for (i, x) in xs.into_iter().enumerate() {
        inits.push(Stmt::SubscriptAssign(
            Expr::Var(v),
            Expr::Int(i as i64),
            Expr::Var(x),
        ));
    }

    Expr::Begin(inits, Box::new(Expr::Var(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::parse::parse;

    #[test]
    fn tuple_expands_to_begin_with_allocate_and_stores() {
        let p = parse("t := (1, 2);").unwrap();
        let mut gen = NameGen::new();
        let exposed = expose_program(p, &mut gen);
        match &exposed.stmts[0] {
            Stmt::Assign(_, Expr::Begin(stmts, val)) => {
                // two init assignments, heap check, allocate, two stores = 6
                assert_eq!(stmts.len(), 6);
                assert!(matches!(stmts[2], Stmt::If { .. }));
                assert!(matches!(stmts[3], Stmt::Assign(_, Expr::Allocate { len: 2, .. })));
                assert!(matches!(**val, Expr::Var(_)));
            }
            other => panic!("expected Begin, got {other:?}"),
        }
    }

    #[test]
    fn allocate_carries_inferred_element_types() {
        let p = parse("t := (1, true);").unwrap();
        let mut gen = NameGen::new();
        let exposed = expose_program(p, &mut gen);
        match &exposed.stmts[0] {
            Stmt::Assign(_, Expr::Begin(stmts, _)) => match &stmts[3] {
                Stmt::Assign(_, Expr::Allocate { ty: Type::Tuple(elems), .. }) => {
                    assert_eq!(elems, &vec![Type::Int, Type::Bool]);
                }
                other => panic!("expected Allocate, got {other:?}"),
            },
            other => panic!("expected Begin, got {other:?}"),
        }
    }
}
