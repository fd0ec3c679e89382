//! Shrink: desugar short-circuit `and`/`or` into `if`-expressions.
//!
//! Grounded on `ShrinkPass` in
//! `examples/original_source/src/iup/compiler/compiler.py`: `a and b`
//! becomes `if a then b else False`, `a or b` becomes `if a then True else
//! b`. Every other node is recursed structurally. Idempotent on already-
//! shrunk input (spec.md §8 property 7; see `tests` below).

use super::ast::*;

pub fn shrink_program(prog: Program) -> Program {
    Program {
        stmts: prog.stmts.into_iter().map(shrink_stmt).collect(),
    }
}

fn shrink_stmt(s: Stmt) -> Stmt {
    match s {
        Stmt::Assign(id, value) => Stmt::Assign(id, shrink_expr(value)),
        Stmt::SubscriptAssign(tup, idx, value) => {
            Stmt::SubscriptAssign(shrink_expr(tup), shrink_expr(idx), shrink_expr(value))
        }
        Stmt::Expr(e) => Stmt::Expr(shrink_expr(e)),
        Stmt::If { test, then, or_else } => Stmt::If {
            test: shrink_expr(test),
            then: then.into_iter().map(shrink_stmt).collect(),
            or_else: or_else.into_iter().map(shrink_stmt).collect(),
        },
        Stmt::While { test, body } => Stmt::While {
            test: shrink_expr(test),
            body: body.into_iter().map(shrink_stmt).collect(),
        },
        Stmt::Collect(n) => Stmt::Collect(n),
        Stmt::Return(e) => Stmt::Return(shrink_expr(e)),
    }
}

fn shrink_expr(e: Expr) -> Expr {
    match e {
        Expr::Var(id) => Expr::Var(id),
        Expr::Int(n) => Expr::Int(n),
        Expr::Bool(b) => Expr::Bool(b),
        Expr::BinOp { op, lhs, rhs } => Expr::BinOp {
            op,
            lhs: Box::new(shrink_expr(*lhs)),
            rhs: Box::new(shrink_expr(*rhs)),
        },
        Expr::Neg(e) => Expr::Neg(Box::new(shrink_expr(*e))),
        Expr::Not(e) => Expr::Not(Box::new(shrink_expr(*e))),
        Expr::Compare { op, lhs, rhs } => Expr::Compare {
            op,
            lhs: Box::new(shrink_expr(*lhs)),
            rhs: Box::new(shrink_expr(*rhs)),
        },
        Expr::And(lhs, rhs) => {
            let lhs = shrink_expr(*lhs);
            let rhs = shrink_expr(*rhs);
            Expr::If {
                test: Box::new(lhs),
                then: Box::new(rhs),
                or_else: Box::new(Expr::Bool(false)),
            }
        }
        Expr::Or(lhs, rhs) => {
            let lhs = shrink_expr(*lhs);
            let rhs = shrink_expr(*rhs);
            Expr::If {
                test: Box::new(lhs),
                then: Box::new(Expr::Bool(true)),
                or_else: Box::new(rhs),
            }
        }
        Expr::If { test, then, or_else } => Expr::If {
            test: Box::new(shrink_expr(*test)),
            then: Box::new(shrink_expr(*then)),
            or_else: Box::new(shrink_expr(*or_else)),
        },
        Expr::InputInt => Expr::InputInt,
        Expr::Print(e) => Expr::Print(Box::new(shrink_expr(*e))),
        Expr::Tuple(es) => Expr::Tuple(es.into_iter().map(shrink_expr).collect()),
        Expr::Subscript(t, i) => Expr::Subscript(Box::new(shrink_expr(*t)), Box::new(shrink_expr(*i))),
        Expr::Len(e) => Expr::Len(Box::new(shrink_expr(*e))),
        Expr::Allocate { len, ty } => Expr::Allocate { len, ty },
        Expr::GlobalValue(g) => Expr::GlobalValue(g),
        Expr::Begin(stmts, val) => Expr::Begin(
            stmts.into_iter().map(shrink_stmt).collect(),
            Box::new(shrink_expr(*val)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::parse::parse;

    fn roundtrip(src: &str) -> String {
        let p = parse(src).unwrap();
        format!("{:?}", shrink_program(p))
    }

    #[test]
    fn and_becomes_if_else_false() {
        let p = parse("x := 1 and 2;").unwrap();
        let shrunk = shrink_program(p);
        match &shrunk.stmts[0] {
            Stmt::Assign(_, Expr::If { or_else, .. }) => {
                assert!(matches!(**or_else, Expr::Bool(false)));
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn or_becomes_if_true_else() {
        let p = parse("x := 1 or 2;").unwrap();
        let shrunk = shrink_program(p);
        match &shrunk.stmts[0] {
            Stmt::Assign(_, Expr::If { then, .. }) => {
                assert!(matches!(**then, Expr::Bool(true)));
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn idempotent_on_shrunk_input() {
        let src = "x := 1 and 2 or 3;";
        let once = roundtrip(src);
        let p = parse(src).unwrap();
        let twice = format!("{:?}", shrink_program(shrink_program(p)));
        assert_eq!(once, twice);
    }
}
