//! The fixed pipeline (spec.md §4.1-§4.11): wires the passes from `front`,
//! `middle`, and `back` together through three [`PassManager`] instances,
//! one per same-typed span of the IR ladder (surface AST, CFG IR,
//! pseudo/real x86). `explicate_control` and `select_program` change the
//! program's Rust type, so they run here as plain bridging calls between
//! managers rather than as `Transform`s — a `Transform<P>` is always
//! `P -> P`.
//!
//! The fixed stage order and per-stage tracing discipline are grounded in
//! `PassManager.run` in
//! `examples/original_source/src/iup/compiler/pass_manager.py`, which logs
//! the program after each transform in the same sequence; the concrete
//! `Transform`/`Analysis` impls below and the three-manager split are new
//! code, since the Python source has no single entry point tying its
//! passes together outside that one `run` loop — see
//! [`super::pass_manager`] for why one manager instance can't thread the
//! whole pipeline here.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::pass_manager::{Analysis, PassManager, Transform};
use crate::back::x86;
use crate::common::{Map, NameGen};
use crate::error::{CompileError, Result};
use crate::front;
use crate::front::ast;
use crate::middle;
use crate::middle::cir;

pub struct CompileResult {
    pub assembly: String,
}

// --- front end: ast::Program -> ast::Program ---

struct WellTyped;
impl Analysis<ast::Program> for WellTyped {
    fn name(&self) -> &'static str {
        "well_typed"
    }
    fn run(&self, program: &ast::Program, _pm: &PassManager<ast::Program>) -> Result<Rc<dyn Any>> {
        front::typecheck::check_program(program)?;
        Ok(Rc::new(()))
    }
}

/// spec.md §8 property 2: every RCO'd operand is atomic.
struct RcoAtomicity;
impl Analysis<ast::Program> for RcoAtomicity {
    fn name(&self) -> &'static str {
        "rco_atomicity"
    }
    fn run(&self, program: &ast::Program, _pm: &PassManager<ast::Program>) -> Result<Rc<dyn Any>> {
        if front::rco::check_atomicity(program) {
            Ok(Rc::new(()))
        } else {
            Err(CompileError::MalformedIr {
                pass: "remove_complex_operands",
                shape: "an operand escaped atomization".to_string(),
            })
        }
    }
}

struct ShrinkTransform;
impl Transform<ast::Program> for ShrinkTransform {
    fn name(&self) -> &'static str {
        "shrink"
    }
    fn run(&self, program: ast::Program, _pm: &PassManager<ast::Program>) -> Result<ast::Program> {
        Ok(front::shrink::shrink_program(program))
    }
}

struct ExposeAllocationTransform;
impl Transform<ast::Program> for ExposeAllocationTransform {
    fn name(&self) -> &'static str {
        "expose_allocation"
    }
    fn run(&self, program: ast::Program, pm: &PassManager<ast::Program>) -> Result<ast::Program> {
        Ok(pm.with_name_gen(|gen| front::expose_alloc::expose_program(program, gen)))
    }
}

struct RemoveComplexOperandsTransform;
impl Transform<ast::Program> for RemoveComplexOperandsTransform {
    fn name(&self) -> &'static str {
        "remove_complex_operands"
    }
    fn run(&self, program: ast::Program, pm: &PassManager<ast::Program>) -> Result<ast::Program> {
        Ok(pm.with_name_gen(|gen| front::rco::rco_program(program, gen)))
    }
}

fn front_manager(gen: Rc<RefCell<NameGen>>, traced: Vec<String>) -> PassManager<ast::Program> {
    let mut analyses: Map<&'static str, Box<dyn Analysis<ast::Program>>> = Map::new();
    analyses.insert("well_typed", Box::new(WellTyped));
    analyses.insert("rco_atomicity", Box::new(RcoAtomicity));
    let transforms: Vec<Box<dyn Transform<ast::Program>>> = vec![
        Box::new(ShrinkTransform),
        Box::new(ExposeAllocationTransform),
        Box::new(RemoveComplexOperandsTransform),
    ];
    PassManager::new(transforms, analyses, gen).with_traced_passes(traced)
}

// --- middle end: cir::Program, zero transforms, one well-formedness check ---

/// spec.md §8 property 3: CFG well-formedness post-explicate.
struct CfgWellFormed;
impl Analysis<cir::Program> for CfgWellFormed {
    fn name(&self) -> &'static str {
        "cfg_well_formed"
    }
    fn run(&self, program: &cir::Program, _pm: &PassManager<cir::Program>) -> Result<Rc<dyn Any>> {
        if middle::well_formed(program) {
            Ok(Rc::new(()))
        } else {
            Err(CompileError::MalformedIr {
                pass: "explicate_control",
                shape: "a block's terminator targets a non-existent label".to_string(),
            })
        }
    }
}

fn cir_manager(gen: Rc<RefCell<NameGen>>, traced: Vec<String>) -> PassManager<cir::Program> {
    let mut analyses: Map<&'static str, Box<dyn Analysis<cir::Program>>> = Map::new();
    analyses.insert("cfg_well_formed", Box::new(CfgWellFormed));
    PassManager::new(Vec::new(), analyses, gen).with_traced_passes(traced)
}

// --- back end: x86::Program (pseudo) -> x86::Program (real) ---

struct LivenessAnalysis;
impl Analysis<x86::Program> for LivenessAnalysis {
    fn name(&self) -> &'static str {
        "liveness"
    }
    fn run(&self, program: &x86::Program, _pm: &PassManager<x86::Program>) -> Result<Rc<dyn Any>> {
        Ok(Rc::new(crate::back::liveness::analyze(program)))
    }
}

struct InterferenceAnalysis;
impl Analysis<x86::Program> for InterferenceAnalysis {
    fn name(&self) -> &'static str {
        "interference"
    }
    fn run(&self, program: &x86::Program, pm: &PassManager<x86::Program>) -> Result<Rc<dyn Any>> {
        let liveness = pm.get_result("liveness", program)?;
        let liveness = liveness
            .downcast_ref::<crate::back::liveness::Liveness>()
            .ok_or_else(|| {
                CompileError::Configuration("`liveness` analysis returned the wrong type".into())
            })?;
        Ok(Rc::new(crate::back::interfere::build(program, liveness)))
    }
}

struct RegisterAllocationTransform;
impl Transform<x86::Program> for RegisterAllocationTransform {
    fn name(&self) -> &'static str {
        "allocate_registers"
    }
    fn run(&self, program: x86::Program, pm: &PassManager<x86::Program>) -> Result<x86::Program> {
        let interference = pm.get_result("interference", &program)?;
        let interference = interference
            .downcast_ref::<crate::back::graph::UndirectedAdjList<x86::Location>>()
            .ok_or_else(|| {
                CompileError::Configuration(
                    "`interference` analysis returned the wrong type".into(),
                )
            })?;
        crate::back::regalloc::allocate(program, interference)
    }
}

struct PatchInstructionsTransform;
impl Transform<x86::Program> for PatchInstructionsTransform {
    fn name(&self) -> &'static str {
        "patch_instructions"
    }
    fn run(&self, program: x86::Program, _pm: &PassManager<x86::Program>) -> Result<x86::Program> {
        Ok(crate::back::patch::patch_program(program))
    }
}

struct PreludeConclusionTransform;
impl Transform<x86::Program> for PreludeConclusionTransform {
    fn name(&self) -> &'static str {
        "prelude_and_conclusion"
    }
    fn run(&self, program: x86::Program, _pm: &PassManager<x86::Program>) -> Result<x86::Program> {
        Ok(crate::back::precon::add_prelude_and_conclusion(program))
    }
}

fn back_manager(gen: Rc<RefCell<NameGen>>, traced: Vec<String>) -> PassManager<x86::Program> {
    let mut analyses: Map<&'static str, Box<dyn Analysis<x86::Program>>> = Map::new();
    analyses.insert("liveness", Box::new(LivenessAnalysis));
    analyses.insert("interference", Box::new(InterferenceAnalysis));
    let transforms: Vec<Box<dyn Transform<x86::Program>>> = vec![
        Box::new(RegisterAllocationTransform),
        Box::new(PatchInstructionsTransform),
        Box::new(PreludeConclusionTransform),
    ];
    PassManager::new(transforms, analyses, gen).with_traced_passes(traced)
}

/// Runs the front and middle ends only, stopping right after
/// explicate-control. Used by the `--out cir` CLI output and as the first
/// half of [`compile`].
///
/// `traced` restricts `--passes`-style IR tracing to these stage names;
/// an empty list traces every stage.
pub fn compile_to_cir(source: &str, traced: &[String]) -> Result<cir::Program> {
    let gen = Rc::new(RefCell::new(NameGen::new()));
    let pm = front_manager(Rc::clone(&gen), traced.to_vec());

    let ast = front::parse(source)?;
    pm.get_result("well_typed", &ast)?;

    let rco = pm.run(ast)?;
    pm.get_result("rco_atomicity", &rco)?;

    let cir = pm.with_name_gen(|gen| middle::explicate_control(rco, gen))?;

    let pm_cir = cir_manager(gen, traced.to_vec());
    pm_cir.trace("explicate_control", &cir);
    pm_cir.get_result("cfg_well_formed", &cir)?;

    Ok(cir)
}

pub fn compile(source: &str, traced: &[String]) -> Result<CompileResult> {
    let cir = compile_to_cir(source, traced)?;

    let pseudo = crate::back::select_program(cir)?;

    let pm = back_manager(Rc::new(RefCell::new(NameGen::new())), traced.to_vec());
    pm.trace("select_instructions", &pseudo);
    let complete = pm.run(pseudo)?;

    Ok(CompileResult { assembly: complete.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_print_of_a_constant() {
        let result = compile("print(10 + 32);", &[]).unwrap();
        assert!(result.assembly.contains("main:"));
        assert!(result.assembly.contains("start:"));
        assert!(result.assembly.contains("conclusion:"));
    }

    #[test]
    fn compiles_a_while_loop() {
        let result = compile("x := 0; while x < 3 { print(x); x := x + 1; }", &[]).unwrap();
        assert!(result.assembly.contains("callq print_int"));
    }

    #[test]
    fn compiles_tuple_allocation() {
        let result = compile("t := (1, 2); print(t[0]);", &[]).unwrap();
        assert!(result.assembly.contains("callq collect"));
    }

    #[test]
    fn rejects_a_type_error_before_running_any_transform() {
        let err = compile("print(true + 1);", &[]).unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch(_)));
    }
}
