//! spec.md §4.1: two lists, transforms (ordered) and analyses (addressable
//! by name), the latter computed lazily via `get_result` and cached against
//! the current program.
//!
//! Grounded on `PassManager` in
//! `examples/original_source/src/iup/compiler/pass_manager.py`, whose
//! `transforms`/`analyses`/`cache` fields and `invalidate`/`get_result`/
//! `run` methods this mirrors. One necessary departure: the Python source's
//! `program` field holds a single dynamically-typed object reassigned by
//! every transform; this pipeline's transforms change the program's *type*
//! at each IR level (surface AST → CFG IR → pseudo-x86 → real x86), which a
//! single mutable slot can't express in a statically typed language, so
//! `driver::pipeline` runs one `PassManager<P>` per same-typed span instead
//! of one manager for the whole pipeline, bridging spans with plain
//! function calls (`explicate_control`, `select_program`) rather than
//! `Transform`s. A second departure: `get_result` here takes `&self`, not
//! `&mut self`, so one analysis can call back into the manager to fetch
//! another (interference asking for liveness) without a `&mut` aliasing
//! conflict; the cache is a `RefCell` underneath.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::common::{Map, NameGen, Set};
use crate::error::{CompileError, Result};
use tracing::debug;

/// A named, ordered rewrite of the program: `P -> P`.
pub trait Transform<P> {
    fn name(&self) -> &'static str;
    fn run(&self, program: P, pm: &PassManager<P>) -> Result<P>;
}

/// A named, pure computation over the program, cached by
/// [`PassManager::get_result`]. Unlike a [`Transform`], an analysis never
/// owns the program and may itself query another analysis.
pub trait Analysis<P> {
    fn name(&self) -> &'static str;
    fn run(&self, program: &P, pm: &PassManager<P>) -> Result<Rc<dyn Any>>;
}

/// Runs the ordered `transforms` list over a program of type `P`, and
/// answers `get_result(name)` queries against the registered `analyses` by
/// computing and memoizing on first access. The cache is dropped in full
/// after every transform (spec.md §4.1's default invalidation policy),
/// since a transform may change anything an analysis depends on.
pub struct PassManager<P> {
    transforms: Vec<Box<dyn Transform<P>>>,
    analyses: Map<&'static str, Box<dyn Analysis<P>>>,
    cache: RefCell<Map<&'static str, Rc<dyn Any>>>,
    traced: Set<String>,
    gen: Rc<RefCell<NameGen>>,
}

impl<P: fmt::Debug> PassManager<P> {
    pub fn new(
        transforms: Vec<Box<dyn Transform<P>>>,
        analyses: Map<&'static str, Box<dyn Analysis<P>>>,
        gen: Rc<RefCell<NameGen>>,
    ) -> Self {
        PassManager {
            transforms,
            analyses,
            cache: RefCell::new(Map::new()),
            traced: Set::new(),
            gen,
        }
    }

    /// Restrict IR tracing to these stage names (the `-p`/`--passes` CLI
    /// flag, SPEC_FULL.md §4.12); traces every stage if `names` is empty.
    pub fn with_traced_passes(mut self, names: Vec<String>) -> Self {
        self.traced = names.into_iter().collect();
        self
    }

    fn should_trace(&self, pass: &str) -> bool {
        self.traced.is_empty() || self.traced.contains(pass)
    }

    /// Log `program`'s textual dump under `pass`'s name, if selected. Public
    /// so `driver::pipeline` can trace the bridging calls
    /// (`explicate_control`, `select_program`) that change the IR's type
    /// and so fall outside any one manager's `run` loop.
    pub fn trace(&self, pass: &'static str, program: &P) {
        if self.should_trace(pass) {
            debug!(pass, "{:?}", program);
        }
    }

    /// Thread `program` through every transform in order, tracing and
    /// clearing the analysis cache after each one.
    pub fn run(&self, mut program: P) -> Result<P> {
        for t in &self.transforms {
            program = t.run(program, self)?;
            self.trace(t.name(), &program);
            self.invalidate_all();
        }
        Ok(program)
    }

    /// Look up (computing and caching on first access) the named analysis
    /// result against `program`. An unregistered name fails with a
    /// configuration error (spec.md §4.1), not a panic.
    pub fn get_result(&self, name: &str, program: &P) -> Result<Rc<dyn Any>> {
        if let Some(hit) = self.cache.borrow().get(name) {
            return Ok(Rc::clone(hit));
        }
        let analysis = self.analyses.get(name).ok_or_else(|| {
            CompileError::Configuration(format!("no such analysis: {name}"))
        })?;
        let result = analysis.run(program, self)?;
        self.cache
            .borrow_mut()
            .insert(analysis.name(), Rc::clone(&result));
        Ok(result)
    }

    /// Drop a subset of cached analysis results, e.g. because a caller
    /// mutated the program out of band.
    pub fn invalidate(&self, names: &[&str]) {
        let mut cache = self.cache.borrow_mut();
        for n in names {
            cache.remove(n);
        }
    }

    /// The default, conservative invalidation policy: drop everything.
    pub fn invalidate_all(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Borrow the fresh-name source shared by every `PassManager` in the
    /// pipeline (spec.md's Design Notes §9: the generator is injected and
    /// owned by the pass manager, not a static singleton).
    pub fn with_name_gen<R>(&self, f: impl FnOnce(&mut NameGen) -> R) -> R {
        f(&mut self.gen.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Increment;
    impl Transform<i32> for Increment {
        fn name(&self) -> &'static str {
            "increment"
        }
        fn run(&self, program: i32, _pm: &PassManager<i32>) -> Result<i32> {
            Ok(program + 1)
        }
    }

    struct CountCalls(Rc<Cell<i32>>);
    impl Analysis<i32> for CountCalls {
        fn name(&self) -> &'static str {
            "even"
        }
        fn run(&self, program: &i32, _pm: &PassManager<i32>) -> Result<Rc<dyn Any>> {
            self.0.set(self.0.get() + 1);
            Ok(Rc::new(program % 2 == 0))
        }
    }

    fn manager(analyses: Map<&'static str, Box<dyn Analysis<i32>>>) -> PassManager<i32> {
        PassManager::new(
            vec![Box::new(Increment)],
            analyses,
            Rc::new(RefCell::new(NameGen::new())),
        )
    }

    #[test]
    fn unregistered_analysis_name_is_a_configuration_error() {
        let pm = manager(Map::new());
        assert!(matches!(
            pm.get_result("not_a_real_analysis", &0),
            Err(CompileError::Configuration(_))
        ));
    }

    #[test]
    fn get_result_caches_until_the_next_transform_runs() {
        let calls = Rc::new(Cell::new(0));
        let mut analyses: Map<&'static str, Box<dyn Analysis<i32>>> = Map::new();
        analyses.insert("even", Box::new(CountCalls(Rc::clone(&calls))));
        let pm = manager(analyses);

        pm.get_result("even", &4).unwrap();
        pm.get_result("even", &4).unwrap();
        assert_eq!(calls.get(), 1, "second lookup should hit the cache, not recompute");

        let _ = pm.run(4).unwrap();
        pm.get_result("even", &6).unwrap();
        assert_eq!(calls.get(), 2, "running a transform should clear the cache");
    }

    #[test]
    fn get_result_returns_a_value_downcastable_to_its_real_type() {
        let mut analyses: Map<&'static str, Box<dyn Analysis<i32>>> = Map::new();
        analyses.insert("even", Box::new(CountCalls(Rc::new(Cell::new(0)))));
        let pm = manager(analyses);
        let result = pm.get_result("even", &4).unwrap();
        assert_eq!(result.downcast_ref::<bool>(), Some(&true));
        assert!(result.downcast_ref::<String>().is_none());
    }
}
