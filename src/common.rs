//! Common definitions that are shared between different parts of the compiler.

// Use sorted sets and maps for consistent output
pub use std::collections::{BTreeMap as Map, BTreeSet as Set};

/// Identifiers.
pub type Id = internment::Intern<String>;

/// Labels naming basic blocks (and, pre-explicate, platform symbols).
pub type Label = internment::Intern<String>;

/// A source of fresh, uniquely-numbered names.
///
/// The original teaching compiler this is modeled on keeps a single
/// process-wide counter (`name_id` in its Python `utils.generate_name`).
/// Here the counter is owned by whoever runs a pipeline (normally the
/// [`crate::driver::pass_manager::PassManager`]) so that two compilations
/// never share mutable state and so that tests can run in parallel.
#[derive(Debug, Default)]
pub struct NameGen {
    next: u64,
}

impl NameGen {
    pub fn new() -> Self {
        NameGen { next: 0 }
    }

    /// Generate a fresh name with the given prefix, e.g. `fresh("_t")` ->
    /// `_t0`, `_t1`, .... Matches the convention of spec-level prefixes
    /// `_t`, `block`, `init.`, `alloc.` (the `.` is stripped, as in the
    /// original `generate_name`, which splits on `.` and keeps only the
    /// first component).
    pub fn fresh(&mut self, prefix: &str) -> Id {
        let base = prefix.split('.').next().unwrap_or(prefix);
        let id = self.next;
        self.next += 1;
        internment::Intern::new(format!("{base}{id}"))
    }

    /// Generate a fresh label, honoring the platform symbol-prefix
    /// convention via [`label_name`].
    pub fn fresh_label(&mut self, prefix: &str) -> Label {
        label_name(&self.fresh(prefix))
    }
}

/// Round `n` up to the nearest multiple of `alignment`.
pub fn align(n: i64, alignment: i64) -> i64 {
    if n % alignment == 0 {
        n
    } else {
        n + (alignment - n % alignment)
    }
}

/// Apply the platform's external-symbol convention (a leading underscore on
/// Darwin) to a bare name. This is the single point of decision named in
/// spec.md §4.11.
pub fn label_name(n: &str) -> Label {
    if cfg!(target_os = "macos") {
        internment::Intern::new(format!("_{n}"))
    } else {
        internment::Intern::new(n.to_string())
    }
}

pub const START_LABEL: &str = "start";
pub const CONCLUSION_LABEL: &str = "conclusion";
pub const MAIN_LABEL: &str = "main";
