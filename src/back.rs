//! The back-end of the compiler: pseudo-x86 IR, instruction selection,
//! liveness, interference, DSATUR register allocation, instruction
//! patching, and prelude/conclusion synthesis (spec.md §4.6-§4.11).

pub mod bimap;
pub mod graph;
pub mod interfere;
pub mod liveness;
pub mod patch;
pub mod pqueue;
pub mod precon;
pub mod regalloc;
pub mod select;
pub mod x86;

pub use select::select_program;
