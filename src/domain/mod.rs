//! Domain types for the store concurrency harness
//!
//! Tasks, the scenario parameters that define one verification run and
//! the invariant the run checks.

pub mod invariant;
pub mod scenario;
pub mod task;

pub use invariant::*;
pub use scenario::*;
pub use task::*;
