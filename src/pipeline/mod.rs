// src/pipeline/mod.rs

//! Declarative phase/task pipeline.
//!
//! - [`step`]: `StepRecord` and its arguments.
//! - [`phase`]: ordered phase descriptors and their builder.
//! - [`registry`]: the task and predicate registries.
//! - [`context`]: the mutable per-run `BuildContext`.
//! - [`executor`]: the predicate-gated, strictly sequential executor.

pub mod context;
pub mod executor;
pub mod phase;
pub mod registry;
pub mod step;

pub use context::BuildContext;
pub use executor::{Decision, PhaseReport, Pipeline, PlannedStep, StepRun, decide};
pub use phase::{PhaseBuilder, PhaseDescriptor};
pub use registry::{
    FnTask, PredicateFn, PredicateRegistry, Registries, Task, TaskFuture, TaskOutput,
    TaskRegistry,
};
pub use step::{Arg, StepArgs, StepRecord};
