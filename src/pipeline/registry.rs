// src/pipeline/registry.rs

//! Task and predicate registries.
//!
//! Both are plain name -> callable tables built once at startup and handed to
//! the [`Pipeline`](super::Pipeline) by reference. Registering a name twice
//! is an error.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::path::PathBuf;

use crate::errors::{PackflowError, Result};
use crate::exec::BoxFuture;

use super::context::BuildContext;
use super::step::StepArgs;

/// What a task hands back to the step that invoked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    Done,
    /// Opaque reference to something the task produced (e.g. a bundle).
    Artifact(PathBuf),
    /// The task was cancelled; the rest of the phase is not run.
    Cancelled,
}

pub type TaskFuture<'a> = BoxFuture<'a, Result<TaskOutput>>;

/// A named operation a step can invoke.
pub trait Task: Send + Sync {
    fn run<'a>(&'a self, ctx: &'a mut BuildContext, args: &'a StepArgs) -> TaskFuture<'a>;

    /// Reject structurally invalid arguments before anything runs.
    fn check_args(&self, _args: &StepArgs) -> Result<()> {
        Ok(())
    }
}

type CheckFn = fn(&StepArgs) -> Result<()>;

fn accept_any(_: &StepArgs) -> Result<()> {
    Ok(())
}

/// A synchronous task body, optionally with an argument check.
pub struct FnTask<F> {
    body: F,
    check: CheckFn,
}

impl<F> FnTask<F>
where
    F: Fn(&mut BuildContext, &StepArgs) -> Result<TaskOutput> + Send + Sync,
{
    pub fn new(body: F) -> Self {
        Self {
            body,
            check: accept_any,
        }
    }

    pub fn checked(mut self, check: CheckFn) -> Self {
        self.check = check;
        self
    }
}

impl<F> Task for FnTask<F>
where
    F: Fn(&mut BuildContext, &StepArgs) -> Result<TaskOutput> + Send + Sync,
{
    fn run<'a>(&'a self, ctx: &'a mut BuildContext, args: &'a StepArgs) -> TaskFuture<'a> {
        let result = (self.body)(ctx, args);
        Box::pin(std::future::ready(result))
    }

    fn check_args(&self, args: &StepArgs) -> Result<()> {
        (self.check)(args)
    }
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Box<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, task: impl Task + 'static) -> Result<()> {
        match self.tasks.entry(name.into()) {
            Entry::Occupied(slot) => Err(PackflowError::DuplicateRegistration {
                kind: "task",
                name: slot.key().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Box::new(task));
                Ok(())
            }
        }
    }

    /// Register a synchronous task body.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, body: F) -> Result<()>
    where
        F: Fn(&mut BuildContext, &StepArgs) -> Result<TaskOutput> + Send + Sync + 'static,
    {
        self.register(name, FnTask::new(body))
    }

    pub fn get(&self, name: &str) -> Option<&dyn Task> {
        self.tasks.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tasks.keys()).finish()
    }
}

/// A side-effect-free check on the build context.
pub type PredicateFn = Box<dyn Fn(&BuildContext) -> bool + Send + Sync>;

#[derive(Default)]
pub struct PredicateRegistry {
    predicates: BTreeMap<String, PredicateFn>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F) -> Result<()>
    where
        F: Fn(&BuildContext) -> bool + Send + Sync + 'static,
    {
        match self.predicates.entry(name.into()) {
            Entry::Occupied(slot) => Err(PackflowError::DuplicateRegistration {
                kind: "predicate",
                name: slot.key().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Box::new(predicate));
                Ok(())
            }
        }
    }

    /// `None` if no predicate of that name exists.
    pub fn evaluate(&self, name: &str, ctx: &BuildContext) -> Option<bool> {
        self.predicates.get(name).map(|p| p(ctx))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.predicates.keys()).finish()
    }
}

/// Both registries, as passed to the pipeline.
#[derive(Debug, Default)]
pub struct Registries {
    pub tasks: TaskRegistry,
    pub predicates: PredicateRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registries holding every built-in task and predicate.
    pub fn builtin() -> Result<Self> {
        let mut registries = Self::new();
        crate::tasks::register_builtin(&mut registries.tasks)?;
        crate::predicates::register_builtin(&mut registries.predicates)?;
        Ok(registries)
    }
}
