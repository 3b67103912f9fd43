// src/pipeline/executor.rs

//! Pipeline executor.
//!
//! Walks a [`PhaseDescriptor`] one step at a time, in declared order:
//!
//! 1. a step whose platform selector does not match is skipped (no
//!    predicate evaluated, no task invoked),
//! 2. otherwise its predicate, if any, is evaluated and `false` skips it,
//! 3. otherwise its task is invoked with the build context and arguments.
//!
//! The gating part is the pure function [`decide`]; [`Pipeline`] is the
//! async shell around it. A task error aborts the rest of the phase. Nothing
//! is rolled back; the phase is expected to be re-run from the start.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::errors::{PackflowError, Result};
use crate::types::Platform;

use super::context::BuildContext;
use super::phase::PhaseDescriptor;
use super::registry::{PredicateRegistry, Registries, TaskOutput};
use super::step::StepRecord;

/// What to do with one step for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    SkipPlatform,
    SkipPredicate,
    Run,
}

/// Gate `step` for `platform`.
///
/// An unregistered predicate name is a configuration error.
pub fn decide(
    step: &StepRecord,
    platform: Platform,
    predicates: &PredicateRegistry,
    ctx: &BuildContext,
) -> Result<Decision> {
    if !step.selector.matches(platform) {
        return Ok(Decision::SkipPlatform);
    }
    let Some(name) = &step.predicate else {
        return Ok(Decision::Run);
    };
    match predicates.evaluate(name, ctx) {
        Some(true) => Ok(Decision::Run),
        Some(false) => Ok(Decision::SkipPredicate),
        None => Err(PackflowError::UnknownPredicate(name.clone())),
    }
}

/// A step that ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRun {
    pub index: usize,
    pub task: String,
    pub artifact: Option<PathBuf>,
}

/// Summary of one phase run for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: String,
    pub platform: Platform,
    pub ran: Vec<StepRun>,
    pub skipped: usize,
    /// The phase stopped early because a task (or the user) cancelled.
    pub cancelled: bool,
}

impl PhaseReport {
    pub fn artifacts(&self) -> impl Iterator<Item = &PathBuf> {
        self.ran.iter().filter_map(|r| r.artifact.as_ref())
    }
}

/// A step that would run, as reported by [`Pipeline::plan`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep<'p> {
    pub index: usize,
    pub platform: Platform,
    pub step: &'p StepRecord,
}

/// Drives phases against a set of registries.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'r> {
    registries: &'r Registries,
}

impl<'r> Pipeline<'r> {
    pub fn new(registries: &'r Registries) -> Self {
        Self { registries }
    }

    /// Run every step of `phase` for `platform`, strictly in order.
    pub async fn run_phase(
        &self,
        phase: &PhaseDescriptor,
        platform: Platform,
        ctx: &mut BuildContext,
    ) -> Result<PhaseReport> {
        phase.validate(self.registries)?;

        info!(phase = phase.name(), %platform, steps = phase.len(), "running phase");
        let mut report = PhaseReport {
            phase: phase.name().to_string(),
            platform,
            ran: Vec::new(),
            skipped: 0,
            cancelled: false,
        };

        for (index, step) in phase.steps().iter().enumerate() {
            if ctx.is_cancelled() {
                info!(phase = phase.name(), %platform, step = index, "phase cancelled");
                report.cancelled = true;
                break;
            }

            match decide(step, platform, &self.registries.predicates, ctx)? {
                Decision::SkipPlatform => {
                    report.skipped += 1;
                    continue;
                }
                Decision::SkipPredicate => {
                    debug!(
                        step = index,
                        task = %step.task,
                        predicate = step.predicate.as_deref().unwrap_or_default(),
                        "predicate false; skipping"
                    );
                    report.skipped += 1;
                    continue;
                }
                Decision::Run => {}
            }

            let task = self
                .registries
                .tasks
                .get(&step.task)
                .ok_or_else(|| PackflowError::UnknownTask(step.task.clone()))?;

            debug!(step = index, %platform, "{step}");
            let output = task.run(ctx, &step.args).await.inspect_err(|err| {
                warn!(
                    phase = phase.name(),
                    %platform,
                    step = index,
                    task = %step.task,
                    error = %err,
                    "task failed; aborting phase"
                );
            })?;

            match output {
                TaskOutput::Cancelled => {
                    info!(phase = phase.name(), task = %step.task, "task cancelled; stopping phase");
                    report.cancelled = true;
                    break;
                }
                TaskOutput::Done => report.ran.push(StepRun {
                    index,
                    task: step.task.clone(),
                    artifact: None,
                }),
                TaskOutput::Artifact(path) => report.ran.push(StepRun {
                    index,
                    task: step.task.clone(),
                    artifact: Some(path),
                }),
            }
        }

        info!(
            phase = phase.name(),
            %platform,
            ran = report.ran.len(),
            skipped = report.skipped,
            cancelled = report.cancelled,
            "phase finished"
        );
        Ok(report)
    }

    /// Run `phase` once per platform, one after the other. Stops after a
    /// cancelled platform run; an error aborts the remaining platforms.
    pub async fn run_phase_for_platforms(
        &self,
        phase: &PhaseDescriptor,
        platforms: &[Platform],
        ctx: &mut BuildContext,
    ) -> Result<Vec<PhaseReport>> {
        let mut reports = Vec::with_capacity(platforms.len());
        for &platform in platforms {
            let report = self.run_phase(phase, platform, ctx).await?;
            let stop = report.cancelled;
            reports.push(report);
            if stop {
                break;
            }
        }
        Ok(reports)
    }

    /// Steps of `phase` that would run for each platform, without running any
    /// task. Predicates are evaluated against the context as it is now.
    pub fn plan<'p>(
        &self,
        phase: &'p PhaseDescriptor,
        platforms: &[Platform],
        ctx: &BuildContext,
    ) -> Result<Vec<PlannedStep<'p>>> {
        phase.validate(self.registries)?;
        let mut planned = Vec::new();
        for &platform in platforms {
            for (index, step) in phase.steps().iter().enumerate() {
                if decide(step, platform, &self.registries.predicates, ctx)? == Decision::Run {
                    planned.push(PlannedStep {
                        index,
                        platform,
                        step,
                    });
                }
            }
        }
        Ok(planned)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::ToolSettings;
    use crate::types::PlatformSelector;

    fn ctx() -> BuildContext {
        BuildContext::new(json!({"name": "n", "uuid": "u"}), ToolSettings::default(), ".")
    }

    #[test]
    fn selector_is_checked_before_predicate() {
        let preds = PredicateRegistry::new();
        let step = StepRecord::new(Platform::Ios, "t").when("unregistered");
        // The predicate is unknown, but it is never looked up for android.
        assert_eq!(
            decide(&step, Platform::Android, &preds, &ctx()).unwrap(),
            Decision::SkipPlatform
        );
        assert!(decide(&step, Platform::Ios, &preds, &ctx()).is_err());
    }

    #[test]
    fn predicate_result_gates_run() {
        let mut preds = PredicateRegistry::new();
        preds.register("no", |_| false).unwrap();
        preds.register("yes", |_| true).unwrap();
        let c = ctx();
        let no = StepRecord::new(PlatformSelector::All, "t").when("no");
        let yes = StepRecord::new(PlatformSelector::All, "t").when("yes");
        assert_eq!(decide(&no, Platform::Web, &preds, &c).unwrap(), Decision::SkipPredicate);
        assert_eq!(decide(&yes, Platform::Web, &preds, &c).unwrap(), Decision::Run);
    }
}
