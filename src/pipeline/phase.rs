// src/pipeline/phase.rs

//! Phase descriptors and the builder that assembles them.

use crate::errors::{PackflowError, Result};

use super::registry::Registries;
use super::step::StepRecord;

/// An ordered list of steps. Order is significant.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseDescriptor {
    name: String,
    steps: Vec<StepRecord>,
}

impl PhaseDescriptor {
    pub fn new(name: impl Into<String>, steps: Vec<StepRecord>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check every referenced task and predicate exists and every task accepts
    /// its arguments. Runs before any step does.
    pub fn validate(&self, registries: &Registries) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(pred) = &step.predicate {
                if !registries.predicates.contains(pred) {
                    return Err(PackflowError::UnknownPredicate(pred.clone()));
                }
            }
            let task = registries
                .tasks
                .get(&step.task)
                .ok_or_else(|| PackflowError::UnknownTask(step.task.clone()))?;
            task.check_args(&step.args).map_err(|err| match err {
                PackflowError::Configuration(msg) => PackflowError::Configuration(format!(
                    "phase '{}', step {index}: {msg}",
                    self.name
                )),
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Collects steps from per-feature builder functions, in call order.
#[derive(Debug, Clone, Default)]
pub struct PhaseBuilder {
    name: String,
    steps: Vec<StepRecord>,
}

impl PhaseBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: StepRecord) -> Self {
        self.steps.push(step);
        self
    }

    pub fn extend(mut self, steps: impl IntoIterator<Item = StepRecord>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn build(self) -> PhaseDescriptor {
        PhaseDescriptor::new(self.name, self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::registry::TaskOutput;
    use crate::types::{Platform, PlatformSelector};

    fn registries() -> Registries {
        let mut r = Registries::new();
        r.tasks.register_fn("a", |_, _| Ok(TaskOutput::Done)).unwrap();
        r.predicates.register("yes", |_| true).unwrap();
        r
    }

    #[test]
    fn builder_keeps_feature_order() {
        let phase = PhaseBuilder::new("p")
            .extend([StepRecord::new(Platform::Android, "a")])
            .step(StepRecord::new(PlatformSelector::All, "a").when("yes"))
            .build();
        assert_eq!(phase.len(), 2);
        assert_eq!(phase.steps()[1].predicate.as_deref(), Some("yes"));
        phase.validate(&registries()).unwrap();
    }

    #[test]
    fn validate_reports_unknown_names() {
        let r = registries();
        let bad_task = PhaseBuilder::new("p")
            .step(StepRecord::new(PlatformSelector::All, "missing"))
            .build();
        assert!(matches!(
            bad_task.validate(&r),
            Err(PackflowError::UnknownTask(name)) if name == "missing"
        ));

        let bad_pred = PhaseBuilder::new("p")
            .step(StepRecord::new(PlatformSelector::All, "a").when("nope"))
            .build();
        assert!(matches!(
            bad_pred.validate(&r),
            Err(PackflowError::UnknownPredicate(name)) if name == "nope"
        ));
    }
}
