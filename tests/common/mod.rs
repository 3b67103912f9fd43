#![allow(dead_code)]

pub use packflow_test_utils::builders::{ContextBuilder, phase, step};
pub use packflow_test_utils::fakes::{
    CancellingTask, CountingTask, FailingTask, FakeProcess, FakeService, JournalTask,
    RecordingSink, RejectingTask,
};
pub use packflow_test_utils::{init_tracing, with_timeout};

use packflow::pipeline::Registries;

/// Registries holding one counting task per name and the given predicates.
pub fn counting_registries(
    tasks: &[&str],
    predicates: &[(&'static str, bool)],
) -> (Registries, Vec<CountingTask>) {
    let mut registries = Registries::new();
    let mut handles = Vec::new();
    for name in tasks {
        let task = CountingTask::new();
        handles.push(task.clone());
        registries.tasks.register(*name, task).unwrap();
    }
    for &(name, answer) in predicates {
        registries
            .predicates
            .register(name, move |_ctx| answer)
            .unwrap();
    }
    (registries, handles)
}
