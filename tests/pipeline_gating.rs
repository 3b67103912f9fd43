mod common;
use crate::common::{
    CancellingTask, ContextBuilder, FailingTask, JournalTask, RejectingTask, counting_registries,
    init_tracing, phase, step,
};

use std::error::Error;
use std::sync::{Arc, Mutex};

use packflow::errors::PackflowError;
use packflow::exec::CancelFlag;
use packflow::pipeline::{Pipeline, Registries};
use packflow::types::Platform;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn steps_run_only_for_matching_platforms() -> TestResult {
    init_tracing();
    let (registries, handles) = counting_registries(&["everywhere", "mobile", "browser"], &[]);
    let ph = phase(
        "gating",
        [
            step("all", "everywhere"),
            step("android,ios", "mobile"),
            step("chrome,firefox,safari,ie", "browser"),
        ],
    );
    let mut ctx = ContextBuilder::new().build();
    let pipeline = Pipeline::new(&registries);

    let reports = pipeline
        .run_phase_for_platforms(&ph, &[Platform::Android, Platform::Chrome], &mut ctx)
        .await?;

    assert_eq!(reports.len(), 2);
    assert_eq!(handles[0].calls(), 2);
    assert_eq!(handles[1].calls(), 1);
    assert_eq!(handles[2].calls(), 1);
    assert_eq!(reports[0].ran.len(), 2);
    assert_eq!(reports[0].skipped, 1);
    Ok(())
}

#[tokio::test]
async fn false_predicate_means_zero_calls() -> TestResult {
    init_tracing();
    let (registries, handles) =
        counting_registries(&["gated", "open"], &[("never", false), ("always", true)]);
    let ph = phase(
        "predicates",
        [
            step("all", "gated").when("never"),
            step("all", "open").when("always"),
        ],
    );
    let mut ctx = ContextBuilder::new().build();

    let report = Pipeline::new(&registries)
        .run_phase(&ph, Platform::Web, &mut ctx)
        .await?;

    assert_eq!(handles[0].calls(), 0);
    assert_eq!(handles[1].calls(), 1);
    assert_eq!(report.skipped, 1);
    Ok(())
}

#[tokio::test]
async fn steps_run_in_declaration_order() -> TestResult {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let mut registries = Registries::new();
    registries
        .tasks
        .register("note", JournalTask::new("note", journal.clone()))?;

    let ph = phase(
        "order",
        ["first", "second", "third"]
            .into_iter()
            .map(|label| step("all", "note").kwarg("label", label)),
    );
    let mut ctx = ContextBuilder::new().build();
    Pipeline::new(&registries)
        .run_phase(&ph, Platform::Ios, &mut ctx)
        .await?;

    assert_eq!(*journal.lock().unwrap(), vec!["first", "second", "third"]);
    Ok(())
}

#[tokio::test]
async fn unknown_names_fail_before_anything_runs() {
    let (registries, handles) = counting_registries(&["counted"], &[]);
    let mut ctx = ContextBuilder::new().build();
    let pipeline = Pipeline::new(&registries);

    let missing_task = phase("bad", [step("all", "counted"), step("all", "nope")]);
    let err = pipeline
        .run_phase(&missing_task, Platform::Android, &mut ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, PackflowError::UnknownTask(name) if name == "nope"));

    let missing_predicate = phase(
        "bad",
        [step("all", "counted"), step("all", "counted").when("mystery")],
    );
    let err = pipeline
        .run_phase(&missing_predicate, Platform::Android, &mut ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, PackflowError::UnknownPredicate(name) if name == "mystery"));

    assert_eq!(handles[0].calls(), 0);
}

#[tokio::test]
async fn rejected_arguments_fail_before_anything_runs() {
    let (mut registries, handles) = counting_registries(&["counted"], &[]);
    registries.tasks.register("picky", RejectingTask).unwrap();
    let ph = phase("bad", [step("all", "counted"), step("all", "picky")]);
    let mut ctx = ContextBuilder::new().build();

    let err = Pipeline::new(&registries)
        .run_phase(&ph, Platform::Wp, &mut ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, PackflowError::Configuration(msg) if msg.contains("rejected")));
    assert_eq!(handles[0].calls(), 0);
}

#[tokio::test]
async fn failing_task_aborts_the_rest_of_the_phase() {
    let (mut registries, handles) = counting_registries(&["before", "after"], &[]);
    registries.tasks.register("fails", FailingTask).unwrap();
    let ph = phase(
        "abort",
        [step("all", "before"), step("all", "fails"), step("all", "after")],
    );
    let mut ctx = ContextBuilder::new().build();

    let result = Pipeline::new(&registries)
        .run_phase_for_platforms(&ph, &[Platform::Android, Platform::Ios], &mut ctx)
        .await;

    assert!(result.is_err());
    assert_eq!(handles[0].calls(), 1);
    assert_eq!(handles[1].calls(), 0);
}

#[tokio::test]
async fn cancelled_task_stops_the_phase_without_error() -> TestResult {
    let (mut registries, handles) = counting_registries(&["after"], &[]);
    registries.tasks.register("interrupted", CancellingTask)?;
    let ph = phase("cancel", [step("all", "interrupted"), step("all", "after")]);
    let mut ctx = ContextBuilder::new().build();

    let reports = Pipeline::new(&registries)
        .run_phase_for_platforms(&ph, &[Platform::Android, Platform::Ios], &mut ctx)
        .await?;

    assert_eq!(reports.len(), 1);
    assert!(reports[0].cancelled);
    assert_eq!(handles[0].calls(), 0);
    Ok(())
}

#[tokio::test]
async fn raised_cancel_flag_stops_before_the_next_step() -> TestResult {
    let (registries, handles) = counting_registries(&["counted"], &[]);
    let flag = CancelFlag::new();
    flag.cancel();
    let mut ctx = ContextBuilder::new().cancel(Arc::new(flag)).build();

    let report = Pipeline::new(&registries)
        .run_phase(&phase("p", [step("all", "counted")]), Platform::Web, &mut ctx)
        .await?;

    assert!(report.cancelled);
    assert_eq!(handles[0].calls(), 0);
    Ok(())
}

#[test]
fn plan_lists_gated_steps_without_running_them() -> TestResult {
    let (registries, handles) =
        counting_registries(&["a", "b"], &[("yes", true), ("no", false)]);
    let ph = phase(
        "plan",
        [
            step("android", "a").when("yes"),
            step("all", "b").when("no"),
            step("ios", "b"),
        ],
    );
    let ctx = ContextBuilder::new().build();

    let planned =
        Pipeline::new(&registries).plan(&ph, &[Platform::Android, Platform::Ios], &ctx)?;

    let shape: Vec<(Platform, usize)> = planned.iter().map(|p| (p.platform, p.index)).collect();
    assert_eq!(shape, vec![(Platform::Android, 0), (Platform::Ios, 2)]);
    assert_eq!(handles[0].calls() + handles[1].calls(), 0);
    Ok(())
}
