mod common;
use crate::common::{FakeProcess, FakeService, with_timeout};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use packflow::exec::{CommandError, Escalation, RetryPolicy, escalate, probe_with_retry};

fn quick_policy(retries: u32) -> RetryPolicy {
    RetryPolicy {
        retries,
        pause: Duration::from_millis(1),
        restart_after: 1,
    }
}

#[tokio::test]
async fn escalation_stops_at_the_first_honoured_step() {
    let mut process = FakeProcess::honoring(Escalation::Terminate);
    let how = escalate(&mut process, Duration::from_millis(10)).await;

    assert_eq!(how, Some(Escalation::Terminate));
    assert_eq!(
        process.delivered,
        vec![Escalation::Interrupt, Escalation::Terminate]
    );
}

#[tokio::test]
async fn undeliverable_step_is_skipped() {
    let mut process =
        FakeProcess::honoring(Escalation::Terminate).refusing(Escalation::Interrupt);
    let how = escalate(&mut process, Duration::from_millis(10)).await;

    assert_eq!(how, Some(Escalation::Terminate));
    assert_eq!(process.delivered, vec![Escalation::Terminate]);
}

#[tokio::test]
async fn stubborn_process_gets_every_step() {
    let mut process = FakeProcess::stubborn();
    let how = escalate(&mut process, Duration::from_millis(10)).await;

    assert_eq!(how, None);
    assert_eq!(process.delivered, Escalation::ORDER.to_vec());
}

#[tokio::test]
async fn probe_returns_first_non_empty_result_without_restart() {
    let service = FakeService::new();
    let calls = AtomicUsize::new(0);

    let found = probe_with_retry(quick_policy(3), &service, || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, CommandError>(if n == 0 { vec!["device-1"] } else { vec![] }) }
    })
    .await
    .unwrap();

    assert_eq!(found, vec!["device-1"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.restarts(), 0);
}

#[tokio::test]
async fn probe_restarts_the_service_once_after_an_empty_retry() {
    let service = FakeService::new();
    let calls = AtomicUsize::new(0);

    let found = with_timeout(
        Duration::from_secs(5),
        probe_with_retry(quick_policy(3), &service, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, CommandError>(if n >= 2 {
                    vec!["emulator-5554".to_string()]
                } else {
                    Vec::new()
                })
            }
        }),
    )
    .await
    .unwrap();

    assert_eq!(found, vec!["emulator-5554".to_string()]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(service.restarts(), 1);
}

#[tokio::test]
async fn probe_gives_up_after_the_retry_budget() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("helper.pid");
    let service = FakeService::with_marker(&marker);
    let calls = AtomicUsize::new(0);

    let found = probe_with_retry(quick_policy(2), &service, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<Vec<String>, CommandError>(Vec::new()) }
    })
    .await
    .unwrap();

    assert!(found.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(service.restarts(), 1);
    assert!(marker.exists());
}

#[tokio::test]
async fn probe_errors_end_the_loop() {
    let service = FakeService::new();
    let err = probe_with_retry(quick_policy(3), &service, || async {
        Err::<Vec<String>, _>(CommandError::Worker {
            program: "adb".into(),
            message: "gone".into(),
        })
    })
    .await
    .unwrap_err();

    assert!(matches!(err, CommandError::Worker { .. }));
    assert_eq!(service.stops(), 0);
}
