#![cfg(unix)]

mod common;
use crate::common::{ContextBuilder, RecordingSink, init_tracing, with_timeout};

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use packflow::errors::PackflowError;
use packflow::phases::{self, PhaseName, PhaseOptions};
use packflow::pipeline::{Pipeline, Registries};
use packflow::types::Platform;

fn script(root: &Path, hook: &str, name: &str, body: &str) {
    let dir = root.join("hooks").join(hook);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn hook_options(hook: &str) -> PhaseOptions {
    PhaseOptions {
        hook: Some(hook.to_string()),
        hook_dir: "development".to_string(),
        ..PhaseOptions::default()
    }
}

#[tokio::test]
async fn hook_scripts_run_in_name_order_inside_the_target_dir() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("development")).unwrap();
    script(root, "prebuild", "02-second.sh", "echo second >> order.txt");
    script(root, "prebuild", "01-first.sh", "echo first >> order.txt");
    fs::write(root.join("hooks/prebuild/README"), "not a script").unwrap();

    let sink = RecordingSink::new();
    let registries = Registries::builtin().unwrap();
    let phase = phases::build_phase(PhaseName::Hook, &hook_options("prebuild")).unwrap();
    let mut ctx = ContextBuilder::new()
        .orig_wd(root)
        .sink(sink.clone())
        .build();

    with_timeout(
        Duration::from_secs(10),
        Pipeline::new(&registries).run_phase(&phase, Platform::Android, &mut ctx),
    )
    .await
    .unwrap();

    let order = fs::read_to_string(root.join("development/order.txt")).unwrap();
    assert_eq!(order, "first\nsecond\n");
    assert!(sink.contains("Running: "));
}

#[tokio::test]
async fn failing_hook_script_fails_the_phase() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("development")).unwrap();
    script(root, "postbuild", "01-broken.sh", "exit 4");
    script(root, "postbuild", "02-never.sh", "touch ran.txt");

    let registries = Registries::builtin().unwrap();
    let phase = phases::build_phase(PhaseName::Hook, &hook_options("postbuild")).unwrap();
    let mut ctx = ContextBuilder::new().orig_wd(root).build();

    let err = Pipeline::new(&registries)
        .run_phase(&phase, Platform::Ios, &mut ctx)
        .await
        .unwrap_err();

    assert!(
        matches!(err, PackflowError::Configuration(ref msg) if msg.contains("01-broken.sh"))
    );
    assert!(!root.join("development/ran.txt").exists());
}

#[tokio::test]
async fn missing_hook_directory_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let registries = Registries::builtin().unwrap();
    let phase = phases::build_phase(PhaseName::Hook, &hook_options("nothing")).unwrap();
    let mut ctx = ContextBuilder::new().orig_wd(dir.path()).build();

    let report = Pipeline::new(&registries)
        .run_phase(&phase, Platform::Web, &mut ctx)
        .await
        .unwrap();
    assert_eq!(report.ran.len(), 1);
}
