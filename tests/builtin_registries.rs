mod common;
use crate::common::{ContextBuilder, CountingTask};

use packflow::errors::PackflowError;
use packflow::phases::{self, PhaseName, PhaseOptions};
use packflow::pipeline::{Pipeline, Registries, TaskRegistry};
use packflow::types::Platform;

#[test]
fn registering_a_name_twice_is_rejected() {
    let mut tasks = TaskRegistry::new();
    tasks.register("copy", CountingTask::new()).unwrap();
    let err = tasks.register("copy", CountingTask::new()).unwrap_err();
    assert!(matches!(
        err,
        PackflowError::DuplicateRegistration { kind: "task", ref name } if name == "copy"
    ));
    assert_eq!(tasks.len(), 1);

    let mut registries = Registries::builtin().unwrap();
    let err = registries
        .predicates
        .register("is_external", |_| true)
        .unwrap_err();
    assert!(matches!(err, PackflowError::DuplicateRegistration { kind: "predicate", .. }));
}

#[test]
fn builtin_registries_cover_every_named_phase() {
    let registries = Registries::builtin().unwrap();
    for task in [
        "copy_files",
        "rename_files",
        "remove_files",
        "find_and_replace",
        "find_and_replace_in_dir",
        "resolve_urls",
        "populate_icons",
        "populate_xml_safe_name",
        "populate_json_safe_name",
        "populate_package_names",
        "run_hook",
        "run_android",
    ] {
        assert!(registries.tasks.contains(task), "missing task {task}");
    }

    let opts = PhaseOptions {
        src: "src".into(),
        hook: Some("postbuild".into()),
        hook_dir: "development".into(),
        ..PhaseOptions::default()
    };
    for name in [PhaseName::Generate, PhaseName::Run, PhaseName::Hook] {
        let phase = phases::build_phase(name, &opts).unwrap();
        phase.validate(&registries).unwrap();
    }
}

#[test]
fn icon_copies_are_planned_only_when_icons_are_configured() {
    let registries = Registries::builtin().unwrap();
    let phase = packflow::pipeline::PhaseBuilder::new("icons")
        .extend(phases::include_icons(false))
        .build();
    let pipeline = Pipeline::new(&registries);

    let bare = ContextBuilder::new().build();
    let planned = pipeline.plan(&phase, &[Platform::Android], &bare).unwrap();
    assert!(planned.iter().all(|p| p.step.task != "copy_files"));

    let with_icons = ContextBuilder::new()
        .module("icons", serde_json::json!({"36": "a.png", "48": "b.png", "72": "c.png"}))
        .build();
    let planned = pipeline
        .plan(&phase, &[Platform::Android], &with_icons)
        .unwrap();
    let copies = planned
        .iter()
        .filter(|p| p.step.task == "copy_files")
        .count();
    assert_eq!(copies, 3);
}
