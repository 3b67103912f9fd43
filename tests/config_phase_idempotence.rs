mod common;
use crate::common::ContextBuilder;

use proptest::prelude::*;
use serde_json::{Value, json};

use packflow::phases;
use packflow::pipeline::{PhaseBuilder, Pipeline, Registries};
use packflow::types::Platform;

fn url_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}\\.js",
        "/[a-z]{1,8}/[a-z]{1,8}\\.css",
        "https://[a-z]{1,8}\\.com/[a-z]{1,8}\\.js",
        "src/[a-z]{1,8}\\.png",
    ]
}

fn modules_strategy() -> impl Strategy<Value = Value> {
    (
        proptest::collection::vec(url_strategy(), 0..4),
        proptest::collection::vec(url_strategy(), 0..3),
        proptest::option::of(url_strategy()),
    )
        .prop_map(|(scripts, icons, popup)| {
            let mut icon_map = serde_json::Map::new();
            for (size, icon) in ["36", "48", "72"].iter().zip(icons) {
                icon_map.insert(size.to_string(), json!(icon));
            }
            let mut modules = json!({
                "activations": [{"patterns": ["http://*/*"], "scripts": scripts}],
                "icons": icon_map,
            });
            if let Some(popup) = popup {
                modules["button"] = json!({"default_popup": popup});
            }
            modules
        })
}

proptest! {
    // Config-deriving phases must be safe to run again on their own output.
    #[test]
    fn config_deriving_phase_is_idempotent(
        modules in modules_strategy(),
        name in "[A-Za-z '\"]{1,16}",
        uuid in "[0-9a-f]{8}",
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let registries = Registries::builtin().unwrap();
        let phase = PhaseBuilder::new("derive")
            .extend(phases::resolve_urls().unwrap())
            .step(
                packflow::pipeline::StepRecord::new(Platform::Android, "populate_icons")
                    .arg("android")
                    .arg(json!([36, 48, 72])),
            )
            .extend(phases::include_name().unwrap().into_iter().filter(|s| s.task.starts_with("populate")))
            .extend(phases::include_uuid().unwrap().into_iter().filter(|s| s.task.starts_with("populate")))
            .build();

        let mut ctx = ContextBuilder::new()
            .config(json!({"name": name, "uuid": uuid, "modules": modules}))
            .build();
        let pipeline = Pipeline::new(&registries);

        rt.block_on(pipeline.run_phase(&phase, Platform::Android, &mut ctx)).unwrap();
        let once = ctx.config.clone();
        rt.block_on(pipeline.run_phase(&phase, Platform::Android, &mut ctx)).unwrap();

        prop_assert_eq!(once, ctx.config);
    }
}
