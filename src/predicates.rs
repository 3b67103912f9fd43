// src/predicates.rs

//! Built-in predicates. All of them only read the build context.

use serde_json::Value;

use crate::errors::Result;
use crate::pipeline::{BuildContext, PredicateRegistry};

/// Icon sizes each platform needs before its icons are copied.
const ICON_SIZES: &[(&str, &[&str])] = &[
    ("android", &["36", "48", "72"]),
    ("ios", &["57", "72", "114"]),
    ("firefox", &["32", "64"]),
    ("safari", &["32", "48", "64"]),
    ("wp", &["62", "99", "173"]),
];

fn module<'c>(ctx: &'c BuildContext, name: &str) -> Option<&'c Value> {
    ctx.modules().and_then(|m| m.get(name))
}

fn has_key(value: Option<&Value>, key: &str) -> bool {
    value
        .and_then(Value::as_object)
        .is_some_and(|m| m.contains_key(key))
}

/// Every size is set either generically (`icons.<size>`) or for the
/// platform (`icons.<platform>.<size>`).
pub fn have_icons(ctx: &BuildContext, platform: &str, sizes: &[&str]) -> bool {
    let Some(icons) = module(ctx, "icons") else {
        return false;
    };
    let per_platform = icons.get(platform);
    sizes
        .iter()
        .all(|size| has_key(Some(icons), size) || has_key(per_platform, size))
}

/// Every named launch image is present.
pub fn have_launch_images(ctx: &BuildContext, names: &[&str]) -> bool {
    let images = module(ctx, "launchimage");
    images.is_some() && names.iter().all(|name| has_key(images, name))
}

/// Register every built-in predicate.
pub fn register_builtin(predicates: &mut PredicateRegistry) -> Result<()> {
    predicates.register("is_external", |ctx| ctx.flags.external)?;
    predicates.register("do_package", |ctx| ctx.flags.package)?;

    for (platform, sizes) in ICON_SIZES {
        predicates.register(format!("have_{platform}_icons"), move |ctx| {
            have_icons(ctx, platform, sizes)
        })?;
    }

    predicates.register("have_ios_launch", |ctx| {
        have_launch_images(ctx, &["iphone", "iphone-retina", "ipad", "ipad-landscape"])
    })?;
    predicates.register("have_android_launch", |ctx| {
        have_launch_images(ctx, &["android", "android-landscape"])
    })?;
    predicates.register("have_wp_launch", |ctx| {
        have_launch_images(ctx, &["wp", "wp-landscape"])
    })?;

    for name in ["topbar", "tabbar", "payments"] {
        predicates.register(format!("module_{name}_enabled"), move |ctx| {
            ctx.has_module(name)
        })?;
    }

    predicates.register("include_gmail", |ctx| ctx.has_module("gmail"))?;
    predicates.register("include_jquery", |ctx| ctx.has_module("jquery"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::ToolSettings;

    fn ctx(modules: Value) -> BuildContext {
        BuildContext::new(
            json!({"name": "n", "uuid": "u", "modules": modules}),
            ToolSettings::default(),
            ".",
        )
    }

    #[test]
    fn icons_may_be_generic_or_per_platform() {
        let generic = ctx(json!({"icons": {"36": "a", "48": "b", "72": "c"}}));
        assert!(have_icons(&generic, "android", &["36", "48", "72"]));

        let mixed = ctx(json!({"icons": {"36": "a", "android": {"48": "b", "72": "c"}}}));
        assert!(have_icons(&mixed, "android", &["36", "48", "72"]));

        let partial = ctx(json!({"icons": {"36": "a"}}));
        assert!(!have_icons(&partial, "android", &["36", "48", "72"]));
        assert!(!have_icons(&ctx(json!({})), "android", &["36"]));
    }

    #[test]
    fn registry_answers_module_checks() {
        let mut preds = PredicateRegistry::new();
        register_builtin(&mut preds).unwrap();
        let c = ctx(json!({"topbar": {}, "launchimage": {"android": "a", "android-landscape": "b"}}));
        assert_eq!(preds.evaluate("module_topbar_enabled", &c), Some(true));
        assert_eq!(preds.evaluate("module_tabbar_enabled", &c), Some(false));
        assert_eq!(preds.evaluate("have_android_launch", &c), Some(true));
        assert_eq!(preds.evaluate("have_ios_launch", &c), Some(false));
        assert_eq!(preds.evaluate("is_external", &c), Some(false));
        assert_eq!(preds.evaluate("no_such_predicate", &c), None);
    }
}
