// src/tasks/config_tasks.rs

//! Tasks that derive values and write them back into the config tree.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{PackflowError, Result};
use crate::pipeline::{Arg, BuildContext, StepArgs, TaskOutput};

/// Prefix given to relative URLs by `resolve_urls`.
pub const SOURCE_PREFIX: &str = "src";

pub fn check_resolve_urls(args: &StepArgs) -> Result<()> {
    for (index, arg) in args.positional().iter().enumerate() {
        if arg.as_path().is_none() {
            return Err(PackflowError::config(format!(
                "resolve_urls: argument {index} must be a config path, got {arg}"
            )));
        }
    }
    Ok(())
}

/// `resolve_urls(path, ...)`: prefix relative URLs found at each config path
/// with `src/`.
pub fn resolve_urls(ctx: &mut BuildContext, args: &StepArgs) -> Result<TaskOutput> {
    check_resolve_urls(args)?;
    for path in args.positional().iter().filter_map(Arg::as_path) {
        debug!(%path, "resolving urls");
        ctx.transform_config(path, |value| resolve_url(value, SOURCE_PREFIX))?;
    }
    Ok(TaskOutput::Done)
}

/// Leave absolute (`http://`, `https://`) and already prefixed URLs alone;
/// prefix everything else. Non-strings pass through untouched.
pub fn resolve_url(value: Value, prefix: &str) -> Value {
    let Value::String(url) = value else {
        return value;
    };
    if url.starts_with("http://") || url.starts_with("https://") || url.starts_with(prefix) {
        Value::String(url)
    } else if url.starts_with('/') {
        Value::String(format!("{prefix}{url}"))
    } else {
        Value::String(format!("{prefix}/{url}"))
    }
}

pub fn check_populate_icons(args: &StepArgs) -> Result<()> {
    args.positional_str("populate_icons", 0)?;
    icon_sizes(args)?;
    Ok(())
}

fn icon_sizes(args: &StepArgs) -> Result<Vec<String>> {
    let bad = || {
        PackflowError::config("populate_icons: argument 1 must be a list of icon sizes")
    };
    let list = args
        .positional()
        .get(1)
        .and_then(Arg::as_value)
        .and_then(Value::as_array)
        .ok_or_else(bad)?;
    list.iter()
        .map(|size| match size {
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => Ok(s.clone()),
            _ => Err(bad()),
        })
        .collect()
}

/// `populate_icons(platform, [sizes])`: copy generic `modules.icons.<size>`
/// entries into `modules.icons.<platform>.<size>` unless already set there.
pub fn populate_icons(ctx: &mut BuildContext, args: &StepArgs) -> Result<TaskOutput> {
    let platform = args.positional_str("populate_icons", 0)?.to_string();
    let sizes = icon_sizes(args)?;

    let modules = ctx.modules_mut()?;
    let Some(icons) = modules.get_mut("icons").and_then(Value::as_object_mut) else {
        // No icons configured is valid.
        return Ok(TaskOutput::Done);
    };

    let generic: Map<String, Value> = icons.clone();
    let per_platform = icons
        .entry(platform.clone())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| {
            PackflowError::config(format!("modules.icons.{platform} must be an object"))
        })?;

    for size in sizes {
        if per_platform.contains_key(&size) {
            continue;
        }
        match generic.get(&size) {
            Some(icon) => {
                per_platform.insert(size, icon.clone());
            }
            None => warn!("missing icon \"{size}\" for platform \"{platform}\""),
        }
    }
    Ok(TaskOutput::Done)
}

fn app_name(ctx: &BuildContext) -> Result<String> {
    ctx.config_str("name")
        .map(str::to_string)
        .ok_or_else(|| PackflowError::config("app config has no 'name'"))
}

fn app_uuid(ctx: &BuildContext) -> Result<String> {
    ctx.config_str("uuid")
        .map(str::to_string)
        .ok_or_else(|| PackflowError::config("app config has no 'uuid'"))
}

fn set_top_level(ctx: &mut BuildContext, key: &str, value: String) -> Result<()> {
    ctx.config
        .as_object_mut()
        .ok_or_else(|| PackflowError::config("app config must be an object"))?
        .insert(key.to_string(), Value::String(value));
    Ok(())
}

/// Sets `xml_safe_name`: the app name with both quote kinds escaped.
pub fn populate_xml_safe_name(ctx: &mut BuildContext, _args: &StepArgs) -> Result<TaskOutput> {
    let safe = app_name(ctx)?.replace('"', "\\\"").replace('\'', "\\'");
    set_top_level(ctx, "xml_safe_name", safe)?;
    Ok(TaskOutput::Done)
}

/// Sets `json_safe_name`: the app name with double quotes escaped.
pub fn populate_json_safe_name(ctx: &mut BuildContext, _args: &StepArgs) -> Result<TaskOutput> {
    let safe = app_name(ctx)?.replace('"', "\\\"");
    set_top_level(ctx, "json_safe_name", safe)?;
    Ok(TaskOutput::Done)
}

/// Lowercased app name stripped to ASCII alphanumerics, followed by the uuid.
pub fn package_name(name: &str, uuid: &str) -> String {
    let mut out: String = name
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    out.push_str(uuid);
    out
}

/// Sets `package_name` and fills `modules.package_names.<platform>` for every
/// platform that has a derived identifier. Existing entries are kept.
pub fn populate_package_names(ctx: &mut BuildContext, _args: &StepArgs) -> Result<TaskOutput> {
    let uuid = app_uuid(ctx)?;
    let package = package_name(&app_name(ctx)?, &uuid);
    set_top_level(ctx, "package_name", package.clone())?;

    let derived = [
        ("android", format!("io.trigger.forge{uuid}")),
        ("firefox", uuid.clone()),
        ("safari", format!("forge.safari.{package}")),
        ("ios", format!("io.trigger.forge{uuid}")),
        ("ie", format!("{{{uuid}}}")),
    ];

    let names = ctx
        .modules_mut()?
        .entry("package_names")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| PackflowError::config("modules.package_names must be an object"))?;
    for (platform, value) in derived {
        names
            .entry(platform)
            .or_insert_with(|| Value::String(value));
    }
    Ok(TaskOutput::Done)
}
