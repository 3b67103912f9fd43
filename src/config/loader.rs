// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::config::settings::ToolSettings;
use crate::config::validate::validate_app_config;
use crate::errors::Result;

/// Load the app configuration tree from a JSON file.
///
/// This only performs JSON deserialization; use [`load_and_validate_app`]
/// for the checks the pipeline relies on.
pub fn load_app_config(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let tree: Value = serde_json::from_str(&contents)?;
    Ok(tree)
}

/// Load the app configuration and validate it.
///
/// - Reads JSON.
/// - Checks the top level is a mapping with string `name` and `uuid`.
/// - Inserts an empty `modules` mapping when absent.
pub fn load_and_validate_app(path: impl AsRef<Path>) -> Result<Value> {
    let mut tree = load_app_config(&path)?;
    validate_app_config(&mut tree)?;
    debug!(path = %path.as_ref().display(), "loaded app config");
    Ok(tree)
}

/// Load machine-local tool settings from TOML.
///
/// A missing file is not an error: defaults are used and the path is
/// remembered so a later `save` creates it.
pub fn load_tool_settings(path: impl AsRef<Path>) -> Result<ToolSettings> {
    let path = path.as_ref();
    let raw: toml::Table = if path.exists() {
        toml::from_str(&fs::read_to_string(path)?)?
    } else {
        debug!(path = %path.display(), "no tool settings file; using defaults");
        toml::Table::new()
    };
    ToolSettings::from_table(raw, Some(path.to_path_buf()))
}

/// Default app config location, relative to the working directory.
pub fn default_app_config_path() -> PathBuf {
    PathBuf::from("src").join("config.json")
}

/// Default tool settings location, relative to the working directory.
pub fn default_tool_settings_path() -> PathBuf {
    PathBuf::from("local_config.toml")
}
