// src/config/settings.rs

//! Machine-local tool settings with dotted lookups (`android.sdk`).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::ToolSettingsFile;
use crate::errors::{PackflowError, Result};

/// Typed view plus the raw TOML table it was derived from.
///
/// The raw table is kept so unknown keys survive `set_dotted` + `save`.
#[derive(Debug, Clone, Default)]
pub struct ToolSettings {
    pub file: ToolSettingsFile,
    raw: toml::Table,
    path: Option<PathBuf>,
}

impl ToolSettings {
    pub fn from_table(raw: toml::Table, path: Option<PathBuf>) -> Result<Self> {
        let file: ToolSettingsFile = toml::Value::Table(raw.clone()).try_into()?;
        Ok(Self { file, raw, path })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a dotted key such as `android.sdk`.
    pub fn get_dotted(&self, key: &str) -> Option<&toml::Value> {
        let mut parts = key.split('.');
        let first = self.raw.get(parts.next()?)?;
        parts.try_fold(first, |current, part| current.as_table()?.get(part))
    }

    /// Convenience: dotted lookup of a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get_dotted(key).and_then(|v| v.as_str())
    }

    /// Set a dotted key, creating intermediate tables as needed.
    ///
    /// Fails if an intermediate key exists but is not a table.
    pub fn set_dotted(&mut self, key: &str, value: toml::Value) -> Result<()> {
        let crumbs: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = crumbs.split_last() else {
            return Err(PackflowError::config("empty tool setting key"));
        };
        if crumbs.iter().any(|c| c.is_empty()) {
            return Err(PackflowError::config(format!(
                "invalid tool setting key '{key}'"
            )));
        }

        let mut level = &mut self.raw;
        for crumb in parents {
            let entry = level
                .entry(crumb.to_string())
                .or_insert(toml::Value::Table(toml::Table::new()));
            level = entry.as_table_mut().ok_or_else(|| {
                PackflowError::config(format!(
                    "tool setting '{crumb}' in '{key}' is not a table"
                ))
            })?;
        }
        level.insert(last.to_string(), value);

        self.file = toml::Value::Table(self.raw.clone()).try_into()?;
        Ok(())
    }

    /// Write the settings back to the file they were loaded from.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Err(PackflowError::config(
                "tool settings were not loaded from a file; nowhere to save",
            ));
        };
        let text = toml::to_string(&self.raw).map_err(anyhow::Error::from)?;
        fs::write(path, text)?;
        info!(path = %path.display(), "saved tool settings");
        Ok(())
    }

    /// Set a dotted key and persist it immediately.
    pub fn set_and_save(&mut self, key: &str, value: toml::Value) -> Result<()> {
        info!(key, %value, "saving tool setting");
        self.set_dotted(key, value)?;
        self.save()
    }
}
