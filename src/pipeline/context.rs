// src/pipeline/context.rs

//! The per-run build context shared by every step of a phase.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::{ConfigPath, ToolSettings, transform_in_place};
use crate::errors::{PackflowError, Result};
use crate::exec::{CancelCheck, LogSink, Supervisor, TracingSink};
use crate::template;
use crate::types::RunFlags;

/// Everything a task may read or mutate during one run.
///
/// The config tree is the single source of truth: tasks write derived values
/// (package names, resolved icon paths, ...) back into it in place.
pub struct BuildContext {
    pub config: Value,
    pub tools: ToolSettings,
    /// Directory the run was started from.
    pub orig_wd: PathBuf,
    pub flags: RunFlags,
    log: Arc<dyn LogSink>,
    cancel: Option<Arc<dyn CancelCheck>>,
}

impl BuildContext {
    pub fn new(config: Value, tools: ToolSettings, orig_wd: impl Into<PathBuf>) -> Self {
        Self {
            config,
            tools,
            orig_wd: orig_wd.into(),
            flags: RunFlags::default(),
            log: Arc::new(TracingSink),
            cancel: None,
        }
    }

    pub fn with_flags(mut self, flags: RunFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log = sink;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<dyn CancelCheck>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.log
    }

    pub fn cancel_check(&self) -> Option<&Arc<dyn CancelCheck>> {
        self.cancel.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    /// A supervisor configured from the `[supervisor]` tool settings, logging
    /// to this context's sink.
    pub fn supervisor(&self) -> Supervisor {
        Supervisor::with_settings(self.log.clone(), &self.tools.file.supervisor)
    }

    /// Resolve `parts` against the original working directory and normalise
    /// `.` and `..` lexically. Absolute parts replace what came before.
    pub fn expand_path<I, P>(&self, parts: I) -> PathBuf
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut joined = self.orig_wd.clone();
        for part in parts {
            joined.push(part);
        }
        normalize(&joined)
    }

    /// Render a `${...}` template against the current config tree.
    pub fn render(&self, text: &str) -> Result<String> {
        Ok(template::render(text, &self.config)?)
    }

    /// Rewrite the config tree in place at every match of `path`.
    pub fn transform_config<F>(&mut self, path: &ConfigPath, f: F) -> Result<()>
    where
        F: FnMut(Value) -> Value,
    {
        Ok(transform_in_place(&mut self.config, path, f)?)
    }

    /// Top-level string value, if present.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn modules(&self) -> Option<&Map<String, Value>> {
        self.config.get("modules").and_then(Value::as_object)
    }

    pub fn modules_mut(&mut self) -> Result<&mut Map<String, Value>> {
        let root = self
            .config
            .as_object_mut()
            .ok_or_else(|| PackflowError::config("app config must be an object"))?;
        root.entry("modules")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| PackflowError::config("'modules' must be an object"))
    }

    /// Whether `modules.<name>` is present.
    pub fn has_module(&self, name: &str) -> bool {
        self.modules().is_some_and(|m| m.contains_key(name))
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("config", &self.config)
            .field("tools", &self.tools)
            .field("orig_wd", &self.orig_wd)
            .field("flags", &self.flags)
            .field("log", &self.log)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ctx(wd: &str) -> BuildContext {
        BuildContext::new(json!({"name": "App", "uuid": "abc"}), ToolSettings::default(), wd)
    }

    #[test]
    fn expand_path_follows_parent_and_absolute_parts() {
        let c = ctx("/home/monk/my-app");
        assert_eq!(
            c.expand_path([".template/lib", "apksigner.jar"]),
            PathBuf::from("/home/monk/my-app/.template/lib/apksigner.jar")
        );
        assert_eq!(
            c.expand_path(["/absolute/path/to/stuff"]),
            PathBuf::from("/absolute/path/to/stuff")
        );
        assert_eq!(
            c.expand_path(["../release.keystore"]),
            PathBuf::from("/home/monk/release.keystore")
        );
    }

    #[test]
    fn modules_mut_creates_missing_table() {
        let mut c = ctx("/tmp");
        c.modules_mut()
            .unwrap()
            .insert("gmail".into(), json!({}));
        assert!(c.has_module("gmail"));
    }
}
