#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value, json};

use packflow::config::ToolSettings;
use packflow::exec::{CancelCheck, LogSink};
use packflow::pipeline::{BuildContext, PhaseBuilder, PhaseDescriptor, StepRecord};
use packflow::types::{PlatformSelector, RunFlags};

/// Builder for `BuildContext` to simplify test setup.
pub struct ContextBuilder {
    config: Value,
    tools: ToolSettings,
    orig_wd: PathBuf,
    flags: RunFlags,
    sink: Option<Arc<dyn LogSink>>,
    cancel: Option<Arc<dyn CancelCheck>>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            config: json!({"name": "Test App", "uuid": "0123abcd", "modules": {}}),
            tools: ToolSettings::default(),
            orig_wd: PathBuf::from("."),
            flags: RunFlags::default(),
            sink: None,
            cancel: None,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config["name"] = json!(name);
        self
    }

    pub fn uuid(mut self, uuid: &str) -> Self {
        self.config["uuid"] = json!(uuid);
        self
    }

    pub fn module(mut self, name: &str, value: Value) -> Self {
        if let Some(modules) = self.config["modules"].as_object_mut() {
            modules.insert(name.to_string(), value);
        } else {
            let mut modules = Map::new();
            modules.insert(name.to_string(), value);
            self.config["modules"] = Value::Object(modules);
        }
        self
    }

    pub fn config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn tools(mut self, tools: ToolSettings) -> Self {
        self.tools = tools;
        self
    }

    pub fn orig_wd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.orig_wd = dir.into();
        self
    }

    pub fn external(mut self, val: bool) -> Self {
        self.flags.external = val;
        self
    }

    pub fn package(mut self, val: bool) -> Self {
        self.flags.package = val;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn cancel(mut self, cancel: Arc<dyn CancelCheck>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> BuildContext {
        let mut ctx =
            BuildContext::new(self.config, self.tools, self.orig_wd).with_flags(self.flags);
        if let Some(sink) = self.sink {
            ctx = ctx.with_sink(sink);
        }
        if let Some(cancel) = self.cancel {
            ctx = ctx.with_cancel(cancel);
        }
        ctx
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a step with a selector written the way phase literals
/// write it (`"all"`, `"android,ios"`).
pub fn step(selector: &str, task: &str) -> StepRecord {
    let selector: PlatformSelector = selector
        .parse()
        .unwrap_or_else(|e| panic!("bad selector {selector:?}: {e}"));
    StepRecord::new(selector, task)
}

/// A phase holding `steps` in order.
pub fn phase(name: &str, steps: impl IntoIterator<Item = StepRecord>) -> PhaseDescriptor {
    PhaseBuilder::new(name).extend(steps).build()
}
