// src/pipeline/step.rs

//! Step records: one conditionally executed task invocation.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::config::{ConfigPath, PathError};
use crate::errors::{PackflowError, Result};
use crate::types::PlatformSelector;

/// One argument passed to a task.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    /// A config path expression, parsed when the phase was built.
    Path(ConfigPath),
}

impl Arg {
    pub fn path(raw: &str) -> std::result::Result<Self, PathError> {
        ConfigPath::parse(raw).map(Arg::Path)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(v) => Some(v),
            Arg::Path(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_path(&self) -> Option<&ConfigPath> {
        match self {
            Arg::Path(p) => Some(p),
            Arg::Value(_) => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(Value::String(s)) => write!(f, "{s:?}"),
            Arg::Value(v) => write!(f, "{v}"),
            Arg::Path(p) => write!(f, "path({p})"),
        }
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(v)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Value(Value::String(s.to_string()))
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Value(Value::String(s))
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Arg::Value(Value::Bool(b))
    }
}

impl From<ConfigPath> for Arg {
    fn from(p: ConfigPath) -> Self {
        Arg::Path(p)
    }
}

/// Positional and keyword arguments of a step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepArgs {
    positional: Vec<Arg>,
    keyword: BTreeMap<String, Arg>,
}

impl StepArgs {
    pub fn new(
        positional: impl IntoIterator<Item = Arg>,
        keyword: impl IntoIterator<Item = (String, Arg)>,
    ) -> Self {
        Self {
            positional: positional.into_iter().collect(),
            keyword: keyword.into_iter().collect(),
        }
    }

    pub fn positional(&self) -> &[Arg] {
        &self.positional
    }

    pub fn keywords(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.keyword.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keyword(&self, name: &str) -> Option<&Arg> {
        self.keyword.get(name)
    }

    pub fn has_keyword(&self, name: &str) -> bool {
        self.keyword.contains_key(name)
    }

    /// Optional string keyword. Present but not a string is an error.
    pub fn str_kw(&self, task: &str, name: &str) -> Result<Option<&str>> {
        match self.keyword(name) {
            None | Some(Arg::Value(Value::Null)) => Ok(None),
            Some(arg) => arg.as_str().map(Some).ok_or_else(|| {
                PackflowError::config(format!("{task}: '{name}' must be a string, got {arg}"))
            }),
        }
    }

    pub fn require_str(&self, task: &str, name: &str) -> Result<&str> {
        self.str_kw(task, name)?.ok_or_else(|| {
            PackflowError::config(format!("{task} requires a \"{name}\" keyword argument"))
        })
    }

    pub fn bool_kw(&self, task: &str, name: &str, default: bool) -> Result<bool> {
        match self.keyword(name) {
            None | Some(Arg::Value(Value::Null)) => Ok(default),
            Some(Arg::Value(Value::Bool(b))) => Ok(*b),
            Some(arg) => Err(PackflowError::config(format!(
                "{task}: '{name}' must be true or false, got {arg}"
            ))),
        }
    }

    /// A keyword that may be a single string or a list of strings.
    pub fn str_list_kw(&self, task: &str, name: &str) -> Result<Vec<String>> {
        let bad = |arg: &Arg| {
            PackflowError::config(format!(
                "{task}: '{name}' must be a string or a list of strings, got {arg}"
            ))
        };
        match self.keyword(name) {
            None | Some(Arg::Value(Value::Null)) => Ok(Vec::new()),
            Some(arg @ Arg::Value(Value::String(_))) => {
                Ok(arg.as_str().map(str::to_string).into_iter().collect())
            }
            Some(arg @ Arg::Value(Value::Array(items))) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(|| bad(arg)))
                .collect(),
            Some(arg) => Err(bad(arg)),
        }
    }

    /// Positional string at `index`.
    pub fn positional_str(&self, task: &str, index: usize) -> Result<&str> {
        let arg = self.positional.get(index).ok_or_else(|| {
            PackflowError::config(format!("{task}: missing positional argument {index}"))
        })?;
        arg.as_str().ok_or_else(|| {
            PackflowError::config(format!(
                "{task}: positional argument {index} must be a string, got {arg}"
            ))
        })
    }

    /// Every positional argument, which must all be strings.
    pub fn positional_strs(&self, task: &str) -> Result<Vec<&str>> {
        (0..self.positional.len())
            .map(|i| self.positional_str(task, i))
            .collect()
    }
}

/// `(platform_selector, predicate?, task, positional, keyword)`.
///
/// Built once by a phase-builder function and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub selector: PlatformSelector,
    pub predicate: Option<String>,
    pub task: String,
    pub args: StepArgs,
}

impl StepRecord {
    pub fn new(selector: impl Into<PlatformSelector>, task: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            predicate: None,
            task: task.into(),
            args: StepArgs::default(),
        }
    }

    /// The literal five-part shape. An empty predicate name means none.
    pub fn from_parts(
        selector: PlatformSelector,
        predicate: &str,
        task: impl Into<String>,
        positional: impl IntoIterator<Item = Arg>,
        keyword: impl IntoIterator<Item = (String, Arg)>,
    ) -> Self {
        Self {
            selector,
            predicate: (!predicate.is_empty()).then(|| predicate.to_string()),
            task: task.into(),
            args: StepArgs::new(positional, keyword),
        }
    }

    pub fn when(mut self, predicate: impl Into<String>) -> Self {
        let predicate = predicate.into();
        self.predicate = (!predicate.is_empty()).then_some(predicate);
        self
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.positional.push(arg.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, arg: impl Into<Arg>) -> Self {
        self.args.keyword.insert(name.into(), arg.into());
        self
    }

    /// Append a positional config path, parsing it now.
    pub fn path_arg(self, raw: &str) -> std::result::Result<Self, PathError> {
        Ok(self.arg(Arg::path(raw)?))
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.selector)?;
        if let Some(pred) = &self.predicate {
            write!(f, "if {pred}: ")?;
        }
        write!(f, "{}(", self.task)?;
        let mut first = true;
        for arg in &self.args.positional {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
            first = false;
        }
        for (name, arg) in &self.args.keyword {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{name}={arg}")?;
            first = false;
        }
        f.write_str(")")
    }
}
