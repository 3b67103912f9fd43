// src/template.rs

//! `${...}` substitution against the live configuration tree.
//!
//! Tasks call [`render`] explicitly on the string arguments that need it;
//! neither the pipeline executor nor the process supervisor render anything.
//!
//! Supported expressions are lookups only:
//! - `${name}`
//! - `${modules.package_names.android}`
//! - `${modules["icons"]["android"]["36"]}`

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]*)\}").expect("placeholder regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("'{0}' is not defined in the configuration")]
    Undefined(String),
    #[error("cannot parse template expression '{0}'")]
    BadExpression(String),
}

/// Render `template` against `config`. Text without placeholders is returned
/// unchanged.
pub fn render(template: &str, config: &Value) -> Result<String, TemplateError> {
    let mut failure = None;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let expr = caps[1].trim();
        match lookup(config, expr) {
            Ok(value) => scalar_text(value),
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(rendered.into_owned()),
    }
}

fn lookup<'a>(config: &'a Value, expr: &str) -> Result<&'a Value, TemplateError> {
    let keys = parse_expression(expr)?;
    let mut current = config;
    for key in &keys {
        current = current
            .get(key.as_str())
            .ok_or_else(|| TemplateError::Undefined(expr.to_string()))?;
    }
    Ok(current)
}

/// Split `a.b["c"]['d']` into `["a", "b", "c", "d"]`.
fn parse_expression(expr: &str) -> Result<Vec<String>, TemplateError> {
    let bad = || TemplateError::BadExpression(expr.to_string());
    let mut keys = Vec::new();
    let mut chars = expr.chars().peekable();
    let mut ident = String::new();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if ident.is_empty() {
                    return Err(bad());
                }
                keys.push(std::mem::take(&mut ident));
            }
            '[' => {
                if !ident.is_empty() {
                    keys.push(std::mem::take(&mut ident));
                } else if keys.is_empty() {
                    return Err(bad());
                }
                let quote = chars.next().filter(|q| *q == '"' || *q == '\'').ok_or_else(bad)?;
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some(q) if q == quote => break,
                        Some(other) => key.push(other),
                        None => return Err(bad()),
                    }
                }
                if chars.next() != Some(']') {
                    return Err(bad());
                }
                keys.push(key);
                if chars.peek() == Some(&'.') {
                    chars.next();
                    if chars.peek().is_none() {
                        return Err(bad());
                    }
                }
            }
            c if c.is_whitespace() => return Err(bad()),
            other => ident.push(other),
        }
    }
    if !ident.is_empty() {
        keys.push(ident);
    }
    if keys.is_empty() {
        return Err(bad());
    }
    Ok(keys)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
