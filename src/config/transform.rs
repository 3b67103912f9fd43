// src/config/transform.rs

//! Generic mutation of the nested configuration tree via [`ConfigPath`]s.
//!
//! Walking rules:
//! - a literal key descends into that key if present; absent keys (or a
//!   non-mapping value) are silently skipped,
//! - `[]` requires a sequence and visits every element,
//! - `*` requires a mapping; as the final segment it recurses through nested
//!   mappings and rewrites every non-mapping leaf, otherwise it visits every
//!   value for further descent.
//!
//! At the final segment the matched value(s) are replaced in place with
//! `f(value)`. Applying `[]` or `*` to the wrong kind of value is a
//! configuration error and fails immediately.

use serde_json::Value;
use thiserror::Error;

use super::path::{ConfigPath, Segment};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("expected a sequence at '{at}' for '[]', found {found}")]
    ExpectedSequence { at: String, found: &'static str },
    #[error("expected a mapping at '{at}' for '*', found {found}")]
    ExpectedMapping { at: String, found: &'static str },
}

/// Apply `f` to every node of `tree` matched by `path`, returning the tree.
///
/// The tree is moved in and handed back; callers continue with the returned
/// value. A failed transform may have already rewritten some matches.
pub fn transform<F>(mut tree: Value, path: &ConfigPath, f: F) -> Result<Value, TransformError>
where
    F: FnMut(Value) -> Value,
{
    transform_in_place(&mut tree, path, f)?;
    Ok(tree)
}

/// In-place variant of [`transform`].
pub fn transform_in_place<F>(tree: &mut Value, path: &ConfigPath, mut f: F) -> Result<(), TransformError>
where
    F: FnMut(Value) -> Value,
{
    let mut trail = Vec::with_capacity(path.segments().len());
    walk(tree, path.segments(), &mut f, &mut trail)
}

fn walk(
    node: &mut Value,
    segments: &[Segment],
    f: &mut dyn FnMut(Value) -> Value,
    trail: &mut Vec<String>,
) -> Result<(), TransformError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };
    trail.push(segment.to_string());

    let result = if rest.is_empty() {
        apply_terminal(node, segment, f, trail)
    } else {
        descend(node, segment, rest, f, trail)
    };

    trail.pop();
    result
}

fn descend(
    node: &mut Value,
    segment: &Segment,
    rest: &[Segment],
    f: &mut dyn FnMut(Value) -> Value,
    trail: &mut Vec<String>,
) -> Result<(), TransformError> {
    match segment {
        Segment::Key(key) => match node.as_object_mut().and_then(|map| map.get_mut(key)) {
            Some(child) => walk(child, rest, f, trail),
            None => Ok(()),
        },
        Segment::AllElements => {
            let items = expect_sequence(node, trail)?;
            for item in items.iter_mut() {
                walk(item, rest, f, trail)?;
            }
            Ok(())
        }
        Segment::AllValues => {
            let map = expect_mapping(node, trail)?;
            for value in map.values_mut() {
                walk(value, rest, f, trail)?;
            }
            Ok(())
        }
    }
}

fn apply_terminal(
    node: &mut Value,
    segment: &Segment,
    f: &mut dyn FnMut(Value) -> Value,
    trail: &[String],
) -> Result<(), TransformError> {
    match segment {
        Segment::Key(key) => {
            if let Some(slot) = node.as_object_mut().and_then(|map| map.get_mut(key)) {
                replace_with(slot, f);
            }
            Ok(())
        }
        Segment::AllElements => {
            for item in expect_sequence(node, trail)?.iter_mut() {
                replace_with(item, f);
            }
            Ok(())
        }
        Segment::AllValues => {
            expect_mapping(node, trail)?;
            rewrite_leaves(node, f);
            Ok(())
        }
    }
}

/// Recurse through nested mappings, rewriting every non-mapping leaf.
fn rewrite_leaves(node: &mut Value, f: &mut dyn FnMut(Value) -> Value) {
    if let Value::Object(map) = node {
        for value in map.values_mut() {
            if value.is_object() {
                rewrite_leaves(value, f);
            } else {
                replace_with(value, f);
            }
        }
    }
}

fn replace_with(slot: &mut Value, f: &mut dyn FnMut(Value) -> Value) {
    let old = std::mem::take(slot);
    *slot = f(old);
}

fn expect_sequence<'a>(
    node: &'a mut Value,
    trail: &[String],
) -> Result<&'a mut Vec<Value>, TransformError> {
    let found = kind_of(node);
    node.as_array_mut()
        .ok_or_else(|| TransformError::ExpectedSequence {
            at: trail.join("."),
            found,
        })
}

fn expect_mapping<'a>(
    node: &'a mut Value,
    trail: &[String],
) -> Result<&'a mut serde_json::Map<String, Value>, TransformError> {
    let found = kind_of(node);
    node.as_object_mut()
        .ok_or_else(|| TransformError::ExpectedMapping {
            at: trail.join("."),
            found,
        })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(raw: &str) -> ConfigPath {
        ConfigPath::parse(raw).unwrap()
    }

    fn increment(by: i64) -> impl FnMut(Value) -> Value {
        move |v| json!(v.as_i64().unwrap_or_default() + by)
    }

    #[test]
    fn increments_every_element_field() {
        let out = transform(json!([{"b": 1}, {"b": 2}]), &path("[].b"), increment(1)).unwrap();
        assert_eq!(out, json!([{"b": 2}, {"b": 3}]));
    }

    #[test]
    fn star_rewrites_nested_leaves() {
        let out = transform(json!({"x": {"y": 1, "z": 2}}), &path("x.*"), increment(10)).unwrap();
        assert_eq!(out, json!({"x": {"y": 11, "z": 12}}));

        let deep = transform(
            json!({"icons": {"32": "a.png", "safari": {"48": "b.png"}}}),
            &path("icons.*"),
            |v| json!(format!("src/{}", v.as_str().unwrap())),
        )
        .unwrap();
        assert_eq!(
            deep,
            json!({"icons": {"32": "src/a.png", "safari": {"48": "src/b.png"}}})
        );
    }

    #[test]
    fn star_in_the_middle_visits_values() {
        let tree = json!({"p": {"a": {"n": 1}, "b": {"n": 2}, "c": {"m": 3}}});
        let out = transform(tree, &path("p.*.n"), increment(5)).unwrap();
        assert_eq!(out, json!({"p": {"a": {"n": 6}, "b": {"n": 7}, "c": {"m": 3}}}));
    }

    #[test]
    fn missing_keys_are_skipped() {
        let tree = json!({"modules": {"activations": [{"scripts": ["a.js"]}, {"styles": []}]}});
        let out = transform(tree.clone(), &path("modules.button.default_icon"), increment(1)).unwrap();
        assert_eq!(out, tree);

        let out = transform(tree, &path("modules.activations.[].scripts.[]"), |v| {
            json!(format!("src/{}", v.as_str().unwrap()))
        })
        .unwrap();
        assert_eq!(
            out,
            json!({"modules": {"activations": [{"scripts": ["src/a.js"]}, {"styles": []}]}})
        );
    }

    #[test]
    fn elements_against_mapping_fails_fast() {
        let err = transform(json!({"a": {"b": 1}}), &path("a.[]"), increment(1)).unwrap_err();
        assert_eq!(
            err,
            TransformError::ExpectedSequence {
                at: "a.[]".into(),
                found: "a mapping"
            }
        );
    }

    #[test]
    fn star_against_sequence_fails_fast() {
        let err = transform(json!({"a": [1, 2]}), &path("a.*.b"), increment(1)).unwrap_err();
        assert!(matches!(err, TransformError::ExpectedMapping { .. }));
    }
}
