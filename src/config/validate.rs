// src/config/validate.rs

use serde_json::{Map, Value};

use crate::errors::{PackflowError, Result};

/// Check the invariants tasks rely on and fill in the `modules` mapping.
pub fn validate_app_config(tree: &mut Value) -> Result<()> {
    let Some(root) = tree.as_object_mut() else {
        return Err(PackflowError::config(
            "app config must be a JSON object at the top level",
        ));
    };

    ensure_string(root, "name")?;
    ensure_string(root, "uuid")?;
    ensure_modules(root)?;
    Ok(())
}

fn ensure_string(root: &Map<String, Value>, key: &str) -> Result<()> {
    match root.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(PackflowError::config(format!(
            "app config field '{key}' must not be empty"
        ))),
        Some(_) => Err(PackflowError::config(format!(
            "app config field '{key}' must be a string"
        ))),
        None => Err(PackflowError::config(format!(
            "app config is missing required field '{key}'"
        ))),
    }
}

fn ensure_modules(root: &mut Map<String, Value>) -> Result<()> {
    match root
        .entry("modules")
        .or_insert_with(|| Value::Object(Map::new()))
    {
        Value::Object(_) => Ok(()),
        _ => Err(PackflowError::config("app config field 'modules' must be an object")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn inserts_modules_when_absent() {
        let mut tree = json!({"name": "app", "uuid": "u1"});
        validate_app_config(&mut tree).unwrap();
        assert_eq!(tree["modules"], json!({}));
    }

    #[test]
    fn rejects_missing_or_mistyped_fields() {
        for bad in [
            json!([]),
            json!({"uuid": "u1"}),
            json!({"name": 3, "uuid": "u1"}),
            json!({"name": "  ", "uuid": "u1"}),
            json!({"name": "app", "uuid": "u1", "modules": []}),
        ] {
            let mut tree = bad.clone();
            let err = validate_app_config(&mut tree).unwrap_err();
            assert!(
                matches!(err, PackflowError::Configuration(_)),
                "expected configuration error for {bad}"
            );
        }
    }
}
