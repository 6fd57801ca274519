//! Compiled JSON Schema validator.

use jsonschema::{Draft, Validator};
use serde_json::Value;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use crate::error::{Result, SchemaError, SchemaViolation};

/// Rendered path of the document root.
pub const ROOT_PATH: &str = "<root>";

/// A compiled draft 2020-12 schema with format assertions enabled.
#[derive(Debug)]
pub struct SchemaValidator {
    validator: Validator,
}

impl SchemaValidator {
    /// Compile a schema document. Not cached; see [`SchemaValidator::load`].
    pub fn from_value(schema: &Value) -> Result<Self> {
        if !schema.is_object() {
            return Err(SchemaError::NotAnObject);
        }

        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .should_validate_formats(true)
            .build(schema)
            .map_err(|e| SchemaError::InvalidSchema(e.to_string()))?;

        Ok(Self { validator })
    }

    /// Read and compile a schema file. Not cached.
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let schema: Value = serde_json::from_str(&text).map_err(|source| SchemaError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(&schema)
    }

    /// Whether `instance` satisfies the schema.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Validate `instance`, reporting the violation with the smallest path.
    pub fn validate(&self, instance: &Value) -> Result<()> {
        match self.violations(instance).into_iter().next() {
            Some(violation) => Err(SchemaError::Violation(violation)),
            None => Ok(()),
        }
    }

    /// Every violation, ordered by ascending instance path.
    pub fn violations(&self, instance: &Value) -> Vec<SchemaViolation> {
        let mut found: Vec<(Vec<String>, SchemaViolation)> = self
            .validator
            .iter_errors(instance)
            .map(|error| {
                let segments = pointer_segments(&error.instance_path.to_string());
                let violation = SchemaViolation {
                    path: render_path(&segments),
                    message: error.to_string(),
                };
                (segments, violation)
            })
            .collect();

        found.sort_by(|(a, va), (b, vb)| {
            compare_paths(a, b).then_with(|| va.message.cmp(&vb.message))
        });
        found.into_iter().map(|(_, violation)| violation).collect()
    }
}

/// Split a JSON pointer (`/origin/kind`) into unescaped segments.
fn pointer_segments(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn render_path(segments: &[String]) -> String {
    if segments.is_empty() {
        ROOT_PATH.to_string()
    } else {
        segments.join(".")
    }
}

/// Segment-wise comparison; array indices compare numerically.
fn compare_paths(a: &[String], b: &[String]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(i), Ok(j)) => i.cmp(&j),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> SchemaValidator {
        SchemaValidator::from_value(&json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "id": {"type": "string", "format": "uuid"},
                "items": {"type": "array", "items": {"type": "integer"}}
            },
            "additionalProperties": false
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_instance() {
        let v = schema();
        assert!(v.validate(&json!({"name": "probe"})).is_ok());
        assert!(v.violations(&json!({"name": "probe"})).is_empty());
    }

    #[test]
    fn test_root_violation_path() {
        let err = schema().validate(&json!({})).unwrap_err();
        match err {
            SchemaError::Violation(v) => assert_eq!(v.path, ROOT_PATH),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_path_joined_with_dots() {
        let violations = schema().violations(&json!({"name": "n", "items": [1, "two"]}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "items.1");
    }

    #[test]
    fn test_violations_sorted_by_path() {
        let mut items = vec![json!(0); 12];
        items[2] = json!("x");
        items[11] = json!("y");
        let violations = schema().violations(&json!({"name": "", "items": items}));
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, ["items.2", "items.11", "name"]);
    }

    #[test]
    fn test_format_checks_enabled() {
        let violations = schema().violations(&json!({"name": "n", "id": "not-a-uuid"}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "id");
    }

    #[test]
    fn test_non_object_schema_rejected() {
        assert!(matches!(
            SchemaValidator::from_value(&json!(true)),
            Err(SchemaError::NotAnObject)
        ));
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let err = SchemaValidator::from_value(&json!({"type": 12})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema(_)));
    }

    #[test]
    fn test_pointer_unescaping() {
        assert_eq!(pointer_segments(""), Vec::<String>::new());
        assert_eq!(pointer_segments("/a~1b/c~0d/3"), ["a/b", "c~d", "3"]);
    }
}
