//! Schema validation and typed decoding.
//!
//! Resource configuration arrives as an untyped `serde_json::Value`. It is
//! checked against the resource [`Schema`] (types, presence, nested block
//! cardinality and attribute [`Validator`]s) and then decoded into the
//! reconciler's typed spec with [`decode`].
//!
//! # Example
//!
//! ```
//! use couchbase_capella_provider::schema::{Attribute, Schema, Validator};
//! use couchbase_capella_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "memory_quota",
//!         Attribute::required_int64().with_validator(Validator::int_range(100, i64::MAX)),
//!     );
//!
//! let diagnostics = validate(&schema, &json!({"name": "b1", "memory_quota": 128}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "b1", "memory_quota": 64}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("memory_quota".to_string()));
//! ```

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};
use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, DiagnosticSeverity, NestedBlock,
    Schema, Validator,
};

const UUID_PATTERN: &str =
    r"^[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-4[a-fA-F0-9]{3}-[8|9|aA|bB][a-fA-F0-9]{3}-[a-fA-F0-9]{12}$";

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Attribute validators must accept the value
/// - Nested blocks are validated recursively with min/max item constraints
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Validate `value` against `schema` and decode it into `T`.
///
/// Schema errors are collapsed into a single [`ProviderError::Validation`]
/// listing every failing attribute. A value that passes the schema but
/// does not fit `T` (for example a server with two placement blocks) is
/// also reported as a validation error.
pub fn decode<T: DeserializeOwned>(schema: &Schema, value: &Value) -> ProviderResult<T> {
    validate_result(schema, value).map_err(|diags| ProviderError::Validation(join(&diags)))?;
    serde_json::from_value(value.clone()).map_err(|e| ProviderError::Validation(e.to_string()))
}

/// Check a database user password.
///
/// At least 8 letters, with at least one lowercase letter, one uppercase
/// letter, one digit and one punctuation or symbol character. Whitespace and
/// control characters are rejected.
pub fn is_valid_password(password: &str) -> bool {
    let (mut lower, mut upper, mut digit, mut symbol) = (false, false, false, false);
    let mut letters = 0;

    for c in password.chars() {
        if c.is_numeric() {
            digit = true;
        } else if c.is_uppercase() {
            upper = true;
            letters += 1;
        } else if c.is_lowercase() {
            lower = true;
            letters += 1;
        } else if c.is_alphabetic() {
            letters += 1;
        } else if c.is_whitespace() || c.is_control() {
            return false;
        } else {
            symbol = true;
        }
    }

    letters >= 8 && lower && upper && digit && symbol
}

fn join(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match &d.detail {
            Some(detail) => format!("{}: {}", d.summary, detail),
            None => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            return;
        },
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Computed-only attributes are set by the provider
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() > before {
                return;
            }
            match v {
                Value::Array(items) => {
                    if (items.len() as u32) < attr.min_items {
                        diagnostics.push(
                            Diagnostic::error(format!(
                                "Attribute '{}' requires at least {} item(s), got {}",
                                path,
                                attr.min_items,
                                items.len()
                            ))
                            .with_attribute(path),
                        );
                    }
                    for (i, item) in items.iter().enumerate() {
                        let item_path = format!("{}.{}", path, i);
                        run_validators(&attr.validators, item, &item_path, diagnostics);
                    }
                },
                _ => run_validators(&attr.validators, v, path, diagnostics),
            }
        },
    }
}

fn run_validators(
    validators: &[Validator],
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for validator in validators {
        if let Some(detail) = check(validator, value) {
            diagnostics.push(
                Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                    .with_detail(detail)
                    .with_attribute(path),
            );
        }
    }
}

/// Returns the failure detail, or `None` when the value is accepted.
fn check(validator: &Validator, value: &Value) -> Option<String> {
    match validator {
        Validator::NotEmpty => match value.as_str() {
            Some(s) if s.trim().is_empty() => Some("must not be empty".to_string()),
            _ => None,
        },
        Validator::Pattern { pattern, message } => {
            let s = value.as_str()?;
            match Regex::new(pattern) {
                Ok(re) if re.is_match(s) => None,
                Ok(_) => Some(message.clone()),
                Err(err) => Some(format!("invalid pattern '{}': {}", pattern, err)),
            }
        },
        Validator::IntRange { min, max } => {
            let n = value.as_i64()?;
            if n < *min || n > *max {
                if *max == i64::MAX {
                    Some(format!("must be at least {}, got {}", min, n))
                } else {
                    Some(format!("must be between {} and {}, got {}", min, max, n))
                }
            } else {
                None
            }
        },
        Validator::OneOf { values } => {
            let s = value.as_str()?;
            if values.iter().any(|v| v == s) {
                None
            } else {
                Some(format!(
                    "'{}' is not one of: {}",
                    s,
                    values.join(", ")
                ))
            }
        },
        Validator::Uuid => {
            let s = value.as_str()?;
            match Regex::new(UUID_PATTERN) {
                Ok(re) if re.is_match(s) => None,
                _ => Some(format!("'{}' is not a valid UUID", s)),
            }
        },
        Validator::Password => {
            let s = value.as_str()?;
            if is_valid_password(s) {
                None
            } else {
                Some(
                    "password must contain at least 8 letters, one lowercase letter, one \
                     uppercase letter, one number and one symbol, and no whitespace"
                        .to_string(),
                )
            }
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                let expected = if matches!(attr_type, AttributeType::Set(_)) {
                    "set"
                } else {
                    "list"
                };
                diagnostics.push(type_error(path, expected, value));
            }
        },
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match nested.nesting_mode {
        BlockNestingMode::Single => validate_single_block(nested, value, path, diagnostics),
        BlockNestingMode::List | BlockNestingMode::Set => {
            validate_list_block(nested, value, path, diagnostics)
        },
    }
}

fn validate_single_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{}'", path))
                        .with_detail("At least one block is required")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            validate_block(&nested.block, v, path, diagnostics);
        },
    }
}

fn validate_list_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
        },
        Some(Value::Array(arr)) => {
            let len = arr.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            // 0 means unlimited
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        },
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic {
        severity: DiagnosticSeverity::Error,
        summary: format!("Invalid type for attribute '{}'", path),
        detail: Some(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        )),
        attribute: Some(path.to_string()),
    }
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "test"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        assert_eq!(validate(&schema, &json!({"name": null})).len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("size", Attribute::required_int64());

        assert!(validate(&schema, &json!({"size": 3})).is_empty());
        assert!(validate(&schema, &json!({"size": 3.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"size": 3.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"size": "3"})).len(), 1);
    }

    #[test]
    fn test_validate_list_elements() {
        let schema = Schema::v0().with_attribute(
            "services",
            Attribute::required_string_list()
                .with_min_items(1)
                .with_validator(Validator::one_of(["data", "index", "query"])),
        );

        assert!(validate(&schema, &json!({"services": ["data", "query"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"services": ["data", "kv"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("services.1".to_string()));

        let diagnostics = validate(&schema, &json!({"services": []}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(&schema, &json!({"services": ["data", 7]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("services.1".to_string()));
    }

    #[test]
    fn test_pattern_validator() {
        let schema = Schema::v0().with_attribute(
            "name",
            Attribute::required_string().with_validator(Validator::pattern(
                r"^[A-Za-z0-9][A-Za-z0-9._-]{0,98}$",
                "bad bucket name",
            )),
        );

        assert!(is_valid(&schema, &json!({"name": "b1"})));
        assert!(is_valid(&schema, &json!({"name": "travel-sample.v2"})));

        let diagnostics = validate(&schema, &json!({"name": "-leading"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].detail.as_deref(), Some("bad bucket name"));

        assert!(!is_valid(&schema, &json!({"name": "a".repeat(100)})));
    }

    #[test]
    fn test_int_range_validator() {
        let schema = Schema::v0().with_attribute(
            "size",
            Attribute::required_int64().with_validator(Validator::int_range(3, 27)),
        );

        assert!(is_valid(&schema, &json!({"size": 3})));
        assert!(is_valid(&schema, &json!({"size": 27})));

        let diagnostics = validate(&schema, &json!({"size": 2}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("must be between 3 and 27, got 2")
        );
        assert!(!is_valid(&schema, &json!({"size": 28})));
    }

    #[test]
    fn test_uuid_validator() {
        let schema = Schema::v0().with_attribute(
            "project_id",
            Attribute::required_string().with_validator(Validator::Uuid),
        );

        assert!(is_valid(
            &schema,
            &json!({"project_id": "0b4bd1f3-3c35-4a0a-9d6c-9bcbd2a33f52"})
        ));
        assert!(!is_valid(&schema, &json!({"project_id": "not-a-uuid"})));
        // Version nibble must be 4
        assert!(!is_valid(
            &schema,
            &json!({"project_id": "0b4bd1f3-3c35-1a0a-9d6c-9bcbd2a33f52"})
        ));
    }

    #[test]
    fn test_not_empty_validator() {
        let schema = Schema::v0().with_attribute(
            "name",
            Attribute::required_string().with_validator(Validator::NotEmpty),
        );

        assert!(is_valid(&schema, &json!({"name": "p"})));
        assert!(!is_valid(&schema, &json!({"name": "  "})));
    }

    #[test]
    fn test_password_policy() {
        assert!(is_valid_password("Password123!"));
        assert!(is_valid_password("CouchbaseIsGreat#9"));

        assert!(!is_valid_password("Pass1!"), "too few letters");
        assert!(!is_valid_password("password123!"), "no uppercase");
        assert!(!is_valid_password("PASSWORD123!"), "no lowercase");
        assert!(!is_valid_password("Passwordabc!"), "no digit");
        assert!(!is_valid_password("Password1234"), "no symbol");
        assert!(!is_valid_password("Pass word123!"), "whitespace");
    }

    #[test]
    fn test_validate_nested_block_single() {
        let schema = Schema::v0().with_block(
            "support_package",
            NestedBlock::single(
                Block::new().with_attribute("timezone", Attribute::required_string()),
            )
            .required(),
        );

        assert!(validate(&schema, &json!({"support_package": {"timezone": "GMT"}})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Missing required block"));

        let diagnostics = validate(&schema, &json!({"support_package": {"timezone": 1}}));
        assert_eq!(
            diagnostics[0].attribute,
            Some("support_package.timezone".to_string())
        );
    }

    #[test]
    fn test_validate_nested_block_list() {
        let schema = Schema::v0().with_block(
            "servers",
            NestedBlock::list(Block::new().with_attribute(
                "size",
                Attribute::required_int64().with_validator(Validator::int_range(2, 27)),
            ))
            .with_min_items(1)
            .with_max_items(2),
        );

        assert!(validate(&schema, &json!({"servers": [{"size": 3}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"servers": []}));
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(
            &schema,
            &json!({"servers": [{"size": 3}, {"size": 3}, {"size": 3}]}),
        );
        assert!(diagnostics[0].summary.contains("at most 2"));

        let diagnostics = validate(&schema, &json!({"servers": [{"size": 1}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("servers.0.size".to_string()));
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }

    #[derive(Debug, Deserialize)]
    struct Quota {
        name: String,
        memory_quota: i64,
    }

    #[test]
    fn test_decode() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "memory_quota",
                Attribute::required_int64().with_validator(Validator::int_range(100, i64::MAX)),
            );

        let quota: Quota = decode(&schema, &json!({"name": "b1", "memory_quota": 128})).unwrap();
        assert_eq!(quota.name, "b1");
        assert_eq!(quota.memory_quota, 128);

        let err = decode::<Quota>(&schema, &json!({"name": "b1", "memory_quota": 10})).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(err.message().contains("memory_quota"));
    }
}
