//! Declarative JSON-to-model mapping.
//!
//! Every model publishes a schema: a list of [`FieldSpec`]s naming the model
//! field, the wire key it comes from (dotted paths reach into nested objects),
//! the expected JSON type and whether the field is required. [`decode`] walks
//! the payload against that schema, coerces string-encoded numbers where a
//! field is marked lenient, and collects every violation instead of silently
//! producing empty fields. The normalized object is then handed to serde to
//! assemble the model.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Clone, Copy)]
pub enum FieldKind {
    String,
    Int,
    Float,
    Bool,
    StringArray,
    /// Passed through untouched (free-form context objects, raw JSON).
    Any,
    Object(&'static [FieldSpec]),
    ObjectArray(&'static [FieldSpec]),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Int => "integer",
            FieldKind::Float => "number",
            FieldKind::Bool => "boolean",
            FieldKind::StringArray => "array of strings",
            FieldKind::Any => "any",
            FieldKind::Object(_) => "object",
            FieldKind::ObjectArray(_) => "array of objects",
        }
    }
}

impl std::fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub wire_key: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Accept string-encoded numbers and booleans ("0.95", "12", "1").
    pub lenient: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, wire_key: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            wire_key,
            kind,
            required: true,
            lenient: false,
        }
    }

    pub const fn optional(name: &'static str, wire_key: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            wire_key,
            kind,
            required: false,
            lenient: false,
        }
    }

    pub const fn lenient(self) -> Self {
        Self {
            lenient: true,
            ..self
        }
    }
}

/// A model that can be decoded from a Watson JSON payload.
pub trait Mapped: DeserializeOwned {
    fn schema() -> &'static [FieldSpec];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Missing {
        path: String,
    },
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::Missing { path } => write!(f, "'{}' is missing", path),
            Violation::TypeMismatch {
                path,
                expected,
                found,
            } => write!(f, "'{}' expected {}, found {}", path, expected, found),
        }
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    #[error("payload is not valid JSON: {0}")]
    Syntax(String),

    #[error("expected {expected} at '{path}', found {found}")]
    UnexpectedShape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("key path '{0}' not found in payload")]
    KeyPathNotFound(String),

    #[error("{} invalid field(s): {}", .0.len(), summarize(.0))]
    Invalid(Vec<Violation>),

    #[error("model assembly failed: {0}")]
    Assembly(String),
}

impl MappingError {
    pub fn violations(&self) -> &[Violation] {
        match self {
            MappingError::Invalid(v) => v,
            _ => &[],
        }
    }
}

pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Follows a dotted key path ("error.code", "data.statusInfo"). An empty path is the root.
pub fn lookup<'a>(value: &'a Value, key_path: &str) -> Option<&'a Value> {
    if key_path.is_empty() {
        return Some(value);
    }
    key_path
        .split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn coerce_scalar(
    raw: &Value,
    field: &FieldSpec,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Option<Value> {
    let mismatch = |violations: &mut Vec<Violation>| {
        violations.push(Violation::TypeMismatch {
            path: path.to_string(),
            expected: field.kind.name(),
            found: json_type(raw),
        });
        None
    };

    match (field.kind, raw) {
        (FieldKind::String, Value::String(_)) => Some(raw.clone()),
        (FieldKind::String, Value::Number(n)) if field.lenient => Some(Value::String(n.to_string())),

        (FieldKind::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(raw.clone()),
        (FieldKind::Int, Value::String(s)) if field.lenient => match s.trim().parse::<i64>() {
            Ok(i) => Some(Value::from(i)),
            Err(_) => mismatch(violations),
        },

        (FieldKind::Float, Value::Number(_)) => Some(raw.clone()),
        (FieldKind::Float, Value::String(s)) if field.lenient => match s.trim().parse::<f64>() {
            // NaN and infinities have no JSON representation.
            Ok(f) => match serde_json::Number::from_f64(f) {
                Some(n) => Some(Value::Number(n)),
                None => mismatch(violations),
            },
            Err(_) => mismatch(violations),
        },

        (FieldKind::Bool, Value::Bool(_)) => Some(raw.clone()),
        (FieldKind::Bool, Value::String(s)) if field.lenient => match s.trim() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => mismatch(violations),
        },
        (FieldKind::Bool, Value::Number(n)) if field.lenient => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => mismatch(violations),
        },

        _ => mismatch(violations),
    }
}

fn normalize_field(
    raw: &Value,
    field: &FieldSpec,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Option<Value> {
    match field.kind {
        FieldKind::Any => Some(raw.clone()),
        FieldKind::Object(schema) => match raw {
            Value::Object(_) => Some(normalize_object(raw, schema, path, violations)),
            other => {
                violations.push(Violation::TypeMismatch {
                    path: path.to_string(),
                    expected: field.kind.name(),
                    found: json_type(other),
                });
                None
            }
        },
        FieldKind::ObjectArray(schema) => match raw {
            Value::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| {
                        let item_path = format!("{}[{}]", path, i);
                        match item {
                            Value::Object(_) => {
                                Some(normalize_object(item, schema, &item_path, violations))
                            }
                            other => {
                                violations.push(Violation::TypeMismatch {
                                    path: item_path,
                                    expected: "object",
                                    found: json_type(other),
                                });
                                None
                            }
                        }
                    })
                    .collect(),
            )),
            other => {
                violations.push(Violation::TypeMismatch {
                    path: path.to_string(),
                    expected: field.kind.name(),
                    found: json_type(other),
                });
                None
            }
        },
        FieldKind::StringArray => match raw {
            Value::Array(items) => {
                let element = FieldSpec {
                    kind: FieldKind::String,
                    ..*field
                };
                Some(Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .filter_map(|(i, item)| {
                            coerce_scalar(item, &element, &format!("{}[{}]", path, i), violations)
                        })
                        .collect(),
                ))
            }
            other => {
                violations.push(Violation::TypeMismatch {
                    path: path.to_string(),
                    expected: field.kind.name(),
                    found: json_type(other),
                });
                None
            }
        },
        _ => coerce_scalar(raw, field, path, violations),
    }
}

/// `value` must already be known to be an object.
fn normalize_object(
    value: &Value,
    schema: &'static [FieldSpec],
    path: &str,
    violations: &mut Vec<Violation>,
) -> Value {
    let mut out = Map::new();
    for field in schema {
        let field_path = join_path(path, field.wire_key);
        match lookup(value, field.wire_key) {
            None | Some(Value::Null) => {
                if field.required {
                    violations.push(Violation::Missing { path: field_path });
                }
            }
            Some(raw) => {
                if let Some(normalized) = normalize_field(raw, field, &field_path, violations) {
                    out.insert(field.name.to_string(), normalized);
                }
            }
        }
    }
    Value::Object(out)
}

fn assemble<T: DeserializeOwned>(normalized: Value) -> Result<T, MappingError> {
    serde_json::from_value(normalized).map_err(|e| MappingError::Assembly(e.to_string()))
}

pub fn decode<T: Mapped>(value: &Value) -> Result<T, MappingError> {
    decode_at(value, "")
}

/// Decodes the object found at `key_path` (dotted, empty for the root).
pub fn decode_at<T: Mapped>(value: &Value, key_path: &str) -> Result<T, MappingError> {
    let target =
        lookup(value, key_path).ok_or_else(|| MappingError::KeyPathNotFound(key_path.to_string()))?;
    if !target.is_object() {
        return Err(MappingError::UnexpectedShape {
            path: key_path.to_string(),
            expected: "object",
            found: json_type(target),
        });
    }

    let mut violations = Vec::new();
    let normalized = normalize_object(target, T::schema(), key_path, &mut violations);
    if !violations.is_empty() {
        tracing::warn!("Mapping rejected payload: {}", summarize(&violations));
        return Err(MappingError::Invalid(violations));
    }
    assemble(normalized)
}

/// Decodes every element of the array found at `key_path`.
pub fn decode_array<T: Mapped>(value: &Value, key_path: &str) -> Result<Vec<T>, MappingError> {
    let target =
        lookup(value, key_path).ok_or_else(|| MappingError::KeyPathNotFound(key_path.to_string()))?;
    let items = target
        .as_array()
        .ok_or_else(|| MappingError::UnexpectedShape {
            path: key_path.to_string(),
            expected: "array",
            found: json_type(target),
        })?;

    let mut violations = Vec::new();
    let mut normalized = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", key_path, i);
        if item.is_object() {
            normalized.push(normalize_object(item, T::schema(), &item_path, &mut violations));
        } else {
            violations.push(Violation::TypeMismatch {
                path: item_path,
                expected: "object",
                found: json_type(item),
            });
        }
    }
    if !violations.is_empty() {
        tracing::warn!("Mapping rejected payload: {}", summarize(&violations));
        return Err(MappingError::Invalid(violations));
    }

    normalized.into_iter().map(assemble).collect()
}

pub fn parse_json(body: &[u8]) -> Result<Value, MappingError> {
    serde_json::from_slice(body).map_err(|e| MappingError::Syntax(e.to_string()))
}
