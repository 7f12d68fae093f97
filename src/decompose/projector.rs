//! Field projection - pull an ordered list of keys out of a JSON object

use crate::error::{ConfigError, Result};
use serde_json::{Map, Value};

/// The caller-declared keys, trimmed once at setup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldKeySpec {
    declared: Vec<String>,
    keys: Vec<String>,
}

impl FieldKeySpec {
    pub fn new<S: AsRef<str>>(keys: &[S]) -> Self {
        Self::from_declared(keys.iter().map(|k| k.as_ref().to_string()).collect())
    }

    fn from_declared(declared: Vec<String>) -> Self {
        let keys = declared.iter().map(|k| k.trim().to_string()).collect();
        FieldKeySpec { declared, keys }
    }

    /// Resolve keys coming from a self-describing source (config files).
    /// Every key has to be a JSON string.
    pub fn from_values(values: &[Value]) -> Result<Self> {
        let mut keys = Vec::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            match value {
                Value::String(s) => keys.push(s.clone()),
                other => {
                    return Err(ConfigError::NonStringKey {
                        index,
                        found: json_type_name(other).to_string(),
                    })
                }
            }
        }
        Ok(Self::from_declared(keys))
    }

    /// Keys used for lookups, trimmed
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Keys exactly as the caller declared them
    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Extracts one text cell per key, empty when the key is missing
#[derive(Debug, Clone, Default)]
pub struct FieldProjector {
    spec: FieldKeySpec,
}

impl FieldProjector {
    pub fn new(spec: FieldKeySpec) -> Self {
        FieldProjector { spec }
    }

    pub fn spec(&self) -> &FieldKeySpec {
        &self.spec
    }

    /// Number of cells `project` always returns
    pub fn width(&self) -> usize {
        self.spec.len()
    }

    /// Project the keys out of `obj`. A missing object behaves like an
    /// empty one.
    pub fn project(&self, obj: Option<&Map<String, Value>>) -> Vec<String> {
        self.spec
            .keys()
            .iter()
            .map(|key| {
                obj.and_then(|o| o.get(key))
                    .map(cell_text)
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Text of a JSON value as a table cell: strings unquoted, null empty,
/// everything else as compact JSON
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
