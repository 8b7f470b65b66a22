//! Plugin schema registry.
//!
//! # Responsibility
//! - Hold the payload shape expected for each registered plugin kind.
//! - Load schema sets from JSON documents.
//!
//! # Invariants
//! - Kind identifiers are unique and start with an ASCII letter.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// JSON type a required payload field must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Bool,
    Object,
    Array,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Returns whether `value` has this JSON type.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

/// Payload shape of one plugin kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PluginSchema {
    /// Field name to expected type. Every entry must be present.
    #[serde(default)]
    pub required: BTreeMap<String, FieldType>,
}

impl PluginSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, field: impl Into<String>, field_type: FieldType) -> Self {
        self.required.insert(field.into(), field_type);
        self
    }
}

/// Schema registration/loading errors.
#[derive(Debug)]
pub enum SchemaError {
    InvalidKind(String),
    DuplicateKind(String),
    Parse(serde_json::Error),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKind(kind) => write!(f, "plugin kind is invalid: `{kind}`"),
            Self::DuplicateKind(kind) => write!(f, "plugin kind already registered: `{kind}`"),
            Self::Parse(err) => write!(f, "invalid plugin schema document: {err}"),
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Set of plugin schemas keyed by kind.
///
/// An empty set disables payload schema checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginSchemas {
    schemas: BTreeMap<String, PluginSchema>,
}

impl PluginSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a document shaped as `{ "<kind>": { "required": { "<field>": "<type>" } } }`.
    pub fn from_json_str(document: &str) -> Result<Self, SchemaError> {
        let parsed: BTreeMap<String, PluginSchema> = serde_json::from_str(document)?;
        let mut schemas = Self::new();
        for (kind, schema) in parsed {
            schemas.register(kind, schema)?;
        }
        Ok(schemas)
    }

    /// Registers the schema of one plugin kind.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        schema: PluginSchema,
    ) -> Result<(), SchemaError> {
        let kind = kind.into().trim().to_string();
        if !is_valid_kind(&kind) {
            return Err(SchemaError::InvalidKind(kind));
        }
        if self.schemas.contains_key(kind.as_str()) {
            return Err(SchemaError::DuplicateKind(kind));
        }
        self.schemas.insert(kind, schema);
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<&PluginSchema> {
        self.schemas.get(kind)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn is_valid_kind(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}
