//! Datasource validation rules.
//!
//! # Responsibility
//! - Check metadata identifiers and plugin payload shape.
//! - Enforce at most one default datasource among `existing`.
//!
//! # Invariants
//! - Validation is pure: it reads the entity, the scope snapshot and the
//!   schema set, and never touches storage.
//! - An entity never conflicts with an entry carrying its own name, so
//!   re-submitting the current default passes.

use crate::model::datasource::Datasource;
use crate::validate::schema::{FieldType, PluginSchemas};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Longest accepted name or project identifier.
pub const MAX_ID_LENGTH: usize = 75;

static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("valid identifier regex"));

/// Reasons a datasource is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    IdTooLong { field: &'static str, value: String },
    InvalidId { field: &'static str, value: String },
    EmptyKind,
    PayloadNotObject,
    DuplicateDefault { name: String, existing: String },
    UnknownKind(String),
    MissingField { kind: String, field: String },
    FieldTypeMismatch {
        kind: String,
        field: String,
        expected: FieldType,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "metadata.name cannot be empty"),
            Self::IdTooLong { field, value } => write!(
                f,
                "{field} `{value}` cannot contain more than {MAX_ID_LENGTH} characters"
            ),
            Self::InvalidId { field, value } => write!(
                f,
                "{field} `{value}` must only contain alphanumerics, `_`, `.` or `-`"
            ),
            Self::EmptyKind => write!(f, "spec.kind cannot be empty"),
            Self::PayloadNotObject => write!(f, "spec.plugin must be a JSON object"),
            Self::DuplicateDefault { name, existing } => write!(
                f,
                "datasource `{name}` cannot be a default datasource because `{existing}` is already the default of this project"
            ),
            Self::UnknownKind(kind) => write!(f, "no schema registered for plugin kind `{kind}`"),
            Self::MissingField { kind, field } => {
                write!(f, "spec.plugin.{field} is required for kind `{kind}`")
            }
            Self::FieldTypeMismatch {
                kind,
                field,
                expected,
            } => write!(
                f,
                "spec.plugin.{field} must be of type {} for kind `{kind}`",
                expected.as_str()
            ),
        }
    }
}

impl Error for ValidationError {}

/// Validates a datasource against its scope snapshot and schema set.
pub trait SchemaValidator {
    /// `existing` holds the datasources of the entity's project when the
    /// entity is a default, and is empty otherwise.
    fn validate(
        &self,
        entity: &Datasource,
        existing: &[Datasource],
        schemas: &PluginSchemas,
    ) -> Result<(), ValidationError>;
}

/// Built-in rule set.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSchemaValidator;

impl SchemaValidator for DefaultSchemaValidator {
    fn validate(
        &self,
        entity: &Datasource,
        existing: &[Datasource],
        schemas: &PluginSchemas,
    ) -> Result<(), ValidationError> {
        validate_id("metadata.name", &entity.metadata.name)?;
        if !entity.metadata.project.is_empty() {
            validate_id("metadata.project", &entity.metadata.project)?;
        }
        if entity.spec.kind.trim().is_empty() {
            return Err(ValidationError::EmptyKind);
        }
        if !entity.spec.plugin.is_object() {
            return Err(ValidationError::PayloadNotObject);
        }
        validate_default_unicity(entity, existing)?;
        if !schemas.is_empty() {
            validate_plugin(entity, schemas)?;
        }
        Ok(())
    }
}

fn validate_id(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if value.chars().count() > MAX_ID_LENGTH {
        return Err(ValidationError::IdTooLong {
            field,
            value: value.to_string(),
        });
    }
    if !ID_RE.is_match(value) {
        return Err(ValidationError::InvalidId {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn validate_default_unicity(
    entity: &Datasource,
    existing: &[Datasource],
) -> Result<(), ValidationError> {
    if !entity.spec.default {
        return Ok(());
    }
    let conflicting = existing
        .iter()
        .find(|item| item.spec.default && item.metadata.name != entity.metadata.name);
    match conflicting {
        Some(item) => Err(ValidationError::DuplicateDefault {
            name: entity.metadata.name.clone(),
            existing: item.metadata.name.clone(),
        }),
        None => Ok(()),
    }
}

fn validate_plugin(entity: &Datasource, schemas: &PluginSchemas) -> Result<(), ValidationError> {
    let kind = entity.spec.kind.as_str();
    let schema = schemas
        .get(kind)
        .ok_or_else(|| ValidationError::UnknownKind(kind.to_string()))?;

    for (field, expected) in &schema.required {
        match entity.spec.plugin.get(field) {
            None => {
                return Err(ValidationError::MissingField {
                    kind: kind.to_string(),
                    field: field.clone(),
                });
            }
            Some(value) if !expected.matches(value) => {
                return Err(ValidationError::FieldTypeMismatch {
                    kind: kind.to_string(),
                    field: field.clone(),
                    expected: *expected,
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DefaultSchemaValidator, SchemaValidator, ValidationError};
    use crate::model::datasource::Datasource;
    use crate::validate::schema::{FieldType, PluginSchema, PluginSchemas};
    use serde_json::json;

    fn prometheus_schemas() -> PluginSchemas {
        let mut schemas = PluginSchemas::new();
        schemas
            .register(
                "prometheus",
                PluginSchema::new().require("url", FieldType::String),
            )
            .unwrap();
        schemas
    }

    #[test]
    fn rejects_bad_identifiers() {
        let validator = DefaultSchemaValidator;
        let none = PluginSchemas::new();

        let empty = Datasource::new("p1", "", "prometheus", false);
        assert_eq!(
            validator.validate(&empty, &[], &none),
            Err(ValidationError::EmptyName)
        );

        let spaced = Datasource::new("p1", "my ds", "prometheus", false);
        assert!(matches!(
            validator.validate(&spaced, &[], &none),
            Err(ValidationError::InvalidId { field: "metadata.name", .. })
        ));

        let long = Datasource::new("p1", "a".repeat(76), "prometheus", false);
        assert!(matches!(
            validator.validate(&long, &[], &none),
            Err(ValidationError::IdTooLong { .. })
        ));

        let bad_project = Datasource::new("p/1", "ds", "prometheus", false);
        assert!(matches!(
            validator.validate(&bad_project, &[], &none),
            Err(ValidationError::InvalidId { field: "metadata.project", .. })
        ));
    }

    #[test]
    fn rejects_empty_kind_and_non_object_payload() {
        let validator = DefaultSchemaValidator;
        let none = PluginSchemas::new();

        let no_kind = Datasource::new("p1", "ds", " ", false);
        assert_eq!(
            validator.validate(&no_kind, &[], &none),
            Err(ValidationError::EmptyKind)
        );

        let scalar = Datasource::new("p1", "ds", "prometheus", false).with_plugin(json!(42));
        assert_eq!(
            validator.validate(&scalar, &[], &none),
            Err(ValidationError::PayloadNotObject)
        );
    }

    #[test]
    fn second_default_is_rejected_but_self_is_ignored() {
        let validator = DefaultSchemaValidator;
        let none = PluginSchemas::new();
        let existing = vec![
            Datasource::new("p1", "ds1", "prometheus", true),
            Datasource::new("p1", "ds3", "loki", false),
        ];

        let candidate = Datasource::new("p1", "ds2", "loki", true);
        assert_eq!(
            validator.validate(&candidate, &existing, &none),
            Err(ValidationError::DuplicateDefault {
                name: "ds2".to_string(),
                existing: "ds1".to_string(),
            })
        );

        let resubmitted = Datasource::new("p1", "ds1", "prometheus", true);
        assert_eq!(validator.validate(&resubmitted, &existing, &none), Ok(()));
    }

    #[test]
    fn plugin_payload_follows_registered_schema() {
        let validator = DefaultSchemaValidator;
        let schemas = prometheus_schemas();

        let valid = Datasource::new("p1", "ds", "prometheus", false)
            .with_plugin(json!({ "url": "http://localhost:9090" }));
        assert_eq!(validator.validate(&valid, &[], &schemas), Ok(()));

        let missing = Datasource::new("p1", "ds", "prometheus", false);
        assert!(matches!(
            validator.validate(&missing, &[], &schemas),
            Err(ValidationError::MissingField { field, .. }) if field == "url"
        ));

        let wrong_type = Datasource::new("p1", "ds", "prometheus", false)
            .with_plugin(json!({ "url": 9090 }));
        assert!(matches!(
            validator.validate(&wrong_type, &[], &schemas),
            Err(ValidationError::FieldTypeMismatch { expected: FieldType::String, .. })
        ));

        let unknown = Datasource::new("p1", "ds", "tempo", false);
        assert_eq!(
            validator.validate(&unknown, &[], &schemas),
            Err(ValidationError::UnknownKind("tempo".to_string()))
        );
    }
}
