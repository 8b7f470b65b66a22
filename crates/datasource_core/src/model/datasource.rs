//! Datasource resource model.
//!
//! # Responsibility
//! - Define the canonical datasource record and its metadata.
//! - Provide metadata lifecycle helpers for create/update stamping.
//!
//! # Invariants
//! - `(metadata.project, metadata.name)` identifies one datasource.
//! - An empty `metadata.project` denotes the global scope.
//! - `uid` and `created_at` never change once stamped by create.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Resource metadata shared by every datasource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    /// Scope identifier. Empty means global.
    #[serde(default)]
    pub project: String,
    /// Unix epoch milliseconds, set by create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Unix epoch milliseconds, refreshed by create and update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    /// Storage identity assigned at creation and carried forward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,
    /// Incremented on every successful update.
    #[serde(default)]
    pub version: u64,
}

impl Metadata {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            ..Self::default()
        }
    }

    /// Stamps creation bookkeeping on a fresh resource.
    pub fn create_now(&mut self) {
        let now = now_epoch_ms();
        self.created_at = Some(now);
        self.updated_at = Some(now);
        self.uid = Some(Uuid::new_v4());
        self.version = 0;
    }

    /// Merges identity and creation data forward from `previous`.
    pub fn update_from(&mut self, previous: &Metadata) {
        self.created_at = previous.created_at;
        self.uid = previous.uid;
        self.version = previous.version + 1;
        self.updated_at = Some(now_epoch_ms());
    }
}

/// Type-specific part of a datasource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceSpec {
    /// Implicit datasource of its scope when none is selected.
    #[serde(default)]
    pub default: bool,
    /// Plugin discriminator, e.g. `prometheus`.
    pub kind: String,
    /// Plugin configuration, opaque to the service.
    #[serde(default = "empty_payload")]
    pub plugin: Value,
}

/// Connection to an external data backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datasource {
    pub metadata: Metadata,
    pub spec: DatasourceSpec,
}

impl Datasource {
    /// Creates a datasource with an empty plugin payload.
    pub fn new(
        project: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        default: bool,
    ) -> Self {
        Self {
            metadata: Metadata::new(project, name),
            spec: DatasourceSpec {
                default,
                kind: kind.into(),
                plugin: empty_payload(),
            },
        }
    }

    /// Replaces the plugin payload.
    pub fn with_plugin(mut self, plugin: Value) -> Self {
        self.spec.plugin = plugin;
        self
    }
}

/// Keeps datasources matching `kind` and `default` when those filters are set.
///
/// Input order is preserved.
pub fn filter_datasources(
    kind: Option<&str>,
    default: Option<bool>,
    list: Vec<Datasource>,
) -> Vec<Datasource> {
    if kind.is_none() && default.is_none() {
        return list;
    }
    list.into_iter()
        .filter(|item| kind.map_or(true, |kind| item.spec.kind == kind))
        .filter(|item| default.map_or(true, |default| item.spec.default == default))
        .collect()
}

/// Current wall-clock time in unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn empty_payload() -> Value {
    Value::Object(Map::new())
}
