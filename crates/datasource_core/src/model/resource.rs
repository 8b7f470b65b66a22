//! Resource values accepted at the API boundary.
//!
//! # Responsibility
//! - Discriminate the supported resource kinds once, as a closed sum type.
//! - Carry caller-supplied identity for point operations.
//!
//! # Invariants
//! - Services take their concrete variant; only dispatch code matches on
//!   `Resource`.

use crate::model::datasource::{Datasource, Metadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scope that owns project-level resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub metadata: Metadata,
}

/// Dashboard definition. The layout payload is opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub metadata: Metadata,
    pub spec: Value,
}

/// Any resource the config store knows about, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
    Project(Project),
    Datasource(Datasource),
    Dashboard(Dashboard),
}

impl Resource {
    /// Stable kind name used in error messages and serialized tags.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Project(_) => "Project",
            Self::Datasource(_) => "Datasource",
            Self::Dashboard(_) => "Dashboard",
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Self::Project(project) => &project.metadata,
            Self::Datasource(datasource) => &datasource.metadata,
            Self::Dashboard(dashboard) => &dashboard.metadata,
        }
    }
}

impl From<Datasource> for Resource {
    fn from(value: Datasource) -> Self {
        Self::Datasource(value)
    }
}

/// Scope and name identifying the target of a point operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parameters {
    pub project: String,
    pub name: String,
}

impl Parameters {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
        }
    }
}
