//! Datasource lifecycle layer of the dashboard config store.
//! This crate owns datasource validation, default unicity and metadata
//! bookkeeping between the API surface and storage.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validate;

pub use logging::{default_log_level, init_logging, logging_status, DiagnosticSink, LogSink};
pub use model::datasource::{filter_datasources, Datasource, DatasourceSpec, Metadata};
pub use model::resource::{Dashboard, Parameters, Project, Resource};
pub use repo::datasource_repo::{
    DatasourceQuery, DatasourceRepository, RepoError, RepoResult, SqliteDatasourceRepository,
};
pub use service::datasource_service::{DatasourceService, ServiceError, ServiceResult};
pub use validate::datasource::{DefaultSchemaValidator, SchemaValidator, ValidationError};
pub use validate::schema::{FieldType, PluginSchema, PluginSchemas, SchemaError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
