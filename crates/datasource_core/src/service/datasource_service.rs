//! Datasource use-case service.
//!
//! # Responsibility
//! - Validate datasources and enforce one default per project.
//! - Keep body identity consistent with caller parameters on update.
//! - Stamp metadata and translate storage outcomes into `ServiceError`.
//!
//! # Invariants
//! - Storage failures other than key conflict/not found reach callers as
//!   `ServiceError::Internal` only, after being reported to the sink.
//! - A failed scope listing during validation is a `BadRequest`, like any
//!   other validation failure.
//! - `list` returns repository errors unchanged.
//! - The default check reads the scope, then writes separately. Two
//!   concurrent writers in one project can both become default; nothing here
//!   serializes them.

use crate::logging::{DiagnosticSink, LogSink};
use crate::model::datasource::{filter_datasources, Datasource};
use crate::model::resource::{Parameters, Resource};
use crate::repo::datasource_repo::{DatasourceQuery, DatasourceRepository, RepoError, RepoResult};
use crate::validate::datasource::{DefaultSchemaValidator, SchemaValidator};
use crate::validate::schema::PluginSchemas;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Caller-facing error taxonomy.
#[derive(Debug)]
pub enum ServiceError {
    /// Wrong resource kind, failed validation or identity mismatch.
    BadRequest(String),
    /// `(project, name)` already exists.
    Conflict { project: String, name: String },
    /// Target datasource does not exist.
    NotFound { project: String, name: String },
    /// Unexpected storage failure. Details are only logged.
    Internal,
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(message) => write!(f, "bad request: {message}"),
            Self::Conflict { project, name } => write!(
                f,
                "conflict: datasource `{name}` already exists in project `{project}`"
            ),
            Self::NotFound { project, name } => write!(
                f,
                "not found: datasource `{name}` does not exist in project `{project}`"
            ),
            Self::Internal => write!(f, "internal server error"),
        }
    }
}

impl Error for ServiceError {}

/// Datasource service over a repository and a schema validator.
pub struct DatasourceService<R: DatasourceRepository, V: SchemaValidator = DefaultSchemaValidator> {
    repo: R,
    validator: V,
    schemas: PluginSchemas,
    sink: Arc<dyn DiagnosticSink>,
}

impl<R: DatasourceRepository> DatasourceService<R> {
    /// Creates a service with the built-in validator, logging to `log`.
    pub fn new(repo: R, schemas: PluginSchemas) -> Self {
        Self::with_parts(
            repo,
            DefaultSchemaValidator,
            schemas,
            Arc::new(LogSink::default()),
        )
    }
}

impl<R: DatasourceRepository, V: SchemaValidator> DatasourceService<R, V> {
    pub fn with_parts(
        repo: R,
        validator: V,
        schemas: PluginSchemas,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            repo,
            validator,
            schemas,
            sink,
        }
    }

    /// Creates a resource received at the API boundary.
    ///
    /// Only the `Datasource` variant is accepted.
    pub fn create_resource(&self, resource: Resource) -> ServiceResult<Datasource> {
        match resource {
            Resource::Datasource(datasource) => self.create(datasource),
            other => Err(self.wrong_kind(&other)),
        }
    }

    /// Updates a resource received at the API boundary.
    pub fn update_resource(
        &self,
        resource: Resource,
        parameters: &Parameters,
    ) -> ServiceResult<Datasource> {
        match resource {
            Resource::Datasource(datasource) => self.update(datasource, parameters),
            other => Err(self.wrong_kind(&other)),
        }
    }

    /// Validates, stamps creation metadata and stores a new datasource.
    ///
    /// # Errors
    /// - `BadRequest` when validation fails.
    /// - `Conflict` when the name already exists in the project.
    /// - `Internal` on any other storage failure.
    pub fn create(&self, mut entity: Datasource) -> ServiceResult<Datasource> {
        self.validate(&entity)?;

        entity.metadata.create_now();
        match self.repo.create(&entity) {
            Ok(()) => Ok(entity),
            Err(RepoError::KeyConflict { project, name }) => {
                self.sink.debug(&format!(
                    "event=datasource_create module=service status=rejected reason=conflict project={project} name={name}"
                ));
                Err(ServiceError::Conflict { project, name })
            }
            Err(err) => Err(self.internal("datasource_create", &entity.metadata.name, &err)),
        }
    }

    /// Replaces the spec of an existing datasource.
    ///
    /// An empty `metadata.project` is taken from `parameters`. Creation time
    /// and identity are carried over from the stored version.
    ///
    /// # Errors
    /// - `BadRequest` when validation fails or the name/project in the body
    ///   differ from `parameters`.
    /// - `NotFound` when no stored version exists.
    /// - `Internal` on storage failure while reading or writing.
    pub fn update(
        &self,
        mut entity: Datasource,
        parameters: &Parameters,
    ) -> ServiceResult<Datasource> {
        self.validate(&entity)?;

        if entity.metadata.name != parameters.name {
            self.sink.debug(&format!(
                "event=datasource_update module=service status=rejected reason=name_mismatch body_name={} path_name={}",
                entity.metadata.name, parameters.name
            ));
            return Err(ServiceError::BadRequest(
                "metadata.name and the name in the request path don't match".to_string(),
            ));
        }
        if entity.metadata.project.is_empty() {
            entity.metadata.project = parameters.project.clone();
        } else if entity.metadata.project != parameters.project {
            self.sink.debug(&format!(
                "event=datasource_update module=service status=rejected reason=project_mismatch body_project={} path_project={}",
                entity.metadata.project, parameters.project
            ));
            return Err(ServiceError::BadRequest(
                "metadata.project and the project in the request path don't match".to_string(),
            ));
        }

        let previous = self.get(parameters)?;
        entity.metadata.update_from(&previous.metadata);

        if let Err(err) = self.repo.update(&entity) {
            return Err(self.internal("datasource_update", &entity.metadata.name, &err));
        }
        Ok(entity)
    }

    /// Deletes the datasource identified by `parameters`.
    pub fn delete(&self, parameters: &Parameters) -> ServiceResult<()> {
        self.repo
            .delete(&parameters.project, &parameters.name)
            .map_err(|err| self.translate_lookup("datasource_delete", parameters, err))
    }

    /// Loads the datasource identified by `parameters`.
    pub fn get(&self, parameters: &Parameters) -> ServiceResult<Datasource> {
        self.repo
            .get(&parameters.project, &parameters.name)
            .map_err(|err| self.translate_lookup("datasource_get", parameters, err))
    }

    /// Lists the datasources of `query.project`, keeping those matching
    /// `query.kind` and `query.default` when set.
    ///
    /// Repository errors are returned as-is. `_parameters` is accepted for
    /// parity with the other operations and is not read.
    pub fn list(
        &self,
        query: &DatasourceQuery,
        _parameters: &Parameters,
    ) -> RepoResult<Vec<Datasource>> {
        let list = self.repo.list(query)?;
        Ok(filter_datasources(
            query.kind.as_deref(),
            query.default,
            list,
        ))
    }

    fn validate(&self, entity: &Datasource) -> ServiceResult<()> {
        let mut existing = Vec::new();
        if entity.spec.default {
            let query = DatasourceQuery::for_project(entity.metadata.project.clone());
            existing = self.repo.list(&query).map_err(|err| {
                self.sink.error(&format!(
                    "event=datasource_validate module=service status=error project={} error={}",
                    entity.metadata.project, err
                ));
                ServiceError::BadRequest(format!("unable to list datasources of the project: {err}"))
            })?;
        }

        self.validator
            .validate(entity, &existing, &self.schemas)
            .map_err(|err| {
                self.sink.debug(&format!(
                    "event=datasource_validate module=service status=rejected name={} reason={}",
                    entity.metadata.name, err
                ));
                ServiceError::BadRequest(err.to_string())
            })
    }

    fn wrong_kind(&self, resource: &Resource) -> ServiceError {
        let metadata = resource.metadata();
        self.sink.debug(&format!(
            "event=datasource_dispatch module=service status=rejected reason=wrong_kind kind={} project={} name={}",
            resource.kind_name(),
            metadata.project,
            metadata.name
        ));
        ServiceError::BadRequest(format!(
            "wrong entity format, attempting Datasource format, received '{}'",
            resource.kind_name()
        ))
    }

    fn translate_lookup(
        &self,
        event: &str,
        parameters: &Parameters,
        err: RepoError,
    ) -> ServiceError {
        match err {
            RepoError::KeyNotFound { project, name } => {
                self.sink.debug(&format!(
                    "event={event} module=service status=rejected reason=not_found project={project} name={name}"
                ));
                ServiceError::NotFound { project, name }
            }
            other => self.internal(event, &parameters.name, &other),
        }
    }

    fn internal(&self, event: &str, name: &str, err: &RepoError) -> ServiceError {
        self.sink.error(&format!(
            "event={event} module=service status=error name={name} error={err}"
        ));
        ServiceError::Internal
    }
}
