//! Datasource repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed CRUD and scope-filtered listing over `datasources`.
//! - Report key conflicts and missing keys as dedicated error variants.
//!
//! # Invariants
//! - `(project, name)` uniqueness is enforced by the table primary key.
//! - The repository never validates payloads or the default flag; that
//!   belongs to the service layer.
//! - Read paths reject undecodable rows instead of masking them.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::datasource::{Datasource, DatasourceSpec, Metadata};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DATASOURCE_SELECT_SQL: &str = "SELECT
    project,
    name,
    uid,
    version,
    created_at,
    updated_at,
    is_default,
    kind,
    plugin
FROM datasources";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for datasource storage operations.
#[derive(Debug)]
pub enum RepoError {
    /// A datasource with the same `(project, name)` already exists.
    KeyConflict { project: String, name: String },
    /// No datasource is stored under `(project, name)`.
    KeyNotFound { project: String, name: String },
    Db(DbError),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyConflict { project, name } => {
                write!(f, "datasource `{name}` already exists in project `{project}`")
            }
            Self::KeyNotFound { project, name } => {
                write!(f, "datasource `{name}` not found in project `{project}`")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted datasource data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter for listing datasources.
///
/// The repository only applies `project`; `kind` and `default` are applied
/// by the service after the scope read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasourceQuery {
    pub project: String,
    pub kind: Option<String>,
    pub default: Option<bool>,
}

impl DatasourceQuery {
    /// Query selecting every datasource of one scope.
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }
}

/// Storage contract consumed by the datasource service.
pub trait DatasourceRepository {
    /// Inserts a new datasource. Fails with `KeyConflict` when the key exists.
    fn create(&self, datasource: &Datasource) -> RepoResult<()>;
    /// Overwrites the datasource stored under the same key.
    fn update(&self, datasource: &Datasource) -> RepoResult<()>;
    /// Removes one datasource. Fails with `KeyNotFound` when absent.
    fn delete(&self, project: &str, name: &str) -> RepoResult<()>;
    /// Loads one datasource. Fails with `KeyNotFound` when absent.
    fn get(&self, project: &str, name: &str) -> RepoResult<Datasource>;
    /// Lists the datasources of `query.project`, ordered by name.
    fn list(&self, query: &DatasourceQuery) -> RepoResult<Vec<Datasource>>;
}

impl<R: DatasourceRepository + ?Sized> DatasourceRepository for &R {
    fn create(&self, datasource: &Datasource) -> RepoResult<()> {
        (**self).create(datasource)
    }

    fn update(&self, datasource: &Datasource) -> RepoResult<()> {
        (**self).update(datasource)
    }

    fn delete(&self, project: &str, name: &str) -> RepoResult<()> {
        (**self).delete(project, name)
    }

    fn get(&self, project: &str, name: &str) -> RepoResult<Datasource> {
        (**self).get(project, name)
    }

    fn list(&self, query: &DatasourceQuery) -> RepoResult<Vec<Datasource>> {
        (**self).list(query)
    }
}

/// SQLite-backed datasource repository.
pub struct SqliteDatasourceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDatasourceRepository<'conn> {
    /// Wraps a connection prepared by `db::open_db`/`open_db_in_memory`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` when the `datasources` table is absent.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version < expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let table_exists: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'datasources'
            );",
            [],
            |row| row.get(0),
        )?;
        if !table_exists {
            return Err(RepoError::MissingRequiredTable("datasources"));
        }

        Ok(Self { conn })
    }
}

impl DatasourceRepository for SqliteDatasourceRepository<'_> {
    fn create(&self, datasource: &Datasource) -> RepoResult<()> {
        let metadata = &datasource.metadata;
        let result = self.conn.execute(
            "INSERT INTO datasources (
                project,
                name,
                uid,
                version,
                created_at,
                updated_at,
                is_default,
                kind,
                plugin
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                metadata.project.as_str(),
                metadata.name.as_str(),
                metadata.uid.map(|uid| uid.to_string()),
                version_to_db(metadata.version)?,
                metadata.created_at,
                metadata.updated_at,
                datasource.spec.default,
                datasource.spec.kind.as_str(),
                datasource.spec.plugin.to_string(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_key_conflict(&err) => Err(RepoError::KeyConflict {
                project: metadata.project.clone(),
                name: metadata.name.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn update(&self, datasource: &Datasource) -> RepoResult<()> {
        let metadata = &datasource.metadata;
        let changed = self.conn.execute(
            "UPDATE datasources
             SET
                uid = ?1,
                version = ?2,
                created_at = ?3,
                updated_at = ?4,
                is_default = ?5,
                kind = ?6,
                plugin = ?7
             WHERE project = ?8 AND name = ?9;",
            params![
                metadata.uid.map(|uid| uid.to_string()),
                version_to_db(metadata.version)?,
                metadata.created_at,
                metadata.updated_at,
                datasource.spec.default,
                datasource.spec.kind.as_str(),
                datasource.spec.plugin.to_string(),
                metadata.project.as_str(),
                metadata.name.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::KeyNotFound {
                project: metadata.project.clone(),
                name: metadata.name.clone(),
            });
        }
        Ok(())
    }

    fn delete(&self, project: &str, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM datasources WHERE project = ?1 AND name = ?2;",
            params![project, name],
        )?;

        if changed == 0 {
            return Err(RepoError::KeyNotFound {
                project: project.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn get(&self, project: &str, name: &str) -> RepoResult<Datasource> {
        let mut stmt = self.conn.prepare(&format!(
            "{DATASOURCE_SELECT_SQL} WHERE project = ?1 AND name = ?2;"
        ))?;

        let row = stmt
            .query_row(params![project, name], read_raw_row)
            .optional()?;
        match row {
            Some(raw) => parse_raw_row(raw),
            None => Err(RepoError::KeyNotFound {
                project: project.to_string(),
                name: name.to_string(),
            }),
        }
    }

    fn list(&self, query: &DatasourceQuery) -> RepoResult<Vec<Datasource>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DATASOURCE_SELECT_SQL} WHERE project = ?1 ORDER BY name ASC;"
        ))?;

        let rows = stmt.query_map([query.project.as_str()], read_raw_row)?;
        let mut datasources = Vec::new();
        for row in rows {
            datasources.push(parse_raw_row(row?)?);
        }
        Ok(datasources)
    }
}

/// Column values as stored, before domain decoding.
struct RawRow {
    project: String,
    name: String,
    uid: Option<String>,
    version: i64,
    created_at: Option<i64>,
    updated_at: Option<i64>,
    is_default: bool,
    kind: String,
    plugin: String,
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        project: row.get("project")?,
        name: row.get("name")?,
        uid: row.get("uid")?,
        version: row.get("version")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        is_default: row.get("is_default")?,
        kind: row.get("kind")?,
        plugin: row.get("plugin")?,
    })
}

fn parse_raw_row(raw: RawRow) -> RepoResult<Datasource> {
    let uid = match raw.uid {
        Some(text) => Some(Uuid::parse_str(&text).map_err(|_| {
            RepoError::InvalidData(format!("invalid uid value `{text}` in datasources.uid"))
        })?),
        None => None,
    };

    let version = u64::try_from(raw.version).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid version `{}` in datasources.version",
            raw.version
        ))
    })?;

    let plugin = serde_json::from_str(&raw.plugin).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid plugin json for datasource `{}`: {err}",
            raw.name
        ))
    })?;

    Ok(Datasource {
        metadata: Metadata {
            name: raw.name,
            project: raw.project,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            uid,
            version,
        },
        spec: DatasourceSpec {
            default: raw.is_default,
            kind: raw.kind,
            plugin,
        },
    })
}

fn version_to_db(version: u64) -> RepoResult<i64> {
    i64::try_from(version)
        .map_err(|_| RepoError::InvalidData(format!("version {version} exceeds storage range")))
}

fn is_key_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && (failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE)
    )
}

#[cfg(test)]
mod tests {
    use super::is_key_conflict;
    use rusqlite::Connection;

    #[test]
    fn primary_key_violation_is_a_key_conflict() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id TEXT PRIMARY KEY); INSERT INTO t VALUES ('a');")
            .unwrap();

        let err = conn
            .execute("INSERT INTO t VALUES ('a');", [])
            .unwrap_err();
        assert!(is_key_conflict(&err));

        let other = conn.execute("INSERT INTO missing VALUES (1);", []).unwrap_err();
        assert!(!is_key_conflict(&other));
    }
}
