use datasource_core::db::migrations::latest_version;
use datasource_core::db::{open_db, open_db_in_memory, DbError};
use datasource_core::{Datasource, DatasourceRepository, SqliteDatasourceRepository};
use rusqlite::Connection;

#[test]
fn datasources_table_is_keyed_by_project_and_name() {
    let conn = open_db_in_memory().unwrap();

    let mut stmt = conn
        .prepare("SELECT name, pk FROM pragma_table_info('datasources') WHERE pk > 0 ORDER BY pk;")
        .unwrap();
    let key: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|column| column.unwrap())
        .collect();
    assert_eq!(key, vec!["project", "name"]);
}

#[test]
fn default_lookup_index_covers_project_then_flag() {
    let conn = open_db_in_memory().unwrap();

    let mut stmt = conn
        .prepare("SELECT name FROM pragma_index_info('idx_datasources_project_default') ORDER BY seqno;")
        .unwrap();
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|column| column.unwrap())
        .collect();
    assert_eq!(columns, vec!["project", "is_default"]);
}

#[test]
fn default_flag_column_only_accepts_booleans() {
    let conn = open_db_in_memory().unwrap();

    let err = conn
        .execute(
            "INSERT INTO datasources (project, name, kind, is_default) VALUES ('p1', 'ds1', 'prometheus', 2);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("CHECK"));
}

#[test]
fn reopening_file_database_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("datasources.db");

    let conn_first = open_db(&path).unwrap();
    SqliteDatasourceRepository::try_new(&conn_first)
        .unwrap()
        .create(&Datasource::new("p1", "ds1", "prometheus", true))
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    let loaded = SqliteDatasourceRepository::try_new(&conn_second)
        .unwrap()
        .get("p1", "ds1")
        .unwrap();
    assert!(loaded.spec.default);
}

#[test]
fn store_written_by_newer_binary_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = open_db(&path).unwrap();
    conn.execute_batch(&format!(
        "PRAGMA user_version = {};",
        latest_version() + 1
    ))
    .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, latest_version() + 1);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn plain_connection_has_no_datasource_schema() {
    let conn = Connection::open_in_memory().unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, 0);
    assert!(SqliteDatasourceRepository::try_new(&conn).is_err());
}
