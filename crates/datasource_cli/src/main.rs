//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `datasource_core` linkage and run one create/list pass against an
//!   in-memory store.
//! - Keep output deterministic for quick local sanity checks.

use datasource_core::db::open_db_in_memory;
use datasource_core::{
    Datasource, DatasourceQuery, DatasourceService, Parameters, PluginSchemas,
    SqliteDatasourceRepository,
};
use serde_json::json;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("datasource_core ping={}", datasource_core::ping());
    println!("datasource_core version={}", datasource_core::core_version());

    match smoke() {
        Ok(count) => {
            println!("datasource_core smoke=ok listed={count}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("datasource_core smoke=error error={err}");
            ExitCode::FAILURE
        }
    }
}

fn smoke() -> Result<usize, Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let repo = SqliteDatasourceRepository::try_new(&conn)?;
    let service = DatasourceService::new(repo, PluginSchemas::new());

    service.create(
        Datasource::new("smoke", "prometheus-main", "prometheus", true)
            .with_plugin(json!({ "url": "http://localhost:9090" })),
    )?;
    let listed = service.list(
        &DatasourceQuery::for_project("smoke"),
        &Parameters::default(),
    )?;
    Ok(listed.len())
}
