//! Domain model for config-store resources.
//!
//! # Responsibility
//! - Define the datasource record and its metadata bookkeeping.
//! - Define boundary values: the `Resource` sum type and `Parameters`.
//!
//! # Invariants
//! - Every stored resource is identified by `(project, name)`.

pub mod datasource;
pub mod resource;
