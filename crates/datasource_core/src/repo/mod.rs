//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the keyed storage contract the service consumes.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - Key conflicts and missing keys are distinct error variants, never
//!   inferred from error text.

pub mod datasource_repo;
