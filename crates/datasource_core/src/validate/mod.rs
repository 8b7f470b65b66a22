//! Datasource validation.
//!
//! # Responsibility
//! - Register plugin payload schemas.
//! - Check identifiers, payload shape and default unicity.
//!
//! # Invariants
//! - Validators never read or write storage; the service hands them the
//!   scope snapshot.

pub mod datasource;
pub mod schema;
