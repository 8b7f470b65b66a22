//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation and repository calls into lifecycle operations.
//! - Translate storage outcomes into caller-facing errors.

pub mod datasource_service;
