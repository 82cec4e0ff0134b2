//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate storage, link rendering and indexing into use-case APIs.
//! - Keep the CLI layer decoupled from SQLite and storage details.

pub mod entry_service;
