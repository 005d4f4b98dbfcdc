//! Test Module
//!
//! Test suite for the FilingLens backend.
//!
//! ## Test Categories
//! - `taxonomy_tests`: Bootstrap defaults, label order, write-through mutations
//! - `database_tests`: Results CRUD against a temporary SQLite store
//! - `pipeline_tests`: Full download → classify → validate → store workflows
//!
//! Pure helpers (prompt rendering, JSON extraction, schema validation, HTML
//! text extraction) carry inline `#[cfg(test)]` modules next to their code.

pub mod pipeline_tests;
