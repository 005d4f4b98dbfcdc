//! Best-effort extraction of the first JSON value embedded in model output.
//!
//! Well-behaved models return bare JSON; others wrap it in explanatory prose.
//! This module isolates the recovery heuristic: a non-greedy DOTALL match for
//! the first `[...]` or `{...}` span. There is no bracket-depth counting, so
//! nested brackets in surrounding prose can truncate or over-extend the span.
//! Known limitation; callers must still parse the extracted substring and
//! handle parse failure.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\[.*?\]|\{.*?\})").expect("invalid JSON block regex"));

/// Returns the first substring of `raw` that looks like a JSON array or
/// object. Fails with [`AppError::NoJsonFound`] when no bracket pair exists.
///
/// Idempotent on clean input: a string that is already exactly one JSON value
/// comes back unchanged.
pub fn extract_json_block(raw: &str) -> Result<&str, AppError> {
    JSON_BLOCK
        .find(raw)
        .map(|m| m.as_str())
        .ok_or(AppError::NoJsonFound)
}
