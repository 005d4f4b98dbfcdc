//! SQLite persistence for classification results.
//!
//! The core never reads this store back during classification; it exists for
//! front ends to inspect past runs.

use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;
use tracing::info;

use crate::models::StoredResult;

pub async fn init_db(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| sqlx::Error::Io(e))?;
    }
    let db_url = format!("sqlite://{}", db_path.to_string_lossy());

    info!("Initializing database at: {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS results (
            id TEXT PRIMARY KEY,
            url TEXT,
            text TEXT,
            model_output JSON NOT NULL,
            validation TEXT NOT NULL,
            expected TEXT,
            company TEXT,
            template TEXT,
            created_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(&pool)
    .await?;

    info!("Database initialized and migrations applied.");

    Ok(pool)
}

/// Arguments for one stored result. The id is caller-supplied so evaluation
/// runs can use stable, human-traceable identifiers.
pub struct NewResult<'a> {
    pub id: &'a str,
    pub url: Option<&'a str>,
    pub text: Option<&'a str>,
    pub model_output: &'a Value,
    pub validation: bool,
    pub expected: Option<&'a str>,
    pub company: Option<&'a str>,
    pub template: Option<&'a str>,
}

pub async fn insert_result(
    pool: &SqlitePool,
    new: NewResult<'_>,
) -> Result<StoredResult, sqlx::Error> {
    let created_at = Utc::now().timestamp();
    let output_json = Json(new.model_output.clone());

    sqlx::query_as::<_, StoredResult>(
        r#"
        INSERT INTO results (id, url, text, model_output, validation, expected, company, template, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, url, text, model_output, validation, expected, company, template, created_at
        "#,
    )
    .bind(new.id)
    .bind(new.url)
    .bind(new.text)
    .bind(output_json)
    .bind(if new.validation { "true" } else { "false" })
    .bind(new.expected)
    .bind(new.company)
    .bind(new.template)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub async fn get_result(pool: &SqlitePool, id: &str) -> Result<Option<StoredResult>, sqlx::Error> {
    sqlx::query_as::<_, StoredResult>(
        r#"
        SELECT id, url, text, model_output, validation, expected, company, template, created_at
        FROM results
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_results_by_url(
    pool: &SqlitePool,
    url: &str,
) -> Result<Vec<StoredResult>, sqlx::Error> {
    sqlx::query_as::<_, StoredResult>(
        r#"
        SELECT id, url, text, model_output, validation, expected, company, template, created_at
        FROM results
        WHERE url = ?
        ORDER BY created_at ASC
        "#,
    )
    .bind(url)
    .fetch_all(pool)
    .await
}

pub async fn get_all_results(pool: &SqlitePool) -> Result<Vec<StoredResult>, sqlx::Error> {
    sqlx::query_as::<_, StoredResult>(
        r#"
        SELECT id, url, text, model_output, validation, expected, company, template, created_at
        FROM results
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Deletes one result; returns whether a row existed.
pub async fn delete_result(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let outcome = sqlx::query("DELETE FROM results WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(outcome.rows_affected() > 0)
}

pub async fn delete_all_results(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let outcome = sqlx::query("DELETE FROM results").execute(pool).await?;
    Ok(outcome.rows_affected())
}
