//! End-to-end orchestration: fetch, extract, classify, validate, store.
//!
//! Each classification request runs as an independent sequential pipeline.
//! The only long-latency step is the backend call; the pipeline owns the
//! timeout for it, since the adapter deliberately does not.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::sqlite::SqlitePool;
use tokio::time::timeout;
use tracing::{error, info};
use uuid::Uuid;

use crate::classify::Classifier;
use crate::database::{insert_result, NewResult};
use crate::error::AppError;
use crate::ingest::{clean_filing_text, download_filing, extract_company_name, extract_text_from_html};
use crate::llm::GenerationBackend;
use crate::models::StoredResult;
use crate::prompt::PromptLibrary;
use crate::taxonomy::EventTaxonomy;
use crate::validator::validate;

/// Upper bound on one backend invocation. Local models can take minutes on a
/// long filing; anything past this is treated as a hang and cancelled.
const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(300);

pub struct Pipeline {
    client: Client,
    classifier: Classifier,
    pool: SqlitePool,
    taxonomy_path: PathBuf,
    generation_timeout: Duration,
}

/// Outcome of one item in a batch run. Failures are recorded, never fatal to
/// the rest of the batch.
pub struct BatchItem {
    pub url: String,
    pub outcome: Result<StoredResult, AppError>,
}

impl Pipeline {
    pub fn new(
        prompts: PromptLibrary,
        backend: Arc<dyn GenerationBackend>,
        pool: SqlitePool,
        taxonomy_path: PathBuf,
    ) -> Self {
        Self {
            client: Client::new(),
            classifier: Classifier::new(prompts, backend),
            pool,
            taxonomy_path,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_generation_timeout(mut self, generation_timeout: Duration) -> Self {
        self.generation_timeout = generation_timeout;
        self
    }

    /// Classifies raw text that is already plain (no download step) and
    /// stores the outcome.
    pub async fn classify_text(
        &self,
        text: &str,
        use_reasoning: bool,
    ) -> Result<StoredResult, AppError> {
        let taxonomy = EventTaxonomy::load(&self.taxonomy_path)?;
        let labels = taxonomy.labels();

        let result = timeout(
            self.generation_timeout,
            self.classifier.classify(text, &labels, use_reasoning),
        )
        .await??;
        let valid = validate(&result, &labels);

        let id = Uuid::new_v4().to_string();
        let stored = insert_result(
            &self.pool,
            NewResult {
                id: &id,
                url: None,
                text: Some(text),
                model_output: result.payload(),
                validation: valid,
                expected: None,
                company: None,
                template: Some(result.variant().display_name()),
            },
        )
        .await?;

        info!(id = %stored.id, valid, "stored classification result");
        Ok(stored)
    }

    /// Downloads a filing, extracts and cleans its text, classifies it, and
    /// stores the outcome together with the extracted registrant name.
    pub async fn classify_url(
        &self,
        url: &str,
        use_reasoning: bool,
    ) -> Result<StoredResult, AppError> {
        let html = download_filing(&self.client, url).await?;
        let filing_text = clean_filing_text(&extract_text_from_html(&html));
        let company = extract_company_name(&filing_text);

        let taxonomy = EventTaxonomy::load(&self.taxonomy_path)?;
        let labels = taxonomy.labels();

        let result = timeout(
            self.generation_timeout,
            self.classifier.classify(&filing_text, &labels, use_reasoning),
        )
        .await??;
        let valid = validate(&result, &labels);

        let id = Uuid::new_v4().to_string();
        let stored = insert_result(
            &self.pool,
            NewResult {
                id: &id,
                url: Some(url),
                text: None,
                model_output: result.payload(),
                validation: valid,
                expected: None,
                company: Some(&company),
                template: Some(result.variant().display_name()),
            },
        )
        .await?;

        info!(id = %stored.id, %url, valid, "stored classification result");
        Ok(stored)
    }

    /// Processes filings sequentially. A failure on one document is recorded
    /// against that document and the loop continues; there is no rollback of
    /// already-stored items.
    pub async fn classify_batch(&self, urls: &[String], use_reasoning: bool) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(urls.len());
        for url in urls {
            let outcome = self.classify_url(url, use_reasoning).await;
            if let Err(ref e) = outcome {
                error!(%url, error = %e, "batch item failed");
            }
            items.push(BatchItem {
                url: url.clone(),
                outcome,
            });
        }
        items
    }
}
