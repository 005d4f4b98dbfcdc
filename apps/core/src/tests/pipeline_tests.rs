//! Pipeline Integration Tests
//!
//! Full download → extract → classify → validate → store workflows, with the
//! filing source mocked by wiremock and the generation backend either stubbed
//! or mocked at the HTTP level.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::{tempdir, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::database;
use crate::error::AppError;
use crate::llm::{GenerationBackend, GeneratorConfig, GeneratorHandle};
use crate::pipeline::Pipeline;
use crate::prompt::PromptLibrary;

/// Backend stub returning a canned reply, standing in for the model.
struct StubBackend {
    reply: String,
}

#[async_trait]
impl GenerationBackend for StubBackend {
    async fn generate(
        &self,
        _prompt: String,
        _model_override: Option<String>,
    ) -> Result<String, AppError> {
        Ok(self.reply.clone())
    }
}

const FILING_HTML: &str = r#"<html><body>
<p>Apple Inc. (Exact name of Registrant as specified in its charter)</p>
<p>Item 2.01 Completion of Acquisition or Disposition of Assets.</p>
</body></html>"#;

async fn setup_pipeline(backend: Arc<dyn GenerationBackend>) -> (TempDir, Pipeline) {
    let dir = tempdir().expect("Failed to create temp dir");

    let prompts = PromptLibrary::new(dir.path().join("prompts"));
    prompts.ensure_defaults().expect("Failed to write templates");

    let pool = database::init_db(&dir.path().join("filings.sqlite"))
        .await
        .expect("Failed to create test pool");

    let taxonomy_path = dir.path().join("events.json");
    let pipeline = Pipeline::new(prompts, backend, pool, taxonomy_path);
    (dir, pipeline)
}

#[tokio::test]
async fn test_classify_url_stores_valid_result() {
    let sec = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Archives/d259993d8k.htm"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FILING_HTML))
        .mount(&sec)
        .await;

    let backend = Arc::new(StubBackend {
        reply: r#"[{"Event Type": "Acquisition", "Relevant": true}]"#.to_string(),
    });
    let (_guard, pipeline) = setup_pipeline(backend).await;

    let url = format!("{}/Archives/d259993d8k.htm", sec.uri());
    let stored = pipeline
        .classify_url(&url, false)
        .await
        .expect("Pipeline failed");

    assert_eq!(stored.url.as_deref(), Some(url.as_str()));
    assert_eq!(stored.validation, "true");
    assert_eq!(stored.company.as_deref(), Some("Apple Inc."));
    assert_eq!(stored.template.as_deref(), Some("Zero-Shot"));
    assert_eq!(
        stored.model_output.0,
        json!([{ "Event Type": "Acquisition", "Relevant": true }])
    );
}

#[tokio::test]
async fn test_classify_text_with_prose_wrapped_reply() {
    let backend = Arc::new(StubBackend {
        reply: r#"Here is the answer: [{"Event Type": "Other", "Relevant": false}] Thank you."#
            .to_string(),
    });
    let (_guard, pipeline) = setup_pipeline(backend).await;

    let stored = pipeline
        .classify_text("Nothing notable happened this quarter.", false)
        .await
        .expect("Pipeline failed");

    assert_eq!(stored.validation, "true");
    assert_eq!(
        stored.model_output.0,
        json!([{ "Event Type": "Other", "Relevant": false }])
    );
}

#[tokio::test]
async fn test_out_of_taxonomy_label_is_stored_invalid() {
    // The run completes; validation records the schema rejection.
    let backend = Arc::new(StubBackend {
        reply: r#"[{"Event Type": "Merger", "Relevant": true}]"#.to_string(),
    });
    let (_guard, pipeline) = setup_pipeline(backend).await;

    let stored = pipeline
        .classify_text("Two companies merged.", false)
        .await
        .expect("Pipeline failed");

    assert_eq!(stored.validation, "false");
}

#[tokio::test]
async fn test_unparsable_reply_fails_without_storing() {
    let backend = Arc::new(StubBackend {
        reply: "I cannot comply.".to_string(),
    });
    let (_guard, pipeline) = setup_pipeline(backend).await;

    let err = pipeline
        .classify_text("Some filing text.", false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnparsableOutput(_)));
}

#[tokio::test]
async fn test_reasoning_variant_end_to_end() {
    let backend = Arc::new(StubBackend {
        reply: r#"{"Reasoning": ["The CFO resigned, a personnel change."], "Events": [{"Event Type": "Personnel Change", "Relevant": true}]}"#
            .to_string(),
    });
    let (_guard, pipeline) = setup_pipeline(backend).await;

    let stored = pipeline
        .classify_text("The CFO resigned effective immediately.", true)
        .await
        .expect("Pipeline failed");

    assert_eq!(stored.validation, "true");
    assert_eq!(stored.template.as_deref(), Some("Chain-of-Thought"));
}

/// Backend stub that never completes within any test-scale deadline.
struct HangingBackend;

#[async_trait]
impl GenerationBackend for HangingBackend {
    async fn generate(
        &self,
        _prompt: String,
        _model_override: Option<String>,
    ) -> Result<String, AppError> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(String::new())
    }
}

#[tokio::test]
async fn test_slow_backend_is_cancelled_by_generation_timeout() {
    let (_guard, pipeline) = setup_pipeline(Arc::new(HangingBackend)).await;
    let pipeline = pipeline.with_generation_timeout(Duration::from_millis(50));

    let err = pipeline
        .classify_text("Some filing text.", false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Timeout(_)));
}

#[tokio::test]
async fn test_batch_continues_past_failures() {
    let sec = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Archives/good.htm"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FILING_HTML))
        .mount(&sec)
        .await;
    Mock::given(method("GET"))
        .and(path("/Archives/gone.htm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&sec)
        .await;

    let backend = Arc::new(StubBackend {
        reply: r#"[{"Event Type": "Acquisition", "Relevant": true}]"#.to_string(),
    });
    let (_guard, pipeline) = setup_pipeline(backend).await;

    let urls = vec![
        format!("{}/Archives/gone.htm", sec.uri()),
        format!("{}/Archives/good.htm", sec.uri()),
    ];
    let items = pipeline.classify_batch(&urls, false).await;

    assert_eq!(items.len(), 2);
    assert!(matches!(
        items[0].outcome,
        Err(AppError::Fetch { ref status_hint, .. }) if status_hint.contains("404")
    ));
    // The failure on the first item did not abort the second.
    assert!(items[1].outcome.is_ok());
}

#[tokio::test]
async fn test_pipeline_with_http_generation_backend() {
    // Same flow, but through the real generator task against a mock server.
    let llm_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "response": "[{\"Event Type\": \"Financial Event\", \"Relevant\": true}]",
            "done": true
        })))
        .mount(&llm_server)
        .await;

    let backend = Arc::new(GeneratorHandle::new(GeneratorConfig {
        base_url: llm_server.uri(),
        model: Some("llama3".to_string()),
    }));
    let (_guard, pipeline) = setup_pipeline(backend).await;

    let stored = pipeline
        .classify_text("Quarterly revenue fell 12 percent.", false)
        .await
        .expect("Pipeline failed");

    assert_eq!(stored.validation, "true");
    assert_eq!(
        stored.model_output.0,
        json!([{ "Event Type": "Financial Event", "Relevant": true }])
    );
}
