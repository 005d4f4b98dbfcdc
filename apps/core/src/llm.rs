//! Generation backend adapter for an Ollama-compatible completion API.
//!
//! The backend call can take seconds to minutes, so it runs on its own task
//! behind an mpsc/oneshot handle; a slow completion never blocks unrelated
//! requests. The adapter performs no retry and imposes no timeout of its own,
//! the orchestrating layer owns both.

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::error::AppError;

/// Abstracts the text-generation backend so the classifier can be exercised
/// against a stub in tests.
#[async_trait]
pub trait GenerationBackend: Send + Sync + 'static {
    /// Sends a prompt and returns the backend's raw textual output.
    ///
    /// Blocking from the caller's perspective; latency is unbounded.
    async fn generate(
        &self,
        prompt: String,
        model_override: Option<String>,
    ) -> Result<String, AppError>;
}

/// Explicit backend configuration, passed in at construction rather than read
/// from process-global state at call time.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Base URL of the completion server, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Default model identifier. `None` means every call must override it.
    pub model: Option<String>,
}

impl GeneratorConfig {
    /// Reads `OLLAMA_URL` and `OLLAMA_MODEL` from the environment (`.env`
    /// files are honored via dotenv in `main`).
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            model: env::var("OLLAMA_MODEL").ok(),
        }
    }
}

/// A handle to the generator task.
///
/// Cloneable; all clones feed the same underlying task.
#[derive(Clone)]
pub struct GeneratorHandle {
    sender: mpsc::Sender<GeneratorMessage>,
}

impl GeneratorHandle {
    /// Spawns the generator runner on a new Tokio task and returns a handle to it.
    pub fn new(config: GeneratorConfig) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let runner = GeneratorRunner::new(receiver, config);
        tokio::spawn(async move { runner.run().await });
        Self { sender }
    }
}

#[async_trait]
impl GenerationBackend for GeneratorHandle {
    async fn generate(
        &self,
        prompt: String,
        model_override: Option<String>,
    ) -> Result<String, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = GeneratorMessage::Generate {
            prompt,
            model_override,
            responder: send,
        };

        self.sender
            .send(msg)
            .await
            .map_err(|e| AppError::Task(e.to_string()))?;
        recv.await.map_err(|e| AppError::Task(e.to_string()))?
    }
}

/// Messages understood by the generator runner.
enum GeneratorMessage {
    Generate {
        prompt: String,
        model_override: Option<String>,
        responder: oneshot::Sender<Result<String, AppError>>,
    },
}

struct GeneratorRunner {
    receiver: mpsc::Receiver<GeneratorMessage>,
    config: GeneratorConfig,
    client: Client,
}

impl GeneratorRunner {
    fn new(receiver: mpsc::Receiver<GeneratorMessage>, config: GeneratorConfig) -> Self {
        Self {
            receiver,
            config,
            client: Client::new(),
        }
    }

    async fn run(mut self) {
        info!("Generator task started");
        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg).await;
        }
        info!("Generator task stopped");
    }

    async fn handle_message(&mut self, msg: GeneratorMessage) {
        match msg {
            GeneratorMessage::Generate {
                prompt,
                model_override,
                responder,
            } => {
                let result = self.generate_completion(prompt, model_override).await;
                let _ = responder.send(result);
            }
        }
    }

    async fn generate_completion(
        &self,
        prompt: String,
        model_override: Option<String>,
    ) -> Result<String, AppError> {
        let model = model_override
            .or_else(|| self.config.model.clone())
            .ok_or(AppError::BackendNotConfigured)?;

        info!(model = %model, prompt_len = prompt.len(), "sending prompt to generation backend");

        let payload = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false
        });

        let res = self
            .client
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::BackendExecution(format!("request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!(%status, "generation backend returned an error");
            return Err(AppError::BackendExecution(format!(
                "completion request failed with status {}: {} (model: {})",
                status, body, model
            )));
        }

        let json: Value = res
            .json()
            .await
            .map_err(|e| AppError::BackendExecution(e.to_string()))?;

        Ok(json["response"].as_str().unwrap_or("").trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_test_generator(server_url: String, model: Option<String>) -> GeneratorHandle {
        let (sender, receiver) = mpsc::channel(32);
        let config = GeneratorConfig {
            base_url: server_url,
            model,
        };
        let runner = GeneratorRunner::new(receiver, config);
        tokio::spawn(async move { runner.run().await });
        GeneratorHandle { sender }
    }

    #[tokio::test]
    async fn test_generate_completion_success() {
        let mock_server = MockServer::start().await;
        let handle =
            setup_test_generator(mock_server.uri(), Some("llama3".to_string())).await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({ "model": "llama3", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3",
                "response": "[{\"Event Type\": \"Acquisition\", \"Relevant\": true}]",
                "done": true
            })))
            .mount(&mock_server)
            .await;

        let result = handle.generate("Classify this.".to_string(), None).await;
        assert_eq!(
            result.unwrap(),
            "[{\"Event Type\": \"Acquisition\", \"Relevant\": true}]"
        );
    }

    #[tokio::test]
    async fn test_generate_completion_server_error_carries_diagnostic() {
        let mock_server = MockServer::start().await;
        let handle =
            setup_test_generator(mock_server.uri(), Some("llama3".to_string())).await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&mock_server)
            .await;

        let result = handle.generate("Classify this.".to_string(), None).await;
        match result {
            Err(AppError::BackendExecution(diag)) => {
                assert!(diag.contains("500"));
                assert!(diag.contains("model not loaded"));
            }
            other => panic!("Expected BackendExecution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_without_model_is_not_configured() {
        let mock_server = MockServer::start().await;
        let handle = setup_test_generator(mock_server.uri(), None).await;

        let result = handle.generate("Classify this.".to_string(), None).await;
        assert!(matches!(result, Err(AppError::BackendNotConfigured)));
    }

    #[tokio::test]
    async fn test_per_call_model_override() {
        let mock_server = MockServer::start().await;
        let handle = setup_test_generator(mock_server.uri(), None).await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({ "model": "mistral" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "[]",
                "done": true
            })))
            .mount(&mock_server)
            .await;

        let result = handle
            .generate("Classify this.".to_string(), Some("mistral".to_string()))
            .await;
        assert_eq!(result.unwrap(), "[]");
    }
}
