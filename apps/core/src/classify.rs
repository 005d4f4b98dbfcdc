//! Classification orchestration: prompt, invoke, parse.
//!
//! The two-stage parse (whole response first, extracted block second) exists
//! because well-behaved models return bare JSON while others wrap it in
//! explanatory prose. The fallback never masks a genuinely malformed response:
//! if neither stage yields JSON the request fails with a terminal
//! `UnparsableOutput`.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::AppError;
use crate::extract::extract_json_block;
use crate::llm::GenerationBackend;
use crate::models::ClassificationResult;
use crate::prompt::{PromptLibrary, TemplateVariant};

pub struct Classifier {
    prompts: PromptLibrary,
    backend: Arc<dyn GenerationBackend>,
}

impl Classifier {
    pub fn new(prompts: PromptLibrary, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { prompts, backend }
    }

    /// Classifies one document against the allowed event types.
    ///
    /// Selects the reasoning template iff `use_reasoning`, builds the prompt,
    /// invokes the backend, and parses the reply. The result is tagged with
    /// the requested variant; whether the payload shape actually matches is
    /// the validator's concern. No retry happens here.
    pub async fn classify(
        &self,
        text: &str,
        labels: &[String],
        use_reasoning: bool,
    ) -> Result<ClassificationResult, AppError> {
        let variant = if use_reasoning {
            TemplateVariant::Reasoning
        } else {
            TemplateVariant::Direct
        };
        info!(template = variant.file_name(), "classifying document");

        let prompt = self.prompts.build(variant, text, labels)?;
        let response = self.backend.generate(prompt, None).await?;
        debug!(response_len = response.len(), "received model output");

        let value = parse_model_output(&response)?;
        Ok(match variant {
            TemplateVariant::Direct => ClassificationResult::Direct(value),
            TemplateVariant::Reasoning => ClassificationResult::Reasoning(value),
        })
    }
}

/// Direct JSON parse first; on failure, extract the first JSON block and
/// parse that. Both failing is a terminal `UnparsableOutput`.
fn parse_model_output(raw: &str) -> Result<Value, AppError> {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Ok(value);
    }

    let block = match extract_json_block(raw) {
        Ok(block) => block,
        Err(AppError::NoJsonFound) => {
            return Err(AppError::UnparsableOutput(
                "no JSON array or object in model output".to_string(),
            ))
        }
        Err(e) => return Err(e),
    };

    serde_json::from_str::<Value>(block)
        .map_err(|e| AppError::UnparsableOutput(e.to_string()))
}
