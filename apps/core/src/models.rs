use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::prompt::TemplateVariant;

/// One classified event as emitted by the model.
///
/// Decoding is strict: `Relevant` must be a genuine JSON boolean, so string or
/// numeric surrogates (`"true"`, `1`) fail the decode. Unknown keys are
/// ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassificationItem {
    /// Event-type label; membership in the taxonomy is checked separately.
    #[serde(rename = "Event Type")]
    pub event_type: String,
    /// Whether the model judged the event material.
    #[serde(rename = "Relevant")]
    pub relevant: bool,
}

/// Strict schema for the reasoning-wrapped response shape.
///
/// The `Reasoning` key must be present but its contents are not shape-checked.
#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningOutput {
    /// Decoded only to enforce presence of the key.
    #[serde(rename = "Reasoning")]
    #[allow(dead_code)]
    pub reasoning: Value,
    #[serde(rename = "Events")]
    pub events: Vec<ClassificationItem>,
}

/// Parsed model output, tagged with the template variant that was requested.
///
/// The payload is kept as raw JSON here; whether its shape actually matches
/// the tag is the validator's call, never coerced by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationResult {
    Direct(Value),
    Reasoning(Value),
}

impl ClassificationResult {
    pub fn variant(&self) -> TemplateVariant {
        match self {
            Self::Direct(_) => TemplateVariant::Direct,
            Self::Reasoning(_) => TemplateVariant::Reasoning,
        }
    }

    pub fn payload(&self) -> &Value {
        match self {
            Self::Direct(value) | Self::Reasoning(value) => value,
        }
    }
}

/// A persisted classification result.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredResult {
    /// Unique identifier for the classification run (UUID).
    pub id: String,
    /// Filing URL, when the request started from one.
    pub url: Option<String>,
    /// Raw filing text, when the request started from text.
    pub text: Option<String>,
    /// Parsed model output as stored JSON.
    pub model_output: Json<Value>,
    /// Validation outcome, stored as "true"/"false".
    pub validation: String,
    /// Expected label, populated by evaluation runs.
    pub expected: Option<String>,
    /// Registrant name extracted from the filing, when available.
    pub company: Option<String>,
    /// Human-readable template name used for the run.
    pub template: Option<String>,
    /// Unix timestamp of when the result was stored.
    pub created_at: i64,
}
