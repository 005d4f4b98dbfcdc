//! Prompt template loading and rendering.
//!
//! Templates are plain text files with two substitution points: `{text}` for
//! the filing text and `{events}` for the allowed event-type list. Rendering
//! is a pure function: identical inputs yield byte-identical prompts.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::AppError;

/// Default location of the template store, relative to the working directory.
pub const DEFAULT_PROMPT_DIR: &str = "prompts";

const ZERO_SHOT_TEMPLATE: &str = include_str!("../prompts/zero_shot.tpl");
const COT_TEMPLATE: &str = include_str!("../prompts/cot.tpl");

/// The two built-in template variants and their expected response shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVariant {
    /// Expects a flat JSON array of classification items.
    Direct,
    /// Expects a reasoning-wrapped object with `Reasoning` and `Events` keys.
    Reasoning,
}

impl TemplateVariant {
    /// Resolves a template name to its variant. Unknown names are a hard error,
    /// never a silent fallback.
    pub fn from_name(name: &str) -> Result<Self, AppError> {
        match name {
            "zero_shot.tpl" => Ok(Self::Direct),
            "cot.tpl" => Ok(Self::Reasoning),
            other => Err(AppError::TemplateNotFound(other.to_string())),
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Direct => "zero_shot.tpl",
            Self::Reasoning => "cot.tpl",
        }
    }

    /// Human-readable name used when persisting results.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Direct => "Zero-Shot",
            Self::Reasoning => "Chain-of-Thought",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            Self::Direct => ZERO_SHOT_TEMPLATE,
            Self::Reasoning => COT_TEMPLATE,
        }
    }
}

/// On-disk template store. One file per variant under a single directory.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Writes the built-in templates for any variant whose file is missing,
    /// so a fresh checkout works without manual setup. Existing files are
    /// never overwritten.
    pub fn ensure_defaults(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir)?;
        for variant in [TemplateVariant::Direct, TemplateVariant::Reasoning] {
            let path = self.dir.join(variant.file_name());
            if !path.exists() {
                info!(path = %path.display(), "writing built-in prompt template");
                fs::write(&path, variant.builtin())?;
            }
        }
        Ok(())
    }

    /// Loads the raw template text for a variant.
    pub fn load(&self, variant: TemplateVariant) -> Result<String, AppError> {
        let path = self.dir.join(variant.file_name());
        fs::read_to_string(&path).map_err(AppError::Io)
    }

    /// Renders a template with the filing text and the allowed event list
    /// substituted in. The event list is serialized as a quoted,
    /// comma-separated inline list in taxonomy declaration order.
    pub fn build(
        &self,
        variant: TemplateVariant,
        text: &str,
        labels: &[String],
    ) -> Result<String, AppError> {
        let template = self.load(variant)?;
        let events = render_event_list(labels);
        Ok(template.replace("{text}", text).replace("{events}", &events))
    }
}

fn render_event_list(labels: &[String]) -> String {
    labels
        .iter()
        .map(|label| format!("\"{}\"", label))
        .collect::<Vec<_>>()
        .join(", ")
}
