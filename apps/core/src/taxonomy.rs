//! Event taxonomy backed by an editable JSON store.
//!
//! The store is a JSON object keyed by event-type label, each value carrying a
//! `relevant` default. Key order is preserved (serde_json `preserve_order`) so
//! rendered prompts are reproducible across runs. Mutations write through to
//! disk immediately; concurrent writers are not coordinated here.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::info;

use crate::error::AppError;

/// Default location of the taxonomy store, relative to the working directory.
pub const DEFAULT_TAXONOMY_PATH: &str = "config/events.json";

/// The ordered set of recognized event-type labels plus their default relevance.
#[derive(Debug, Clone)]
pub struct EventTaxonomy {
    path: PathBuf,
    events: Map<String, Value>,
}

impl EventTaxonomy {
    /// Loads the taxonomy from `path`, creating and persisting the bootstrap
    /// defaults when the store does not exist yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            info!(path = %path.display(), "taxonomy store missing, writing bootstrap defaults");
            let taxonomy = Self {
                path,
                events: default_events(),
            };
            taxonomy.save()?;
            return Ok(taxonomy);
        }

        let raw = fs::read_to_string(&path)?;
        let events: Map<String, Value> = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("Invalid taxonomy store {}: {}", path.display(), e)))?;

        Ok(Self { path, events })
    }

    /// Event-type labels in declaration order.
    pub fn labels(&self) -> Vec<String> {
        self.events.keys().cloned().collect()
    }

    /// Whether `label` is marked relevant by default. Unknown labels are not relevant.
    pub fn default_relevance(&self, label: &str) -> bool {
        self.events
            .get(label)
            .and_then(|entry| entry.get("relevant"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.events.contains_key(label)
    }

    /// Adds a new event type (or overwrites an existing one) and persists the store.
    pub fn add_event_type(&mut self, label: &str, relevant: bool) -> Result<(), AppError> {
        self.events
            .insert(label.to_string(), json!({ "relevant": relevant }));
        self.save()
    }

    /// Removes an event type and persists the store. Unknown labels are a no-op.
    pub fn remove_event_type(&mut self, label: &str) -> Result<(), AppError> {
        if self.events.remove(label).is_some() {
            self.save()?;
        }
        Ok(())
    }

    /// Updates the default relevance of an existing event type and persists the
    /// store. Unknown labels are a no-op.
    pub fn update_relevance(&mut self, label: &str, relevant: bool) -> Result<(), AppError> {
        if let Some(entry) = self.events.get_mut(label) {
            entry["relevant"] = Value::Bool(relevant);
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.events)
            .map_err(|e| AppError::Config(format!("Failed to serialize taxonomy: {}", e)))?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// Bootstrap taxonomy written on first load from a missing store.
fn default_events() -> Map<String, Value> {
    let mut events = Map::new();
    for (label, relevant) in [
        ("Acquisition", true),
        ("Customer Event", true),
        ("Personnel Change", true),
        ("Financial Event", true),
        ("Open Market Purchase", true),
        ("Open Market Sale", true),
        ("Option Exercise", true),
        ("Shares Withheld for Taxes", false),
        ("Automatic Sale under Rule 10b5-1", false),
        ("Other", false),
    ] {
        events.insert(label.to_string(), json!({ "relevant": relevant }));
    }
    events
}
