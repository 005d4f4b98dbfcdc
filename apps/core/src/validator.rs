//! Schema validation of parsed model output against the event taxonomy.
//!
//! Validation is a pure conformance check: it confirms the structure decodes
//! into one of the two recognized shapes and that every referenced event type
//! is in the taxonomy. It says nothing about whether the model's judgment is
//! correct. Malformed or mismatched structures resolve to `false`; nothing in
//! here ever returns an error or mutates its input. (Output that fails to
//! parse as JSON at all never reaches this module; the classifier rejects it
//! as `UnparsableOutput` first.)

use serde_json::Value;

use crate::models::{ClassificationItem, ClassificationResult, ReasoningOutput};

/// Dispatches to the shape check matching the variant the result is tagged
/// with. A payload whose shape does not match its tag validates to `false`.
pub fn validate(result: &ClassificationResult, allowed_events: &[String]) -> bool {
    match result {
        ClassificationResult::Direct(value) => validate_direct(value, allowed_events),
        ClassificationResult::Reasoning(value) => validate_reasoning(value, allowed_events),
    }
}

/// Validates the direct (flat list) response shape: a JSON array where every
/// element is an object with an in-taxonomy `"Event Type"` and a strictly
/// boolean `"Relevant"`. Extra keys are ignored.
pub fn validate_direct(value: &Value, allowed_events: &[String]) -> bool {
    match serde_json::from_value::<Vec<ClassificationItem>>(value.clone()) {
        Ok(items) => items_conform(&items, allowed_events),
        Err(_) => false,
    }
}

/// Validates the reasoning-wrapped response shape: a JSON object with a
/// `"Reasoning"` key (contents unchecked, presence required) and an
/// `"Events"` key obeying the same per-item rule as the direct shape.
pub fn validate_reasoning(value: &Value, allowed_events: &[String]) -> bool {
    match serde_json::from_value::<ReasoningOutput>(value.clone()) {
        Ok(output) => items_conform(&output.events, allowed_events),
        Err(_) => false,
    }
}

/// The item rule shared by both shapes. The strict decode already enforced
/// key presence and genuine booleans; what remains is taxonomy membership.
fn items_conform(items: &[ClassificationItem], allowed_events: &[String]) -> bool {
    items
        .iter()
        .all(|item| allowed_events.contains(&item.event_type))
}
