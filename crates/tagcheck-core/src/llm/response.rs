//! Turning a model's reply into a prediction string.

use crate::taxonomy::NO_MATCH_LABEL;

/// Prediction recorded when the provider's safety filter blocked the request.
pub const CONTENT_FILTERED: &str = "CONTENT_FILTERED";

/// Interpretation of one model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResult {
    /// Comma-separated labels, possibly empty when nothing matched
    Labels(String),
    /// The provider refused the image
    ContentFiltered,
    /// No `{"result": ...}` object could be read; the cleaned text is kept
    Unparsed(String),
}

impl ParsedResult {
    /// Value written to the predictions column.
    pub fn into_prediction(self) -> String {
        match self {
            ParsedResult::Labels(labels) => labels,
            ParsedResult::ContentFiltered => CONTENT_FILTERED.to_string(),
            ParsedResult::Unparsed(text) => text,
        }
    }
}

/// Whether a reply or error message reports a content-filter block.
pub fn is_content_filtered(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("content filters") || lower.contains("blocked")
}

/// Parse `text` and keep at most `max_labels` labels.
pub fn parse_result(text: &str, max_labels: usize) -> ParsedResult {
    let cleaned = strip_fences(text);

    if is_content_filtered(&cleaned) {
        return ParsedResult::ContentFiltered;
    }

    let candidate = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => &cleaned[start..=end],
        _ => cleaned.as_str(),
    };

    let result = serde_json::from_str::<serde_json::Value>(candidate)
        .ok()
        .and_then(|value| match value.get("result")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            _ => None,
        });

    match result {
        Some(raw) => ParsedResult::Labels(normalize_labels(&raw, max_labels)),
        None => {
            tracing::debug!("Could not parse model reply: {:?}", cleaned);
            ParsedResult::Unparsed(cleaned)
        }
    }
}

fn strip_fences(text: &str) -> String {
    let mut cleaned = text.replace("```", "");
    let trimmed = cleaned.trim_start();
    if let Some(rest) = trimmed.strip_prefix("json") {
        cleaned = rest.to_string();
    }
    cleaned.trim().to_string()
}

/// Trim each label, drop empties and the no-match marker, cap the count.
fn normalize_labels(raw: &str, max_labels: usize) -> String {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty() && *label != NO_MATCH_LABEL)
        .take(max_labels)
        .collect::<Vec<_>>()
        .join(",")
}
