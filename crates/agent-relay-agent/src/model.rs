//! Model selection for diagnostics.

use std::collections::BTreeMap;

/// Fallback model identifier when nothing else is configured.
pub const DEFAULT_MODEL_ID: &str = "us.amazon.nova-pro-v1:0";

/// Model parameters handed to the backend (and logged per request).
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

impl ModelSpec {
    /// Build a `ModelSpec` for one model id with default sampling parameters.
    #[must_use]
    pub fn for_model(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Self::default()
        }
    }
}

/// Pick a model id by scanning the prompt for configured keywords.
///
/// Keywords are matched case-insensitively; the first match in keyword order
/// wins, otherwise `default` is returned.
#[must_use]
pub fn select_model_id(
    prompt: &str,
    keywords: &BTreeMap<String, String>,
    default: &str,
) -> String {
    let lowered = prompt.to_lowercase();
    for (keyword, model_id) in keywords {
        if lowered.contains(&keyword.to_lowercase()) {
            return model_id.clone();
        }
    }
    default.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("premier".to_string(), "us.amazon.nova-premier-v1:0".to_string()),
            (
                "sonnet".to_string(),
                "us.anthropic.claude-3-7-sonnet-20250219-v1:0".to_string(),
            ),
        ])
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let id = select_model_id("Use SONNET for this one", &keywords(), DEFAULT_MODEL_ID);
        assert_eq!(id, "us.anthropic.claude-3-7-sonnet-20250219-v1:0");
    }

    #[test]
    fn no_keyword_falls_back_to_default() {
        let id = select_model_id("ordinary question", &keywords(), DEFAULT_MODEL_ID);
        assert_eq!(id, DEFAULT_MODEL_ID);
    }
}
