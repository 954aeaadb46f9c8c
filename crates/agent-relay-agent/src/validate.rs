//! Prompt screening and error-message redaction.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Default ceiling on prompt length, in characters.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 10_000;

const REDACTED: &str = "***REDACTED***";

/// Prompt validation error. The messages are user-facing: they are reported
/// back to the destination conversation verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no prompt was provided")]
    Empty,
    #[error("prompt is too long (max {max} characters)")]
    TooLong { max: usize },
    #[error("prompt contains disallowed content")]
    Disallowed,
}

static DISALLOWED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<script[^>]*>.*?</script>",
        r"(?i)javascript:",
        r"(?i)data:text/html",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static CREDENTIAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Bot authorization header values
        r"Bot\s+[0-9A-Za-z._-]+",
        // Webhook paths embed the application id and delivery token
        r"webhooks/[0-9A-Za-z._-]+/[0-9A-Za-z._-]+",
        // Long secret-like runs
        r"[0-9A-Za-z/+=_-]{40,}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Validate an inbound prompt before it reaches the agent.
///
/// # Errors
/// Returns error for empty, over-length or disallowed content.
pub fn validate_prompt(prompt: &str, max_chars: usize) -> Result<(), ValidationError> {
    if prompt.is_empty() {
        return Err(ValidationError::Empty);
    }
    if prompt.chars().count() > max_chars {
        return Err(ValidationError::TooLong { max: max_chars });
    }
    if DISALLOWED_PATTERNS.iter().any(|p| p.is_match(prompt)) {
        return Err(ValidationError::Disallowed);
    }
    Ok(())
}

/// Strip credential-like substrings from an error message before it leaves
/// the service.
#[must_use]
pub fn sanitize_error(message: &str) -> String {
    let mut sanitized = message.to_string();
    for pattern in CREDENTIAL_PATTERNS.iter() {
        sanitized = pattern.replace_all(&sanitized, REDACTED).into_owned();
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_prompts() {
        assert_eq!(validate_prompt("What time is it?", 100), Ok(()));
    }

    #[test]
    fn rejects_empty_prompt() {
        assert_eq!(validate_prompt("", 100), Err(ValidationError::Empty));
    }

    #[test]
    fn rejects_over_length_prompt() {
        assert_eq!(
            validate_prompt("aaaaaa", 5),
            Err(ValidationError::TooLong { max: 5 })
        );
    }

    #[test]
    fn length_limit_counts_characters() {
        // Five multibyte chars fit a five-char limit.
        assert_eq!(validate_prompt("ねこねこね", 5), Ok(()));
    }

    #[test]
    fn rejects_script_tags_and_uri_schemes() {
        assert_eq!(
            validate_prompt("<script>alert(1)</script>", 100),
            Err(ValidationError::Disallowed)
        );
        assert_eq!(
            validate_prompt("click JAVASCRIPT:void(0)", 100),
            Err(ValidationError::Disallowed)
        );
        assert_eq!(
            validate_prompt("open data:text/html;base64,xyz", 100),
            Err(ValidationError::Disallowed)
        );
    }

    #[test]
    fn sanitize_masks_bot_tokens() {
        let msg = "request failed: Authorization: Bot abc123.def-456 rejected";
        let clean = sanitize_error(msg);
        assert!(!clean.contains("abc123.def-456"));
        assert!(clean.contains("***REDACTED***"));
    }

    #[test]
    fn sanitize_masks_webhook_paths() {
        let msg = "POST https://discord.com/api/v10/webhooks/1234/tok-secret failed";
        let clean = sanitize_error(msg);
        assert!(!clean.contains("tok-secret"));
    }

    #[test]
    fn sanitize_masks_long_secret_runs() {
        let secret = "A".repeat(40);
        let clean = sanitize_error(&format!("bad key {secret} in config"));
        assert!(!clean.contains(&secret));
    }

    #[test]
    fn sanitize_keeps_ordinary_text() {
        assert_eq!(sanitize_error("plain failure"), "plain failure");
    }
}
