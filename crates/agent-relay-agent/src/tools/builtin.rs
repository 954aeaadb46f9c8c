//! Built-in tool implementations.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use sha2::{Digest, Sha256, Sha512};

use super::{Tool, ToolError};

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs(format!("missing string field `{key}`")))
}

/// Hash a text with a fixed set of secure algorithms.
pub struct GenerateHash;

#[async_trait]
impl Tool for GenerateHash {
    fn name(&self) -> &'static str {
        "generate_hash"
    }

    fn description(&self) -> &'static str {
        "Generate a cryptographic hash of a text (sha256 or sha512)"
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let text = required_str(&args, "text")?;
        let algorithm = args
            .get("algorithm")
            .and_then(Value::as_str)
            .unwrap_or("sha256");

        let hash = match algorithm {
            "sha256" => format!("{:x}", Sha256::digest(text.as_bytes())),
            "sha512" => format!("{:x}", Sha512::digest(text.as_bytes())),
            other => {
                return Err(ToolError::InvalidArgs(format!(
                    "unsupported algorithm: {other}"
                )));
            }
        };

        Ok(json!({
            "algorithm": algorithm,
            "hash": hash,
            "original_length": text.chars().count(),
        }))
    }
}

/// Pretty-print a JSON document.
pub struct JsonFormatter;

#[async_trait]
impl Tool for JsonFormatter {
    fn name(&self) -> &'static str {
        "json_formatter"
    }

    fn description(&self) -> &'static str {
        "Parse a JSON string and return it pretty-printed"
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let raw = required_str(&args, "json_string")?;
        let parsed: Value = serde_json::from_str(raw)
            .map_err(|e| ToolError::InvalidArgs(format!("invalid JSON: {e}")))?;
        let pretty = serde_json::to_string_pretty(&parsed)
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(Value::String(pretty))
    }
}

/// Basic statistics about a text.
pub struct TextAnalyzer;

#[async_trait]
impl Tool for TextAnalyzer {
    fn name(&self) -> &'static str {
        "text_analyzer"
    }

    fn description(&self) -> &'static str {
        "Report character, word, line and character-class statistics for a text"
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let text = required_str(&args, "text")?;

        let char_count = text.chars().count();
        let line_count = if text.is_empty() {
            0
        } else {
            text.matches('\n').count() + 1
        };
        let word_count = text.split_whitespace().count();

        let uppercase = text.chars().filter(|c| c.is_uppercase()).count();
        let lowercase = text.chars().filter(|c| c.is_lowercase()).count();
        let digits = text.chars().filter(char::is_ascii_digit).count();
        let whitespace = text.chars().filter(|c| c.is_whitespace()).count();
        let hiragana = text
            .chars()
            .filter(|c| ('\u{3040}'..='\u{309f}').contains(c))
            .count();
        let katakana = text
            .chars()
            .filter(|c| ('\u{30a0}'..='\u{30ff}').contains(c))
            .count();
        let kanji = text
            .chars()
            .filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c))
            .count();

        let avg_word_length = if word_count > 0 {
            (char_count as f64 / word_count as f64 * 100.0).round() / 100.0
        } else {
            0.0
        };

        Ok(json!({
            "char_count": char_count,
            "word_count": word_count,
            "line_count": line_count,
            "character_classes": {
                "uppercase": uppercase,
                "lowercase": lowercase,
                "digits": digits,
                "whitespace": whitespace,
                "hiragana": hiragana,
                "katakana": katakana,
                "kanji": kanji,
            },
            "avg_word_length": avg_word_length,
        }))
    }
}

/// Current date and time.
pub struct CurrentTime;

#[async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &'static str {
        "current_time"
    }

    fn description(&self) -> &'static str {
        "Return the current UTC date and time"
    }

    async fn call(&self, _args: Value) -> Result<Value, ToolError> {
        let now = chrono::Utc::now();
        Ok(json!({
            "iso": now.to_rfc3339(),
            "unix": now.timestamp(),
        }))
    }
}

/// HTTP requests against external APIs.
pub struct HttpRequest {
    client: reqwest::Client,
}

impl HttpRequest {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for HttpRequest {
    fn name(&self) -> &'static str {
        "http_request"
    }

    fn description(&self) -> &'static str {
        "Perform an HTTP request (GET or POST) against an external API"
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let url = required_str(&args, "url")?;
        let method = args
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();
        let timeout = args
            .get("timeout_secs")
            .and_then(Value::as_u64)
            .map_or(Self::DEFAULT_TIMEOUT, Duration::from_secs);

        let request = match method.as_str() {
            "GET" => self.client.get(url),
            "POST" => {
                let builder = self.client.post(url);
                match args.get("body") {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            }
            other => {
                return Err(ToolError::InvalidArgs(format!(
                    "unsupported method: {other}"
                )));
            }
        };

        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(json!({
            "status_code": status,
            "body": body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generate_hash_sha256() {
        let out = GenerateHash
            .call(json!({ "text": "abc" }))
            .await
            .unwrap();

        assert_eq!(out["algorithm"], "sha256");
        assert_eq!(
            out["hash"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(out["original_length"], 3);
    }

    #[tokio::test]
    async fn generate_hash_rejects_weak_algorithms() {
        let err = GenerateHash
            .call(json!({ "text": "abc", "algorithm": "md5" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn json_formatter_pretty_prints() {
        let out = JsonFormatter
            .call(json!({ "json_string": "{\"b\":1,\"a\":[2,3]}" }))
            .await
            .unwrap();

        let pretty = out.as_str().unwrap();
        assert!(pretty.contains("\n"));
        let reparsed: Value = serde_json::from_str(pretty).unwrap();
        assert_eq!(reparsed["b"], 1);
    }

    #[tokio::test]
    async fn json_formatter_rejects_invalid_json() {
        let err = JsonFormatter
            .call(json!({ "json_string": "{not json" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn text_analyzer_counts_classes() {
        let out = TextAnalyzer
            .call(json!({ "text": "Abc 123\nねこネコ猫" }))
            .await
            .unwrap();

        assert_eq!(out["char_count"], 13);
        assert_eq!(out["word_count"], 3);
        assert_eq!(out["line_count"], 2);
        assert_eq!(out["character_classes"]["uppercase"], 1);
        assert_eq!(out["character_classes"]["digits"], 3);
        assert_eq!(out["character_classes"]["hiragana"], 2);
        assert_eq!(out["character_classes"]["katakana"], 2);
        assert_eq!(out["character_classes"]["kanji"], 1);
    }

    #[tokio::test]
    async fn text_analyzer_empty_text() {
        let out = TextAnalyzer.call(json!({ "text": "" })).await.unwrap();
        assert_eq!(out["char_count"], 0);
        assert_eq!(out["line_count"], 0);
        assert_eq!(out["avg_word_length"], 0.0);
    }

    #[tokio::test]
    async fn current_time_is_rfc3339() {
        let out = CurrentTime.call(json!({})).await.unwrap();
        let iso = out["iso"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(iso).is_ok());
        assert!(out["unix"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn http_request_rejects_unknown_method() {
        let err = HttpRequest::new()
            .call(json!({ "url": "http://localhost:1", "method": "DELETE" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }
}
