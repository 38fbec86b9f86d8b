use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{http, Completion, TranslationBackend};
use crate::config::ProviderConfig;
use crate::error::{SyncError, SyncResult};
use crate::model::usage::TokenUsage;

const CLAUDE_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const MAX_TOKENS: u32 = 8192;

/// Anthropic messages API.
pub struct ClaudeBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_retries: usize,
}

impl ClaudeBackend {
    pub fn new(client: Client, cfg: &ProviderConfig, api_key: String) -> Self {
        Self {
            client,
            endpoint: cfg.api_url.clone().unwrap_or_else(|| CLAUDE_ENDPOINT.to_string()),
            api_key,
            model: cfg.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_retries: cfg.max_retries,
        }
    }
}

#[async_trait]
impl TranslationBackend for ClaudeBackend {
    fn provider_name(&self) -> &str {
        "Claude"
    }

    async fn complete(&self, prompt: &str) -> SyncResult<Completion> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let build = || {
            self.client
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
        };
        let reply = http::send_json(self.provider_name(), self.max_retries, &build).await?;
        parse_reply(&reply)
    }
}

fn parse_reply(reply: &Value) -> SyncResult<Completion> {
    let blocks = reply
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| SyncError::service_fatal("Claude", "invalid response: missing content"))?;

    let content: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();

    let usage = reply.get("usage").map(|u| {
        TokenUsage::new(
            u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
            u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
        )
    });

    Ok(Completion {
        content: content.trim().to_string(),
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_blocks() {
        let reply = json!({
            "content": [
                { "type": "text", "text": "{\"a\":" },
                { "type": "text", "text": "\"b\"}" }
            ],
            "usage": { "input_tokens": 30, "output_tokens": 4 }
        });
        let c = parse_reply(&reply).unwrap();
        assert_eq!(c.content, "{\"a\":\"b\"}");
        assert_eq!(c.usage, Some(TokenUsage::new(30, 4)));
    }

    #[test]
    fn missing_content_is_an_error() {
        assert!(parse_reply(&json!({ "type": "error" })).is_err());
    }
}
