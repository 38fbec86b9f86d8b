use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{http, Completion, TranslationBackend};
use crate::config::ProviderConfig;
use crate::error::{SyncError, SyncResult};
use crate::model::usage::TokenUsage;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Gemini `generateContent`.
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    max_retries: usize,
}

impl GeminiBackend {
    /// The model has no default and must be configured.
    pub fn new(client: Client, cfg: &ProviderConfig, api_key: String) -> SyncResult<Self> {
        let model = cfg
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| SyncError::Configuration("missing Gemini model name".into()))?;

        let endpoint = match &cfg.api_url {
            Some(url) => url.clone(),
            None => format!("{GEMINI_BASE}/{model}:generateContent"),
        };

        Ok(Self {
            client,
            endpoint,
            api_key,
            max_retries: cfg.max_retries,
        })
    }
}

#[async_trait]
impl TranslationBackend for GeminiBackend {
    fn provider_name(&self) -> &str {
        "Gemini"
    }

    async fn complete(&self, prompt: &str) -> SyncResult<Completion> {
        let body = json!({
            "contents": [
                { "role": "user", "parts": [{ "text": prompt }] }
            ]
        });

        let build = || {
            self.client
                .post(&self.endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        };
        let reply = http::send_json(self.provider_name(), self.max_retries, &build).await?;
        parse_reply(&reply)
    }
}

fn parse_reply(reply: &Value) -> SyncResult<Completion> {
    let parts = reply
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SyncError::service_fatal("Gemini", "invalid response: missing candidates[0].content.parts")
        })?;

    let content: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    let usage = reply.get("usageMetadata").map(|u| {
        TokenUsage::new(
            u.get("promptTokenCount").and_then(Value::as_u64).unwrap_or(0),
            u.get("candidatesTokenCount").and_then(Value::as_u64).unwrap_or(0),
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
    use crate::config::ProviderKind;

    #[test]
    fn reads_candidate_text_and_usage() {
        let reply = json!({
            "candidates": [{ "content": { "parts": [{ "text": "true" }] } }],
            "usageMetadata": { "promptTokenCount": 50, "candidatesTokenCount": 1 }
        });
        let c = parse_reply(&reply).unwrap();
        assert_eq!(c.content, "true");
        assert_eq!(c.usage, Some(TokenUsage::new(50, 1)));
    }

    #[test]
    fn endpoint_embeds_model() {
        let cfg = ProviderConfig {
            kind: ProviderKind::Gemini,
            model: Some("gemini-1.5-pro".into()),
            ..ProviderConfig::default()
        };
        let b = GeminiBackend::new(Client::new(), &cfg, "k".into()).unwrap();
        assert!(b.endpoint.ends_with("/gemini-1.5-pro:generateContent"));
    }
}
