use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{http, Completion, TranslationBackend};
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{SyncError, SyncResult};
use crate::model::usage::TokenUsage;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEEPSEEK_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
const COMPATIBLE_ENDPOINT: &str = "https://api.aihubmix.com/v1/chat/completions";

/// Chat-completions backend: OpenAI, DeepSeek, or any compatible endpoint.
pub struct OpenAiBackend {
    client: Client,
    name: &'static str,
    endpoint: String,
    api_key: String,
    model: String,
    max_retries: usize,
}

impl OpenAiBackend {
    pub fn new(client: Client, cfg: &ProviderConfig, api_key: String) -> Self {
        let (name, default_endpoint, default_model) = match cfg.kind {
            ProviderKind::Deepseek => ("DeepSeek", DEEPSEEK_ENDPOINT, "deepseek-chat"),
            ProviderKind::OpenAiCompatible => ("OpenAICompatible", COMPATIBLE_ENDPOINT, "gpt-4o"),
            _ => ("OpenAI", OPENAI_ENDPOINT, "gpt-3.5-turbo"),
        };

        Self {
            client,
            name,
            endpoint: cfg.api_url.clone().unwrap_or_else(|| default_endpoint.to_string()),
            api_key,
            model: cfg.model.clone().unwrap_or_else(|| default_model.to_string()),
            max_retries: cfg.max_retries,
        }
    }
}

#[async_trait]
impl TranslationBackend for OpenAiBackend {
    fn provider_name(&self) -> &str {
        self.name
    }

    async fn complete(&self, prompt: &str) -> SyncResult<Completion> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let build = || {
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
        };
        let reply = http::send_json(self.name, self.max_retries, &build).await?;
        parse_reply(self.name, &reply)
    }
}

fn parse_reply(provider: &str, reply: &Value) -> SyncResult<Completion> {
    let content = reply
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            SyncError::service_fatal(provider, "invalid response: missing choices[0].message.content")
        })?;

    let usage = reply.get("usage").map(|u| {
        TokenUsage::new(
            u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0),
            u.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0),
        )
    });

    Ok(Completion {
        content: content.trim().to_string(),
        usage,
    })
}
