//! Translation capability: one trait, one implementation per remote backend.
//!
//! A backend only has to turn a prompt into a [`Completion`]; prompt building,
//! reply parsing and token accounting are shared by the provided methods of
//! [`TranslationBackend`]. The backend is chosen once at startup by
//! [`build_backend`].

pub mod claude;
pub mod gemini;
pub mod http;
pub mod mock;
pub mod openai;
pub mod prompt;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{SyncError, SyncResult};
use crate::model::tree::{FlatMap, LocaleTree};
use crate::model::usage::TokenUsage;

/// Raw reply of one model call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    /// `None` when the backend did not report usage.
    pub usage: Option<TokenUsage>,
}

/// Result of translating one batch.
#[derive(Debug, Clone, Default)]
pub struct TranslationOutput {
    pub translated_content: FlatMap,
    pub tokens_used: TokenUsage,
}

/// Result of validating a merged target tree.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutput {
    pub is_valid: bool,
    pub tokens_used: TokenUsage,
}

#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Display name used in logs and errors.
    fn provider_name(&self) -> &str;

    /// Sends one prompt and returns the model reply.
    async fn complete(&self, prompt: &str) -> SyncResult<Completion>;

    /// Translates the values of `content` into `target_lang`, keeping its keys.
    async fn translate(&self, content: &FlatMap, target_lang: &str) -> SyncResult<TranslationOutput> {
        tracing::debug!(provider = self.provider_name(), target_lang, keys = content.len(), "translate");
        let prompt = prompt::translation_prompt(content, target_lang);
        let completion = self.complete(&prompt).await?;
        let translated_content = prompt::parse_translation(self.provider_name(), &completion.content)?;

        Ok(TranslationOutput {
            translated_content,
            tokens_used: usage_or_estimate(&completion, &prompt),
        })
    }

    /// Asks the backend whether `translated` is an acceptable rendering of `original`.
    async fn validate_translation(
        &self,
        original: &LocaleTree,
        translated: &LocaleTree,
        target_lang: &str,
    ) -> SyncResult<ValidationOutput> {
        tracing::debug!(provider = self.provider_name(), target_lang, "validate");
        let prompt = prompt::validation_prompt(original, translated, target_lang);
        let completion = self.complete(&prompt).await?;

        Ok(ValidationOutput {
            is_valid: prompt::parse_validation(&completion.content),
            tokens_used: usage_or_estimate(&completion, &prompt),
        })
    }
}

fn usage_or_estimate(completion: &Completion, prompt: &str) -> TokenUsage {
    completion.usage.unwrap_or_else(|| {
        TokenUsage::new(
            prompt::estimate_tokens(prompt),
            prompt::estimate_tokens(&completion.content),
        )
    })
}

/// Builds the configured backend.
pub fn build_backend(cfg: &ProviderConfig) -> SyncResult<Box<dyn TranslationBackend>> {
    let api_key = cfg
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            SyncError::Configuration(format!("missing API key for provider {}", cfg.kind))
        })?
        .to_string();

    let client = http::build_client(Duration::from_secs(cfg.timeout_secs))?;

    let backend: Box<dyn TranslationBackend> = match cfg.kind {
        ProviderKind::OpenAi | ProviderKind::OpenAiCompatible | ProviderKind::Deepseek => {
            Box::new(openai::OpenAiBackend::new(client, cfg, api_key))
        }
        ProviderKind::Claude => Box::new(claude::ClaudeBackend::new(client, cfg, api_key)),
        ProviderKind::Gemini => Box::new(gemini::GeminiBackend::new(client, cfg, api_key)?),
    };

    tracing::info!(provider = backend.provider_name(), "translation backend ready");
    Ok(backend)
}
