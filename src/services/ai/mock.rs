//! In-process backend used by tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{Completion, TranslationBackend, TranslationOutput, ValidationOutput};
use crate::error::{SyncError, SyncResult};
use crate::model::tree::{FlatMap, LocaleTree};
use crate::model::usage::TokenUsage;

/// A call the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Translate { target_lang: String, keys: Vec<String> },
    Validate { target_lang: String },
}

/// Translates every string leaf to `"[<lang>] <text>"`.
#[derive(Debug, Default)]
pub struct MockBackend {
    calls: Mutex<Vec<MockCall>>,
    usage_per_call: TokenUsage,
    failing_langs: HashSet<String>,
    fail_on_translate_call: Option<usize>,
    dropped_keys: HashSet<String>,
    invalid: bool,
    validation_error: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            usage_per_call: TokenUsage::new(10, 5),
            ..Self::default()
        }
    }

    /// Usage reported by every call.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage_per_call = usage;
        self
    }

    /// Every translate call for `lang` fails.
    pub fn failing_for(mut self, lang: &str) -> Self {
        self.failing_langs.insert(lang.to_string());
        self
    }

    /// The n-th translate call overall (0-based) fails.
    pub fn failing_on_call(mut self, n: usize) -> Self {
        self.fail_on_translate_call = Some(n);
        self
    }

    /// The reply omits `path`.
    pub fn dropping_key(mut self, path: &str) -> Self {
        self.dropped_keys.insert(path.to_string());
        self
    }

    /// Validation answers "false".
    pub fn invalid(mut self) -> Self {
        self.invalid = true;
        self
    }

    /// The validation call itself errors.
    pub fn validation_errors(mut self) -> Self {
        self.validation_error = true;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn translate_calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Translate { target_lang, keys } => Some((target_lang, keys)),
                MockCall::Validate { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: MockCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn translate_count(&self) -> usize {
        self.translate_calls().len()
    }
}

pub fn mock_translation(value: &Value, lang: &str) -> Value {
    match value {
        Value::String(s) => Value::String(format!("[{lang}] {s}")),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), mock_translation(v, lang)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn provider_name(&self) -> &str {
        "Mock"
    }

    async fn complete(&self, _prompt: &str) -> SyncResult<Completion> {
        Err(SyncError::service_fatal("Mock", "raw completion is not supported"))
    }

    async fn translate(&self, content: &FlatMap, target_lang: &str) -> SyncResult<TranslationOutput> {
        let index = self.translate_count();
        self.record(MockCall::Translate {
            target_lang: target_lang.to_string(),
            keys: content.keys().cloned().collect(),
        });

        if self.failing_langs.contains(target_lang) || self.fail_on_translate_call == Some(index) {
            return Err(SyncError::service_fatal("Mock", format!("scripted failure on call {index}")));
        }

        let translated_content = content
            .iter()
            .filter(|(k, _)| !self.dropped_keys.contains(k.as_str()))
            .map(|(k, v)| (k.clone(), mock_translation(v, target_lang)))
            .collect();

        Ok(TranslationOutput {
            translated_content,
            tokens_used: self.usage_per_call,
        })
    }

    async fn validate_translation(
        &self,
        _original: &LocaleTree,
        _translated: &LocaleTree,
        target_lang: &str,
    ) -> SyncResult<ValidationOutput> {
        self.record(MockCall::Validate {
            target_lang: target_lang.to_string(),
        });

        if self.validation_error {
            return Err(SyncError::Validation("scripted validation failure".into()));
        }

        Ok(ValidationOutput {
            is_valid: !self.invalid,
            tokens_used: self.usage_per_call,
        })
    }
}
