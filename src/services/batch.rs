use crate::error::SyncResult;
use crate::model::tree::FlatMap;
use crate::model::usage::TokenUsage;
use crate::services::ai::TranslationBackend;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Splits `content` into consecutive batches of at most `batch_size` entries,
/// keeping the source order. A zero size is treated as one.
pub fn split_into_batches(content: &FlatMap, batch_size: usize) -> Vec<FlatMap> {
    let size = batch_size.max(1);
    let mut batches = Vec::with_capacity(content.len().div_ceil(size));
    let mut batch = FlatMap::new();

    for (key, value) in content {
        batch.insert(key.clone(), value.clone());
        if batch.len() == size {
            batches.push(std::mem::take(&mut batch));
        }
    }

    if !batch.is_empty() {
        batches.push(batch);
    }

    batches
}

/// Drives the backend over size-bounded batches, strictly one after another.
pub struct BatchCoordinator<'a> {
    backend: &'a dyn TranslationBackend,
    batch_size: usize,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(backend: &'a dyn TranslationBackend, batch_size: usize) -> Self {
        Self {
            backend,
            batch_size,
        }
    }

    /// Translates everything or nothing: the first failing batch aborts the
    /// language and the completed batches are dropped.
    pub async fn run(&self, to_translate: &FlatMap, target_lang: &str) -> SyncResult<(FlatMap, TokenUsage)> {
        let batches = split_into_batches(to_translate, self.batch_size);
        let total = batches.len();

        let mut translated = FlatMap::new();
        let mut usage = TokenUsage::default();

        for (i, batch) in batches.iter().enumerate() {
            tracing::info!(
                lang = target_lang,
                stage = "translating",
                "translating batch {} of {} ({} keys)",
                i + 1,
                total,
                batch.len()
            );

            let output = self.backend.translate(batch, target_lang).await.map_err(|e| {
                tracing::error!(lang = target_lang, batch = i + 1, error = %e, "batch failed");
                e
            })?;

            tracing::info!(
                lang = target_lang,
                input_tokens = output.tokens_used.input_tokens,
                output_tokens = output.tokens_used.output_tokens,
                "batch {} translated",
                i + 1
            );

            translated.extend(output.translated_content);
            usage += output.tokens_used;
        }

        Ok((translated, usage))
    }
}
