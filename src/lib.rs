//! Keeps translated locale files in step with a base-language locale file.
//!
//! Changes are found with a three-way diff of base, target and the base
//! snapshot taken at the last successful sync, sent to a translation backend in
//! ordered batches, and merged back into the target tree.

pub mod config;
pub mod error;
pub mod model;
pub mod services;

pub use config::{MergeTemplate, ProviderConfig, ProviderKind, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use model::diff::{DiffResult, PathChange};
pub use model::tree::{FlatMap, LocaleTree};
pub use model::usage::TokenUsage;
pub use services::ai::{build_backend, TranslationBackend};
pub use services::sync::{LanguageOutcome, LanguageReport, RunReport, SyncOrchestrator, SyncPlan, SyncStage};
