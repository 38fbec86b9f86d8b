//! Per-language synchronization run.
//!
//! Shared inputs (configuration, base file, snapshot, change log) are read once
//! and any failure there aborts the run. Each enabled target language then goes
//! through `Idle -> Diffing -> Translating -> Merging -> Validating -> Persisting`
//! and ends in `Persisted` or `Failed`. A failed language never stops the next one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::ai::TranslationBackend;
use super::batch::BatchCoordinator;
use super::changelog::{self, GitCli, VersionControl};
use super::diff::diff;
use super::locale_file::{locale_path, read_tree, write_tree};
use super::merge::{merge, ops_for};
use super::snapshot::{fingerprint, SnapshotStore};
use crate::config::{MergeTemplate, SyncConfig};
use crate::error::{SyncError, SyncResult};
use crate::model::diff::DiffResult;
use crate::model::tree::{FlatMap, LocaleTree};
use crate::model::usage::TokenUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Idle,
    Diffing,
    Translating,
    Merging,
    Validating,
    /// Writing the target file, then the snapshot.
    Persisting,
    Persisted,
    Failed,
}

impl SyncStage {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStage::Idle => "idle",
            SyncStage::Diffing => "diffing",
            SyncStage::Translating => "translating",
            SyncStage::Merging => "merging",
            SyncStage::Validating => "validating",
            SyncStage::Persisting => "persisting",
            SyncStage::Persisted => "persisted",
            SyncStage::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one language needs, before anything is translated.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub diff: DiffResult,
    /// Paths named by the last commit of the base file.
    pub changelog: FlatMap,
    /// `added ∪ modified ∪ changelog`, change log last.
    pub to_translate: FlatMap,
}

impl SyncPlan {
    pub fn build(diff: DiffResult, changelog: &FlatMap) -> Self {
        let mut to_translate = diff.to_translate();
        to_translate.extend(changelog.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            diff,
            changelog: changelog.clone(),
            to_translate,
        }
    }

    /// Nothing to translate and nothing to delete.
    pub fn is_noop(&self) -> bool {
        self.to_translate.is_empty() && self.diff.deleted().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub changelog: usize,
}

impl ChangeCounts {
    fn of(plan: &SyncPlan) -> Self {
        let (added, modified, deleted) = plan.diff.counts();
        Self {
            added,
            modified,
            deleted,
            changelog: plan.changelog.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LanguageOutcome {
    Persisted {
        counts: ChangeCounts,
        translated: usize,
        /// Requested keys the backend left out of its reply.
        missing: usize,
        usage: TokenUsage,
        /// `None` when validation was disabled, skipped or errored.
        validated: Option<bool>,
        /// Fingerprint of the snapshot written after this language.
        fingerprint: String,
    },
    /// No changes detected; nothing was written.
    Unchanged,
    Failed {
        stage: SyncStage,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageReport {
    pub lang: String,
    pub outcome: LanguageOutcome,
}

impl LanguageReport {
    pub fn usage(&self) -> TokenUsage {
        match &self.outcome {
            LanguageOutcome::Persisted { usage, .. } => *usage,
            _ => TokenUsage::default(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, LanguageOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub languages: Vec<LanguageReport>,
    pub total_usage: TokenUsage,
}

impl RunReport {
    fn push(&mut self, report: LanguageReport) {
        self.total_usage += report.usage();
        self.languages.push(report);
    }

    pub fn failed(&self) -> impl Iterator<Item = &LanguageReport> {
        self.languages.iter().filter(|r| r.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }
}

/// Shared inputs for one run.
struct RunInputs {
    base_path: PathBuf,
    base_language: String,
    base_file: PathBuf,
    base: LocaleTree,
    snapshot: LocaleTree,
    changelog: FlatMap,
}

pub struct SyncOrchestrator<'a> {
    config: SyncConfig,
    backend: &'a dyn TranslationBackend,
    vcs: Option<Box<dyn VersionControl + 'a>>,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(config: SyncConfig, backend: &'a dyn TranslationBackend) -> Self {
        Self {
            config,
            backend,
            vcs: None,
        }
    }

    /// Replaces the `git` command line as change-log source.
    pub fn with_version_control(mut self, vcs: Box<dyn VersionControl + 'a>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Syncs every enabled target language, in configured order.
    pub async fn run(&self) -> SyncResult<RunReport> {
        let targets = self.config.validate()?.target_languages;
        let inputs = self.prepare()?;

        let pause = Duration::from_millis(self.config.pause_between_languages_ms);
        let mut report = RunReport::default();

        for (i, lang) in targets.iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                tracing::debug!(lang = %lang, "pausing {} ms before next language", pause.as_millis());
                tokio::time::sleep(pause).await;
            }

            let target_file = locale_path(&inputs.base_path, lang);
            report.push(self.sync_language(&inputs, lang, &target_file).await);
        }

        tracing::info!(
            languages = report.languages.len(),
            failed = report.failed().count(),
            input_tokens = report.total_usage.input_tokens,
            output_tokens = report.total_usage.output_tokens,
            "sync run finished"
        );
        Ok(report)
    }

    /// Syncs one target file. The language is the file stem.
    pub async fn sync_file(&self, path: &Path) -> SyncResult<LanguageReport> {
        let lang = language_of(path)?;
        let inputs = self.prepare()?;
        if lang == inputs.base_language {
            return Err(SyncError::Configuration(format!(
                "{} is the base language file",
                path.display()
            )));
        }
        Ok(self.sync_language(&inputs, &lang, path).await)
    }

    /// Diff and change log for `lang`, without translating or writing.
    pub fn plan(&self, lang: &str) -> SyncResult<SyncPlan> {
        plan_with(&self.config, self.vcs.as_deref(), lang)
    }

    fn prepare(&self) -> SyncResult<RunInputs> {
        prepare(&self.config, self.vcs.as_deref())
    }

    async fn sync_language(&self, inputs: &RunInputs, lang: &str, target_file: &Path) -> LanguageReport {
        let mut stage = SyncStage::Idle;
        let outcome = match self.sync_stages(inputs, lang, target_file, &mut stage).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(lang, stage = %stage, error = %e, "sync failed");
                LanguageOutcome::Failed {
                    stage,
                    error: e.to_string(),
                }
            }
        };

        LanguageReport {
            lang: lang.to_string(),
            outcome,
        }
    }

    async fn sync_stages(
        &self,
        inputs: &RunInputs,
        lang: &str,
        target_file: &Path,
        stage: &mut SyncStage,
    ) -> SyncResult<LanguageOutcome> {
        *stage = SyncStage::Diffing;
        let target = read_tree(target_file)?.unwrap_or_default();
        let plan = plan_for(inputs, &target);
        let counts = ChangeCounts::of(&plan);

        tracing::info!(
            lang,
            stage = %stage,
            added = counts.added,
            modified = counts.modified,
            deleted = counts.deleted,
            changelog = counts.changelog,
            "diff computed"
        );

        if plan.is_noop() {
            tracing::info!(lang, stage = %stage, "no changes detected");
            return Ok(LanguageOutcome::Unchanged);
        }

        *stage = SyncStage::Translating;
        let (translated, mut usage) = if plan.to_translate.is_empty() {
            (FlatMap::new(), TokenUsage::default())
        } else {
            BatchCoordinator::new(self.backend, self.config.batch_size)
                .run(&plan.to_translate, lang)
                .await?
        };
        let translated = keep_requested(translated, &plan.to_translate, lang);
        let missing = plan.to_translate.len() - translated.len();

        *stage = SyncStage::Merging;
        let template = match self.config.merge_template {
            MergeTemplate::Base => &inputs.base,
            MergeTemplate::Target => &target,
        };
        let ops = ops_for(&translated, &plan.diff);
        let merged = merge(template, &ops);
        tracing::debug!(lang, stage = %stage, ops = ops.len(), "merged");

        *stage = SyncStage::Validating;
        let validated = if self.config.validate && !translated.is_empty() {
            match self.backend.validate_translation(&inputs.base, &merged, lang).await {
                Ok(out) => {
                    usage += out.tokens_used;
                    if !out.is_valid {
                        tracing::warn!(lang, stage = %stage, "validation reported problems, keeping translation");
                    }
                    Some(out.is_valid)
                }
                Err(e) => {
                    tracing::warn!(lang, stage = %stage, error = %e, "validation unavailable");
                    None
                }
            }
        } else {
            None
        };

        *stage = SyncStage::Persisting;
        // target first: a crash in between leaves the old snapshot, so the next run redoes the diff
        write_tree(target_file, &merged)?;
        let fingerprint = SnapshotStore::for_base_file(&inputs.base_file).save(&inputs.base)?;

        *stage = SyncStage::Persisted;
        tracing::info!(
            lang,
            stage = %stage,
            translated = translated.len(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            file = %target_file.display(),
            "language synced"
        );

        Ok(LanguageOutcome::Persisted {
            counts,
            translated: translated.len(),
            missing,
            usage,
            validated,
            fingerprint,
        })
    }
}

/// Diff and change log for `lang` using `git` as change-log source. Needs no backend.
pub fn plan(config: &SyncConfig, lang: &str) -> SyncResult<SyncPlan> {
    plan_with(config, None, lang)
}

fn plan_with(config: &SyncConfig, vcs: Option<&dyn VersionControl>, lang: &str) -> SyncResult<SyncPlan> {
    let inputs = prepare(config, vcs)?;
    let target_file = locale_path(&inputs.base_path, lang);
    let target = read_tree(&target_file)?.unwrap_or_default();
    Ok(plan_for(&inputs, &target))
}

fn prepare(config: &SyncConfig, vcs: Option<&dyn VersionControl>) -> SyncResult<RunInputs> {
    let settings = config.validate_base()?;
    let base_file = locale_path(&settings.base_path, &settings.base_language);

    let base = read_tree(&base_file)?.ok_or_else(|| SyncError::MissingBaseFile(base_file.clone()))?;
    let snapshot = SnapshotStore::for_base_file(&base_file).load_or_seed(&base)?;

    let base_fp = fingerprint(&base);
    if base_fp == fingerprint(&snapshot) {
        tracing::info!(lang = %settings.base_language, "base unchanged since last sync");
    } else {
        tracing::info!(lang = %settings.base_language, fingerprint = %base_fp, "base changed since last sync");
    }

    let changelog = match (config.use_git_history, vcs) {
        (false, _) => FlatMap::new(),
        (true, Some(vcs)) => changelog::augment(vcs, &base_file, &base),
        (true, None) => changelog::augment(&GitCli::new(&settings.base_path), &base_file, &base),
    };
    if !changelog.is_empty() {
        tracing::info!(
            lang = %settings.base_language,
            paths = changelog.len(),
            "paths from the last commit of the base file are translated again for every language \
             on every run; set use_git_history = false to stop this"
        );
    }

    Ok(RunInputs {
        base_path: settings.base_path,
        base_language: settings.base_language,
        base_file,
        base,
        snapshot,
        changelog,
    })
}

fn plan_for(inputs: &RunInputs, target: &LocaleTree) -> SyncPlan {
    SyncPlan::build(diff(&inputs.base, target, &inputs.snapshot), &inputs.changelog)
}

/// Drops reply keys nobody asked for and logs requested keys that are missing.
fn keep_requested(translated: FlatMap, requested: &FlatMap, lang: &str) -> FlatMap {
    for key in requested.keys().filter(|k| !translated.contains_key(*k)) {
        tracing::warn!(lang, stage = "translating", key = %key, "missing from reply, keeping template value");
    }

    translated
        .into_iter()
        .filter(|(key, _)| {
            let wanted = requested.contains_key(key);
            if !wanted {
                tracing::debug!(lang, key = %key, "ignoring unrequested key");
            }
            wanted
        })
        .collect()
}

fn language_of(path: &Path) -> SyncResult<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SyncError::Configuration(format!("cannot infer language from {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai::mock::{MockBackend, MockCall};
    use serde_json::{json, Value};
    use tempfile::{tempdir, TempDir};

    fn write(dir: &Path, name: &str, value: Value) {
        std::fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn read(dir: &Path, name: &str) -> Value {
        serde_json::from_str(&std::fs::read_to_string(dir.join(name)).unwrap()).unwrap()
    }

    fn config(dir: &TempDir, targets: &[&str]) -> SyncConfig {
        let mut cfg = SyncConfig {
            base_path: Some(dir.path().to_path_buf()),
            base_language: Some("en".into()),
            pause_between_languages_ms: 0,
            use_git_history: false,
            ..SyncConfig::default()
        };
        cfg.set_targets(targets.iter().copied());
        cfg
    }

    #[tokio::test]
    async fn first_run_translates_everything() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello", "b": "World"}));
        let backend = MockBackend::new();

        let report = SyncOrchestrator::new(config(&dir, &["fr"]), &backend).run().await.unwrap();

        assert_eq!(read(dir.path(), "fr.json"), json!({"a": "[fr] Hello", "b": "[fr] World"}));
        assert_eq!(read(dir.path(), "en.json.original"), json!({"a": "Hello", "b": "World"}));
        match &report.languages[0].outcome {
            LanguageOutcome::Persisted { counts, validated, .. } => {
                assert_eq!(counts.added, 2);
                assert_eq!(*validated, Some(true));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        // translate 10/5 plus validate 10/5
        assert_eq!(report.total_usage, TokenUsage::new(20, 10));
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        let backend = MockBackend::new();
        let orchestrator = SyncOrchestrator::new(config(&dir, &["fr"]), &backend);

        orchestrator.run().await.unwrap();
        let before = std::fs::read_to_string(dir.path().join("fr.json")).unwrap();
        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.languages[0].outcome, LanguageOutcome::Unchanged);
        assert_eq!(std::fs::read_to_string(dir.path().join("fr.json")).unwrap(), before);
        assert_eq!(backend.translate_calls().len(), 1);
    }

    #[tokio::test]
    async fn failure_in_one_language_does_not_stop_the_next() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        let backend = MockBackend::new().failing_for("de");

        let report = SyncOrchestrator::new(config(&dir, &["de", "fr"]), &backend)
            .run()
            .await
            .unwrap();

        assert!(matches!(
            report.languages[0].outcome,
            LanguageOutcome::Failed { stage: SyncStage::Translating, .. }
        ));
        assert!(!dir.path().join("de.json").exists());
        assert_eq!(read(dir.path(), "fr.json"), json!({"a": "[fr] Hello"}));
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn broken_target_fails_only_that_language() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        std::fs::write(dir.path().join("de.json"), "{ not json").unwrap();
        let backend = MockBackend::new();

        let report = SyncOrchestrator::new(config(&dir, &["de", "fr"]), &backend)
            .run()
            .await
            .unwrap();

        assert!(matches!(
            report.languages[0].outcome,
            LanguageOutcome::Failed { stage: SyncStage::Diffing, .. }
        ));
        assert!(!report.languages[1].is_failed());
    }

    #[tokio::test]
    async fn shared_input_errors_abort_the_run() {
        let dir = tempdir().unwrap();
        let backend = MockBackend::new();

        let err = SyncOrchestrator::new(config(&dir, &["fr"]), &backend).run().await.unwrap_err();
        assert!(matches!(err, SyncError::MissingBaseFile(_)));

        std::fs::write(dir.path().join("en.json"), "[1, 2]").unwrap();
        let err = SyncOrchestrator::new(config(&dir, &["fr"]), &backend).run().await.unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));

        let err = SyncOrchestrator::new(config(&dir, &[]), &backend).run().await.unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));

        // a broken snapshot is shared input too, for a full run and a single file
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        std::fs::write(dir.path().join("en.json.original"), "{ broken").unwrap();
        let orchestrator = SyncOrchestrator::new(config(&dir, &["fr", "de"]), &backend);
        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, SyncError::Parse { ref path, .. } if path.ends_with("en.json.original")));
        let err = orchestrator.sync_file(&dir.path().join("fr.json")).await.unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));

        assert!(backend.calls().is_empty());
        assert!(!dir.path().join("fr.json").exists());
    }

    #[tokio::test]
    async fn invalid_validation_still_persists() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        let backend = MockBackend::new().invalid();

        let report = SyncOrchestrator::new(config(&dir, &["fr"]), &backend).run().await.unwrap();

        assert!(matches!(
            report.languages[0].outcome,
            LanguageOutcome::Persisted { validated: Some(false), .. }
        ));
        assert!(dir.path().join("fr.json").exists());
    }

    #[tokio::test]
    async fn validation_error_is_a_warning() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        let backend = MockBackend::new().validation_errors();

        let report = SyncOrchestrator::new(config(&dir, &["fr"]), &backend).run().await.unwrap();

        assert!(matches!(
            report.languages[0].outcome,
            LanguageOutcome::Persisted { validated: None, .. }
        ));
    }

    #[tokio::test]
    async fn deletion_only_skips_backend() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        write(dir.path(), "en.json.original", json!({"a": "Hello"}));
        write(dir.path(), "fr.json", json!({"a": "Bonjour", "c": "extra"}));
        let backend = MockBackend::new();

        SyncOrchestrator::new(config(&dir, &["fr"]), &backend).run().await.unwrap();

        // base template: untouched leaves come from base
        assert_eq!(read(dir.path(), "fr.json"), json!({"a": "Hello"}));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn target_template_keeps_existing_translations() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello", "b": "World"}));
        write(dir.path(), "en.json.original", json!({"a": "Hello"}));
        write(dir.path(), "fr.json", json!({"a": "Bonjour", "c": "extra"}));
        let backend = MockBackend::new();

        let mut cfg = config(&dir, &["fr"]);
        cfg.merge_template = MergeTemplate::Target;
        SyncOrchestrator::new(cfg, &backend).run().await.unwrap();

        assert_eq!(read(dir.path(), "fr.json"), json!({"a": "Bonjour", "b": "[fr] World"}));
    }

    #[tokio::test]
    async fn missing_reply_key_keeps_template_value() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello", "b": "World"}));
        let backend = MockBackend::new().dropping_key("b");

        let report = SyncOrchestrator::new(config(&dir, &["fr"]), &backend).run().await.unwrap();

        assert_eq!(read(dir.path(), "fr.json"), json!({"a": "[fr] Hello", "b": "World"}));
        assert!(matches!(
            report.languages[0].outcome,
            LanguageOutcome::Persisted { missing: 1, translated: 1, .. }
        ));
    }

    struct FixedLog(&'static str);

    impl VersionControl for FixedLog {
        fn last_commit_diff(&self, _file: &Path) -> SyncResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn change_log_adds_paths_to_translate() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"menu": {"open": "Open"}, "b": "World"}));
        write(dir.path(), "en.json.original", json!({"menu": {"open": "Open"}, "b": "World"}));
        write(dir.path(), "fr.json", json!({"menu": {"open": "Ouvrir"}, "b": "Monde"}));
        let backend = MockBackend::new();

        let mut cfg = config(&dir, &["fr"]);
        cfg.use_git_history = true;
        let orchestrator = SyncOrchestrator::new(cfg, &backend)
            .with_version_control(Box::new(FixedLog("+    \"open\": \"Open\",\n")));

        let plan = orchestrator.plan("fr").unwrap();
        assert!(plan.diff.is_empty());
        assert_eq!(plan.to_translate.keys().collect::<Vec<_>>(), vec!["menu.open"]);

        orchestrator.run().await.unwrap();
        assert_eq!(
            read(dir.path(), "fr.json"),
            json!({"menu": {"open": "[fr] Open"}, "b": "World"})
        );
    }

    #[tokio::test]
    async fn change_log_paths_are_sent_again_every_run() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        let backend = MockBackend::new();

        let mut cfg = config(&dir, &["fr"]);
        cfg.use_git_history = true;
        let orchestrator = SyncOrchestrator::new(cfg.clone(), &backend)
            .with_version_control(Box::new(FixedLog("+  \"a\": \"Hello\"\n")));

        for _ in 0..3 {
            let report = orchestrator.run().await.unwrap();
            assert!(matches!(
                report.languages[0].outcome,
                LanguageOutcome::Persisted { counts: ChangeCounts { changelog: 1, .. }, translated: 1, .. }
            ));
        }
        assert_eq!(backend.translate_calls().len(), 3);

        cfg.use_git_history = false;
        let report = SyncOrchestrator::new(cfg, &backend)
            .with_version_control(Box::new(FixedLog("+  \"a\": \"Hello\"\n")))
            .run()
            .await
            .unwrap();
        assert_eq!(report.languages[0].outcome, LanguageOutcome::Unchanged);
        assert_eq!(backend.translate_calls().len(), 3);
    }

    #[tokio::test]
    async fn write_failure_is_reported_as_persisting() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        // the temp file for fr.json cannot be created over a directory
        std::fs::create_dir(dir.path().join("fr.json.tmp")).unwrap();
        let backend = MockBackend::new();

        let report = SyncOrchestrator::new(config(&dir, &["fr"]), &backend).run().await.unwrap();

        assert!(matches!(
            report.languages[0].outcome,
            LanguageOutcome::Failed { stage: SyncStage::Persisting, .. }
        ));
        assert!(!dir.path().join("fr.json").exists());
        assert!(!dir.path().join("en.json.original").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_only_between_languages() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        let backend = MockBackend::new();

        let mut cfg = config(&dir, &["fr"]);
        cfg.pause_between_languages_ms = 1000;
        let started = tokio::time::Instant::now();
        SyncOrchestrator::new(cfg.clone(), &backend).run().await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);

        cfg.set_targets(["de", "ja"]);
        let started = tokio::time::Instant::now();
        let report = SyncOrchestrator::new(cfg, &backend).run().await.unwrap();
        // one pause between de and ja, none before de
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1000) && elapsed < Duration::from_millis(2000));
        assert_eq!(report.languages.len(), 2);
    }

    #[tokio::test]
    async fn sync_file_uses_file_stem() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en.json", json!({"a": "Hello"}));
        let backend = MockBackend::new();
        let orchestrator = SyncOrchestrator::new(config(&dir, &[]), &backend);

        let report = orchestrator.sync_file(&dir.path().join("ja.json")).await.unwrap();
        assert_eq!(report.lang, "ja");
        assert_eq!(read(dir.path(), "ja.json"), json!({"a": "[ja] Hello"}));

        let err = orchestrator.sync_file(&dir.path().join("en.json")).await.unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert_eq!(
            backend.calls(),
            vec![
                MockCall::Translate {
                    target_lang: "ja".into(),
                    keys: vec!["a".into()]
                },
                MockCall::Validate {
                    target_lang: "ja".into()
                },
            ]
        );
    }

    #[test]
    fn plan_merges_change_log_last() {
        let mut d = DiffResult::new();
        d.push("a".into(), crate::model::diff::PathChange::Added(json!("x")));
        let mut log = FlatMap::new();
        log.insert("a".into(), json!("y"));
        log.insert("b".into(), json!("z"));

        let plan = SyncPlan::build(d, &log);
        assert_eq!(plan.to_translate["a"], json!("y"));
        assert_eq!(plan.to_translate.len(), 2);
        assert!(!plan.is_noop());
        assert!(SyncPlan::default().is_noop());
    }
}
