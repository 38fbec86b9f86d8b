//! Run configuration: `locsync.toml`, environment, then command-line overrides.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::services::batch::DEFAULT_BATCH_SIZE;

pub const CONFIG_FILE: &str = "locsync.toml";
pub const API_KEY_ENV: &str = "LOCSYNC_API_KEY";

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_pause_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> usize {
    3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "openai")]
    #[value(name = "openai")]
    OpenAi,
    #[serde(rename = "openai-compatible")]
    #[value(name = "openai-compatible")]
    OpenAiCompatible,
    #[serde(rename = "deepseek")]
    #[value(name = "deepseek")]
    Deepseek,
    #[serde(rename = "claude")]
    #[value(name = "claude")]
    Claude,
    #[serde(rename = "gemini")]
    #[value(name = "gemini")]
    Gemini,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenAiCompatible => "openai-compatible",
            ProviderKind::Deepseek => "deepseek",
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
        };
        f.write_str(name)
    }
}

/// Which tree a merge starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeTemplate {
    /// Clone the base tree; untouched leaves come from base.
    #[default]
    Base,
    /// Clone the existing target tree; untouched leaves keep their translation.
    Target,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: None,
            api_url: None,
            model: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directory holding `<lang>.json` files. Relative paths resolve against the
    /// config file's directory.
    #[serde(default)]
    pub base_path: Option<PathBuf>,

    #[serde(default)]
    pub base_language: Option<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_pause_ms")]
    pub pause_between_languages_ms: u64,

    #[serde(default = "default_true")]
    pub use_git_history: bool,

    #[serde(default = "default_true")]
    pub validate: bool,

    #[serde(default)]
    pub merge_template: MergeTemplate,

    /// `lang = true|false`, in file order.
    #[serde(default)]
    pub target_languages: toml::Table,

    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            base_language: None,
            target_languages: toml::Table::new(),
            batch_size: default_batch_size(),
            pause_between_languages_ms: default_pause_ms(),
            use_git_history: true,
            validate: true,
            merge_template: MergeTemplate::default(),
            provider: ProviderConfig::default(),
        }
    }
}

/// Values checked by [`SyncConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub base_path: PathBuf,
    pub base_language: String,
    pub target_languages: Vec<String>,
}

impl SyncConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> SyncResult<Self> {
        toml::from_str(text).map_err(|e| SyncError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Reads a config file; a relative `base_path` is resolved against its directory.
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let mut cfg = Self::from_toml_str(&text, path)?;
        if let (Some(base), Some(dir)) = (&cfg.base_path, path.parent()) {
            if base.is_relative() {
                cfg.base_path = Some(dir.join(base));
            }
        }
        Ok(cfg)
    }

    /// `explicit` if given, else `./locsync.toml`, else `<config_dir>/locsync/locsync.toml`.
    /// No file at all yields the defaults.
    pub fn load(explicit: Option<&Path>) -> SyncResult<Self> {
        let mut cfg = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::search_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "using config file");
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };

        if cfg.provider.api_key.is_none() {
            cfg.provider.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        Ok(cfg)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE));
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("locsync").join(CONFIG_FILE));
        }
        paths
    }

    /// Enabled target languages, in configured order.
    pub fn enabled_targets(&self) -> SyncResult<Vec<String>> {
        let mut out = Vec::new();
        for (lang, enabled) in &self.target_languages {
            match enabled.as_bool() {
                Some(true) => out.push(lang.clone()),
                Some(false) => {}
                None => {
                    return Err(SyncError::Configuration(format!(
                        "target_languages.{lang} must be true or false"
                    )))
                }
            }
        }
        Ok(out)
    }

    /// Replaces the target set with `langs`, all enabled.
    pub fn set_targets<I, S>(&mut self, langs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_languages = langs
            .into_iter()
            .map(|l| (l.into(), toml::Value::Boolean(true)))
            .collect();
    }

    /// Checks the settings every operation needs. The target list is left empty.
    pub fn validate_base(&self) -> SyncResult<ValidatedConfig> {
        let base_path = self
            .base_path
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| SyncError::Configuration("invalid or missing base_path".into()))?;

        let base_language = self
            .base_language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| SyncError::Configuration("invalid or missing base_language".into()))?
            .to_string();

        if self.batch_size == 0 {
            return Err(SyncError::Configuration("batch_size must be at least 1".into()));
        }

        Ok(ValidatedConfig {
            base_path,
            base_language,
            target_languages: Vec::new(),
        })
    }

    pub fn validate(&self) -> SyncResult<ValidatedConfig> {
        let mut validated = self.validate_base()?;

        let enabled = self.enabled_targets()?;
        if enabled.is_empty() {
            return Err(SyncError::Configuration("no target languages enabled".into()));
        }

        validated.target_languages = enabled
            .into_iter()
            .filter(|lang| {
                let is_base = *lang == validated.base_language;
                if is_base {
                    tracing::debug!(lang = %lang, "skipping base language in target set");
                }
                !is_base
            })
            .collect();

        Ok(validated)
    }

    /// Pretty TOML with the API key masked.
    pub fn to_display_string(&self) -> String {
        let mut shown = self.clone();
        if shown.provider.api_key.is_some() {
            shown.provider.api_key = Some("******".into());
        }
        toml::to_string_pretty(&shown).unwrap_or_default()
    }
}
