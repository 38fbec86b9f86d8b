//! locsync CLI
//!
//! - `sync` - sync every enabled target language
//! - `sync-file` - sync one target locale file
//! - `diff` - show what a sync of one language would change
//! - `show-config` - print the effective configuration

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use locsync::services::sync::{self, ChangeCounts};
use locsync::{
    build_backend, LanguageOutcome, LanguageReport, PathChange, ProviderKind, RunReport,
    SyncConfig, SyncError, SyncOrchestrator, SyncPlan,
};

/// Keep translated locale files in sync with the base language.
#[derive(Parser)]
#[command(name = "locsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./locsync.toml, then the user config dir)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Overrides {
    /// Directory holding the locale files
    #[arg(global = true, long)]
    base_path: Option<PathBuf>,

    /// Base language code
    #[arg(global = true, long)]
    base_language: Option<String>,

    /// Target language (repeatable); replaces the configured set
    #[arg(global = true, long = "target")]
    targets: Vec<String>,

    /// Entries per translation request
    #[arg(global = true, long)]
    batch_size: Option<usize>,

    /// Translation provider
    #[arg(global = true, long, value_enum)]
    provider: Option<ProviderKind>,

    /// Model name
    #[arg(global = true, long)]
    model: Option<String>,

    /// Provider endpoint URL
    #[arg(global = true, long)]
    api_url: Option<String>,

    /// Ignore git history of the base file. With history on, keys touched by the
    /// last commit are translated again on every run, even when already synced.
    #[arg(global = true, long)]
    no_history: bool,
}

impl Overrides {
    fn apply(self, cfg: &mut SyncConfig) {
        if let Some(path) = self.base_path {
            cfg.base_path = Some(path);
        }
        if let Some(lang) = self.base_language {
            cfg.base_language = Some(lang);
        }
        if !self.targets.is_empty() {
            cfg.set_targets(self.targets);
        }
        if let Some(size) = self.batch_size {
            cfg.batch_size = size;
        }
        if let Some(kind) = self.provider {
            cfg.provider.kind = kind;
        }
        if let Some(model) = self.model {
            cfg.provider.model = Some(model);
        }
        if let Some(url) = self.api_url {
            cfg.provider.api_url = Some(url);
        }
        if self.no_history {
            cfg.use_git_history = false;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sync every enabled target language
    Sync,

    /// Sync one target locale file; the language is the file name
    SyncFile {
        /// Path to `<lang>.json`
        path: PathBuf,
    },

    /// Show the paths a sync of LANG would add, modify or delete
    Diff {
        /// Target language code
        lang: String,
    },

    /// Print the effective configuration with the API key masked
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, SyncError> {
    let mut cfg = SyncConfig::load(cli.config.as_deref())?;
    cli.overrides.apply(&mut cfg);

    match cli.command {
        Commands::Sync => {
            let backend = build_backend(&cfg.provider)?;
            let report = SyncOrchestrator::new(cfg, backend.as_ref()).run().await?;
            print_run(&report);
            Ok(exit_for(report.has_failures()))
        }
        Commands::SyncFile { path } => {
            let backend = build_backend(&cfg.provider)?;
            let report = SyncOrchestrator::new(cfg, backend.as_ref()).sync_file(&path).await?;
            print_language(&report);
            Ok(exit_for(report.is_failed()))
        }
        Commands::Diff { lang } => {
            let plan = sync::plan(&cfg, &lang)?;
            print_plan(&lang, &plan);
            Ok(ExitCode::SUCCESS)
        }
        Commands::ShowConfig => {
            print!("{}", cfg.to_display_string());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_for(failed: bool) -> ExitCode {
    if failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

fn print_run(report: &RunReport) {
    for lang in &report.languages {
        print_language(lang);
    }
    println!(
        "total tokens: {} in, {} out",
        report.total_usage.input_tokens, report.total_usage.output_tokens
    );
}

fn print_language(report: &LanguageReport) {
    match &report.outcome {
        LanguageOutcome::Persisted {
            counts,
            translated,
            missing,
            usage,
            validated,
            ..
        } => {
            let ChangeCounts {
                added,
                modified,
                deleted,
                changelog,
            } = counts;
            let validation = match validated {
                Some(true) => "valid",
                Some(false) => "flagged",
                None => "not validated",
            };
            println!(
                "{}: synced (+{added} ~{modified} -{deleted}, {changelog} from history), \
                 {translated} translated, {missing} missing, {validation}, {} tokens",
                report.lang,
                usage.total()
            );
        }
        LanguageOutcome::Unchanged => println!("{}: no changes", report.lang),
        LanguageOutcome::Failed { stage, error } => {
            println!("{}: failed while {stage}: {error}", report.lang)
        }
    }
}

fn print_plan(lang: &str, plan: &SyncPlan) {
    if plan.is_noop() {
        println!("{lang}: no changes");
        return;
    }
    for (path, change) in plan.diff.entries() {
        let mark = match change {
            PathChange::Added(_) => '+',
            PathChange::Modified(_) => '~',
            PathChange::Deleted => '-',
        };
        println!("{mark} {path}");
    }
    for path in plan.changelog.keys() {
        println!("h {path}");
    }
}
