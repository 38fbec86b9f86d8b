//! Secondary change source: lines the last commit touched in the base file.
//!
//! Best effort only. Any failure (no repository, no parent commit, git missing,
//! an unparseable diff) yields an empty set and a warning.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::flatten::flatten;
use crate::error::{SyncError, SyncResult};
use crate::model::tree::{FlatMap, LocaleTree, PATH_SEPARATOR};

/// Read-only access to the history of one file.
pub trait VersionControl {
    /// Unified diff of `file` between the previous and the current commit.
    fn last_commit_diff(&self, file: &Path) -> SyncResult<String>;
}

/// `git` on the command line, rooted at `repo_root`.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
}

impl GitCli {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    fn git(&self, args: &[&str]) -> SyncResult<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(args)
            .output()
            .map_err(|e| SyncError::ChangeLogUnavailable(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::ChangeLogUnavailable(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionControl for GitCli {
    fn last_commit_diff(&self, file: &Path) -> SyncResult<String> {
        let inside = self.git(&["rev-parse", "--is-inside-work-tree"])?;
        if inside.trim() != "true" {
            return Err(SyncError::ChangeLogUnavailable(format!(
                "{} is not inside a work tree",
                self.repo_root.display()
            )));
        }

        let relative = file.strip_prefix(&self.repo_root).unwrap_or(file);
        let relative = relative.to_string_lossy();
        self.git(&["diff", "HEAD~1", "HEAD", "--", relative.as_ref()])
    }
}

/// Paths of `base` touched by the last commit, with their current base values.
pub fn augment(vcs: &dyn VersionControl, base_file: &Path, base: &LocaleTree) -> FlatMap {
    let result = vcs
        .last_commit_diff(base_file)
        .and_then(|text| changes_from_diff(&text, base));

    match result {
        Ok(changes) => {
            tracing::debug!(
                file = %base_file.display(),
                changes = changes.len(),
                "change log read"
            );
            changes
        }
        Err(e) => {
            tracing::warn!(file = %base_file.display(), error = %e, "skipping change log");
            FlatMap::new()
        }
    }
}

fn diff_line_re() -> Result<&'static Regex, regex::Error> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = RE.get() {
        return Ok(re);
    }
    let re = Regex::new(r#"^\s*"((?:[^"\\]|\\.)*)"\s*:\s*(.*?)\s*,?\s*$"#)?;
    Ok(RE.get_or_init(|| re))
}

/// Maps inserted `"key": value` lines of a unified diff onto base paths.
///
/// A diff line only shows the last key segment, so it is matched against base
/// leaves with the same final segment and, when the value parses, the same value.
pub fn changes_from_diff(diff_text: &str, base: &LocaleTree) -> SyncResult<FlatMap> {
    let line_re = diff_line_re().map_err(|e| SyncError::ChangeLogUnavailable(e.to_string()))?;

    let flat = flatten(base);
    let mut by_key: HashMap<&str, Vec<(&String, &Value)>> = HashMap::new();
    for (path, value) in &flat {
        let last = path.rsplit(PATH_SEPARATOR).next().unwrap_or(path.as_str());
        by_key.entry(last).or_default().push((path, value));
    }

    let mut changes = FlatMap::new();
    for line in diff_text.lines() {
        if line.starts_with("+++") {
            continue;
        }
        let Some(added) = line.strip_prefix('+') else {
            continue;
        };
        let Some(caps) = line_re.captures(added) else {
            continue;
        };

        let raw_key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let raw_value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let opens_block = raw_value.starts_with('{')
            || (raw_value.starts_with('[') && !raw_value.ends_with(']'));
        if opens_block {
            continue;
        }

        let key: String = match serde_json::from_str(&format!("\"{raw_key}\"")) {
            Ok(k) => k,
            Err(_) => raw_key.to_string(),
        };
        let parsed: Option<Value> = serde_json::from_str(raw_value).ok();

        let Some(candidates) = by_key.get(key.as_str()) else {
            continue;
        };
        for (path, value) in candidates {
            if parsed.as_ref().map_or(true, |p| p == *value) {
                changes.insert((*path).clone(), (*value).clone());
            }
        }
    }

    Ok(changes)
}
