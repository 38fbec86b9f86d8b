use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::encoding;
use crate::error::{SyncError, SyncResult};
use crate::model::tree::LocaleTree;

/// `<dir>/<lang>.json`
pub fn locale_path(dir: &Path, lang: &str) -> PathBuf {
    dir.join(format!("{lang}.json"))
}

/// Reads a locale tree. A missing file is `Ok(None)`; a file whose root is not an
/// object is a parse error.
pub fn read_tree(path: &Path) -> SyncResult<Option<LocaleTree>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SyncError::io(path, e)),
    };

    let decoded = encoding::decode(&bytes);
    if decoded.encoding != encoding_rs::UTF_8 || decoded.had_errors {
        tracing::warn!(
            path = %path.display(),
            encoding = decoded.encoding.name(),
            had_errors = decoded.had_errors,
            "locale file is not clean utf-8"
        );
    }
    if decoded.had_bom {
        tracing::debug!(path = %path.display(), "byte order mark stripped; writes omit it");
    }

    parse_tree(path, &decoded.text).map(Some)
}

pub fn parse_tree(path: &Path, text: &str) -> SyncResult<LocaleTree> {
    let value: Value = serde_json::from_str(text).map_err(|e| SyncError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match value {
        Value::Object(tree) => Ok(tree),
        other => Err(SyncError::Parse {
            path: path.to_path_buf(),
            message: format!("expected a JSON object at the root, found {}", kind(&other)),
        }),
    }
}

/// Writes a tree as 2-space indented JSON.
pub fn write_tree(path: &Path, tree: &LocaleTree) -> SyncResult<()> {
    let mut json = serde_json::to_string_pretty(tree).map_err(|e| SyncError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> SyncResult<()> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }

    fs::write(&tmp, bytes).map_err(|e| SyncError::io(&tmp, e))?;

    // rename over an existing file is not atomic on every platform
    if cfg!(windows) && path.exists() {
        fs::remove_file(path).map_err(|e| SyncError::io(path, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| SyncError::io(path, e))?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "locale".to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
