//! The "base at last successful sync" sidecar that the diff compares against.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::locale_file;
use crate::error::SyncResult;
use crate::model::tree::LocaleTree;

const SNAPSHOT_SUFFIX: &str = ".original";

/// Snapshot sidecar for one base locale file: `<base>.json` -> `<base>.json.original`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn for_base_file(base_file: &Path) -> Self {
        let mut name = base_file
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(SNAPSHOT_SUFFIX);
        Self {
            path: base_file.with_file_name(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` means no sync has succeeded yet; callers seed with the current base.
    pub fn load(&self) -> SyncResult<Option<LocaleTree>> {
        let tree = locale_file::read_tree(&self.path)?;
        match &tree {
            Some(t) => tracing::debug!(
                path = %self.path.display(),
                fingerprint = %fingerprint(t),
                "snapshot loaded"
            ),
            None => tracing::info!(path = %self.path.display(), "no snapshot yet, seeding from base"),
        }
        Ok(tree)
    }

    /// Loads the snapshot, falling back to `base` on first run. Nothing is written.
    pub fn load_or_seed(&self, base: &LocaleTree) -> SyncResult<LocaleTree> {
        Ok(self.load()?.unwrap_or_else(|| base.clone()))
    }

    /// Overwrites the snapshot with the base content. Returns its fingerprint.
    pub fn save(&self, base: &LocaleTree) -> SyncResult<String> {
        locale_file::write_tree(&self.path, base)?;
        let digest = fingerprint(base);
        tracing::debug!(path = %self.path.display(), fingerprint = %digest, "snapshot saved");
        Ok(digest)
    }
}

/// SHA-256 hex digest of the serialized tree.
pub fn fingerprint(tree: &LocaleTree) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(tree).unwrap_or_default());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn tree(v: Value) -> LocaleTree {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn sidecar_name_is_derived_from_base() {
        let store = SnapshotStore::for_base_file(Path::new("/tmp/messages/en.json"));
        assert_eq!(store.path(), Path::new("/tmp/messages/en.json.original"));
    }

    #[test]
    fn first_run_seeds_without_writing() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::for_base_file(&dir.path().join("en.json"));
        let base = tree(json!({ "a": "Hello" }));

        assert!(store.load().unwrap().is_none());
        assert_eq!(store.load_or_seed(&base).unwrap(), base);
        assert!(!store.path().exists());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::for_base_file(&dir.path().join("en.json"));
        let base = tree(json!({ "a": "Hello", "n": { "b": "B" } }));

        let digest = store.save(&base).unwrap();
        assert_eq!(digest, fingerprint(&base));
        assert_eq!(store.load().unwrap(), Some(base));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = tree(json!({ "a": "1" }));
        let b = tree(json!({ "a": "2" }));
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);
    }
}
