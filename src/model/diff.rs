use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use super::tree::FlatMap;

/// Classification of one path by the three-way diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PathChange {
    /// Present in base, absent from target (or structurally incompatible with it).
    Added(Value),
    /// Base value moved away from the last synced snapshot.
    Modified(Value),
    /// Present in target, absent from base.
    Deleted,
}

/// Ordered, per-path diff outcome. Each path appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffResult {
    entries: Vec<(String, PathChange)>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl DiffResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change. A path that is already present keeps its first classification.
    pub fn push(&mut self, path: String, change: PathChange) {
        if self.seen.insert(path.clone()) {
            self.entries.push((path, change));
        }
    }

    pub fn entries(&self) -> &[(String, PathChange)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn added(&self) -> FlatMap {
        self.collect(|c| match c {
            PathChange::Added(v) => Some(v),
            _ => None,
        })
    }

    pub fn modified(&self) -> FlatMap {
        self.collect(|c| match c {
            PathChange::Modified(v) => Some(v),
            _ => None,
        })
    }

    pub fn deleted(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, c)| matches!(c, PathChange::Deleted))
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// `added ∪ modified`, in diff order.
    pub fn to_translate(&self) -> FlatMap {
        self.collect(|c| match c {
            PathChange::Added(v) | PathChange::Modified(v) => Some(v),
            PathChange::Deleted => None,
        })
    }

    /// Counts as `(added, modified, deleted)`.
    pub fn counts(&self) -> (usize, usize, usize) {
        self.entries
            .iter()
            .fold((0, 0, 0), |(a, m, d), (_, c)| match c {
                PathChange::Added(_) => (a + 1, m, d),
                PathChange::Modified(_) => (a, m + 1, d),
                PathChange::Deleted => (a, m, d + 1),
            })
    }

    fn collect(&self, pick: impl Fn(&PathChange) -> Option<&Value>) -> FlatMap {
        let mut out = FlatMap::new();
        for (path, change) in &self.entries {
            if let Some(v) = pick(change) {
                out.insert(path.clone(), v.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_classification_wins() {
        let mut diff = DiffResult::new();
        diff.push("a".into(), PathChange::Added(json!("x")));
        diff.push("a".into(), PathChange::Deleted);
        assert_eq!(diff.len(), 1);
        assert!(diff.deleted().is_empty());
    }

    #[test]
    fn views_split_by_kind() {
        let mut diff = DiffResult::new();
        diff.push("a".into(), PathChange::Added(json!("A")));
        diff.push("b".into(), PathChange::Modified(json!("B")));
        diff.push("c".into(), PathChange::Deleted);

        assert_eq!(diff.counts(), (1, 1, 1));
        assert_eq!(diff.added().get("a"), Some(&json!("A")));
        assert_eq!(diff.modified().get("b"), Some(&json!("B")));
        assert_eq!(diff.deleted(), vec!["c".to_string()]);

        let to_translate = diff.to_translate();
        let keys: Vec<&String> = to_translate.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
