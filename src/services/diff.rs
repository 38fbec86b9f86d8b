use serde_json::Value;

use crate::model::diff::{DiffResult, PathChange};
use crate::model::tree::{join_path, LocaleTree};

/// Three-way diff of `base` against `target`, using `snapshot` (base at the last
/// successful sync) to tell genuine base edits from existing translations.
///
/// A leaf whose target value differs from base is only `Modified` when base also
/// differs from the snapshot; otherwise the target value is taken to be a valid
/// translation and left alone.
pub fn diff(base: &LocaleTree, target: &LocaleTree, snapshot: &LocaleTree) -> DiffResult {
    let mut out = DiffResult::new();
    walk(base, target, Some(snapshot), "", &mut out);

    let (added, modified, deleted) = out.counts();
    tracing::debug!(added, modified, deleted, "diff computed");
    out
}

fn walk(
    base: &LocaleTree,
    target: &LocaleTree,
    snapshot: Option<&LocaleTree>,
    prefix: &str,
    out: &mut DiffResult,
) {
    for (key, base_value) in base {
        let path = join_path(prefix, key);
        let Some(target_value) = target.get(key) else {
            out.push(path, PathChange::Added(base_value.clone()));
            continue;
        };

        let snapshot_value = snapshot.and_then(|s| s.get(key));

        match (base_value, target_value) {
            (Value::Object(base_child), Value::Object(target_child)) => {
                let snapshot_child = snapshot_value.and_then(Value::as_object);
                walk(base_child, target_child, snapshot_child, &path, out);
            }
            // Scalar on one side, object on the other: replace the whole node.
            (Value::Object(_), _) | (_, Value::Object(_)) => {
                out.push(path, PathChange::Added(base_value.clone()));
            }
            _ if base_value != target_value => {
                if snapshot_value != Some(base_value) {
                    out.push(path, PathChange::Modified(base_value.clone()));
                }
            }
            _ => {}
        }
    }

    for key in target.keys() {
        if !base.contains_key(key) {
            out.push(join_path(prefix, key), PathChange::Deleted);
        }
    }
}
