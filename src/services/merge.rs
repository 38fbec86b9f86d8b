use serde_json::Value;

use super::flatten::{remove_path, set_path};
use crate::model::diff::DiffResult;
use crate::model::tree::{FlatMap, LocaleTree};

/// One write against the merge template.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOp {
    /// Overlay a value at the path, creating parents as needed.
    Set(Value),
    /// Remove the node at the path if it exists.
    Remove,
}

/// Builds the ops for one sync: every translated path is set, every deleted path removed.
pub fn ops_for(translated: &FlatMap, diff: &DiffResult) -> Vec<(String, MergeOp)> {
    let mut ops: Vec<(String, MergeOp)> = translated
        .iter()
        .map(|(path, value)| (path.clone(), MergeOp::Set(value.clone())))
        .collect();
    ops.extend(diff.deleted().into_iter().map(|path| (path, MergeOp::Remove)));
    ops
}

/// Deep-clones `template` and applies `ops` in order.
///
/// Leaves with no op are copied from the template verbatim.
pub fn merge(template: &LocaleTree, ops: &[(String, MergeOp)]) -> LocaleTree {
    let mut merged = template.clone();
    for (path, op) in ops {
        match op {
            MergeOp::Set(value) => set_path(&mut merged, path, value.clone()),
            MergeOp::Remove => {
                remove_path(&mut merged, path);
            }
        }
    }
    merged
}
