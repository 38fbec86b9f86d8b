use serde_json::{Map, Value};

use crate::model::tree::{join_path, split_path, FlatMap, LocaleTree};

/// Flattens a tree into dotted paths, depth-first. Only objects are recursed into;
/// arrays and scalars terminate a path.
pub fn flatten(tree: &LocaleTree) -> FlatMap {
    let mut out = FlatMap::new();
    flatten_into(tree, "", &mut out);
    out
}

fn flatten_into(tree: &LocaleTree, prefix: &str, out: &mut FlatMap) {
    for (key, value) in tree {
        let path = join_path(prefix, key);
        match value {
            Value::Object(child) => flatten_into(child, &path, out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

/// Rebuilds a tree from dotted paths, creating intermediate objects on demand.
pub fn unflatten(flat: &FlatMap) -> LocaleTree {
    let mut tree = LocaleTree::new();
    for (path, value) in flat {
        set_path(&mut tree, path, value.clone());
    }
    tree
}

/// Looks up the value at `path`.
pub fn get_path<'a>(tree: &'a LocaleTree, path: &str) -> Option<&'a Value> {
    let mut segments = split_path(path).peekable();
    let mut current = tree;
    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;
        if segments.peek().is_none() {
            return Some(value);
        }
        current = value.as_object()?;
    }
    None
}

/// Writes `value` at `path`. Missing or non-object intermediates are replaced by objects.
pub fn set_path(tree: &mut LocaleTree, path: &str, value: Value) {
    let segments: Vec<&str> = split_path(path).collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = tree;
    for segment in parents {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }
    current.insert(last.to_string(), value);
}

/// Removes the node at `path`. Returns false when any part of the path is missing.
pub fn remove_path(tree: &mut LocaleTree, path: &str) -> bool {
    let segments: Vec<&str> = split_path(path).collect();
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = tree;
    for segment in parents {
        current = match current.get_mut(*segment) {
            Some(Value::Object(map)) => map,
            _ => return false,
        };
    }
    current.shift_remove(*last).is_some()
}
