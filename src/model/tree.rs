use serde_json::{Map, Value};

/// A nested locale document: string keys mapping to string leaves or nested trees.
///
/// Key order is preserved (`serde_json/preserve_order`), so files are written
/// back in the order they were read.
pub type LocaleTree = Map<String, Value>;

/// A flat mapping from dotted paths (`"menu.file.open"`) to leaf values.
pub type FlatMap = Map<String, Value>;

pub const PATH_SEPARATOR: char = '.';

pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{key}")
    }
}

pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_SEPARATOR)
}
