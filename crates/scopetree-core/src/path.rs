//! Scope Path Addressing
//!
//! A [`ScopePath`] is the hierarchical address of a unit of logic inside the
//! shared state tree: an ordered sequence of non-empty segments, written
//! `"a.b.c"` in string form. This module also provides the structural
//! helpers that read and write `serde_json::Value` trees by path.

use crate::errors::{ScopeError, ScopeResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt;

/// Separator between scope segments in string form
pub const SCOPE_SEPARATOR: char = '.';

// ----------------------------------------------------------------------------
// ScopePath
// ----------------------------------------------------------------------------

/// Hierarchical address of a state slice and its owning reducer
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopePath(SmallVec<[String; 4]>);

impl ScopePath {
    /// The empty path, addressing the root of the state tree
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Parse a dot-delimited scope string. Every segment must be non-empty;
    /// the empty string denotes the root path.
    pub fn split(scope: &str) -> ScopeResult<Self> {
        if scope.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = SmallVec::new();
        for segment in scope.split(SCOPE_SEPARATOR) {
            if segment.is_empty() {
                return Err(ScopeError::InvalidScope {
                    scope: scope.to_string(),
                    reason: "empty path segment".to_string(),
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Self(segments))
    }

    /// Build a path from pre-validated segments
    pub fn from_segments<I, S>(segments: I) -> ScopeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = Self::root();
        for segment in segments {
            let segment = segment.into();
            if segment.is_empty() || segment.contains(SCOPE_SEPARATOR) {
                return Err(ScopeError::InvalidScope {
                    scope: segment,
                    reason: "segments must be non-empty and must not contain `.`".to_string(),
                });
            }
            path.0.push(segment);
        }
        Ok(path)
    }

    /// Dot-joined string form
    pub fn join(&self) -> String {
        self.0.join(".")
    }

    /// Concatenate a child path onto this one
    pub fn concat(&self, child: &ScopePath) -> ScopePath {
        let mut segments = self.0.clone();
        segments.extend(child.0.iter().cloned());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `prefix` is this path or one of its ancestors
    pub fn starts_with(&self, prefix: &ScopePath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// The segments below `prefix`, if `prefix` is an ancestor-or-self
    pub fn strip_prefix(&self, prefix: &ScopePath) -> Option<&[String]> {
        if self.starts_with(prefix) {
            Some(&self.0[prefix.0.len()..])
        } else {
            None
        }
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join())
    }
}

// ----------------------------------------------------------------------------
// State Tree Addressing
// ----------------------------------------------------------------------------

/// Read the value at `path`, if the whole chain of objects exists
pub fn get_at<'a>(tree: &'a Value, path: &ScopePath) -> Option<&'a Value> {
    let mut current = tree;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate objects as needed.
/// Non-object intermediates are replaced; siblings are left in place.
pub fn set_at(tree: &mut Value, path: &ScopePath, value: Value) {
    if path.is_empty() {
        *tree = value;
        return;
    }
    let mut current = tree;
    for segment in &path.segments()[..path.len() - 1] {
        current = object_slot(current)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    object_slot(current).insert(path.segments()[path.len() - 1].clone(), value);
}

/// View a value as a mutable object map, replacing non-objects in place
fn object_slot(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("slot was just made an object"),
    }
}

/// Remove the value at `path`. Returns whether anything was removed.
/// Interior objects left empty by the removal are pruned as well.
pub fn delete_at(tree: &mut Value, path: &ScopePath) -> bool {
    if path.is_empty() {
        let removed = !tree.is_null();
        *tree = Value::Null;
        return removed;
    }
    delete_segments(tree, path.segments())
}

fn delete_segments(tree: &mut Value, segments: &[String]) -> bool {
    let Some(map) = tree.as_object_mut() else {
        return false;
    };
    let (head, rest) = match segments {
        [head, rest @ ..] => (head, rest),
        [] => return false,
    };
    if rest.is_empty() {
        return map.remove(head).is_some();
    }
    let Some(child) = map.get_mut(head) else {
        return false;
    };
    let removed = delete_segments(child, rest);
    if removed && child.as_object().is_some_and(Map::is_empty) {
        map.remove(head);
    }
    removed
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn split_and_join_round_trip() {
        let path = ScopePath::split("root.counter").unwrap();
        assert_eq!(path.segments(), ["root", "counter"]);
        assert_eq!(path.join(), "root.counter");
    }

    #[test]
    fn split_empty_string_is_root() {
        let path = ScopePath::split("").unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn split_rejects_empty_segments() {
        assert!(matches!(
            ScopePath::split("a..b"),
            Err(ScopeError::InvalidScope { .. })
        ));
        assert!(matches!(
            ScopePath::split(".a"),
            Err(ScopeError::InvalidScope { .. })
        ));
    }

    #[test]
    fn concat_appends_child_segments() {
        let parent = ScopePath::split("a.b").unwrap();
        let child = ScopePath::split("c").unwrap();
        assert_eq!(parent.concat(&child).join(), "a.b.c");
    }

    #[test]
    fn prefix_relationships() {
        let parent = ScopePath::split("a.b").unwrap();
        let child = ScopePath::split("a.b.c").unwrap();
        let sibling = ScopePath::split("a.x").unwrap();
        assert!(child.starts_with(&parent));
        assert!(child.starts_with(&child));
        assert!(!sibling.starts_with(&parent));
        assert_eq!(child.strip_prefix(&parent), Some(&["c".to_string()][..]));
        assert_eq!(sibling.strip_prefix(&parent), None);
    }

    #[test]
    fn set_at_creates_intermediate_objects() {
        let mut tree = Value::Null;
        let path = ScopePath::split("a.b.c").unwrap();
        set_at(&mut tree, &path, json!(42));
        assert_eq!(tree, json!({"a": {"b": {"c": 42}}}));
        assert_eq!(get_at(&tree, &path), Some(&json!(42)));
    }

    #[test]
    fn set_at_preserves_siblings() {
        let mut tree = json!({"a": {"x": 1}});
        set_at(&mut tree, &ScopePath::split("a.y").unwrap(), json!(2));
        assert_eq!(tree, json!({"a": {"x": 1, "y": 2}}));
    }

    #[test]
    fn delete_at_prunes_empty_interior_nodes() {
        let mut tree = json!({"a": {"b": {"c": 1}}, "z": 0});
        assert!(delete_at(&mut tree, &ScopePath::split("a.b.c").unwrap()));
        assert_eq!(tree, json!({"z": 0}));
    }

    #[test]
    fn delete_at_unknown_path_is_noop() {
        let mut tree = json!({"a": 1});
        assert!(!delete_at(&mut tree, &ScopePath::split("a.b").unwrap()));
        assert!(!delete_at(&mut tree, &ScopePath::split("q").unwrap()));
        assert_eq!(tree, json!({"a": 1}));
    }

    proptest! {
        #[test]
        fn get_after_set_returns_value(
            segments in proptest::collection::vec("[a-z]{1,8}", 1..5),
            value in -1000i64..1000,
        ) {
            let path = ScopePath::from_segments(segments).unwrap();
            let mut tree = json!({"existing": true});
            set_at(&mut tree, &path, json!(value));
            prop_assert_eq!(get_at(&tree, &path), Some(&json!(value)));
        }
    }
}
