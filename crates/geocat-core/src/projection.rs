//! Field projector: resolves `fields` include/exclude sets against the
//! default-include floor and applies them to serialized records.
//!
//! Paths are dotted (`properties.gsd`) and address nested objects. A path
//! that names an object keeps or removes it whole; a longer path reaches
//! into it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// `fields` as the client sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsRequest {
    #[serde(default)]
    pub include: BTreeSet<String>,
    #[serde(default)]
    pub exclude: BTreeSet<String>,
}

impl FieldsRequest {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProjector {
    defaults: BTreeSet<String>,
}

impl FieldProjector {
    pub fn new<I, S>(defaults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            defaults: defaults.into_iter().map(Into::into).collect(),
        }
    }

    pub fn defaults(&self) -> &BTreeSet<String> {
        &self.defaults
    }

    /// Effective sets for one request. `predicate_paths` are the storage
    /// paths of fields the request filters on; they are always returned.
    pub fn resolve(&self, request: &FieldsRequest, predicate_paths: &BTreeSet<String>) -> ProjectionSpec {
        let mut include = self.defaults.clone();
        if !request.include.is_empty() {
            include.extend(request.include.iter().cloned());
            if !request.exclude.is_empty() {
                for path in request.exclude.difference(&self.defaults) {
                    include.remove(path);
                }
            }
        }
        include.extend(predicate_paths.iter().cloned());

        let exclude: BTreeSet<String> = request
            .exclude
            .iter()
            .filter(|path| {
                !self
                    .defaults
                    .iter()
                    .chain(predicate_paths)
                    .any(|kept| overlaps(path, kept))
            })
            .cloned()
            .collect();

        ProjectionSpec::new(include, exclude)
    }
}

/// `true` when removing `a` would remove some of `b`, or the reverse.
fn overlaps(a: &str, b: &str) -> bool {
    a == b || is_ancestor(a, b) || is_ancestor(b, a)
}

fn is_ancestor(parent: &str, path: &str) -> bool {
    path.strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('.'))
}

/// Resolved include and exclude sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionSpec {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
    include_tree: FieldTree,
    exclude_tree: FieldTree,
}

impl ProjectionSpec {
    pub fn new(include: BTreeSet<String>, exclude: BTreeSet<String>) -> Self {
        let include_tree = FieldTree::from_paths(&include);
        let exclude_tree = FieldTree::from_paths(&exclude);
        Self {
            include,
            exclude,
            include_tree,
            exclude_tree,
        }
    }

    pub fn include(&self) -> &BTreeSet<String> {
        &self.include
    }

    pub fn exclude(&self) -> &BTreeSet<String> {
        &self.exclude
    }

    /// Keep the included keys, then drop the excluded ones.
    pub fn apply(&self, record: Value) -> Value {
        let mut kept = self.include_tree.keep(record);
        self.exclude_tree.remove(&mut kept);
        kept
    }
}

/// Dotted paths grouped by their leading key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTree {
    children: BTreeMap<String, FieldSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// The key and everything below it.
    Whole,
    /// Only the listed keys below it.
    Nested(FieldTree),
}

impl FieldTree {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = FieldTree::default();
        for path in paths {
            let segments: Vec<&str> = path.as_ref().split('.').collect();
            if segments.iter().any(|s| s.is_empty()) {
                continue;
            }
            tree.insert(&segments);
        }
        tree
    }

    fn insert(&mut self, segments: &[&str]) {
        let Some((head, rest)) = segments.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.children.insert(head.to_string(), FieldSelection::Whole);
            return;
        }
        let entry = self
            .children
            .entry(head.to_string())
            .or_insert_with(|| FieldSelection::Nested(FieldTree::default()));
        if let FieldSelection::Nested(subtree) = entry {
            subtree.insert(rest);
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldSelection> {
        self.children.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn keep(&self, value: Value) -> Value {
        let Value::Object(map) = value else {
            return value;
        };
        let mut kept = Map::new();
        for (key, child) in map {
            match self.children.get(&key) {
                Some(FieldSelection::Whole) => {
                    kept.insert(key, child);
                }
                Some(FieldSelection::Nested(subtree)) if child.is_object() => {
                    kept.insert(key, subtree.keep(child));
                }
                _ => {}
            }
        }
        Value::Object(kept)
    }

    fn remove(&self, value: &mut Value) {
        let Value::Object(map) = value else {
            return;
        };
        for (key, selection) in &self.children {
            match selection {
                FieldSelection::Whole => {
                    map.remove(key);
                }
                FieldSelection::Nested(subtree) => {
                    if let Some(child) = map.get_mut(key) {
                        subtree.remove(child);
                    }
                }
            }
        }
    }
}
