use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::Kind;

/// Flat mapping from field name to string value.
///
/// Used for request construction, signing input and parsed responses alike.
/// Keys are case-sensitive. An empty value counts as absent wherever presence
/// matters (signing, validation).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// `true` when the field exists and its value is non-empty.
    #[must_use]
    pub fn is_present(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Returns a copy with `other` layered on top; `other` wins on conflicts.
    #[must_use]
    pub fn merged(&self, other: &FieldMap) -> FieldMap {
        let mut out = self.clone();
        out.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    /// Returns a copy holding only the keys accepted by `keep`.
    #[must_use]
    pub fn filtered<P: Fn(&str) -> bool>(&self, keep: P) -> FieldMap {
        self.0
            .iter()
            .filter(|(k, _)| keep(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for FieldMap {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for FieldMap {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'map> IntoIterator for &'map FieldMap {
    type Item = (&'map String, &'map String);
    type IntoIter = btree_map::Iter<'map, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Three-part client-facing result: `code == 0` means success.
///
/// `trusted` is `false` whenever `payload` comes from a response that failed
/// signature verification; such fields are for logging only.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub code: i32,
    pub message: Option<String>,
    pub payload: Option<FieldMap>,
    pub trusted: bool,
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

impl<T: Into<FieldMap>> From<Result<T>> for Outcome {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self {
                code: 0,
                message: None,
                payload: Some(value.into()),
                trusted: true,
            },
            Err(err) => {
                let payload = match err.kind() {
                    Kind::Verification => err.untrusted_fields().cloned(),
                    _ => None,
                };
                Self {
                    code: err.code(),
                    message: err.inner().map(ToString::to_string),
                    payload,
                    trusted: false,
                }
            }
        }
    }
}
