// assay-core/src/domain/identity/id_dict.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::json::canonicalize;

/// Anything that can produce a content fingerprint.
///
/// `None` means the value carries no identifying content at all.
pub trait Fingerprint {
    fn fingerprint(&self) -> Option<String>;
}

/// Lowercase hex MD5 of the canonical (sorted-key, compact) JSON text of `value`.
pub fn digest(value: &Value) -> String {
    let canonical = canonicalize(value);
    // Serializing a `Value` cannot fail: keys are strings and numbers are finite.
    let text = serde_json::to_string(&canonical).unwrap_or_default();
    format!("{:x}", md5::compute(text.as_bytes()))
}

/// Digest of a JSON object, the identity scheme shared by definitions and requests.
pub fn digest_map(map: &Map<String, Value>) -> String {
    digest(&Value::Object(map.clone()))
}

/// Order-insensitive identifier mapping.
///
/// Equality ignores insertion order; display keeps it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdDict(Map<String, Value>);

impl IdDict {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Fingerprint of the whole mapping.
    ///
    /// * no keys: `None`
    /// * one key: `"key=value"`
    /// * otherwise: digest of the canonical JSON text
    pub fn to_id(&self) -> Option<String> {
        self.to_id_excluding(&[])
    }

    /// Fingerprint computed over every key except `ignore_keys`.
    pub fn to_id_excluding(&self, ignore_keys: &[&str]) -> Option<String> {
        let subset: Map<String, Value> = self
            .0
            .iter()
            .filter(|(k, _)| !ignore_keys.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        match subset.len() {
            0 => None,
            1 => subset
                .iter()
                .next()
                .map(|(key, value)| format!("{}={}", key, render_scalar(value))),
            _ => Some(digest_map(&subset)),
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Fingerprint for IdDict {
    fn fingerprint(&self) -> Option<String> {
        self.to_id()
    }
}

impl From<Map<String, Value>> for IdDict {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<IdDict> for Value {
    fn from(dict: IdDict) -> Self {
        Value::Object(dict.0)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for IdDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for IdDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}
