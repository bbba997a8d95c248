use serde::Serialize;
use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::constants::{KEY_COMMENT, KEY_CREATED, KEY_DTYPES, KEY_REFS, KEY_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Scalar(String),
    List(Vec<String>),
}

impl MetaValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        MetaValue::Scalar(value.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetaValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            MetaValue::Scalar(value) => Some(value),
            MetaValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            MetaValue::Scalar(_) => None,
            MetaValue::List(items) => Some(items),
        }
    }

    /// List items, or the scalar as a one-item slice.
    pub fn items(&self) -> &[String] {
        match self {
            MetaValue::Scalar(value) => std::slice::from_ref(value),
            MetaValue::List(items) => items,
        }
    }
}

/// Block metadata in parse order. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(SmolStr, MetaValue)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Inserts or replaces a value. A replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<SmolStr>, value: MetaValue) -> Option<MetaValue> {
        let key = key.into();
        if let Some((_, slot)) = self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Appends a new key; returns `false` without touching the map when the key exists.
    pub fn try_insert(&mut self, key: impl Into<SmolStr>, value: MetaValue) -> bool {
        let key = key.into();
        if self.contains_key(&key) {
            return false;
        }
        self.entries.push((key, value));
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
        let idx = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetaValue::as_scalar)
    }

    /// Columns named by `refs`. A scalar is taken as a single column.
    pub fn refs(&self) -> Option<&[String]> {
        self.get(KEY_REFS).map(MetaValue::items)
    }

    /// `dtypes` entries split on the first `:` into `(column, type)`.
    /// Items without a `:` are skipped.
    pub fn dtypes(&self) -> Vec<(&str, &str)> {
        let Some(value) = self.get(KEY_DTYPES) else {
            return Vec::new();
        };
        value
            .items()
            .iter()
            .filter_map(|item| item.split_once(':'))
            .map(|(column, ty)| (column.trim(), ty.trim()))
            .collect()
    }

    pub fn comment(&self) -> Option<&str> {
        self.scalar(KEY_COMMENT)
    }

    pub fn created(&self) -> Option<&str> {
        self.scalar(KEY_CREATED)
    }

    pub fn version(&self) -> Option<&str> {
        self.scalar(KEY_VERSION)
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            let value = match value {
                MetaValue::Scalar(value) => Value::String(value.clone()),
                MetaValue::List(items) => {
                    Value::Array(items.iter().cloned().map(Value::String).collect())
                }
            };
            map.insert(key.to_string(), value);
        }
        Value::Object(map)
    }
}

impl<K: Into<SmolStr>> FromIterator<(K, MetaValue)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, MetaValue)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_insert_keeps_order_and_position() {
        let mut metadata = Metadata::new();
        metadata.insert("version", MetaValue::scalar("1"));
        metadata.insert("comment", MetaValue::scalar("a"));
        let previous = metadata.insert("version", MetaValue::scalar("2"));
        assert_eq!(previous, Some(MetaValue::scalar("1")));
        assert_eq!(metadata.keys().collect::<Vec<_>>(), vec!["version", "comment"]);
        assert_eq!(metadata.version(), Some("2"));
    }

    #[rstest::rstest]
    fn test_try_insert_rejects_duplicates() {
        let mut metadata = Metadata::new();
        assert!(metadata.try_insert("a", MetaValue::scalar("1")));
        assert!(!metadata.try_insert("a", MetaValue::scalar("2")));
        assert_eq!(metadata.scalar("a"), Some("1"));
    }

    #[rstest::rstest]
    fn test_dtypes_pairs() {
        let metadata: Metadata = [(
            "dtypes",
            MetaValue::list(["id:int", "name: str", "broken"]),
        )]
        .into_iter()
        .collect();
        assert_eq!(metadata.dtypes(), vec![("id", "int"), ("name", "str")]);
    }

    #[rstest::rstest]
    fn test_refs_accepts_scalar() {
        let list: Metadata = [("refs", MetaValue::list(["a", "b"]))].into_iter().collect();
        let scalar: Metadata = [("refs", MetaValue::scalar("a"))].into_iter().collect();
        assert_eq!(list.refs(), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(scalar.refs(), Some(&["a".to_string()][..]));
        assert_eq!(Metadata::new().refs(), None);
    }

    #[rstest::rstest]
    fn test_to_json_preserves_order() {
        let metadata: Metadata = [
            ("z", MetaValue::scalar("1")),
            ("a", MetaValue::list(["x", "y"])),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            serde_json::to_string(&metadata.to_json()).unwrap(),
            r#"{"z":"1","a":["x","y"]}"#
        );
        assert_eq!(
            serde_json::to_value(MetaValue::list(["x"])).unwrap(),
            serde_json::json!(["x"])
        );
    }
}
