//! The `key=value;key=value` style micro-format carried by `mxCell@style`.
//!
//! A segment without `=` is a flag (`group`, `ellipse`, `edgeLabel`). Flags
//! are kept apart from `key=` entries so both re-encode exactly as read.
//! Entries keep insertion order and unknown keys are never dropped.

use serde::ser::{Serialize, SerializeMap, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleMap {
    entries: Vec<(String, Option<String>)>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits on `;`, then each segment on its first `=`. Empty segments are skipped.
    pub fn parse(text: &str) -> Self {
        let mut style = StyleMap::new();
        for segment in text.split(';') {
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((key, value)) => style.insert(key, value),
                None => style.insert_flag(segment),
            }
        }
        style
    }

    /// Re-joins entries in insertion order with no trailing separator.
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            out.push_str(key);
            if let Some(value) = value {
                out.push('=');
                out.push_str(value);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value for `key`; flags read as `""`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Inserts or overwrites `key`, keeping its original position when present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.put(key.into(), Some(value.into()));
    }

    /// Inserts a bare flag segment.
    pub fn insert_flag(&mut self, key: impl Into<String>) {
        self.put(key.into(), None);
    }

    fn put(&mut self, key: String, value: Option<String>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        let (_, value) = self.entries.remove(idx);
        Some(value.unwrap_or_default())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref().unwrap_or("")))
    }

    /// Reads a `"1"`/`"0"` entry. Anything else, including a bare flag, is `None`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        }
    }

    pub fn set_flag(&mut self, key: impl Into<String>, on: bool) {
        self.insert(key, if on { "1" } else { "0" });
    }

    pub fn shape(&self) -> Option<&str> {
        self.get("shape").filter(|s| !s.is_empty())
    }

    /// The host marks group containers with a `group` entry.
    pub fn is_group(&self) -> bool {
        self.contains_key("group")
    }

    pub fn is_locked(&self) -> bool {
        self.flag("locked") == Some(true)
    }

    pub fn is_hidden(&self) -> bool {
        self.flag("hidden") == Some(true)
    }
}

impl<K, V> FromIterator<(K, V)> for StyleMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut style = StyleMap::new();
        for (k, v) in iter {
            style.insert(k, v);
        }
        style
    }
}

impl From<&str> for StyleMap {
    fn from(text: &str) -> Self {
        StyleMap::parse(text)
    }
}

impl Serialize for StyleMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
