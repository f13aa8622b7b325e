//! Captured path parameters.

use std::collections::BTreeMap;

/// Name to value mapping of path captures.
///
/// Named captures use their name as key. Unnamed captures (`*`, bare
/// groups, raw regular expressions) are positional and keyed `"0"`, `"1"`, ...
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, String>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a capture by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Look up a positional capture.
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.get(&index.to_string())
    }

    /// Insert or overwrite a capture, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    /// Remove a capture.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    /// Returns `true` if a capture with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of consecutive positional captures starting at index 0.
    pub fn positional_len(&self) -> usize {
        (0..).take_while(|i| self.values.contains_key(&i.to_string())).count()
    }

    /// Number of captures.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no captures.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy every entry of `other` into `self`, overwriting on conflict.
    pub fn extend_from(&mut self, other: Params) {
        self.values.extend(other.values);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_len_stops_at_gap() {
        let params: Params = [("0", "a"), ("1", "b"), ("3", "d"), ("id", "7")]
            .into_iter()
            .collect();
        assert_eq!(params.positional_len(), 2);
        assert_eq!(params.positional(1), Some("b"));
        assert_eq!(params.get("id"), Some("7"));
    }

    #[test]
    fn test_positional_len_without_index_zero() {
        let params: Params = [("1", "b")].into_iter().collect();
        assert_eq!(params.positional_len(), 0);
    }
}
