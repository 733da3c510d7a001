use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

/// Flat string settings, keyed by name and kept sorted by key.
///
/// Later inserts overwrite earlier ones. Rendering produces one `key=value`
/// line per entry in key order, so the output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    entries: BTreeMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value for `key`, or `default` if it is missing or empty.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.get(key) {
            Some(value) if !value.is_empty() => value,
            _ => default,
        }
    }

    /// Returns the entries whose keys start with `prefix`, with the prefix removed.
    pub fn prefix_view(&self, prefix: &str) -> Settings {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key[prefix.len()..].to_string(), value.clone()))
            .collect()
    }

    /// Copies every entry of `other` into `self`, overwriting existing keys.
    pub fn merge(&mut self, other: &Settings) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        settings.extend(iter);
        settings
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Settings {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Settings {
        [
            ("test.nestedId", "12345"),
            ("test.deeper.flag", "true"),
            ("test-dash", "outside"),
            ("testing", "no"),
            ("super_attribute", "x"),
            ("empty", ""),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_get_or_treats_empty_as_missing() {
        let settings = sample();
        assert_eq!(settings.get("empty"), Some(""));
        assert_eq!(settings.get_or("empty", "fallback"), "fallback");
        assert_eq!(settings.get_or("absent", "fallback"), "fallback");
        assert_eq!(settings.get_or("testing", "fallback"), "no");
    }

    #[test]
    fn test_prefix_view_strips_prefix() {
        let view = sample().prefix_view("test.");
        assert_eq!(view.len(), 2);
        assert_eq!(view.get("nestedId"), Some("12345"));
        assert_eq!(view.get("deeper.flag"), Some("true"));
        assert_eq!(view.get("testing"), None);

        let deeper = view.prefix_view("deeper.");
        assert_eq!(deeper.get("flag"), Some("true"));
    }

    #[test]
    fn test_prefix_view_edges() {
        let settings = sample();
        assert_eq!(settings.prefix_view(""), settings);
        assert!(settings.prefix_view("zzz.").is_empty());
        assert_eq!(settings.prefix_view("test-").get("dash"), Some("outside"));
    }

    #[test]
    fn test_later_entries_win() {
        let mut settings = sample();
        let overlay: Settings = [("testing", "yes")].into_iter().collect();
        settings.merge(&overlay);
        assert_eq!(settings.get("testing"), Some("yes"));
    }

    #[test]
    fn test_display_sorted_lines() {
        let settings: Settings = [("b", "2"), ("a", "1=one")].into_iter().collect();
        assert_eq!(settings.to_string(), "a=1=one\nb=2");
    }

    #[test]
    fn test_serde_as_flat_map() {
        let settings: Settings = [("port", "8080")].into_iter().collect();
        let text = toml::to_string(&settings).unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }
}
