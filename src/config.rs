//! Named-lookup configuration sources.
//!
//! Lookups never fail: absent or malformed values resolve to the default the
//! caller passes in.

use std::collections::{BTreeSet, HashMap};

/// A source of string-valued settings addressed by key.
pub trait ConfigSource {
    /// Returns the raw value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Parses `key` as a signed integer, or returns `default`.
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Parses `key` as a finite real number, or returns `default`.
    fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.get(key)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(default)
    }

    /// Parses `key` as a comma or whitespace separated list of status codes.
    ///
    /// Entries that are not valid `u16` values are skipped. An absent key
    /// yields `default`; a present key with no valid entries yields an empty
    /// set, which policy normalization replaces with the default set.
    fn get_status_set(&self, key: &str, default: &BTreeSet<u16>) -> BTreeSet<u16> {
        match self.get(key) {
            Some(raw) => raw
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter_map(|entry| entry.trim().parse().ok())
                .collect(),
            None => default.clone(),
        }
    }
}

/// Reads settings from process environment variables.
///
/// An optional prefix is prepended to every key, so `EnvSource::with_prefix("MYAPP_")`
/// resolves `MAX_ATTEMPTS` from `MYAPP_MAX_ATTEMPTS`.
#[derive(Clone, Debug, Default)]
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.key(key))
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use super::{ConfigSource, EnvSource};

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn integer_lookup_trims_and_falls_back() {
        let source = map(&[("A", " 42 "), ("B", "4.2")]);
        assert_eq!(source.get_i64("A", 0), 42);
        assert_eq!(source.get_i64("B", 7), 7);
        assert_eq!(source.get_i64("MISSING", 9), 9);
    }

    #[test]
    fn real_lookup_rejects_non_finite_values() {
        let source = map(&[("A", "0.75"), ("B", "inf"), ("C", "NaN")]);
        assert_eq!(source.get_f64("A", 1.0), 0.75);
        assert_eq!(source.get_f64("B", 1.0), 1.0);
        assert_eq!(source.get_f64("C", 1.0), 1.0);
    }

    #[test]
    fn status_set_accepts_mixed_separators_and_skips_garbage() {
        let source = map(&[("S", "429,503 504, teapot,70000")]);
        let set = source.get_status_set("S", &BTreeSet::new());
        assert_eq!(set, BTreeSet::from([429, 503, 504]));
    }

    #[test]
    fn absent_status_set_uses_default() {
        let default = BTreeSet::from([500]);
        assert_eq!(map(&[]).get_status_set("S", &default), default);
    }

    #[test]
    fn env_source_applies_prefix() {
        let source = EnvSource::with_prefix("RESILIENT_HTTP_TEST_");
        assert_eq!(source.key("MAX_ATTEMPTS"), "RESILIENT_HTTP_TEST_MAX_ATTEMPTS");
        assert_eq!(source.get("DEFINITELY_UNSET_KEY"), None);
    }
}
