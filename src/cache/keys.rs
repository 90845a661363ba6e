//! Cache key derivation.
//!
//! Keys look like `{namespace}:{version}:{category}:{discriminator}`. The
//! discriminator is either a literal id or a truncated SHA-256 digest of the
//! canonical JSON of a parameter object, so parameter sets that are deep-equal
//! always map to the same key whatever order their fields were inserted in.
//!
//! Truncated digests can collide. Nothing detects that; widen the digest with
//! [`KeyBuilder::with_digest_len`] if the keyspace grows large enough to care.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

const MIN_DIGEST_LEN: usize = 8;
const MAX_DIGEST_LEN: usize = 64;

// == Cache Category ==
/// Kind of data a key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    /// Aggregate filter option counts (literal key)
    FilterOptions,
    /// Single advocate, keyed by id
    AdvocateDetail,
    /// Paginated listing, keyed by parameter digest
    Paginated,
    /// Search results, keyed by parameter digest
    Search,
    /// Total counts, keyed by parameter digest
    Count,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 5] = [
        CacheCategory::FilterOptions,
        CacheCategory::AdvocateDetail,
        CacheCategory::Paginated,
        CacheCategory::Search,
        CacheCategory::Count,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::FilterOptions => "filter-options",
            CacheCategory::AdvocateDetail => "advocate",
            CacheCategory::Paginated => "paginated",
            CacheCategory::Search => "search",
            CacheCategory::Count => "count",
        }
    }

    /// Long-lived aggregate categories that pressure eviction must not touch.
    pub fn is_protected(&self) -> bool {
        matches!(self, CacheCategory::FilterOptions | CacheCategory::Count)
    }

    /// TTL tier for this category.
    pub fn default_ttl(&self) -> u64 {
        use super::CacheTtl;

        match self {
            CacheCategory::FilterOptions => CacheTtl::FILTER_OPTIONS,
            CacheCategory::AdvocateDetail => CacheTtl::ADVOCATE_DETAIL,
            CacheCategory::Paginated => CacheTtl::PAGINATED,
            CacheCategory::Search => CacheTtl::SEARCH_RESULTS,
            CacheCategory::Count => CacheTtl::COUNT,
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheCategory {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        CacheCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CacheError::InvalidRequest(format!("Unknown cache category: {}", s)))
    }
}

// == Key Builder ==
/// Builds namespaced, versioned cache keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    namespace: String,
    version: String,
    digest_len: usize,
}

impl KeyBuilder {
    pub fn new(namespace: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            version: version.into(),
            digest_len: MIN_DIGEST_LEN,
        }
    }

    /// Sets how many hex characters of the digest are kept (8..=64).
    pub fn with_digest_len(mut self, len: usize) -> Self {
        self.digest_len = len.clamp(MIN_DIGEST_LEN, MAX_DIGEST_LEN);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `{namespace}:{version}:{category}`
    pub fn literal(&self, category: CacheCategory) -> String {
        format!("{}{}", self.version_prefix(), category)
    }

    /// `{namespace}:{version}:{category}:{id}`
    pub fn for_id(&self, category: CacheCategory, id: impl fmt::Display) -> String {
        format!("{}{}:{}", self.version_prefix(), category, id)
    }

    /// `{namespace}:{version}:{category}:{digest}` for any serializable parameter set.
    pub fn build_key<P: Serialize + ?Sized>(
        &self,
        category: CacheCategory,
        params: &P,
    ) -> Result<String> {
        let value = serde_json::to_value(params)?;
        Ok(self.for_id(category, self.hash_params(&value)))
    }

    /// Truncated hex SHA-256 of the canonical JSON of `params`.
    pub fn hash_params(&self, params: &Value) -> String {
        let digest = Sha256::digest(canonical_json(params).as_bytes());
        let mut encoded = hex::encode(digest);
        encoded.truncate(self.digest_len);
        encoded
    }

    /// Every key of one category in the current version.
    pub fn category_pattern(&self, category: CacheCategory) -> String {
        format!("{}{}:*", self.version_prefix(), category)
    }

    /// Every key in the current version.
    pub fn version_pattern(&self) -> String {
        format!("{}*", self.version_prefix())
    }

    /// Every key in the namespace, orphaned versions included.
    pub fn namespace_pattern(&self) -> String {
        format!("{}:*", self.namespace)
    }

    /// True for namespace keys of a protected category, whatever their version.
    pub fn is_protected(&self, key: &str) -> bool {
        key.strip_prefix(self.namespace.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|rest| rest.split(':').nth(1))
            .and_then(|segment| segment.parse::<CacheCategory>().ok())
            .is_some_and(|category| category.is_protected())
    }

    /// True when `pattern` cannot reach outside this namespace.
    pub fn owns_pattern(&self, pattern: &str) -> bool {
        pattern.starts_with(&format!("{}:", self.namespace))
    }

    fn version_prefix(&self) -> String {
        format!("{}:{}:", self.namespace, self.version)
    }
}

/// Serializes `value` with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder() -> KeyBuilder {
        KeyBuilder::new("ns", "v1")
    }

    #[test]
    fn test_literal_key() {
        assert_eq!(builder().literal(CacheCategory::FilterOptions), "ns:v1:filter-options");
    }

    #[test]
    fn test_id_key() {
        assert_eq!(builder().for_id(CacheCategory::AdvocateDetail, 42), "ns:v1:advocate:42");
    }

    #[test]
    fn test_paginated_key_ignores_field_order() {
        let a = builder()
            .build_key(CacheCategory::Paginated, &json!({"page": 1, "pageSize": 25}))
            .unwrap();
        let b = builder()
            .build_key(CacheCategory::Paginated, &json!({"pageSize": 25, "page": 1}))
            .unwrap();

        assert_eq!(a, b);
        assert!(a.starts_with("ns:v1:paginated:"));
        assert_eq!(a.rsplit(':').next().unwrap().len(), 8);
    }

    #[test]
    fn test_struct_params() {
        #[derive(Serialize)]
        struct Query {
            page: u32,
            search: Option<String>,
        }

        let key = builder()
            .build_key(CacheCategory::Search, &Query { page: 2, search: Some("cardio".into()) })
            .unwrap();
        let same = builder()
            .build_key(CacheCategory::Search, &json!({"search": "cardio", "page": 2}))
            .unwrap();
        assert_eq!(key, same);
    }

    #[test]
    fn test_different_params_different_keys() {
        let a = builder().build_key(CacheCategory::Paginated, &json!({"page": 1})).unwrap();
        let b = builder().build_key(CacheCategory::Paginated, &json!({"page": 2})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_category_is_part_of_key() {
        let params = json!({"page": 1});
        let a = builder().build_key(CacheCategory::Paginated, &params).unwrap();
        let b = builder().build_key(CacheCategory::Count, &params).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_canonical_json_sorts_nested_objects() {
        let value = json!({"b": {"y": 1, "x": [ {"d": 1, "c": 2} ]}, "a": "s"});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":"s","b":{"x":[{"c":2,"d":1}],"y":1}}"#
        );
    }

    #[test]
    fn test_digest_len_clamped() {
        let wide = builder().with_digest_len(16);
        assert_eq!(wide.hash_params(&json!({})).len(), 16);

        let narrow = builder().with_digest_len(2);
        assert_eq!(narrow.hash_params(&json!({})).len(), 8);

        let huge = builder().with_digest_len(500);
        assert_eq!(huge.hash_params(&json!({})).len(), 64);
    }

    #[test]
    fn test_version_bump_changes_key() {
        let params = json!({"page": 1});
        let v1 = KeyBuilder::new("ns", "v1").build_key(CacheCategory::Paginated, &params).unwrap();
        let v2 = KeyBuilder::new("ns", "v2").build_key(CacheCategory::Paginated, &params).unwrap();
        assert_ne!(v1, v2);
        assert_eq!(v1.rsplit(':').next(), v2.rsplit(':').next());
    }

    #[test]
    fn test_patterns() {
        let keys = builder();
        assert_eq!(keys.category_pattern(CacheCategory::Paginated), "ns:v1:paginated:*");
        assert_eq!(keys.version_pattern(), "ns:v1:*");
        assert_eq!(keys.namespace_pattern(), "ns:*");
        assert!(keys.owns_pattern("ns:v1:search:*"));
        assert!(!keys.owns_pattern("*"));
        assert!(!keys.owns_pattern("nsx:*"));
    }

    #[test]
    fn test_is_protected() {
        let keys = builder();
        assert!(keys.is_protected("ns:v1:filter-options"));
        assert!(keys.is_protected("ns:v1:count:abcd1234"));
        assert!(!keys.is_protected("ns:v1:paginated:abcd1234"));
        assert!(!keys.is_protected("ns:v1:advocate:7"));
        // older versions keep their protection
        assert!(keys.is_protected("ns:v0:filter-options"));
        assert!(keys.is_protected("ns:v0:count:abcd1234"));
        assert!(!keys.is_protected("ns:v0:search:abcd1234"));
        assert!(!keys.is_protected("other:v1:filter-options"));
        assert!(!keys.is_protected("nsx:v1:filter-options"));
    }

    #[test]
    fn test_category_parse() {
        for category in CacheCategory::ALL {
            assert_eq!(category.as_str().parse::<CacheCategory>().unwrap(), category);
        }
        assert!("nope".parse::<CacheCategory>().is_err());
    }
}
