//! Request DTOs for the ops API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::{CacheCategory, KeyBuilder};
use crate::error::{CacheError, Result};

/// Request body for `POST /cache/invalidate`.
///
/// Exactly one of `pattern` (a Redis glob inside the namespace) or `category`
/// (every current-version key of that category) must be given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl InvalidateRequest {
    /// Resolves the request to the glob to invalidate.
    pub fn resolve(&self, keys: &KeyBuilder) -> Result<String> {
        match (&self.pattern, &self.category) {
            (Some(pattern), None) => {
                if !keys.owns_pattern(pattern) {
                    return Err(CacheError::InvalidRequest(format!(
                        "Pattern must start with '{}:'",
                        keys.namespace()
                    )));
                }
                Ok(pattern.clone())
            }
            (None, Some(category)) => {
                let category: CacheCategory = category.parse()?;
                Ok(if category == CacheCategory::FilterOptions {
                    keys.literal(category)
                } else {
                    keys.category_pattern(category)
                })
            }
            _ => Err(CacheError::InvalidRequest(
                "Provide exactly one of 'pattern' or 'category'".to_string(),
            )),
        }
    }
}
