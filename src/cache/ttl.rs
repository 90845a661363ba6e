//! TTL tiers, in seconds, ordered by how volatile the cached data is.

/// TTL constants for each kind of cached data.
pub struct CacheTtl;

impl CacheTtl {
    /// Filter option counts change only when the directory is reloaded.
    pub const FILTER_OPTIONS: u64 = 3600;
    /// Single advocate profile.
    pub const ADVOCATE_DETAIL: u64 = 1800;
    /// Total result counts for a filter set.
    pub const COUNT: u64 = 600;
    /// Paginated listing pages.
    pub const PAGINATED: u64 = 300;
    /// Free-text search results.
    pub const SEARCH_RESULTS: u64 = 120;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_ordering() {
        assert!(CacheTtl::FILTER_OPTIONS >= CacheTtl::SEARCH_RESULTS);
        assert!(CacheTtl::ADVOCATE_DETAIL >= CacheTtl::SEARCH_RESULTS);
        assert!(CacheTtl::FILTER_OPTIONS >= CacheTtl::COUNT);
        assert!(CacheTtl::COUNT >= CacheTtl::PAGINATED);
    }
}
