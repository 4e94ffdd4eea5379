use std::fmt;

/// Shared-cache lifetime of a successful search response, in seconds.
pub const SEARCH_CACHE_TTL: u64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDirective {
    pub s_max_age: u64,
    pub stale_while_revalidate: u64,
}

pub fn directive_for(ttl_seconds: u64) -> CacheDirective {
    CacheDirective {
        s_max_age: ttl_seconds,
        stale_while_revalidate: ttl_seconds.saturating_mul(2),
    }
}

impl fmt::Display for CacheDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "public, s-maxage={}, stale-while-revalidate={}",
            self.s_max_age, self.stale_while_revalidate
        )
    }
}
