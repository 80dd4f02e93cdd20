//! Cache key builder
//!
//! All cache keys share one prefix so several engines can log side by side
//! and remain distinguishable.

/// Builds every key used by the cache stores.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    // ==================== Catalog ====================

    /// Current merged snapshot
    ///
    /// TTL: none (replaced or invalidated by the refresh coordinator)
    #[must_use]
    pub fn snapshot(&self) -> String {
        format!("{}:catalog:snapshot", self.prefix)
    }

    // ==================== Remote Directories ====================

    /// Stream directory as last fetched
    ///
    /// TTL: `sources.stream_directory_ttl_seconds`
    #[must_use]
    pub fn stream_directory(&self) -> String {
        format!("{}:directory:streams", self.prefix)
    }

    /// Last successfully fetched stream directory, used when a fetch fails
    ///
    /// TTL: none
    #[must_use]
    pub fn stream_directory_last_good(&self) -> String {
        format!("{}:directory:streams:last_good", self.prefix)
    }

    /// Last successfully fetched channel directory, used when a fetch fails
    ///
    /// TTL: none
    #[must_use]
    pub fn channel_directory_last_good(&self) -> String {
        format!("{}:directory:channels:last_good", self.prefix)
    }

    // ==================== Verification ====================

    /// Liveness result for one stream url
    ///
    /// TTL: `verification.ttl_seconds`
    #[must_use]
    pub fn verification(&self, url: &str) -> String {
        format!("{}:verify:{}", self.prefix, url)
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new("livetv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_share_prefix() {
        let keys = KeyBuilder::new("test");
        assert_eq!(keys.snapshot(), "test:catalog:snapshot");
        assert_eq!(keys.stream_directory(), "test:directory:streams");
        assert_eq!(
            keys.verification("http://a/b.m3u8"),
            "test:verify:http://a/b.m3u8"
        );
        assert_ne!(
            keys.stream_directory(),
            keys.stream_directory_last_good()
        );
    }
}
