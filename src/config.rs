//! Construction-time options for [`HeaderIndex`](crate::HeaderIndex).

/// Resident-record ceiling used when nothing else is configured (one retarget period).
pub const DEFAULT_HEADERS_LIMIT: usize = 2016;

/// Index configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderIndexConfig {
    /// Maximum number of resident records. `0` disables eviction.
    pub headers_limit: usize,
}

impl Default for HeaderIndexConfig {
    fn default() -> Self {
        Self {
            headers_limit: DEFAULT_HEADERS_LIMIT,
        }
    }
}

impl HeaderIndexConfig {
    /// A configuration that never evicts.
    pub const fn unbounded() -> Self {
        Self { headers_limit: 0 }
    }

    /// Override the resident-record ceiling. Values below 1 disable eviction.
    pub const fn with_headers_limit(mut self, limit: usize) -> Self {
        self.headers_limit = limit;
        self
    }

    /// The effective ceiling, `None` when eviction is disabled.
    pub const fn limit(&self) -> Option<usize> {
        if self.headers_limit < 1 {
            None
        } else {
            Some(self.headers_limit)
        }
    }
}
