use crate::error::{Error, Result};

/// A validated `skip`/`limit` window over a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    skip: u64,
    limit: u64,
}

impl PageRequest {
    /// Build a window from optional query parameters.
    ///
    /// A missing `limit` falls back to `default_limit`; an oversized one is clamped to
    /// `max_limit`. A zero `limit` is rejected.
    pub fn new(skip: Option<u64>, limit: Option<u64>, default_limit: u64, max_limit: u64) -> Result<Self> {
        let limit = limit.unwrap_or(default_limit);
        if limit == 0 {
            return Err(Error::BadRequest("limit must be a positive integer".to_string()));
        }
        Ok(Self {
            skip: skip.unwrap_or(0),
            limit: limit.min(max_limit.max(1)),
        })
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}
