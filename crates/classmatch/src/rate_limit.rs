//! Fixed-window rate limiting backed by the `rate_limits` table.
//!
//! The counter is read and then written without a transaction, so concurrent
//! requests from the same client can under-count.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::db::MatcherDb;
use crate::error::ServiceError;

/// A rate-limit key derived from a scope and a client identity.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// The client identity is hashed so raw addresses never reach the database.
    pub fn new(scope: &str, client: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(client.as_bytes());
        let result = hasher.finalize();
        let hash: String = result[..16].iter().map(|b| format!("{:02x}", b)).collect();
        Self(format!("{scope}:{hash}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Window size and request budget for one scope.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub limit: i64,
}

/// Counts one request for `client` in `scope`, failing with
/// [`ServiceError::RateLimited`] once the window's budget is spent.
pub fn enforce_rate_limit(
    db: &MatcherDb,
    scope: &str,
    client: &str,
    policy: RateLimitPolicy,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let key = RateLimitKey::new(scope, client);
    let window_start = now - policy.window;

    let Some(existing) = db.rate_limit(key.as_str())? else {
        db.start_rate_limit_window(key.as_str(), now)?;
        return Ok(());
    };

    if existing.window_start < window_start {
        debug!("Rate limit window for {} expired, starting a new one", scope);
        db.start_rate_limit_window(key.as_str(), now)?;
        return Ok(());
    }

    if existing.count >= policy.limit {
        warn!("Rate limit exceeded for scope {}", scope);
        return Err(ServiceError::RateLimited);
    }

    db.set_rate_limit_count(key.as_str(), existing.count + 1)?;
    Ok(())
}
