//! Explicit configuration handed to store and repository constructors.
//!
//! Nothing here is read from the environment; the embedding request layer
//! builds a `CoreConfig` and passes it down.

use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_POOL_SIZE: usize = 4;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_BACKOFF_MS: u64 = 20;

/// Top-level configuration for the pet care core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreConfig {
    pub store: StoreOptions,
    pub invite_policy: InvitePolicy,
}

/// Connection and transaction settings for the SQLite document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long one connection waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Upper bound of idle connections kept for file databases.
    pub max_pool_size: usize,
    pub retry: RetryPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded retry for transactions that lose an optimistic-concurrency race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Linear backoff applied after the given (1-based) failed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Who may create a sharing invite for a pet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvitePolicy {
    /// Owner and every accepted member may invite further users.
    #[default]
    AnyMember,
    /// Only the owner may invite.
    OwnerOnly,
}
