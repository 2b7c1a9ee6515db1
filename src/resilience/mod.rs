//! Resilience
//!
//! Retry patterns for the bootstrap sequence.
//!
//! - **Backoff**: doubling delay schedule
//! - **Retry**: bounded, cancellable retry loop driven by `VaultDbError::is_retryable`

pub mod backoff;
pub mod retry;

pub use backoff::{BackoffPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
pub use retry::RetryExecutor;
