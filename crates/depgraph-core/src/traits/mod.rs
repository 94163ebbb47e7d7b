//! Contracts shared across crates.

pub mod cache_store;
pub mod cancellation;
pub mod graph_backend;
pub mod retry;

pub use cache_store::{CacheKey, ParseCacheStore};
pub use cancellation::{Cancellable, CancellationToken, Deadline};
pub use graph_backend::GraphBackend;
pub use retry::{with_backoff, BackoffPolicy};
