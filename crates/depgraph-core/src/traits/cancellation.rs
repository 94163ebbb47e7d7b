//! Cooperative cancellation token and caller-supplied deadlines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Used by long-running operations (ingestion, traversal, reports) to check
/// whether the caller has requested cancellation.
pub trait Cancellable {
    fn is_cancelled(&self) -> bool;

    fn cancel(&self);
}

#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token (not cancelled).
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Clear a previous cancellation so the token can be reused.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellable for CancellationToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// A point in time after which a traversal stops and reports `partial: true`.
///
/// `Deadline::none()` never expires. A deadline may carry a cancellation
/// token, in which case cancelling the token expires it immediately.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    at: Option<Instant>,
    token: Option<CancellationToken>,
}

impl Deadline {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn at(instant: Instant) -> Self {
        Self {
            at: Some(instant),
            token: None,
        }
    }

    pub fn after(budget: Duration) -> Self {
        Self::at(Instant::now() + budget)
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn expired(&self) -> bool {
        if self.token.as_ref().is_some_and(|t| t.is_cancelled()) {
            return true;
        }
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Remaining time, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_expires() {
        assert!(!Deadline::none().expired());
        assert!(Deadline::none().remaining().is_none());
    }

    #[test]
    fn past_deadline_is_expired() {
        let d = Deadline::at(Instant::now() - Duration::from_millis(1));
        assert!(d.expired());
    }

    #[test]
    fn token_expires_deadline() {
        let token = CancellationToken::new();
        let d = Deadline::none().with_token(token.clone());
        assert!(!d.expired());
        token.cancel();
        assert!(d.expired());
    }

    #[test]
    fn reset_clears_cancellation_for_every_clone() {
        let token = CancellationToken::new();
        let shared = token.clone();
        token.cancel();
        assert!(shared.is_cancelled());
        shared.reset();
        assert!(!token.is_cancelled());
    }
}
