//! Cooperative cancellation for timer-driven work
//!
//! - `CancellationToken` (from `tokio_util`): one-shot signal owned by a
//!   single replay run; the driver selects on `cancelled()` at every delay.
//! - `Generation`: monotonically increasing request counter. Each debounced
//!   recompute captures a ticket; only the ticket matching the latest
//!   generation may apply its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use tokio_util::sync::CancellationToken;

/// Ticket handed out by `Generation::advance`.
pub type Ticket = u64;

/// Request-generation counter for superseding in-flight work.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, invalidating every earlier ticket.
    pub fn advance(&self) -> Ticket {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> Ticket {
        self.current.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current() == ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_generation_supersedes_older_tickets() {
        let generation = Generation::new();
        let first = generation.advance();
        assert!(generation.is_current(first));

        let second = generation.advance();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn cloned_generation_shares_counter() {
        let generation = Generation::new();
        let clone = generation.clone();
        let ticket = generation.advance();
        assert!(clone.is_current(ticket));
        clone.advance();
        assert!(!generation.is_current(ticket));
    }

    #[test]
    fn fresh_generation_has_no_current_ticket() {
        let generation = Generation::new();
        assert_eq!(generation.current(), 0);
        assert!(!generation.is_current(1));
    }
}
