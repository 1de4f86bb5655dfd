//! Per-factory sequence numbering.
//!
//! Every factory owns one [`SequenceCounter`]. A build captures the current
//! number and advances the counter in a single atomic step, so builds started
//! from inside a derivation (or from another task) never observe a number
//! that an enclosing build already holds.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// The number handed to generators and derivations for one build.
pub type SequenceNumber = u64;

/// Shared, monotonically advancing counter.
///
/// Clones share the same underlying cell; a factory and its clones therefore
/// draw from one sequence.
#[derive(Clone, Debug, Default)]
pub struct SequenceCounter {
    next: Arc<AtomicU64>,
}

impl SequenceCounter {
    /// Create a counter whose first captured number is `start`.
    #[must_use]
    pub fn starting_at(start: SequenceNumber) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Capture the current number and advance the counter.
    #[must_use]
    pub fn capture(&self) -> SequenceNumber {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Number the next capture will return.
    #[must_use]
    pub fn peek(&self) -> SequenceNumber {
        self.next.load(Ordering::SeqCst)
    }

    /// Rewind (or fast-forward) the counter to `value`.
    pub fn reset(&self, value: SequenceNumber) {
        self.next.store(value, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::SequenceCounter;

    #[test]
    fn capture_advances() {
        let counter = SequenceCounter::starting_at(3);
        assert_eq!(counter.capture(), 3);
        assert_eq!(counter.capture(), 4);
        assert_eq!(counter.peek(), 5);
    }

    #[test]
    fn clones_share_the_sequence() {
        let counter = SequenceCounter::default();
        let clone = counter.clone();
        assert_eq!(counter.capture(), 0);
        assert_eq!(clone.capture(), 1);
        clone.reset(10);
        assert_eq!(counter.capture(), 10);
    }
}
