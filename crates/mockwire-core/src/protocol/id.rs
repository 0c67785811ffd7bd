//! Request id generation.
//!
//! Each caller owns one generator. Ids start at 1 (pre-increment from 0) and
//! wrap back to 1 once the ceiling is reached, so 0 is never issued.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use super::envelope::RequestId;

#[derive(Debug)]
pub struct IdGenerator {
    last: AtomicU64,
    ceiling: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::with_ceiling(u64::MAX)
    }

    /// Generator that wraps after issuing `ceiling`.
    pub fn with_ceiling(ceiling: u64) -> Self {
        Self {
            last: AtomicU64::new(0),
            ceiling: ceiling.max(1),
        }
    }

    pub fn next_id(&self) -> RequestId {
        let ceiling = self.ceiling;
        let step = |cur: u64| if cur >= ceiling { 1 } else { cur + 1 };
        let prev = match self
            .last
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| Some(step(cur)))
        {
            Ok(p) | Err(p) => p,
        };
        RequestId::from_nonzero(NonZeroU64::new(step(prev)).unwrap_or(NonZeroU64::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_one_and_increments() {
        let g = IdGenerator::new();
        assert_eq!(g.next_id().get(), 1);
        assert_eq!(g.next_id().get(), 2);
        assert_eq!(g.next_id().get(), 3);
    }

    #[test]
    fn wraps_to_one_never_zero() {
        let g = IdGenerator::with_ceiling(3);
        let ids: Vec<u64> = (0..7).map(|_| g.next_id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn independent_generators_do_not_interfere() {
        let a = IdGenerator::new();
        let b = IdGenerator::new();
        a.next_id();
        a.next_id();
        assert_eq!(b.next_id().get(), 1);
    }
}
