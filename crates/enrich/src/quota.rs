use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared budget of external service calls.
///
/// Once exhausted every further `try_acquire` fails, so the remaining units go to
/// the local heuristic deterministically.
#[derive(Debug)]
pub struct QuotaLimiter {
    limit: Option<usize>,
    used: AtomicUsize,
}

impl QuotaLimiter {
    /// Limiter allowing at most `limit` calls
    pub fn new(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            used: AtomicUsize::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            limit: None,
            used: AtomicUsize::new(0),
        }
    }

    /// Take one call from the budget
    pub fn try_acquire(&self) -> bool {
        match self.limit {
            None => {
                self.used.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some(limit) => self
                .used
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                    (used < limit).then_some(used + 1)
                })
                .is_ok(),
        }
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// `None` when unlimited
    pub fn remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.used()))
    }

    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }
}
