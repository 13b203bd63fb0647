//! Memoize-with-expiration combinator.
//!
//! [`Memoized`] wraps a zero-argument function and serves its last result
//! until the result is `ttl` old. Expiry is checked lazily on access.
//!
//! The slot mutex is held while the function runs, so concurrent callers
//! that find the slot empty or expired queue behind the one doing the work
//! and then read its result instead of computing their own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};

struct Snapshot<T> {
    value: T,
    computed_at: Instant,
}

pub struct Memoized<T, F> {
    compute: F,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<Snapshot<T>>>,
}

impl<T, F> Memoized<T, F>
where
    T: Clone,
    F: Fn() -> T,
{
    pub fn new(compute: F, ttl: Duration) -> Self {
        Self::with_clock(compute, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(compute: F, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            compute,
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value, recomputing it first if it is missing or
    /// at least `ttl` old.
    pub fn get(&self) -> T {
        let mut slot = self.lock_slot();
        let now = self.clock.now();

        if let Some(snapshot) = slot.as_ref()
            && now.saturating_duration_since(snapshot.computed_at) < self.ttl
        {
            return snapshot.value.clone();
        }

        // Expiry counts from when the refresh started, not when it finished.
        let value = (self.compute)();
        *slot = Some(Snapshot {
            value: value.clone(),
            computed_at: now,
        });
        value
    }

    /// Drop the cached value so the next [`get`](Self::get) recomputes.
    pub fn invalidate(&self) {
        self.lock_slot().take();
    }

    /// Age of the cached value, or `None` if nothing has been computed yet.
    pub fn age(&self) -> Option<Duration> {
        let slot = self.lock_slot();
        let now = self.clock.now();
        slot.as_ref()
            .map(|s| now.saturating_duration_since(s.computed_at))
    }

    // A panic inside `compute` poisons the mutex before the slot is
    // written, so the old snapshot (or none) is still consistent.
    fn lock_slot(&self) -> MutexGuard<'_, Option<Snapshot<T>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
