//! Trailing debounce over an injectable clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of "now" for time-based state machines.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    elapsed_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }
}

/// Whether a value last changed at `changed_at` has been stable for `window` by `now`.
pub fn debounce_elapsed(changed_at: Instant, window: Duration, now: Instant) -> bool {
    now.saturating_duration_since(changed_at) >= window
}

/// Emits only the last value pushed within a quiet period of `window`.
#[derive(Debug)]
pub struct Debouncer<T, C = SystemClock> {
    window: Duration,
    clock: C,
    pending: Option<(T, Instant)>,
    last_emitted: Option<T>,
}

impl<T: Clone + PartialEq, C: Clock> Debouncer<T, C> {
    pub fn new(window: Duration, clock: C) -> Self {
        Self {
            window,
            clock,
            pending: None,
            last_emitted: None,
        }
    }

    /// Record a new value and restart the quiet period.
    /// Re-pushing the value that was last emitted, with nothing pending, is a no-op.
    pub fn push(&mut self, value: T) {
        if self.pending.is_none() && self.last_emitted.as_ref() == Some(&value) {
            return;
        }
        self.pending = Some((value, self.clock.now()));
    }

    /// Take the pending value once it has been stable for the whole window.
    /// A value that settled back to the last emission is swallowed.
    pub fn poll(&mut self) -> Option<T> {
        let (_, changed_at) = self.pending.as_ref()?;
        if !debounce_elapsed(*changed_at, self.window, self.clock.now()) {
            return None;
        }
        let (value, _) = self.pending.take()?;
        if self.last_emitted.as_ref() == Some(&value) {
            return None;
        }
        self.last_emitted = Some(value.clone());
        Some(value)
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
