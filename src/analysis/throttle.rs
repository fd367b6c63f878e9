// src/analysis/throttle.rs

use crate::error::PipelineError;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Time source for the throttle. Swappable so tests can drive it by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Minimum-interval gate between analysis results and the renderer.
///
/// Check-and-emit runs under one lock: two callers racing on the same instant
/// cannot both pass, and emissions leave in timestamp order.
pub struct UpdateThrottle {
    min_interval: Duration,
    last_emit: Mutex<Option<Instant>>,
    clock: Box<dyn Clock>,
}

impl UpdateThrottle {
    pub fn new(min_interval: Duration) -> Result<Self, PipelineError> {
        Self::with_clock(min_interval, MonotonicClock)
    }

    pub fn with_clock(
        min_interval: Duration,
        clock: impl Clock + 'static,
    ) -> Result<Self, PipelineError> {
        if min_interval.is_zero() {
            return Err(PipelineError::invalid(
                "minimum emission interval must be greater than zero",
            ));
        }
        Ok(Self {
            min_interval,
            last_emit: Mutex::new(None),
            clock: Box::new(clock),
        })
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Offers `value` at the clock's current time. See [`offer_at`](Self::offer_at).
    pub fn offer<T>(&self, value: T, emit: impl FnOnce(T)) -> bool {
        let now = self.clock.now();
        self.offer_at(now, value, emit)
    }

    /// Calls `emit(value)` and returns `true` if at least `min_interval` has passed
    /// since the last emission (or nothing was emitted yet). Otherwise `value` is
    /// dropped and `false` is returned.
    ///
    /// `emit` runs while the gate is held, so it must not block.
    pub fn offer_at<T>(&self, now: Instant, value: T, emit: impl FnOnce(T)) -> bool {
        let mut last = self.last_emit.lock();
        let open = match *last {
            None => true,
            Some(prev) => now.saturating_duration_since(prev) >= self.min_interval,
        };
        if open {
            *last = Some(now);
            emit(value);
        }
        open
    }

    /// Forgets the last emission so the next offer passes.
    pub fn reset(&self) {
        *self.last_emit.lock() = None;
    }
}
