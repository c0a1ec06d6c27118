//! Millisecond monotonic clocks.
//!
//! Time is a 32-bit millisecond counter that wraps after ~49.7 days, the way
//! a microcontroller `millis()` does. Absolute values carry no meaning; only
//! unsigned differences do (see [`elapsed_ms`]).

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Monotonic millisecond source.
pub trait Clock {
    /// Current time in milliseconds. Wraps at `u32::MAX`.
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    #[inline]
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds from `since` to `now`, correct across one rollover.
#[inline]
pub const fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Host clock backed by [`Instant`], zero at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.origin.elapsed().as_millis() as u32
    }
}

/// Hand-driven clock for tests and simulation.
///
/// Clones share the same counter, so a test can keep one clone and advance
/// time under a state machine that owns another.
///
/// ```rust
/// use kite_core::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(u32::MAX - 1);
/// let observer = clock.clone();
/// clock.advance(3);
/// assert_eq!(observer.now_ms(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start_ms)),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::Relaxed);
    }

    /// Move forward by `ms`, wrapping at `u32::MAX`. Returns the new time.
    pub fn advance(&self, ms: u32) -> u32 {
        self.now
            .fetch_add(ms, Ordering::Relaxed)
            .wrapping_add(ms)
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_and_wraps() {
        let clock = ManualClock::new(u32::MAX - 5);
        assert_eq!(clock.advance(10), 4);
        assert_eq!(clock.now_ms(), 4);
        assert_eq!(elapsed_ms(clock.now_ms(), u32::MAX - 5), 10);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::default();
        let other = clock.clone();
        clock.set(1234);
        assert_eq!(other.now_ms(), 1234);
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = clock.now_ms();
        assert!(elapsed_ms(b, a) >= 2);
    }

    #[test]
    fn clock_through_smart_pointers() {
        let shared: Arc<dyn Clock + Send + Sync> = Arc::new(ManualClock::new(7));
        assert_eq!(shared.now_ms(), 7);
        let boxed: Box<dyn Clock> = Box::new(ManualClock::new(9));
        assert_eq!(boxed.now_ms(), 9);
    }
}
