//! Cached system status string.
//!
//! Rendering the status touches the pool lock and the telemetry snapshot, so
//! the facade keeps the last rendering and recomputes it at most once per
//! refresh interval. Requests in between get the cached text.

use std::sync::Arc;

use kite_common::consts::STATUS_REFRESH_MS;
use kite_core::clock::{Clock, elapsed_ms};
use parking_lot::Mutex;

/// Something that can describe the running system in human-readable text.
pub trait StatusSource: Send + Sync {
    fn render(&self) -> String;
}

impl<F> StatusSource for F
where
    F: Fn() -> String + Send + Sync,
{
    fn render(&self) -> String {
        self()
    }
}

#[derive(Debug)]
struct Cached {
    text: String,
    rendered_at_ms: u32,
}

/// Rate-limited wrapper around a [`StatusSource`].
pub struct StatusCache {
    source: Arc<dyn StatusSource>,
    clock: Box<dyn Clock + Send + Sync>,
    refresh_ms: u32,
    cached: Mutex<Option<Cached>>,
}

impl StatusCache {
    pub fn new(
        source: Arc<dyn StatusSource>,
        clock: impl Clock + Send + Sync + 'static,
        refresh_ms: u32,
    ) -> Self {
        Self {
            source,
            clock: Box::new(clock),
            refresh_ms,
            cached: Mutex::new(None),
        }
    }

    /// Cache with the default one-second refresh interval.
    pub fn with_default_refresh(
        source: Arc<dyn StatusSource>,
        clock: impl Clock + Send + Sync + 'static,
    ) -> Self {
        Self::new(source, clock, STATUS_REFRESH_MS)
    }

    #[inline]
    pub fn refresh_ms(&self) -> u32 {
        self.refresh_ms
    }

    /// Current status text, re-rendered if the cached copy is stale.
    pub fn get(&self) -> String {
        let now = self.clock.now_ms();
        let mut cached = self.cached.lock();
        match cached.as_ref() {
            Some(c) if elapsed_ms(now, c.rendered_at_ms) < self.refresh_ms => c.text.clone(),
            _ => {
                let text = self.source.render();
                *cached = Some(Cached {
                    text: text.clone(),
                    rendered_at_ms: now,
                });
                text
            }
        }
    }

    /// Force the next [`get`](Self::get) to re-render.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}

impl std::fmt::Debug for StatusCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCache")
            .field("refresh_ms", &self.refresh_ms)
            .field("cached", &self.cached.lock().is_some())
            .finish_non_exhaustive()
    }
}
