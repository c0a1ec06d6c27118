//! Sensor sampling task and its state machine.
//!
//! `Warmup → Sampling ↔ Stalled`
//!
//! - `Warmup`: the IMU settles; no samples are taken until the warmup timeout.
//! - `Sampling`: one sample per tick. Each queued sample restarts the stale
//!   timer; if nothing is queued for a full stale timeout the sensor stalls.
//! - `Stalled`: sampling continues; the first queued sample resumes `Sampling`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use kite_common::consts::SAMPLE_POOL_CAPACITY;
use kite_common::modules::Modules;
use kite_core::fsm::{FsmCore, StateMachine};
use kite_core::pool::PoolError;
use tracing::{debug, error, info, warn};

use crate::SharedClock;
use crate::config::SensorConfig;
use crate::sample::{ImuSource, SamplePool, SampleQueue, SampleRef};
use crate::scheduler::Task;

// ─── State machine ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SensorState {
    Warmup = 0,
    Sampling = 1,
    Stalled = 2,
}

impl SensorState {
    #[inline]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Warmup),
            1 => Some(Self::Sampling),
            2 => Some(Self::Stalled),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warmup => "warmup",
            Self::Sampling => "sampling",
            Self::Stalled => "stalled",
        }
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensor health state machine.
///
/// The owning task reports each tick's sampling outcome with
/// [`note_sample`](Self::note_sample) before calling `update`.
pub struct SensorFsm {
    core: FsmCore<SensorState, SharedClock>,
    stale_timeout_ms: u32,
    sampled: bool,
}

impl SensorFsm {
    pub fn new(clock: SharedClock, config: &SensorConfig) -> Self {
        Self {
            core: FsmCore::new(SensorState::Warmup, config.warmup_ms, clock),
            stale_timeout_ms: config.stale_timeout_ms,
            sampled: false,
        }
    }

    /// Record whether this tick queued a sample.
    #[inline]
    pub fn note_sample(&mut self, queued: bool) {
        self.sampled = queued;
    }
}

impl StateMachine for SensorFsm {
    type State = SensorState;
    type Clock = SharedClock;

    fn core(&self) -> &FsmCore<SensorState, SharedClock> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FsmCore<SensorState, SharedClock> {
        &mut self.core
    }

    fn update(&mut self) {
        let sampled = std::mem::take(&mut self.sampled);
        match self.current_state() {
            SensorState::Warmup => {
                if self.has_timed_out() {
                    self.core.set_timeout(self.stale_timeout_ms);
                    self.transition_to(SensorState::Sampling);
                    info!("sensor warmup complete");
                }
            }
            SensorState::Sampling => {
                if sampled {
                    // Re-entering restarts the stale timer.
                    self.transition_to(SensorState::Sampling);
                } else if self.has_timed_out() {
                    warn!(
                        stale_ms = self.core.elapsed_ms(),
                        "no sensor sample queued, sensor stalled"
                    );
                    self.transition_to(SensorState::Stalled);
                }
            }
            SensorState::Stalled => {
                if sampled {
                    info!("sensor sampling resumed");
                    self.transition_to(SensorState::Sampling);
                }
            }
        }
    }
}

impl fmt::Debug for SensorFsm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorFsm")
            .field("state", &self.core.current_state())
            .field("elapsed_ms", &self.core.elapsed_ms())
            .field("timeout_ms", &self.core.timeout())
            .finish()
    }
}

// ─── Shared observation ─────────────────────────────────────────────

/// Sensor counters at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorCounters {
    /// Samples queued for telemetry.
    pub queued: u64,
    /// Samples dropped because no slot was free.
    pub dropped: u64,
    /// Ticks that gave up on a busy pool lock.
    pub deferred: u64,
    /// IMU read failures.
    pub read_failures: u64,
}

/// State and counters the sensor task publishes to other threads.
#[derive(Debug, Default)]
pub struct SensorShared {
    state: AtomicU8,
    queued: AtomicU64,
    dropped: AtomicU64,
    deferred: AtomicU64,
    read_failures: AtomicU64,
}

impl SensorShared {
    pub fn state(&self) -> SensorState {
        SensorState::from_u8(self.state.load(Ordering::Relaxed)).unwrap_or(SensorState::Warmup)
    }

    pub fn counters(&self) -> SensorCounters {
        SensorCounters {
            queued: self.queued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
        }
    }

    fn publish(&self, state: SensorState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ─── Task ───────────────────────────────────────────────────────────

pub struct SensorTask {
    fsm: SensorFsm,
    pool: &'static SamplePool,
    queue: SampleQueue,
    imu: Box<dyn ImuSource>,
    shared: Arc<SensorShared>,
    /// Slots whose release hit lock contention; retried next tick.
    pending: heapless::Vec<SampleRef, SAMPLE_POOL_CAPACITY>,
}

impl SensorTask {
    pub fn new(
        fsm: SensorFsm,
        pool: &'static SamplePool,
        queue: SampleQueue,
        imu: Box<dyn ImuSource>,
    ) -> Self {
        let shared = Arc::new(SensorShared::default());
        shared.publish(fsm.current_state());
        Self {
            fsm,
            pool,
            queue,
            imu,
            shared,
            pending: heapless::Vec::new(),
        }
    }

    pub fn shared(&self) -> Arc<SensorShared> {
        Arc::clone(&self.shared)
    }

    pub fn state(&self) -> SensorState {
        self.fsm.current_state()
    }

    /// Take one sample into a pool slot and queue it. `true` if queued.
    fn sample(&mut self, now_ms: u32) -> bool {
        let mut slot = match self.pool.try_acquire() {
            Ok(slot) => slot,
            Err(PoolError::Exhausted { capacity }) => {
                SensorShared::bump(&self.shared.dropped);
                debug!(capacity, "sample pool exhausted, sample dropped");
                return false;
            }
            Err(e @ PoolError::Contention { .. }) => {
                SensorShared::bump(&self.shared.deferred);
                warn!(error = %e, "sample pool busy, retrying next tick");
                return false;
            }
            Err(e) => {
                error!(error = %e, "unexpected sample pool error");
                return false;
            }
        };

        if let Err(e) = self.imu.read(now_ms, &mut slot) {
            SensorShared::bump(&self.shared.read_failures);
            debug!(error = %e, "IMU read failed");
            self.give_back(slot);
            return false;
        }

        let rejected = self.queue.lock().push_back(slot);
        match rejected {
            Ok(()) => {
                SensorShared::bump(&self.shared.queued);
                true
            }
            Err(slot) => {
                SensorShared::bump(&self.shared.dropped);
                warn!("sample queue full, sample dropped");
                self.give_back(slot);
                false
            }
        }
    }

    fn give_back(&mut self, slot: SampleRef) {
        let err = match self.pool.try_release(slot) {
            Ok(()) => return,
            Err(err) => err,
        };

        let kind = err.kind();
        if kind.is_handle_violation() {
            error!(error = %kind, "sample handle violation on release");
            return;
        }
        warn!(error = %kind, "sample slot release deferred");
        if self.pending.push(err.into_inner()).is_err() {
            error!("release retry list full, sample slot leaked");
        }
    }

    fn retry_pending(&mut self) {
        for slot in std::mem::take(&mut self.pending) {
            self.give_back(slot);
        }
    }

    /// Slots waiting for a retried release.
    pub fn pending_releases(&self) -> usize {
        self.pending.len()
    }
}

impl Task for SensorTask {
    fn name(&self) -> &'static str {
        "sensors"
    }

    fn module(&self) -> Modules {
        Modules::SENSORS
    }

    fn tick(&mut self, now_ms: u32) {
        self.retry_pending();
        if self.fsm.current_state() != SensorState::Warmup {
            let queued = self.sample(now_ms);
            self.fsm.note_sample(queued);
        }
        self.fsm.update();
        self.shared.publish(self.fsm.current_state());
    }
}

impl fmt::Debug for SensorTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorTask")
            .field("state", &self.fsm.current_state())
            .field("counters", &self.shared.counters())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
