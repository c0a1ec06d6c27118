//! Telemetry task: consumes queued samples and returns their slots.

use std::sync::Arc;

use kite_common::consts::SAMPLE_POOL_CAPACITY;
use kite_common::modules::Modules;
use parking_lot::RwLock;
use tracing::{error, warn};

use crate::sample::{SamplePool, SampleQueue, SampleRef, SensorSample};
use crate::scheduler::Task;

/// Running summary of consumed samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Telemetry {
    /// Samples consumed.
    pub samples: u64,
    /// Most recent sample.
    pub last: Option<SensorSample>,
    /// Highest line tension seen.
    pub max_line_tension_n: f32,
    /// Clock time of the last consumed batch.
    pub last_update_ms: u32,
    /// Slots that could not be returned to the pool.
    pub release_failures: u64,
}

impl Telemetry {
    fn fold(&mut self, sample: &SensorSample) {
        self.samples += 1;
        self.max_line_tension_n = self.max_line_tension_n.max(sample.line_tension_n);
        self.last = Some(*sample);
    }
}

pub type SharedTelemetry = Arc<RwLock<Telemetry>>;

type Batch = heapless::Vec<SampleRef, SAMPLE_POOL_CAPACITY>;

pub struct TelemetryTask {
    pool: &'static SamplePool,
    queue: SampleQueue,
    telemetry: SharedTelemetry,
    /// Slots whose release hit lock contention; retried next tick.
    pending: Batch,
}

impl TelemetryTask {
    pub fn new(pool: &'static SamplePool, queue: SampleQueue) -> Self {
        Self {
            pool,
            queue,
            telemetry: SharedTelemetry::default(),
            pending: Batch::new(),
        }
    }

    pub fn telemetry(&self) -> SharedTelemetry {
        Arc::clone(&self.telemetry)
    }

    fn drain_queue(&self) -> Batch {
        let mut batch = Batch::new();
        let mut queue = self.queue.lock();
        while let Some(slot) = queue.pop_front() {
            // The batch has the queue's capacity.
            let pushed = batch.push(slot);
            debug_assert!(pushed.is_ok(), "telemetry batch smaller than the sample queue");
        }
        batch
    }

    fn release(&mut self, slot: SampleRef) {
        let err = match self.pool.try_release(slot) {
            Ok(()) => return,
            Err(err) => err,
        };

        let kind = err.kind();
        if kind.is_transient() {
            warn!(error = %kind, "sample slot release deferred");
            if self.pending.push(err.into_inner()).is_err() {
                error!("release retry list full, sample slot leaked");
                self.telemetry.write().release_failures += 1;
            }
        } else {
            error!(error = %kind, "sample handle violation on release");
            self.telemetry.write().release_failures += 1;
        }
    }
}

impl Task for TelemetryTask {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn module(&self) -> Modules {
        Modules::LOGGING
    }

    fn tick(&mut self, now_ms: u32) {
        let retries = std::mem::take(&mut self.pending);
        for slot in retries {
            self.release(slot);
        }

        let batch = self.drain_queue();
        if batch.is_empty() {
            return;
        }

        {
            let mut telemetry = self.telemetry.write();
            for slot in &batch {
                telemetry.fold(slot);
            }
            telemetry.last_update_ms = now_ms;
        }

        for slot in batch {
            self.release(slot);
        }
    }
}

impl std::fmt::Debug for TelemetryTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryTask")
            .field("telemetry", &*self.telemetry.read())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{ImuSource, SimulatedImu, sample_queue};

    fn leaked_pool() -> &'static SamplePool {
        Box::leak(Box::new(SamplePool::new()))
    }

    fn enqueue(pool: &'static SamplePool, queue: &SampleQueue, imu: &mut SimulatedImu, now: u32) {
        let mut slot = pool.acquire().unwrap();
        imu.read(now, &mut slot).unwrap();
        assert!(queue.lock().push_back(slot).is_ok());
    }

    #[test]
    fn drains_queue_and_returns_slots() {
        let pool = leaked_pool();
        let queue = sample_queue();
        let mut task = TelemetryTask::new(pool, queue.clone());
        let mut imu = SimulatedImu::new();

        for t in [10, 20, 30] {
            enqueue(pool, &queue, &mut imu, t);
        }
        assert_eq!(pool.available(), 13);

        task.tick(40);
        assert_eq!(pool.available(), 16);
        assert!(queue.lock().is_empty());

        let telemetry = *task.telemetry().read();
        assert_eq!(telemetry.samples, 3);
        assert_eq!(telemetry.last.map(|s| s.seq), Some(3));
        assert_eq!(telemetry.last.map(|s| s.timestamp_ms), Some(30));
        assert_eq!(telemetry.last_update_ms, 40);
        assert!(telemetry.max_line_tension_n >= 120.0);
    }

    #[test]
    fn empty_queue_leaves_telemetry_untouched() {
        let pool = leaked_pool();
        let mut task = TelemetryTask::new(pool, sample_queue());
        task.tick(100);
        assert_eq!(*task.telemetry().read(), Telemetry::default());
    }

    #[test]
    fn contended_release_is_retried_next_tick() {
        let pool: &'static SamplePool = Box::leak(Box::new(SamplePool::with_lock_timeout(
            std::time::Duration::from_millis(1),
        )));
        let queue = sample_queue();
        let mut task = TelemetryTask::new(pool, queue.clone());
        let mut imu = SimulatedImu::new();
        enqueue(pool, &queue, &mut imu, 10);
        enqueue(pool, &queue, &mut imu, 20);

        let hold = pool.hold_lock();
        task.tick(30);
        drop(hold);
        assert_eq!(task.pending.len(), 2);
        assert_eq!(pool.available(), 14);
        assert!(queue.lock().is_empty());

        task.tick(40);
        assert!(task.pending.is_empty());
        assert_eq!(pool.available(), 16);

        let telemetry = *task.telemetry().read();
        assert_eq!(telemetry.samples, 2);
        assert_eq!(telemetry.release_failures, 0);
        assert_eq!(pool.stats().unwrap().contentions, 2);
    }

    #[test]
    fn foreign_handle_is_reported_not_released() {
        let ours = leaked_pool();
        let theirs = leaked_pool();
        let queue = sample_queue();
        let mut task = TelemetryTask::new(ours, queue.clone());
        let mut imu = SimulatedImu::new();

        enqueue(theirs, &queue, &mut imu, 5);
        task.tick(10);

        let telemetry = *task.telemetry().read();
        assert_eq!(telemetry.samples, 1);
        assert_eq!(telemetry.release_failures, 1);
        assert_eq!(ours.available(), 16);
        assert_eq!(ours.stats().unwrap().violations, 1);
        // The foreign slot leaked from its own pool.
        assert_eq!(theirs.available(), 15);
    }
}
