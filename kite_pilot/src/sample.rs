//! Sensor samples, their pool, and the simulated IMU that fills them.

use std::sync::Arc;

use heapless::Deque;
use kite_common::consts::SAMPLE_POOL_CAPACITY;
use kite_core::pool::{Pool, PoolRef};
use parking_lot::Mutex;
use thiserror::Error;

/// One attitude and line-tension reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSample {
    /// Monotonic sequence number assigned by the source.
    pub seq: u32,
    /// Clock time of the reading.
    pub timestamp_ms: u32,
    pub roll_deg: f32,
    pub pitch_deg: f32,
    /// 0..360, clockwise from north.
    pub heading_deg: f32,
    /// Tether tension in newtons.
    pub line_tension_n: f32,
}

/// Pre-allocated sample storage shared by the sensor and telemetry tasks.
pub type SamplePool = Pool<SensorSample, SAMPLE_POOL_CAPACITY>;

/// Handle to a filled sample.
pub type SampleRef = PoolRef<'static, SensorSample>;

/// Samples waiting for the telemetry task. Holds at most one handle per slot.
pub type SampleQueue = Arc<Mutex<Deque<SampleRef, SAMPLE_POOL_CAPACITY>>>;

pub fn sample_queue() -> SampleQueue {
    Arc::new(Mutex::new(Deque::new()))
}

/// IMU read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ImuError {
    #[error("IMU not responding")]
    NotResponding,
}

/// A source of attitude readings.
pub trait ImuSource: Send {
    /// Fill `out` with a reading taken at `now_ms`.
    fn read(&mut self, now_ms: u32, out: &mut SensorSample) -> Result<(), ImuError>;
}

/// Kite flying a slow figure-eight: roll and heading swing with the pattern,
/// tension peaks at the power-zone crossings.
#[derive(Debug, Clone, Default)]
pub struct SimulatedImu {
    seq: u32,
}

/// Figure-eight period.
const PATTERN_PERIOD_MS: f32 = 8_000.0;

impl SimulatedImu {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImuSource for SimulatedImu {
    fn read(&mut self, now_ms: u32, out: &mut SensorSample) -> Result<(), ImuError> {
        let phase = (now_ms as f32 / PATTERN_PERIOD_MS) * std::f32::consts::TAU;
        self.seq = self.seq.wrapping_add(1);

        *out = SensorSample {
            seq: self.seq,
            timestamp_ms: now_ms,
            roll_deg: 35.0 * phase.sin(),
            pitch_deg: 10.0 + 5.0 * (2.0 * phase).cos(),
            heading_deg: (180.0 + 60.0 * phase.sin()).rem_euclid(360.0),
            line_tension_n: 120.0 + 80.0 * (2.0 * phase).sin().abs(),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_readings_stay_in_range() {
        let mut imu = SimulatedImu::new();
        let mut sample = SensorSample::default();
        for t in (0..16_000).step_by(37) {
            imu.read(t, &mut sample).unwrap();
            assert_eq!(sample.timestamp_ms, t);
            assert!(sample.roll_deg.abs() <= 35.0);
            assert!((0.0..360.0).contains(&sample.heading_deg));
            assert!((120.0..=200.0).contains(&sample.line_tension_n));
        }
    }

    #[test]
    fn sequence_increments() {
        let mut imu = SimulatedImu::new();
        let mut sample = SensorSample::default();
        imu.read(0, &mut sample).unwrap();
        assert_eq!(sample.seq, 1);
        imu.read(10, &mut sample).unwrap();
        assert_eq!(sample.seq, 2);
    }

    #[test]
    fn queue_holds_one_handle_per_slot() {
        let pool: &'static SamplePool = Box::leak(Box::new(SamplePool::new()));
        let queue = sample_queue();
        let mut q = queue.lock();
        while let Some(slot) = pool.acquire() {
            assert!(q.push_back(slot).is_ok());
        }
        assert!(q.is_full());
        assert_eq!(pool.available(), 0);
        while let Some(slot) = q.pop_front() {
            assert!(pool.release(slot));
        }
    }
}
