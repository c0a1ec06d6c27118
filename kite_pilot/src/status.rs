//! Human-readable system status for the web facade.

use std::fmt::Write as _;
use std::sync::Arc;

use kite_common::modules::ModuleSwitches;
use kite_core::clock::{Clock, elapsed_ms};
use kite_web::StatusSource;

use crate::SharedClock;
use crate::sample::SamplePool;
use crate::tasks::{SensorShared, SharedTelemetry};

/// Everything the status page reports, gathered from the running tasks.
pub struct SystemStatus {
    service_name: String,
    clock: SharedClock,
    started_at_ms: u32,
    switches: Arc<ModuleSwitches>,
    pool: &'static SamplePool,
    sensor: Arc<SensorShared>,
    telemetry: SharedTelemetry,
}

impl SystemStatus {
    pub fn new(
        service_name: impl Into<String>,
        clock: SharedClock,
        switches: Arc<ModuleSwitches>,
        pool: &'static SamplePool,
        sensor: Arc<SensorShared>,
        telemetry: SharedTelemetry,
    ) -> Self {
        let started_at_ms = clock.now_ms();
        Self {
            service_name: service_name.into(),
            clock,
            started_at_ms,
            switches,
            pool,
            sensor,
            telemetry,
        }
    }

    pub fn uptime_ms(&self) -> u32 {
        elapsed_ms(self.clock.now_ms(), self.started_at_ms)
    }
}

impl StatusSource for SystemStatus {
    fn render(&self) -> String {
        let mut out = String::with_capacity(512);
        let uptime = self.uptime_ms();
        let _ = writeln!(
            out,
            "Kite PiloteV3 [{}] v{}",
            self.service_name,
            env!("CARGO_PKG_VERSION")
        );
        let _ = writeln!(out, "uptime: {}.{:03} s", uptime / 1000, uptime % 1000);

        let enabled: Vec<String> = self.switches.snapshot().lowercase_names().collect();
        let enabled = if enabled.is_empty() {
            "none".to_string()
        } else {
            enabled.join(", ")
        };
        let _ = writeln!(out, "modules: {enabled}");

        match self.pool.stats() {
            Ok(stats) => {
                let _ = writeln!(
                    out,
                    "sample pool: {}/{} in use (high water {}), exhausted {}, contention {}, violations {}",
                    stats.in_use,
                    stats.capacity,
                    stats.high_water,
                    stats.exhaustions,
                    stats.contentions,
                    stats.violations
                );
            }
            Err(e) => {
                let _ = writeln!(out, "sample pool: unavailable ({e})");
            }
        }

        let counters = self.sensor.counters();
        let _ = writeln!(
            out,
            "sensor: {} (queued {}, dropped {}, deferred {}, read failures {})",
            self.sensor.state(),
            counters.queued,
            counters.dropped,
            counters.deferred,
            counters.read_failures
        );

        let telemetry = *self.telemetry.read();
        match telemetry.last {
            Some(last) => {
                let _ = write!(
                    out,
                    "telemetry: {} samples, roll {:.1} deg, pitch {:.1} deg, heading {:.1} deg, tension {:.1} N (max {:.1} N)",
                    telemetry.samples,
                    last.roll_deg,
                    last.pitch_deg,
                    last.heading_deg,
                    last.line_tension_n,
                    telemetry.max_line_tension_n
                );
            }
            None => out.push_str("telemetry: no samples"),
        }
        out
    }
}

impl std::fmt::Debug for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemStatus")
            .field("service_name", &self.service_name)
            .field("uptime_ms", &self.uptime_ms())
            .finish_non_exhaustive()
    }
}
