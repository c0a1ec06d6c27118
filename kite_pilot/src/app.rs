//! Composition root: builds every subsystem from one [`PilotConfig`].

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use kite_common::modules::{ModuleSwitches, Modules};
use kite_core::clock::Clock;
use kite_web::{StatusCache, StatusSource, WebError, WebFacade};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::SharedClock;
use crate::config::PilotConfig;
use crate::error::PilotError;
use crate::sample::{ImuSource, SamplePool, SampleQueue, SimulatedImu, sample_queue};
use crate::scheduler::{Scheduler, TaskStats};
use crate::status::SystemStatus;
use crate::tasks::{
    SensorFsm, SensorShared, SensorState, SensorTask, SharedTelemetry, Telemetry, TelemetryTask,
};

/// Running web server task.
pub type WebServer = JoinHandle<Result<(), WebError>>;

/// Tick loop timing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    /// Ticks that took longer than the tick period.
    pub overruns: u64,
    pub max_tick_us: u64,
    pub total_tick_us: u64,
}

/// The running firmware.
pub struct Pilot {
    config: PilotConfig,
    clock: SharedClock,
    switches: Arc<ModuleSwitches>,
    pool: &'static SamplePool,
    queue: SampleQueue,
    scheduler: Scheduler,
    sensor: Arc<SensorShared>,
    telemetry: SharedTelemetry,
    status: Arc<SystemStatus>,
    tick_stats: TickStats,
}

impl Pilot {
    /// Build the firmware with the simulated IMU.
    pub fn build(config: PilotConfig, clock: SharedClock) -> Result<Self, PilotError> {
        Self::build_with_imu(config, clock, Box::new(SimulatedImu::new()))
    }

    /// Build the firmware around a specific IMU source.
    ///
    /// The sample pool is leaked: it lives for the rest of the process.
    pub fn build_with_imu(
        config: PilotConfig,
        clock: SharedClock,
        imu: Box<dyn ImuSource>,
    ) -> Result<Self, PilotError> {
        config.validate()?;

        let switches = Arc::new(ModuleSwitches::new(Modules::from(config.modules)));
        let pool: &'static SamplePool =
            Box::leak(Box::new(SamplePool::with_lock_timeout(config.pool.lock_timeout())));
        let queue = sample_queue();

        let sensor_task = SensorTask::new(
            SensorFsm::new(Arc::clone(&clock), &config.sensors),
            pool,
            queue.clone(),
            imu,
        );
        let telemetry_task = TelemetryTask::new(pool, queue.clone());
        let sensor = sensor_task.shared();
        let telemetry = telemetry_task.telemetry();

        let mut scheduler = Scheduler::new(Arc::clone(&switches));
        scheduler.add(Box::new(sensor_task));
        scheduler.add(Box::new(telemetry_task));

        let status = Arc::new(SystemStatus::new(
            config.shared.service_name.clone(),
            Arc::clone(&clock),
            Arc::clone(&switches),
            pool,
            Arc::clone(&sensor),
            Arc::clone(&telemetry),
        ));

        info!(
            service = %config.shared.service_name,
            modules = ?switches.snapshot(),
            pool_capacity = SamplePool::capacity(),
            lock_timeout_ms = config.pool.lock_timeout_ms,
            tick_ms = config.scheduler.tick_ms,
            "pilot built"
        );

        Ok(Self {
            config,
            clock,
            switches,
            pool,
            queue,
            scheduler,
            sensor,
            telemetry,
            status,
            tick_stats: TickStats::default(),
        })
    }

    /// Run one scheduler tick at the current clock time.
    pub fn tick(&mut self) -> u32 {
        let started = Instant::now();
        let now_ms = self.clock.now_ms();
        self.scheduler.run_tick(now_ms);

        let tick_us = started.elapsed().as_micros() as u64;
        let stats = &mut self.tick_stats;
        stats.ticks += 1;
        stats.total_tick_us += tick_us;
        stats.max_tick_us = stats.max_tick_us.max(tick_us);
        if tick_us > u64::from(self.config.scheduler.tick_ms) * 1000 {
            stats.overruns += 1;
            if stats.overruns <= 10 || stats.overruns % 1000 == 0 {
                warn!(
                    "Tick overrun #{}: took {}us (period {}ms)",
                    stats.overruns, tick_us, self.config.scheduler.tick_ms
                );
            }
        }
        if stats.ticks % 1000 == 0 {
            debug!(
                "Tick loop: {} ticks, avg={}us, max={}us, overruns={}",
                stats.ticks,
                stats.total_tick_us / stats.ticks,
                stats.max_tick_us,
                stats.overruns
            );
        }
        now_ms
    }

    /// Web facade wired to this pilot's status and module switches.
    pub fn web_facade(&self) -> Arc<WebFacade> {
        let source: Arc<dyn StatusSource> = self.status.clone();
        let cache = StatusCache::new(
            source,
            Arc::clone(&self.clock),
            self.config.web.status_refresh_ms,
        );
        let facade = WebFacade::new(self.config.web.port, cache, Arc::clone(&self.switches));
        facade.set_webserver_mode(self.config.web.use_files);
        Arc::new(facade)
    }

    /// Bind the web server and serve it on the current tokio runtime until
    /// `shutdown` resolves. `None` while the `webserver` module is disabled.
    ///
    /// # Errors
    ///
    /// [`PilotError::Web`] if the port cannot be bound.
    pub async fn start_web<F>(&self, shutdown: F) -> Result<Option<WebServer>, PilotError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.switches.is_enabled(Modules::WEBSERVER) {
            info!("webserver module disabled, not serving HTTP");
            return Ok(None);
        }
        let facade = self.web_facade();
        let listener = kite_web::bind(&facade).await?;
        Ok(Some(tokio::spawn(kite_web::serve(facade, listener, shutdown))))
    }

    pub fn config(&self) -> &PilotConfig {
        &self.config
    }

    pub fn switches(&self) -> &Arc<ModuleSwitches> {
        &self.switches
    }

    pub fn pool(&self) -> &'static SamplePool {
        self.pool
    }

    /// Samples waiting for the telemetry task.
    pub fn queued_samples(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn sensor_state(&self) -> SensorState {
        self.sensor.state()
    }

    pub fn sensor(&self) -> &SensorShared {
        &self.sensor
    }

    pub fn telemetry(&self) -> Telemetry {
        *self.telemetry.read()
    }

    pub fn task_stats(&self) -> Vec<TaskStats> {
        self.scheduler.stats()
    }

    pub fn tick_stats(&self) -> TickStats {
        self.tick_stats
    }

    pub fn status(&self) -> Arc<SystemStatus> {
        Arc::clone(&self.status)
    }
}

impl std::fmt::Debug for Pilot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pilot")
            .field("service", &self.config.shared.service_name)
            .field("modules", &self.switches.snapshot())
            .field("scheduler", &self.scheduler)
            .field("tick_stats", &self.tick_stats)
            .finish_non_exhaustive()
    }
}
