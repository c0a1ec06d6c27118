//! Cooperative tick scheduler.
//!
//! Tasks run in registration order, once per tick. A task whose module is
//! switched off is skipped for that tick; it keeps its state and resumes
//! when the module is switched back on.

use std::sync::Arc;

use kite_common::modules::{ModuleSwitches, Modules};
use tracing::debug;

/// Periodic work owned by one firmware module.
pub trait Task: Send {
    fn name(&self) -> &'static str;

    /// Module that gates this task.
    fn module(&self) -> Modules;

    /// One control tick at clock time `now_ms`.
    fn tick(&mut self, now_ms: u32);
}

/// Per-task run counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    pub name: &'static str,
    pub module: Modules,
    pub runs: u64,
    pub skipped: u64,
}

struct Entry {
    task: Box<dyn Task>,
    runs: u64,
    skipped: u64,
    was_enabled: bool,
}

pub struct Scheduler {
    switches: Arc<ModuleSwitches>,
    entries: Vec<Entry>,
    ticks: u64,
}

impl Scheduler {
    pub fn new(switches: Arc<ModuleSwitches>) -> Self {
        Self {
            switches,
            entries: Vec::new(),
            ticks: 0,
        }
    }

    /// Register a task. Tasks tick in registration order.
    pub fn add(&mut self, task: Box<dyn Task>) {
        debug!(task = task.name(), "task registered");
        self.entries.push(Entry {
            task,
            runs: 0,
            skipped: 0,
            was_enabled: true,
        });
    }

    /// Run every enabled task once.
    pub fn run_tick(&mut self, now_ms: u32) {
        let enabled = self.switches.snapshot();
        for entry in &mut self.entries {
            let on = enabled.contains(entry.task.module());
            if on != entry.was_enabled {
                debug!(task = entry.task.name(), enabled = on, "task gate changed");
                entry.was_enabled = on;
            }
            if on {
                entry.task.tick(now_ms);
                entry.runs += 1;
            } else {
                entry.skipped += 1;
            }
        }
        self.ticks += 1;
    }

    /// Ticks run so far.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn stats(&self) -> Vec<TaskStats> {
        self.entries
            .iter()
            .map(|e| TaskStats {
                name: e.task.name(),
                module: e.task.module(),
                runs: e.runs,
                skipped: e.skipped,
            })
            .collect()
    }

    pub fn switches(&self) -> &Arc<ModuleSwitches> {
        &self.switches
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.stats())
            .field("ticks", &self.ticks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        module: Modules,
        log: Arc<Mutex<Vec<(&'static str, u32)>>>,
    }

    impl Task for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn module(&self) -> Modules {
            self.module
        }

        fn tick(&mut self, now_ms: u32) {
            self.log.lock().push((self.name, now_ms));
        }
    }

    fn scheduler(enabled: Modules) -> (Scheduler, Arc<Mutex<Vec<(&'static str, u32)>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sched = Scheduler::new(Arc::new(ModuleSwitches::new(enabled)));
        for (name, module) in [("sensors", Modules::SENSORS), ("telemetry", Modules::LOGGING)] {
            sched.add(Box::new(Recorder {
                name,
                module,
                log: log.clone(),
            }));
        }
        (sched, log)
    }

    #[test]
    fn tasks_run_in_registration_order() {
        let (mut sched, log) = scheduler(Modules::SENSORS | Modules::LOGGING);
        sched.run_tick(10);
        sched.run_tick(20);
        assert_eq!(
            *log.lock(),
            vec![("sensors", 10), ("telemetry", 10), ("sensors", 20), ("telemetry", 20)]
        );
        assert_eq!(sched.ticks(), 2);
    }

    #[test]
    fn disabled_module_is_skipped() {
        let (mut sched, log) = scheduler(Modules::SENSORS);
        sched.run_tick(0);
        assert_eq!(*log.lock(), vec![("sensors", 0)]);

        let stats = sched.stats();
        assert_eq!(stats[0].runs, 1);
        assert_eq!(stats[1].runs, 0);
        assert_eq!(stats[1].skipped, 1);
    }

    #[test]
    fn runtime_toggle_takes_effect_next_tick() {
        let (mut sched, log) = scheduler(Modules::SENSORS | Modules::LOGGING);
        sched.run_tick(0);
        sched.switches().set(Modules::LOGGING, false);
        sched.run_tick(10);
        sched.switches().set(Modules::LOGGING, true);
        sched.run_tick(20);

        let telemetry_ticks: Vec<u32> = log
            .lock()
            .iter()
            .filter(|(name, _)| *name == "telemetry")
            .map(|&(_, t)| t)
            .collect();
        assert_eq!(telemetry_ticks, vec![0, 20]);
        assert_eq!(sched.stats()[1].skipped, 1);
    }
}
