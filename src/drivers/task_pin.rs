//! Core-pinned thread spawning.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task on a given core with explicit priority and stack size.
//! On non-ESP targets, falls back to a plain named thread.
//!
//! # ESP-IDF Threading Model
//!
//! ESP-IDF implements `std::thread` via pthreads, which are thin wrappers
//! around FreeRTOS tasks. `esp_pthread_set_cfg()` sets thread-local
//! configuration that applies to the *next* `pthread_create()` call from
//! the calling thread, so the config→spawn pair must not be interleaved
//! with other thread creation on the same thread. Only the main task
//! spawns.

use crate::app::ports::{Job, SpawnError, TaskSpawner};

/// CPU core identifiers. The ESP32-C3 has a single RISC-V core, so
/// `Any` and `Core0` end up on the same CPU there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Core {
    Core0,
    /// Let the scheduler pick.
    Any,
}

/// Weather worker placement: below the main loop, 8 KB of stack for
/// TLS plus JSON parsing.
pub const WORKER_PRIORITY: u8 = 3;
pub const WORKER_STACK_KB: usize = 8;

/// Spawn a thread pinned to a core with explicit priority and stack.
///
/// The `name` must be NUL-terminated (e.g. `"weather\0"`); it is handed to
/// FreeRTOS as-is.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>, SpawnError> {
    // SAFETY: the config struct is fully initialised by the default
    // constructor and `name` is 'static and NUL-terminated.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = match core {
            Core::Core0 => 0,
            Core::Any => esp_idf_sys::tskNO_AFFINITY as i32,
        };
        cfg.prio = i32::from(priority);
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr() as *const _;
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK {
        log::warn!("TASK: esp_pthread_set_cfg failed: {}", ret);
        return Err(SpawnError);
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "TASK: spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
        .map_err(|_| SpawnError)
}

/// Simulation fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>, SpawnError> {
    let display_name = name.trim_end_matches('\0');
    log::debug!("TASK: spawning '{}' (sim, stack={}KB)", display_name, stack_kb);

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb.max(64) * 1024)
        .spawn(f)
        .map_err(|_| SpawnError)
}

/// [`TaskSpawner`] that gives every job its own short-lived worker thread.
/// The weather service runs at most one job at a time, so there is never
/// more than one of these alive.
#[derive(Debug, Clone, Copy)]
pub struct ThreadSpawner {
    core: Core,
    priority: u8,
    stack_kb: usize,
}

impl ThreadSpawner {
    pub const fn new(core: Core, priority: u8, stack_kb: usize) -> Self {
        Self {
            core,
            priority,
            stack_kb,
        }
    }

    pub const fn weather_worker() -> Self {
        Self::new(Core::Core0, WORKER_PRIORITY, WORKER_STACK_KB)
    }
}

impl TaskSpawner for ThreadSpawner {
    fn spawn(&self, name: &'static str, job: Job) -> Result<(), SpawnError> {
        // Detached: the job reports back through its own channel.
        spawn_on_core(self.core, self.priority, self.stack_kb, name, job).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn spawner_runs_job_off_thread() {
        let (tx, rx) = mpsc::channel();
        let main_id = std::thread::current().id();
        ThreadSpawner::weather_worker()
            .spawn(
                "test\0",
                Box::new(move || {
                    let _ = tx.send(std::thread::current().id());
                }),
            )
            .unwrap();
        let worker_id = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert_ne!(worker_id, main_id);
    }

    #[test]
    fn thread_name_drops_nul() {
        let handle = spawn_on_core(Core::Any, 1, 16, "named\0", || {
            assert_eq!(std::thread::current().name(), Some("named"));
        })
        .unwrap();
        handle.join().unwrap();
    }
}
