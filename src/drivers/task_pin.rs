//! Core-pinned thread spawning for the ESP32 dual-core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task pinned to a specific CPU core with explicit priority and
//! stack size.  On non-ESP targets, falls back to a plain named thread.
//!
//! `esp_pthread_set_cfg()` sets thread-local configuration that applies to
//! the *next* `pthread_create()` from the calling thread, so the
//! config→spawn pair must not be interleaved with other thread creation.

/// CPU core identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): WiFi, lwIP, HTTP server, acquisition, display.
    Pro = 0,
    /// Core 1 (APP_CPU): pump supervision.
    App = 1,
}

/// Placement of one long-running task.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    /// Null-terminated for the ESP-IDF pthread config.
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

pub const ACQUISITION_TASK: TaskSpec = TaskSpec {
    name: "acquire\0",
    core: Core::Pro,
    priority: 5,
    stack_kb: 8,
};

pub const SUPERVISOR_TASK: TaskSpec = TaskSpec {
    name: "pump-sup\0",
    core: Core::App,
    priority: 6,
    stack_kb: 6,
};

pub const DISPLAY_TASK: TaskSpec = TaskSpec {
    name: "display\0",
    core: Core::Pro,
    priority: 3,
    stack_kb: 6,
};

/// Spawn a thread placed according to `spec`.
///
/// Thread creation failure at boot is unrecoverable and panics.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> std::thread::JoinHandle<()> {
    // SAFETY: the config struct is fully initialised by
    // esp_create_default_pthread_config and `name` is 'static.
    unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = spec.priority as i32;
        cfg.stack_size = (spec.stack_kb * 1024) as _;
        cfg.thread_name = spec.name.as_ptr() as *const _;
        let ret = esp_idf_svc::sys::esp_pthread_set_cfg(&cfg);
        assert!(ret == esp_idf_svc::sys::ESP_OK as i32, "esp_pthread_set_cfg failed: {ret}");
    }

    let display_name = spec.name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
        .expect("spawn_on_core: thread creation failed")
}

/// Simulation fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> std::thread::JoinHandle<()> {
    let display_name = spec.name.trim_end_matches('\0');
    log::info!("Spawning '{}' (sim, no core pinning)", display_name);

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(spec.stack_kb.max(64) * 1024)
        .spawn(f)
        .expect("spawn_on_core(sim): thread creation failed")
}
