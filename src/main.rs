//! Irrigation Node Firmware: main entry point
//!
//! Hexagonal core with three core-pinned periodic tasks.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BoardRelay      BoardFlowInput   BoardEnvironment  Esp32Time  │
//! │  (RelayPort)     (FlowInput)      (EnvironmentPort) (Clock)    │
//! │  LinkMonitor     LogEventSink     HTTP server      LogDisplay  │
//! │  (LinkProbe)     (EventSink)      (ControlSurface) (Display)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  PumpController · AcquisitionHub · SharedSnapshot      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  acquisition + display (PRO core) · supervisor (APP core)      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use irrigation_node::adapters::display::LogDisplay;
use irrigation_node::adapters::hardware::{self, BoardEnvironment, BoardFlowInput};
use irrigation_node::adapters::http;
use irrigation_node::adapters::log_sink::LogEventSink;
use irrigation_node::adapters::time::Esp32TimeAdapter;
use irrigation_node::adapters::wifi::{self, LinkMonitor, WifiCredentials};
use irrigation_node::app::context::NodeContext;
use irrigation_node::app::events::NodeEvent;
use irrigation_node::app::ports::EventSink;
use irrigation_node::config::NodeConfig;
use irrigation_node::error::Error;
use irrigation_node::control::ControlSurface;
use irrigation_node::drivers::hw_init;
use irrigation_node::drivers::task_pin::{self, ACQUISITION_TASK, DISPLAY_TASK, SUPERVISOR_TASK};
use irrigation_node::drivers::watchdog::Watchdog;
use irrigation_node::pump::interlock::{ConnectivityInterlock, InterlockSet, LinkStatus, WaterLevelInterlock};
use irrigation_node::sensors::flow::{FlowMeter, PulseCounter};
use irrigation_node::sensors::AcquisitionHub;
use irrigation_node::tasks::{AcquisitionTask, DisplayTask, SupervisorTask};

/// Flow pulses land here from the GPIO ISR for the whole run.
static FLOW_PULSES: PulseCounter = PulseCounter::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Irrigation node v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = NodeConfig::default();
    config.validate()?;

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Without a known-low relay output nothing is safe to run.
        // The task watchdog resets the chip from here.
        error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 3. WiFi ───────────────────────────────────────────────
    let link = LinkStatus::new(false);
    let _wifi = match WifiCredentials::from_build_env() {
        Ok(creds) => Some(wifi::connect_station(peripherals.modem, sysloop, nvs, &creds)?),
        Err(e) => {
            warn!("WiFi: {}, pump stays interlocked", e);
            None
        }
    };
    let link_monitor = LinkMonitor::new(link.clone());

    // ── 4. Node context ───────────────────────────────────────
    let mut interlocks = InterlockSet::new().with(ConnectivityInterlock::new(link))?;
    if config.water_level_interlock {
        interlocks.push(WaterLevelInterlock::new(hardware::water_level_ok))?;
    }
    let mut ctx = NodeContext::new(
        &config,
        hardware::board_relay().map_err(Error::from)?,
        interlocks,
        Esp32TimeAdapter::new(),
        &FLOW_PULSES,
    )?;

    // ── 5. Control surface ────────────────────────────────────
    let surface = Arc::new(
        ControlSurface::new(ctx.pump(), config.water_rate_ml_per_second)
            .with_flow_requests(ctx.flow_requests()),
    );
    let _server = http::start(surface, config.http_port)?;

    // ── 6. Tasks ──────────────────────────────────────────────
    let hub = AcquisitionHub::new(
        BoardEnvironment::new(),
        FlowMeter::new(BoardFlowInput::new(), ctx.counter(), &config),
    );
    let mut acquisition = AcquisitionTask::new(
        hub,
        ctx.take_writer()?,
        ctx.pump(),
        LogEventSink::new(),
        config.acquisition_interval_ms,
    )
    .with_link_monitor(link_monitor)
    .with_flow_requests(ctx.flow_requests());
    acquisition.start()?;

    let supervisor = SupervisorTask::new(ctx.pump(), LogEventSink::new(), config.supervisor_interval_ms);
    let watchdog_timeout_ms = config.watchdog_timeout_ms;
    let display = DisplayTask::new(ctx.pump(), ctx.reader(), LogDisplay::new(), config.display_interval_ms);

    task_pin::spawn_on_core(ACQUISITION_TASK, move || acquisition.run());
    task_pin::spawn_on_core(SUPERVISOR_TASK, move || {
        supervisor.with_watchdog(Watchdog::subscribe(watchdog_timeout_ms)).run()
    });
    task_pin::spawn_on_core(DISPLAY_TASK, move || display.run());

    LogEventSink::new().emit(&NodeEvent::Started);

    // The WiFi driver and HTTP server live as long as this frame.
    loop {
        std::thread::park();
    }
}
