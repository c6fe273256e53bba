//! MeshNode Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative event loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ThreadAdapter          HardwareAdapter        LogEventSink    │
//! │  (Network+SRP+CoAP)     (Strip+GPIO+Sensors)   (EventSink)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              NodeService (pure logic)                  │    │
//! │  │  Session FSM · Join retry · Work queue                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (delegate-driven) · EVENTS (callback → main loop)   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::rmt::TxRmtDriver;
use esp_idf_hal::rmt::config::TransmitConfig;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use log::{error, info, warn};

use meshnode::adapters::hardware::HardwareAdapter;
use meshnode::adapters::log_sink::LogEventSink;
use meshnode::adapters::thread::ThreadAdapter;
use meshnode::adapters::time::SystemClock;
use meshnode::app::ports::Ports;
use meshnode::app::service::NodeService;
use meshnode::config::NodeConfig;
use meshnode::drivers::button::ButtonDriver;
use meshnode::drivers::gpio_bank::GpioBank;
use meshnode::drivers::led_strip::LedStrip;
use meshnode::drivers::qdec::{self, RotationAccumulator};
use meshnode::drivers::hw_init;
use meshnode::events::{EVENTS, QueueDelegate, push_event};
use meshnode::input::{self, Button};
use meshnode::scheduler::Scheduler;

/// NVS namespace and key of the stored config blob.
const CONFIG_NAMESPACE: &str = "meshnode";
const CONFIG_KEY: &str = "config";

/// Main loop period.  Bounds button and indicator latency.
const LOOP_PERIOD_MS: u32 = 10;

/// Stored config if present and valid, defaults otherwise.
fn load_config(partition: EspDefaultNvsPartition) -> NodeConfig {
    let nvs = match EspNvs::<NvsDefault>::new(partition, CONFIG_NAMESPACE, true) {
        Ok(nvs) => nvs,
        Err(e) => {
            warn!("Config: NVS namespace unavailable ({}), using defaults", e);
            return NodeConfig::default();
        }
    };
    let mut buf = [0u8; 256];
    match nvs.get_raw(CONFIG_KEY, &mut buf) {
        Ok(Some(blob)) => match NodeConfig::from_blob(blob) {
            Ok(config) => {
                info!("Config: loaded from NVS");
                config
            }
            Err(e) => {
                warn!("Config: {}, using defaults", e);
                NodeConfig::default()
            }
        },
        Ok(None) => {
            info!("Config: none stored, using defaults");
            NodeConfig::default()
        }
        Err(e) => {
            warn!("Config: read failed ({}), using defaults", e);
            NodeConfig::default()
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  MeshNode v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals + ISRs ─────────────────────────────────
    let peripherals = Peripherals::take()?;
    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    if let Err(e) = hw_init::init_isr_service() {
        error!("ISR service init failed: {}, continuing without local input", e);
    }

    // ── 3. Config (NVS must be up before the mesh stack) ──────
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let config = load_config(nvs_partition);

    // ── 4. Adapters ───────────────────────────────────────────
    let tx = TxRmtDriver::new(
        peripherals.rmt.channel0,
        peripherals.pins.gpio8,
        &TransmitConfig::new().clock_divider(1),
    )?;
    let mut hw = HardwareAdapter::new(LedStrip::new(tx), GpioBank::new());
    let mut net = ThreadAdapter::start()?;
    let mut sched = Scheduler::new();
    let mut sink = LogEventSink::new();
    let mut clock = SystemClock::new();

    let mut buttons = Button::ALL.map(|b| ButtonDriver::new(b.index()));
    let mut rotation = RotationAccumulator::default();

    // ── 5. Engine ─────────────────────────────────────────────
    let mut service = NodeService::new(config).map_err(|e| anyhow::anyhow!("{e}"))?;
    service.start(&mut Ports::new(&mut net, &mut hw, &mut sched, &mut sink));

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        let delta_ms = clock.delta_ms();
        sched.tick(delta_ms, &mut QueueDelegate(&EVENTS));

        // Local input → events.
        let now_ms = clock.uptime_ms() as u32;
        for (button, driver) in Button::ALL.iter().zip(buttons.iter_mut()) {
            if let Some(gesture) = driver.tick(now_ms) {
                if let Some(event) = input::button_event(*button, gesture, service.testing_mode()) {
                    push_event(event);
                }
            }
        }
        if let Some(steps) = rotation.feed(qdec::take_steps()) {
            push_event(input::rotation_event(steps));
        }

        EVENTS.drain(|event| {
            service.handle_event(event, &mut Ports::new(&mut net, &mut hw, &mut sched, &mut sink));
        });

        hw.tick(delta_ms);
        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
