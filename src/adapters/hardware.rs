//! Hardware adapter: bridges board peripherals to domain port traits.
//!
//! Owns the LED strip, the output GPIO bank, the presence indicator and
//! the sensor readings, exposing them through [`ActuatorPort`],
//! [`SensorPort`], [`SystemPort`] and `DelayNs`.  This is the only module
//! in the system that touches board hardware.  On non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs.

use embedded_hal::delay::DelayNs;
use log::info;

use crate::app::model::{GroupStatus, IndicatorMode, LightGroup, PinState, Rgb};
use crate::app::ports::{ActuatorPort, SensorPort, SystemPort};
use crate::drivers::gpio_bank::GpioBank;
use crate::drivers::indicator::Indicator;
use crate::drivers::led_strip::LedStrip;
use crate::error::{ActuatorError, SensorError};
use crate::pins;

/// Latest converted sensor values.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Readings {
    temperature: f64,
    humidity: f64,
    light: f64,
    pressure: f64,
    battery_level: f64,
}

impl Readings {
    /// Mains-powered board: battery always full.
    const BOOT: Self = Self {
        temperature: 0.0,
        humidity: 0.0,
        light: 0.0,
        pressure: 0.0,
        battery_level: 100.0,
    };
}

/// Concrete adapter that combines all board hardware behind port traits.
pub struct HardwareAdapter {
    strip: LedStrip,
    bank: GpioBank,
    indicator: Indicator,
    readings: Readings,
    samples: u32,
    management_started: bool,
    #[cfg(target_os = "espidf")]
    temp_sensor: esp_idf_svc::sys::temperature_sensor_handle_t,
}

impl HardwareAdapter {
    pub fn new(strip: LedStrip, bank: GpioBank) -> Self {
        Self {
            strip,
            bank,
            indicator: Indicator::new(pins::INDICATOR_GPIO),
            readings: Readings::BOOT,
            samples: 0,
            management_started: false,
            #[cfg(target_os = "espidf")]
            temp_sensor: install_temp_sensor(),
        }
    }

    /// Advance the indicator pattern.  Call from the main loop.
    pub fn tick(&mut self, delta_ms: u32) {
        self.indicator.tick(delta_ms);
    }

    pub fn indicator_mode(&self) -> IndicatorMode {
        self.indicator.mode()
    }

    pub fn management_started(&self) -> bool {
        self.management_started
    }

    pub fn samples_taken(&self) -> u32 {
        self.samples
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_sample(&mut self) -> Result<Readings, SensorError> {
        let mut celsius = 0.0_f32;
        // SAFETY: the handle was installed and enabled in new(); main-loop only.
        let ret = unsafe {
            esp_idf_svc::sys::temperature_sensor_get_celsius(self.temp_sensor, &mut celsius)
        };
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            return Err(SensorError::BusFailed);
        }
        Ok(Readings {
            temperature: f64::from(celsius),
            ..self.readings
        })
    }

    /// Deterministic values that drift slightly so successive reports differ.
    #[cfg(not(target_os = "espidf"))]
    fn platform_sample(&mut self) -> Result<Readings, SensorError> {
        let wobble = f64::from(self.samples % 10) / 10.0;
        Ok(Readings {
            temperature: 21.5 + wobble,
            humidity: 45.0 + wobble,
            light: 120.0,
            pressure: 101.3,
            battery_level: 100.0,
        })
    }
}

#[cfg(target_os = "espidf")]
fn install_temp_sensor() -> esp_idf_svc::sys::temperature_sensor_handle_t {
    use esp_idf_svc::sys::*;

    let cfg = temperature_sensor_config_t {
        range_min: -10,
        range_max: 80,
        ..Default::default()
    };
    let mut handle: temperature_sensor_handle_t = core::ptr::null_mut();
    // SAFETY: called once from new(); the handle lives as long as the adapter.
    unsafe {
        if temperature_sensor_install(&cfg, &mut handle) != ESP_OK as i32
            || temperature_sensor_enable(handle) != ESP_OK as i32
        {
            log::warn!("Sensors: internal temperature sensor unavailable");
        }
    }
    handle
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn set_group_power(&mut self, group: LightGroup, on: bool) -> Result<(), ActuatorError> {
        self.strip.set_power(group, on)
    }

    fn set_group_color(&mut self, group: LightGroup, color: Rgb) -> Result<(), ActuatorError> {
        self.strip.set_color(group, color)
    }

    fn group_status(&self, group: LightGroup) -> Result<GroupStatus, ActuatorError> {
        Ok(self.strip.status(group))
    }

    fn set_pin(&mut self, name: &str, high: bool) -> Result<(), ActuatorError> {
        self.bank.set(name, high)
    }

    fn pin(&self, name: &str) -> Result<bool, ActuatorError> {
        self.bank.get(name)
    }

    fn pins(&self) -> heapless::Vec<PinState, 8> {
        self.bank.states()
    }

    fn set_indicator(&mut self, mode: IndicatorMode) {
        self.indicator.set_mode(mode);
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn sample_all(&mut self) -> Result<(), SensorError> {
        self.samples = self.samples.wrapping_add(1);
        self.readings = self.platform_sample()?;
        Ok(())
    }

    fn temperature(&self) -> f64 {
        self.readings.temperature
    }

    fn humidity(&self) -> f64 {
        self.readings.humidity
    }

    fn light(&self) -> f64 {
        self.readings.light
    }

    fn pressure(&self) -> f64 {
        self.readings.pressure
    }

    fn battery_level(&self) -> f64 {
        self.readings.battery_level
    }
}

// ── SystemPort implementation ─────────────────────────────────

impl SystemPort for HardwareAdapter {
    #[cfg(target_os = "espidf")]
    fn reboot(&mut self) {
        info!("System: restarting");
        // SAFETY: esp_restart never returns.
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    #[cfg(not(target_os = "espidf"))]
    fn reboot(&mut self) {
        info!("System(sim): restart requested");
    }

    fn start_management(&mut self) {
        if self.management_started {
            return;
        }
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: plain OTA partition bookkeeping; main-loop only.
            let ret = unsafe { esp_idf_svc::sys::esp_ota_mark_app_valid_cancel_rollback() };
            if ret != esp_idf_svc::sys::ESP_OK as i32 {
                log::warn!("System: image confirm failed (rc={})", ret);
            }
        }
        self.management_started = true;
        info!("System: image management started");
    }
}

// ── DelayNs implementation ────────────────────────────────────

impl DelayNs for HardwareAdapter {
    #[cfg(target_os = "espidf")]
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_hal::delay::Ets::delay_us(ns.div_ceil(1000));
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }
}
