//! ParkGate Firmware — Main Entry Point
//!
//! Two barrier lanes sharing one ticket ledger, driven by GPIO edges and
//! esp_timer expiries through a single event bus.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EdgeBinding ×3     Gate<PinDriver, ServoMotor> ×2             │
//! │  (GPIO ISRs)        (light barrier + barrier arm)              │
//! │  EspOneShotTimer ×2 LogEventSink                               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ParkingSystem (pure logic)                  │    │
//! │  │  EntryController · TicketLedger · ExitController       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  EventBus ◀── EventLoop (dispatch thread)                      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::gpio::{AnyIOPin, Input, PinDriver, Pull};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use parkgate::adapters::log_sink::LogEventSink;
use parkgate::app::service::ParkingSystem;
use parkgate::config::GarageConfig;
use parkgate::drivers::edge::EdgeBinding;
use parkgate::drivers::hw_init::install_edge_isrs;
use parkgate::drivers::hw_timer::EspOneShotTimer;
use parkgate::events::EventKind;
use parkgate::events::bus::{EventBus, EventLoop};
use parkgate::fsm::LaneHardware;
use parkgate::gate::{Button, Gate};
use parkgate::gate::motor::ServoMotor;

const SERVO_PWM_HZ: u32 = 50;
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Input pin with the internal pull-up; every lane input is active low.
fn input(pin: i32) -> Result<PinDriver<'static, AnyIOPin, Input>> {
    // SAFETY: the validated config guarantees every pin number is used once.
    let mut driver = PinDriver::input(unsafe { AnyIOPin::new(pin) })?;
    driver.set_pull(Pull::Up)?;
    Ok(driver)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ParkGate v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = GarageConfig::default();
    config.validate()?;
    let pins = config.pins;

    // ── 2. Servo PWM (50 Hz, shared by both barrier arms) ─────
    let peripherals = Peripherals::take()?;
    let servo_timer: &'static _ = Box::leak(Box::new(LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new()
            .frequency(Hertz(SERVO_PWM_HZ))
            .resolution(Resolution::Bits14),
    )?));
    // SAFETY: motor pins are distinct from each other and from the inputs.
    let entry_pwm = LedcDriver::new(peripherals.ledc.channel0, servo_timer, unsafe {
        AnyIOPin::new(pins.entry_motor)
    })?;
    let exit_pwm = LedcDriver::new(peripherals.ledc.channel1, servo_timer, unsafe {
        AnyIOPin::new(pins.exit_motor)
    })?;

    // ── 3. Lanes ──────────────────────────────────────────────
    let bus = Arc::new(EventBus::new());
    let entry_gate = Gate::new(
        "EntryGate",
        input(pins.entry_light_barrier)?,
        ServoMotor::new(entry_pwm),
    )?;
    let exit_gate = Gate::new(
        "ExitGate",
        input(pins.exit_light_barrier)?,
        ServoMotor::new(exit_pwm),
    )?;
    let entry_timer =
        EspOneShotTimer::new(c"entry_barrier", EventKind::EntryBarrierTimeout, bus.publisher())?;
    let exit_timer =
        EspOneShotTimer::new(c"exit_barrier", EventKind::ExitBarrierTimeout, bus.publisher())?;

    let system = ParkingSystem::new(
        config,
        Arc::clone(&bus),
        LaneHardware::new(entry_gate, entry_timer),
        LaneHardware::new(exit_gate, exit_timer),
    )?;
    system.attach_sink(LogEventSink::new());

    // ── 4. Inputs → bus ───────────────────────────────────────
    // Edges are read in the ISR; the driver serves console level reads.
    system.attach_entry_button(Button::new(input(pins.entry_button)?));
    let bindings: [&'static EdgeBinding; 3] = [
        Box::leak(Box::new(EdgeBinding::entry_button(
            pins.entry_button,
            system.config().button_debounce_ms,
            bus.publisher(),
        ))),
        Box::leak(Box::new(EdgeBinding::light_barrier(
            pins.entry_light_barrier,
            EventKind::EntryLightBarrierBlocked,
            EventKind::EntryLightBarrierCleared,
            bus.publisher(),
        ))),
        Box::leak(Box::new(EdgeBinding::light_barrier(
            pins.exit_light_barrier,
            EventKind::ExitLightBarrierBlocked,
            EventKind::ExitLightBarrierCleared,
            bus.publisher(),
        ))),
    ];
    install_edge_isrs(&bindings)?;

    // ── 5. Dispatch ───────────────────────────────────────────
    let event_loop = EventLoop::spawn(Arc::clone(&bus))?;
    info!("System ready. Capacity {}.", system.config().capacity);

    let mut last_dropped = 0;
    loop {
        std::thread::sleep(STATUS_INTERVAL);
        if !event_loop.is_running() {
            error!("EventBus: dispatch thread died, lanes no longer react");
        }
        let status = system.status();
        info!("\n{}", status);
        if status.dropped_events != last_dropped {
            warn!(
                "EventBus: {} events dropped since start-up",
                status.dropped_events
            );
            last_dropped = status.dropped_events;
        }
    }
}
