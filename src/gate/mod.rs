//! Lane gate: barrier actuator + light barrier behind [`GateLane`].
//!
//! ```text
//!           ┌──────────────── Gate<S, M> ────────────────┐
//!  open() ─▶│ open? ──no──▶ motor.drive(Open) ──▶ open=1 │
//! close() ─▶│ open? ─yes──▶ motor.drive(Closed) ─▶ open=0│
//!           │ is_car_detected() ◀── sensor.is_low()      │
//!           └────────────────────────────────────────────┘
//! ```
//!
//! The light barrier is active LOW: an interrupted beam pulls the input
//! low, which reads as "car detected".

pub mod motor;

use std::sync::{Arc, Mutex};

use embedded_hal::digital::InputPin;
use log::{info, warn};

pub use crate::app::ports::{ButtonInput, GateLane};
use crate::error::{Result, SensorError};
use crate::sync::lock;
use motor::{BarrierMotor, BarrierPosition};

// ───────────────────────────────────────────────────────────────
// Hardware gate
// ───────────────────────────────────────────────────────────────

/// A lane gate built from an `embedded-hal` input and a barrier motor.
pub struct Gate<S, M> {
    name: &'static str,
    sensor: S,
    motor: M,
    open: bool,
}

impl<S, M> Gate<S, M>
where
    S: InputPin + Send,
    M: BarrierMotor,
{
    /// Wrap the peripherals and drive the barrier to its closed rest position.
    ///
    /// A barrier that cannot be homed is an initialisation failure.
    pub fn new(name: &'static str, sensor: S, mut motor: M) -> Result<Self> {
        motor.drive(BarrierPosition::Closed)?;
        info!("{}: gate initialised (closed)", name);
        Ok(Self {
            name,
            sensor,
            motor,
            open: false,
        })
    }

    fn drive(&mut self, position: BarrierPosition) {
        if let Err(e) = self.motor.drive(position) {
            warn!("{}: barrier {:?} command failed: {}", self.name, position, e);
        }
    }
}

impl<S, M> GateLane for Gate<S, M>
where
    S: InputPin + Send,
    M: BarrierMotor,
{
    fn open(&mut self) {
        if self.open {
            return;
        }
        info!("{}: opening barrier", self.name);
        self.drive(BarrierPosition::Open);
        self.open = true;
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        info!("{}: closing barrier", self.name);
        self.drive(BarrierPosition::Closed);
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read_car_detected(&mut self) -> core::result::Result<bool, SensorError> {
        self.sensor.is_low().map_err(|_| SensorError::GpioReadFailed)
    }

    fn is_car_detected(&mut self) -> bool {
        self.read_car_detected().unwrap_or_else(|e| {
            warn!("{}: light barrier {}", self.name, e);
            false
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Entry button
// ───────────────────────────────────────────────────────────────

/// Active-low push button on an `embedded-hal` input with pull-up.
pub struct Button<P> {
    pin: P,
}

impl<P: InputPin + Send> Button<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: InputPin + Send> ButtonInput for Button<P> {
    fn is_pressed(&mut self) -> core::result::Result<bool, SensorError> {
        self.pin.is_low().map_err(|_| SensorError::GpioReadFailed)
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated gate
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SimGateState {
    open: bool,
    car_detected: bool,
    open_commands: u32,
    close_commands: u32,
}

/// In-memory gate for host simulation and tests.
///
/// Clones share state: hand one to a controller and keep another to
/// observe the barrier or place a car in the beam.
#[derive(Debug, Clone, Default)]
pub struct SimGate {
    state: Arc<Mutex<SimGateState>>,
}

impl SimGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a car in (or take it out of) the light barrier beam.
    pub fn set_car_detected(&self, detected: bool) {
        lock(&self.state).car_detected = detected;
    }

    /// Actual barrier movements (no-op commands are not counted).
    pub fn open_commands(&self) -> u32 {
        lock(&self.state).open_commands
    }

    pub fn close_commands(&self) -> u32 {
        lock(&self.state).close_commands
    }
}

impl GateLane for SimGate {
    fn open(&mut self) {
        let mut s = lock(&self.state);
        if !s.open {
            s.open = true;
            s.open_commands += 1;
        }
    }

    fn close(&mut self) {
        let mut s = lock(&self.state);
        if s.open {
            s.open = false;
            s.close_commands += 1;
        }
    }

    fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    fn read_car_detected(&mut self) -> core::result::Result<bool, SensorError> {
        Ok(lock(&self.state).car_detected)
    }
}
