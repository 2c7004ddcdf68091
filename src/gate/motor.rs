//! Barrier motor drivers.
//!
//! Two interchangeable actuators behind [`BarrierMotor`]:
//!
//! | Driver        | HAL trait                   | Open            | Closed          |
//! |---------------|-----------------------------|-----------------|-----------------|
//! | `RelayMotor`  | `embedded_hal` `OutputPin`  | HIGH            | LOW             |
//! | `ServoMotor`  | `embedded_hal` `SetDutyCycle` | 0° (1000 µs)  | 90° (1500 µs)   |
//!
//! The servo runs on a 50 Hz PWM (20 ms period) with the standard
//! 1000–2000 µs pulse spanning 0–180°.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::error::ActuatorError;

/// Commanded barrier position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierPosition {
    Open,
    Closed,
}

/// A barrier actuator.  Drivers are dumb: idempotence and logging live in
/// [`Gate`](super::Gate).
pub trait BarrierMotor: Send {
    fn drive(&mut self, position: BarrierPosition) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Relay / digital motor
// ───────────────────────────────────────────────────────────────

/// Barrier motor switched by a single digital output (HIGH = open).
pub struct RelayMotor<P> {
    pin: P,
}

impl<P: OutputPin + Send> RelayMotor<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin + Send> BarrierMotor for RelayMotor<P> {
    fn drive(&mut self, position: BarrierPosition) -> Result<(), ActuatorError> {
        match position {
            BarrierPosition::Open => self.pin.set_high(),
            BarrierPosition::Closed => self.pin.set_low(),
        }
        .map_err(|_| ActuatorError::GpioWriteFailed)
    }
}

// ───────────────────────────────────────────────────────────────
// Hobby servo motor
// ───────────────────────────────────────────────────────────────

pub const SERVO_PERIOD_US: u16 = 20_000;
pub const SERVO_MIN_PULSE_US: u16 = 1000;
pub const SERVO_MAX_PULSE_US: u16 = 2000;
pub const SERVO_OPEN_DEG: u16 = 0;
pub const SERVO_CLOSED_DEG: u16 = 90;

/// Pulse width for `angle_deg`, clamped to 0–180°.
pub const fn pulse_width_us(angle_deg: u16) -> u16 {
    let angle = (if angle_deg > 180 { 180 } else { angle_deg }) as u32;
    let span = (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US) as u32;
    (SERVO_MIN_PULSE_US as u32 + angle * span / 180) as u16
}

/// Barrier arm on a hobby servo.  The PWM channel must already run at 50 Hz.
pub struct ServoMotor<P> {
    pwm: P,
    angle_deg: u16,
}

impl<P: SetDutyCycle + Send> ServoMotor<P> {
    pub fn new(pwm: P) -> Self {
        Self {
            pwm,
            angle_deg: SERVO_CLOSED_DEG,
        }
    }

    /// Last commanded arm angle.
    pub fn angle_deg(&self) -> u16 {
        self.angle_deg
    }

    pub fn set_angle(&mut self, angle_deg: u16) -> Result<(), ActuatorError> {
        let pulse = pulse_width_us(angle_deg);
        self.pwm
            .set_duty_cycle_fraction(pulse, SERVO_PERIOD_US)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.angle_deg = angle_deg.min(180);
        Ok(())
    }
}

impl<P: SetDutyCycle + Send> BarrierMotor for ServoMotor<P> {
    fn drive(&mut self, position: BarrierPosition) -> Result<(), ActuatorError> {
        match position {
            BarrierPosition::Open => self.set_angle(SERVO_OPEN_DEG),
            BarrierPosition::Closed => self.set_angle(SERVO_CLOSED_DEG),
        }
    }
}
