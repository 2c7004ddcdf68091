//! Port traits — the boundary between the lane controllers and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Entry/Exit controller (domain)
//! ```
//!
//! Driven adapters (barriers, timers, event sinks) implement these traits.
//! Controllers receive them as boxed trait objects at construction, so the
//! domain core never touches a GPIO or an RTOS timer directly and every
//! lane can be exercised with in-memory doubles.

use crate::error::SensorError;
use crate::events::Event;

// ───────────────────────────────────────────────────────────────
// Gate port (driven adapter: domain ↔ barrier + light barrier)
// ───────────────────────────────────────────────────────────────

/// One lane's barrier actuator plus its vehicle-presence sensor.
///
/// Commands are infallible from the controller's point of view:
/// implementations log actuator failures and keep the commanded state.
pub trait GateLane: Send {
    /// Command the barrier open.  No-op if already open.
    fn open(&mut self);

    /// Command the barrier closed.  No-op if already closed.
    fn close(&mut self);

    /// Last commanded barrier state.
    fn is_open(&self) -> bool;

    /// Sample the light barrier: `Ok(true)` while the beam is interrupted.
    fn read_car_detected(&mut self) -> Result<bool, SensorError>;

    /// Like [`read_car_detected`](Self::read_car_detected), but a failed
    /// read is logged and reported as no car.
    fn is_car_detected(&mut self) -> bool {
        self.read_car_detected().unwrap_or_else(|e| {
            log::warn!("GateLane: light barrier {}", e);
            false
        })
    }
}

/// A momentary push button, read on demand (diagnostics only; presses
/// reach the lanes as debounced bus events).
pub trait ButtonInput: Send {
    /// `Ok(true)` while the button is held down.
    fn is_pressed(&mut self) -> Result<bool, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Timer port (driven adapter: domain → RTOS / host timer)
// ───────────────────────────────────────────────────────────────

/// A single re-programmable one-shot timer owned by one controller.
///
/// Expiry is delivered as that controller's timeout event on the bus,
/// never as a direct callback, so state changes always happen on the
/// dispatch path.
pub trait OneShotTimer: Send {
    /// Arm for `period_ms`.  Re-arming cancels any countdown in flight.
    fn start(&mut self, period_ms: u32);

    /// Disarm without firing.
    fn stop(&mut self);

    fn is_armed(&self) -> bool;

    /// Period of the most recent `start`.
    fn period_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// Receives the controllers' derived events.  Adapters decide where they
/// go (serial log, display, uplink).
pub trait EventSink: Send {
    fn emit(&mut self, event: &Event);
}
