//! Event-driven lane state machines.
//!
//! Each lane controller owns a small core (state, current ticket, gate,
//! one-shot timer) behind its own mutex.  At construction the controller
//! binds plain `fn` handlers to the event kinds it reacts to:
//!
//! ```text
//! ┌─────────────┐  kind  ┌────────────────────┐   lock   ┌──────────────┐
//! │  EventBus   │───────▶│ fn(&mut Core, &Ev) │─────────▶│ Arc<Mutex<   │
//! │  dispatch   │        │  (bound handler)   │          │   Core>>     │
//! └─────────────┘        └────────────────────┘          └──────────────┘
//! ```
//!
//! Timer expiry arrives as the lane's timeout event, so every transition
//! runs on the dispatch path.  The one exception is the exit lane's manual
//! validation entry point, which takes the same core lock.
//!
//! Lock order: bus subscriber lock → controller core → ledger / queue.

pub mod entry;
pub mod exit;

use std::sync::{Arc, Mutex};

use crate::app::ports::{GateLane, OneShotTimer};
use crate::events::bus::EventBus;
use crate::events::{Event, EventKind};
use crate::sync::lock;

/// Delay between the car clearing the light barrier and the barrier closing.
pub const POST_PASS_DELAY_MS: u32 = 2000;

/// Signature of a bound state handler.
pub type CoreHandler<C> = fn(&mut C, &Event);

/// The per-lane peripherals a controller takes ownership of.
pub struct LaneHardware {
    pub gate: Box<dyn GateLane>,
    pub timer: Box<dyn OneShotTimer>,
}

impl LaneHardware {
    pub fn new(gate: impl GateLane + 'static, timer: impl OneShotTimer + 'static) -> Self {
        Self {
            gate: Box::new(gate),
            timer: Box::new(timer),
        }
    }
}

/// Subscribe `handler` for `kind`, running it under `core`'s lock.
pub(crate) fn bind<C: Send + 'static>(
    bus: &EventBus,
    core: &Arc<Mutex<C>>,
    kind: EventKind,
    handler: CoreHandler<C>,
) {
    let core = Arc::clone(core);
    bus.subscribe(kind, move |event| handler(&mut lock(&core), event));
}
