//! Exit lane controller.
//!
//! The exit lane is driven by manual ticket validation (console or kiosk),
//! not by the light barrier:
//!
//! ```text
//!  IDLE ──validate_ticket_manually(id)──▶ VALIDATING_TICKET
//!    ▲                                        │        │
//!    │◀──[unknown / unpaid / used]────────────┘        │ consume ok
//!    │   TicketRejected(id)                            ▼ TicketValidated(id), open
//!    │                                         OPENING_BARRIER ──[timeout]──▶ WAITING_FOR_CAR_TO_PASS
//!    │                                                                              │ [blocked]
//!    │                                                                              ▼
//!    └──[timeout]── CLOSING_BARRIER ◀──[timeout]── WAITING_BEFORE_CLOSE ◀──[cleared]── CAR_PASSING
//!                   close, ExitBarrierClosed        CarExitedParking(id), 2 s delay
//! ```
//!
//! A car blocking the exit light barrier while the lane is IDLE is ignored:
//! the barrier only opens for a validated ticket.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use serde::Serialize;

use super::{LaneHardware, POST_PASS_DELAY_MS, bind};
use crate::error::SensorError;
use crate::events::bus::{EventBus, Publisher};
use crate::events::{Event, EventKind};
use crate::sync::lock;
use crate::tickets::{INVALID_TICKET_ID, TicketId, TicketLedger};

/// Exit lane states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExitState {
    Idle,
    ValidatingTicket,
    OpeningBarrier,
    WaitingForCarToPass,
    CarPassing,
    WaitingBeforeClose,
    ClosingBarrier,
}

impl ExitState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::ValidatingTicket => "ValidatingTicket",
            Self::OpeningBarrier => "OpeningBarrier",
            Self::WaitingForCarToPass => "WaitingForCarToPass",
            Self::CarPassing => "CarPassing",
            Self::WaitingBeforeClose => "WaitingBeforeClose",
            Self::ClosingBarrier => "ClosingBarrier",
        }
    }
}

impl core::fmt::Display for ExitState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Controller core
// ═══════════════════════════════════════════════════════════════════════════

struct ExitCore {
    state: ExitState,
    ticket_id: TicketId,
    hw: LaneHardware,
    ledger: Arc<TicketLedger>,
    publisher: Publisher,
    barrier_timeout_ms: u32,
}

impl ExitCore {
    fn set_state(&mut self, next: ExitState) {
        if self.state != next {
            info!("ExitGate: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn publish(&self, event: Event) {
        self.publisher.publish(event);
    }

    fn reject(&mut self, id: TicketId) {
        self.publish(Event::with_ticket(EventKind::TicketRejected, id));
        self.ticket_id = INVALID_TICKET_ID;
        self.set_state(ExitState::Idle);
    }

    fn validate(&mut self, id: TicketId) -> bool {
        if self.state != ExitState::Idle {
            warn!("ExitGate: validation of ticket {} refused, lane busy ({})", id, self.state);
            return false;
        }

        self.ticket_id = id;
        self.set_state(ExitState::ValidatingTicket);

        match self.ledger.ticket_info(id) {
            None => {
                warn!("ExitGate: ticket {} not found", id);
                self.reject(id);
                return false;
            }
            Some(ticket) if !ticket.is_paid => {
                warn!("ExitGate: ticket {} not paid", id);
                self.reject(id);
                return false;
            }
            Some(_) => {}
        }

        let free = match self.ledger.consume(id) {
            Ok(free) => free,
            Err(e) => {
                warn!("ExitGate: ticket {} rejected: {}", id, e);
                self.reject(id);
                return false;
            }
        };

        info!("ExitGate: ticket {} validated", id);
        self.publish(Event::with_ticket(EventKind::TicketValidated, id));
        if free == 1 {
            self.publish(Event::new(EventKind::CapacityAvailable));
        }
        self.set_state(ExitState::OpeningBarrier);
        self.hw.gate.open();
        self.publish(Event::new(EventKind::ExitBarrierOpened));
        self.hw.timer.start(self.barrier_timeout_ms);
        true
    }
}

fn on_light_barrier_blocked(core: &mut ExitCore, _event: &Event) {
    match core.state {
        ExitState::WaitingForCarToPass => {
            info!("ExitGate: car in light barrier");
            core.set_state(ExitState::CarPassing);
        }
        ExitState::Idle => debug!("ExitGate: car waiting at closed barrier, no validated ticket"),
        other => debug!("ExitGate: light barrier blocked ignored in state {}", other),
    }
}

fn on_light_barrier_cleared(core: &mut ExitCore, _event: &Event) {
    if core.state == ExitState::CarPassing {
        info!("ExitGate: car left with ticket {}", core.ticket_id);
        core.publish(Event::with_ticket(EventKind::CarExitedParking, core.ticket_id));
        core.set_state(ExitState::WaitingBeforeClose);
        core.hw.timer.start(POST_PASS_DELAY_MS);
    } else {
        debug!("ExitGate: light barrier cleared ignored in state {}", core.state);
    }
}

fn on_barrier_timeout(core: &mut ExitCore, _event: &Event) {
    match core.state {
        ExitState::OpeningBarrier => core.set_state(ExitState::WaitingForCarToPass),
        ExitState::WaitingBeforeClose => {
            core.set_state(ExitState::ClosingBarrier);
            core.hw.gate.close();
            core.publish(Event::new(EventKind::ExitBarrierClosed));
            core.hw.timer.start(core.barrier_timeout_ms);
        }
        ExitState::ClosingBarrier => {
            core.ticket_id = INVALID_TICKET_ID;
            core.set_state(ExitState::Idle);
        }
        other => debug!("ExitGate: timeout ignored in state {}", other),
    }
}

fn on_validation_timeout(core: &mut ExitCore, _event: &Event) {
    warn!(
        "ExitGate: validation timeout in state {} ignored (manual validation mode)",
        core.state
    );
}

// ═══════════════════════════════════════════════════════════════════════════
//  Public controller
// ═══════════════════════════════════════════════════════════════════════════

/// Exit lane controller.  Subscribes itself to the bus on construction.
pub struct ExitController {
    core: Arc<Mutex<ExitCore>>,
}

impl ExitController {
    pub fn new(
        bus: &EventBus,
        ledger: Arc<TicketLedger>,
        hw: LaneHardware,
        barrier_timeout_ms: u32,
    ) -> Self {
        let core = Arc::new(Mutex::new(ExitCore {
            state: ExitState::Idle,
            ticket_id: INVALID_TICKET_ID,
            hw,
            ledger,
            publisher: bus.publisher(),
            barrier_timeout_ms,
        }));

        bind(bus, &core, EventKind::ExitLightBarrierBlocked, on_light_barrier_blocked);
        bind(bus, &core, EventKind::ExitLightBarrierCleared, on_light_barrier_cleared);
        bind(bus, &core, EventKind::ExitBarrierTimeout, on_barrier_timeout);
        bind(bus, &core, EventKind::ExitValidationTimeout, on_validation_timeout);

        info!("ExitGate: controller ready (barrier timeout {} ms)", barrier_timeout_ms);
        Self { core }
    }

    /// Validate and consume `id`, opening the barrier on success.
    ///
    /// Refused without side effects unless the lane is idle.  Unknown,
    /// unpaid or already used tickets publish `TicketRejected` and leave
    /// the lane idle.
    pub fn validate_ticket_manually(&self, id: TicketId) -> bool {
        lock(&self.core).validate(id)
    }

    pub fn state(&self) -> ExitState {
        lock(&self.core).state
    }

    /// Ticket of the car currently leaving; 0 when idle.
    pub fn current_ticket_id(&self) -> TicketId {
        lock(&self.core).ticket_id
    }

    /// Expire the barrier timer now, as if its period had elapsed.
    pub fn force_barrier_timeout(&self) {
        let mut core = lock(&self.core);
        core.hw.timer.stop();
        on_barrier_timeout(&mut core, &Event::new(EventKind::ExitBarrierTimeout));
    }

    pub fn is_barrier_open(&self) -> bool {
        lock(&self.core).hw.gate.is_open()
    }

    pub fn is_car_detected(&self) -> bool {
        lock(&self.core).hw.gate.is_car_detected()
    }

    pub fn read_car_detected(&self) -> Result<bool, SensorError> {
        lock(&self.core).hw.gate.read_car_detected()
    }

    /// Drive the barrier directly, bypassing the state machine (service use).
    pub fn set_barrier(&self, open: bool) {
        let mut core = lock(&self.core);
        warn!("ExitGate: manual barrier override ({})", if open { "open" } else { "close" });
        if open {
            core.hw.gate.open();
        } else {
            core.hw.gate.close();
        }
    }
}
