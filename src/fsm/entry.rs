//! Entry lane controller.
//!
//! ```text
//!  IDLE ──[button]──▶ CHECKING_CAPACITY ──[full]──▶ IDLE  (+CapacityFull)
//!                            │
//!                       [space free]
//!                            ▼
//!                     ISSUING_TICKET ──[issue failed]──▶ IDLE
//!                            │ TicketIssued(id), open, EntryBarrierOpened
//!                            ▼
//!                     OPENING_BARRIER ──[timeout]──▶ WAITING_FOR_CAR
//!                                                         │ [blocked]
//!                                                         ▼
//!  IDLE ◀──[timeout]── CLOSING_BARRIER ◀──[timeout]── WAITING_BEFORE_CLOSE ◀──[cleared]── CAR_PASSING
//!           ticket=0     close, EntryBarrierClosed          CarEnteredParking(id), 2 s delay
//! ```
//!
//! Button presses outside IDLE are ignored with a warning.  Light-barrier
//! events are only accepted in the single state that expects them, and a
//! timeout in a state without a timed phase is dropped.

use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use serde::Serialize;

use super::{LaneHardware, POST_PASS_DELAY_MS, bind};
use crate::error::SensorError;
use crate::events::bus::{EventBus, Publisher};
use crate::events::{Event, EventKind};
use crate::sync::lock;
use crate::tickets::{INVALID_TICKET_ID, TicketId, TicketLedger};

/// Entry lane states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntryState {
    Idle,
    CheckingCapacity,
    IssuingTicket,
    OpeningBarrier,
    WaitingForCar,
    CarPassing,
    WaitingBeforeClose,
    ClosingBarrier,
}

impl EntryState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::CheckingCapacity => "CheckingCapacity",
            Self::IssuingTicket => "IssuingTicket",
            Self::OpeningBarrier => "OpeningBarrier",
            Self::WaitingForCar => "WaitingForCar",
            Self::CarPassing => "CarPassing",
            Self::WaitingBeforeClose => "WaitingBeforeClose",
            Self::ClosingBarrier => "ClosingBarrier",
        }
    }
}

impl core::fmt::Display for EntryState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Controller core
// ═══════════════════════════════════════════════════════════════════════════

struct EntryCore {
    state: EntryState,
    ticket_id: TicketId,
    hw: LaneHardware,
    ledger: Arc<TicketLedger>,
    publisher: Publisher,
    barrier_timeout_ms: u32,
}

impl EntryCore {
    fn set_state(&mut self, next: EntryState) {
        if self.state != next {
            info!("EntryGate: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn publish(&self, event: Event) {
        self.publisher.publish(event);
    }
}

fn on_button_pressed(core: &mut EntryCore, _event: &Event) {
    if core.state != EntryState::Idle {
        warn!("EntryGate: button ignored in state {}", core.state);
        return;
    }

    core.set_state(EntryState::CheckingCapacity);
    let active = core.ledger.active_count();
    let capacity = core.ledger.capacity();
    if active >= capacity {
        warn!("EntryGate: parking full ({}/{})", active, capacity);
        core.publish(Event::new(EventKind::CapacityFull));
        core.set_state(EntryState::Idle);
        return;
    }

    core.set_state(EntryState::IssuingTicket);
    match core.ledger.issue_ticket() {
        Ok(id) => {
            core.ticket_id = id;
            core.publish(Event::with_ticket(EventKind::TicketIssued, id));
            core.set_state(EntryState::OpeningBarrier);
            core.hw.gate.open();
            core.publish(Event::new(EventKind::EntryBarrierOpened));
            core.hw.timer.start(core.barrier_timeout_ms);
        }
        Err(e) => {
            error!("EntryGate: ticket issue failed: {}", e);
            core.set_state(EntryState::Idle);
        }
    }
}

fn on_light_barrier_blocked(core: &mut EntryCore, _event: &Event) {
    if core.state == EntryState::WaitingForCar {
        info!("EntryGate: car in light barrier");
        core.set_state(EntryState::CarPassing);
    } else {
        debug!("EntryGate: light barrier blocked ignored in state {}", core.state);
    }
}

fn on_light_barrier_cleared(core: &mut EntryCore, _event: &Event) {
    if core.state == EntryState::CarPassing {
        info!("EntryGate: car passed with ticket {}", core.ticket_id);
        core.publish(Event::with_ticket(EventKind::CarEnteredParking, core.ticket_id));
        core.set_state(EntryState::WaitingBeforeClose);
        core.hw.timer.start(POST_PASS_DELAY_MS);
    } else {
        debug!("EntryGate: light barrier cleared ignored in state {}", core.state);
    }
}

fn on_barrier_timeout(core: &mut EntryCore, _event: &Event) {
    match core.state {
        EntryState::OpeningBarrier => core.set_state(EntryState::WaitingForCar),
        EntryState::WaitingBeforeClose => {
            core.set_state(EntryState::ClosingBarrier);
            core.hw.gate.close();
            core.publish(Event::new(EventKind::EntryBarrierClosed));
            core.hw.timer.start(core.barrier_timeout_ms);
        }
        EntryState::ClosingBarrier => {
            core.ticket_id = INVALID_TICKET_ID;
            core.set_state(EntryState::Idle);
        }
        other => debug!("EntryGate: timeout ignored in state {}", other),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Public controller
// ═══════════════════════════════════════════════════════════════════════════

/// Entry lane controller.  Subscribes itself to the bus on construction.
pub struct EntryController {
    core: Arc<Mutex<EntryCore>>,
}

impl EntryController {
    pub fn new(
        bus: &EventBus,
        ledger: Arc<TicketLedger>,
        hw: LaneHardware,
        barrier_timeout_ms: u32,
    ) -> Self {
        let core = Arc::new(Mutex::new(EntryCore {
            state: EntryState::Idle,
            ticket_id: INVALID_TICKET_ID,
            hw,
            ledger,
            publisher: bus.publisher(),
            barrier_timeout_ms,
        }));

        bind(bus, &core, EventKind::EntryButtonPressed, on_button_pressed);
        bind(bus, &core, EventKind::EntryLightBarrierBlocked, on_light_barrier_blocked);
        bind(bus, &core, EventKind::EntryLightBarrierCleared, on_light_barrier_cleared);
        bind(bus, &core, EventKind::EntryBarrierTimeout, on_barrier_timeout);

        info!("EntryGate: controller ready (barrier timeout {} ms)", barrier_timeout_ms);
        Self { core }
    }

    pub fn state(&self) -> EntryState {
        lock(&self.core).state
    }

    /// Ticket of the car currently being admitted; 0 when idle.
    pub fn current_ticket_id(&self) -> TicketId {
        lock(&self.core).ticket_id
    }

    /// Expire the barrier timer now, as if its period had elapsed.
    pub fn force_barrier_timeout(&self) {
        let mut core = lock(&self.core);
        core.hw.timer.stop();
        on_barrier_timeout(&mut core, &Event::new(EventKind::EntryBarrierTimeout));
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
        warn!("EntryGate: manual barrier override ({})", if open { "open" } else { "close" });
        if open {
            core.hw.gate.open();
        } else {
            core.hw.gate.close();
        }
    }
}
