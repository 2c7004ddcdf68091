//! Inbound commands to the parking system.
//!
//! These are the typed form of what an operator console, kiosk or test
//! harness asks for.  Text parsing lives outside the crate; the
//! [`ParkingSystem`](super::service::ParkingSystem) interprets the typed
//! command and answers with a [`CommandOutcome`](super::status::CommandOutcome).

use serde::Serialize;

use crate::events::EventKind;
use crate::tickets::TicketId;

/// One of the two lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lane {
    Entry,
    Exit,
}

/// Commands that external adapters can send into the parking system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GarageCommand {
    /// Capacity, lane states, sensor and barrier levels.
    Status,

    /// Every ticket in the ledger.
    ListTickets,

    /// Mark a ticket paid (payment terminal).
    PayTicket(TicketId),

    /// Present a ticket at the exit.
    ValidateTicket(TicketId),

    /// Inject a hardware event, as if the sensor had fired.
    Publish(EventKind),

    /// Names of the injectable event kinds.
    ListEventKinds,

    /// Drive a barrier directly, bypassing the lane state machine (service only).
    SetBarrier { lane: Lane, open: bool },

    /// Read a lane's light barrier.
    ReadCarDetected(Lane),

    /// Read the entry ticket button level.
    ReadEntryButton,
}
