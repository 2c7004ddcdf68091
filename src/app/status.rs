//! Outbound answers of the parking system.
//!
//! [`GarageStatus`] is the point-in-time snapshot shown on the operator
//! console; [`CommandOutcome`] / [`CommandError`] answer a
//! [`GarageCommand`](super::commands::GarageCommand).

use core::fmt;

use serde::Serialize;

use super::commands::Lane;
use crate::error::{Error, SensorError};
use crate::events::EventKind;
use crate::fsm::entry::EntryState;
use crate::fsm::exit::ExitState;
use crate::tickets::{Ticket, TicketError, TicketId};

/// A point-in-time snapshot suitable for the console or for transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GarageStatus {
    pub capacity: u32,
    pub active: u32,
    pub free: u32,
    pub entry_state: EntryState,
    pub exit_state: ExitState,
    pub entry_barrier_open: bool,
    pub exit_barrier_open: bool,
    pub entry_car_detected: bool,
    pub exit_car_detected: bool,
    pub dropped_events: u32,
}

fn beam(detected: bool) -> &'static str {
    if detected { "BLOCKED" } else { "CLEAR" }
}

fn barrier(open: bool) -> &'static str {
    if open { "OPEN" } else { "CLOSED" }
}

impl fmt::Display for GarageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Parking System Status ===")?;
        writeln!(f, "Capacity: {}/{} ({} free)", self.active, self.capacity, self.free)?;
        writeln!(f, "Entry Gate: {}", self.entry_state)?;
        writeln!(f, "Exit Gate: {}", self.exit_state)?;
        writeln!(f, "Entry Light Barrier: {}", beam(self.entry_car_detected))?;
        writeln!(f, "Exit Light Barrier: {}", beam(self.exit_car_detected))?;
        writeln!(f, "Entry Barrier: {}", barrier(self.entry_barrier_open))?;
        writeln!(f, "Exit Barrier: {}", barrier(self.exit_barrier_open))?;
        if self.dropped_events > 0 {
            writeln!(f, "Dropped Events: {}", self.dropped_events)?;
        }
        Ok(())
    }
}

/// Successful answer to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CommandOutcome {
    Status(GarageStatus),
    Tickets(Vec<Ticket>),
    TicketPaid(TicketId),
    /// The exit barrier is opening for this ticket.
    TicketAccepted(TicketId),
    Published(EventKind),
    EventKinds(Vec<EventKind>),
    BarrierSet { lane: Lane, open: bool },
    CarDetected { lane: Lane, detected: bool },
    EntryButton { pressed: bool },
}

/// Why a command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The ledger refused the operation.
    Ticket(TicketError),
    /// The exit lane rejected the ticket or was busy with another car.
    ValidationRefused(TicketId),
    /// Only hardware events may be injected.
    NotInjectable(EventKind),
    /// A diagnostic read hit a hardware fault.
    Hardware(Error),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ticket(e) => write!(f, "{e}"),
            Self::ValidationRefused(id) => write!(f, "ticket {id} refused at exit"),
            Self::NotInjectable(kind) => write!(f, "{kind} cannot be injected"),
            Self::Hardware(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<TicketError> for CommandError {
    fn from(e: TicketError) -> Self {
        Self::Ticket(e)
    }
}

impl From<SensorError> for CommandError {
    fn from(e: SensorError) -> Self {
        Self::Hardware(Error::Sensor(e))
    }
}
