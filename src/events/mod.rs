//! Garage event vocabulary and the publish/subscribe bus.
//!
//! Events are produced by:
//! - GPIO ISRs (entry button, light barriers)
//! - One-shot timers (barrier travel, post-pass delay)
//! - The lane controllers themselves (derived events)
//! - The console layer (injected hardware events)
//!
//! and consumed by handlers registered on the [`bus::EventBus`].
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ GPIO ISR    │────▶│              │     │ EntryController  │
//! │ Timer task  │────▶│  Event Queue │────▶│ ExitController   │
//! │ Controllers │────▶│  (depth 32)  │     │ Log sink         │
//! │ Console     │────▶│              │     │                  │
//! └─────────────┘     └──────────────┘     └──────────────────┘
//! ```

pub mod bus;

use core::fmt;

use serde::Serialize;

use crate::tickets::TicketId;

/// Every event kind known to the garage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum EventKind {
    // ── Hardware inputs ───────────────────────────────────
    EntryButtonPressed = 0,
    EntryButtonReleased = 1,
    EntryLightBarrierBlocked = 2,
    EntryLightBarrierCleared = 3,
    ExitLightBarrierBlocked = 4,
    ExitLightBarrierCleared = 5,

    // ── System ────────────────────────────────────────────
    CapacityAvailable = 10,
    CapacityFull = 11,
    TicketIssued = 12,
    TicketValidated = 13,
    TicketRejected = 14,

    // ── Lane state ────────────────────────────────────────
    EntryBarrierOpened = 20,
    EntryBarrierClosed = 21,
    ExitBarrierOpened = 22,
    ExitBarrierClosed = 23,
    CarEnteredParking = 24,
    CarExitedParking = 25,

    // ── Timers ────────────────────────────────────────────
    /// The entry lane's one-shot barrier timer expired.
    EntryBarrierTimeout = 30,
    /// The exit lane's one-shot barrier timer expired.
    ExitBarrierTimeout = 31,
    /// Automatic ticket validation window expired (unused in manual mode).
    ExitValidationTimeout = 32,
}

impl EventKind {
    /// The full vocabulary, in declaration order.
    pub const ALL: [Self; 20] = [
        Self::EntryButtonPressed,
        Self::EntryButtonReleased,
        Self::EntryLightBarrierBlocked,
        Self::EntryLightBarrierCleared,
        Self::ExitLightBarrierBlocked,
        Self::ExitLightBarrierCleared,
        Self::CapacityAvailable,
        Self::CapacityFull,
        Self::TicketIssued,
        Self::TicketValidated,
        Self::TicketRejected,
        Self::EntryBarrierOpened,
        Self::EntryBarrierClosed,
        Self::ExitBarrierOpened,
        Self::ExitBarrierClosed,
        Self::CarEnteredParking,
        Self::CarExitedParking,
        Self::EntryBarrierTimeout,
        Self::ExitBarrierTimeout,
        Self::ExitValidationTimeout,
    ];

    /// Stable display name, also accepted by [`from_name`](Self::from_name).
    pub const fn name(self) -> &'static str {
        match self {
            Self::EntryButtonPressed => "EntryButtonPressed",
            Self::EntryButtonReleased => "EntryButtonReleased",
            Self::EntryLightBarrierBlocked => "EntryLightBarrierBlocked",
            Self::EntryLightBarrierCleared => "EntryLightBarrierCleared",
            Self::ExitLightBarrierBlocked => "ExitLightBarrierBlocked",
            Self::ExitLightBarrierCleared => "ExitLightBarrierCleared",
            Self::CapacityAvailable => "CapacityAvailable",
            Self::CapacityFull => "CapacityFull",
            Self::TicketIssued => "TicketIssued",
            Self::TicketValidated => "TicketValidated",
            Self::TicketRejected => "TicketRejected",
            Self::EntryBarrierOpened => "EntryBarrierOpened",
            Self::EntryBarrierClosed => "EntryBarrierClosed",
            Self::ExitBarrierOpened => "ExitBarrierOpened",
            Self::ExitBarrierClosed => "ExitBarrierClosed",
            Self::CarEnteredParking => "CarEnteredParking",
            Self::CarExitedParking => "CarExitedParking",
            Self::EntryBarrierTimeout => "EntryBarrierTimeout",
            Self::ExitBarrierTimeout => "ExitBarrierTimeout",
            Self::ExitValidationTimeout => "ExitValidationTimeout",
        }
    }

    /// Look up a kind by its display name (exact match).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Hardware kinds the console may inject to simulate sensors.
    pub const fn is_injectable(self) -> bool {
        matches!(
            self,
            Self::EntryButtonPressed
                | Self::EntryButtonReleased
                | Self::EntryLightBarrierBlocked
                | Self::EntryLightBarrierCleared
                | Self::ExitLightBarrierBlocked
                | Self::ExitLightBarrierCleared
        )
    }

    /// Kinds produced by the controllers rather than by hardware or timers.
    pub const fn is_derived(self) -> bool {
        matches!(
            self,
            Self::CapacityAvailable
                | Self::CapacityFull
                | Self::TicketIssued
                | Self::TicketValidated
                | Self::TicketRejected
                | Self::EntryBarrierOpened
                | Self::EntryBarrierClosed
                | Self::ExitBarrierOpened
                | Self::ExitBarrierClosed
                | Self::CarEnteredParking
                | Self::CarExitedParking
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Optional event payload.  A closed set: most events carry nothing,
/// ticket events carry the ticket id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Payload {
    #[default]
    None,
    TicketId(TicketId),
    Flag(bool),
}

/// A single bus event.  Small and `Copy` so it fits the ISR-side queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    /// Monotonic microseconds.  Zero means "stamp at publish time".
    pub timestamp_us: u64,
    pub payload: Payload,
}

impl Event {
    /// A payload-free event, stamped when published.
    pub const fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp_us: 0,
            payload: Payload::None,
        }
    }

    /// An event carrying a ticket id.
    pub const fn with_ticket(kind: EventKind, id: TicketId) -> Self {
        Self {
            kind,
            timestamp_us: 0,
            payload: Payload::TicketId(id),
        }
    }

    /// The ticket id carried by this event, if any.
    pub const fn ticket_id(&self) -> Option<TicketId> {
        match self.payload {
            Payload::TicketId(id) => Some(id),
            _ => None,
        }
    }
}
