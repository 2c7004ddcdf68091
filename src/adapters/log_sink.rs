//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing the garage's derived events to the
//! ESP-IDF logger (UART / USB-CDC in production, stderr on the host).
//! A display panel or MQTT adapter would implement the same trait.

use log::{info, warn};

use crate::app::ports::EventSink;
use crate::events::{Event, EventKind};
use crate::tickets::INVALID_TICKET_ID;

/// Adapter that logs every derived [`Event`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events written so far.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &Event) {
        self.emitted = self.emitted.wrapping_add(1);
        let t = event.timestamp_us;
        let id = event.ticket_id().unwrap_or(INVALID_TICKET_ID);
        match event.kind {
            EventKind::TicketIssued => {
                info!("TICKET | issued #{} | t={}us", id, t);
            }
            EventKind::TicketValidated => {
                info!("TICKET | validated #{} | t={}us", id, t);
            }
            EventKind::TicketRejected => {
                warn!("TICKET | rejected #{} | t={}us", id, t);
            }
            EventKind::CapacityFull => warn!("CAPACITY | full | t={}us", t),
            EventKind::CapacityAvailable => info!("CAPACITY | space available | t={}us", t),
            EventKind::CarEnteredParking => {
                info!("CAR | entered #{} | t={}us", id, t);
            }
            EventKind::CarExitedParking => {
                info!("CAR | exited #{} | t={}us", id, t);
            }
            kind => info!("GATE | {} | t={}us", kind, t),
        }
    }
}
