//! Ticket ledger, the one resource shared by both lanes.
//!
//! The ledger is the authority on capacity: every issued, not yet consumed
//! ticket occupies one space.  All operations run under a single mutex so
//! capacity checks and state changes are atomic with respect to each other,
//! whichever lane (or console) calls them.
//!
//! ```text
//!   issue ──▶ [unpaid] ──pay──▶ [paid] ──validate_and_consume──▶ [used]
//!                │                                                  │
//!                └──────────── occupies a space ◀───────────────────┘ frees it
//! ```

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Mutex;

use log::{info, warn};
use serde::Serialize;

use crate::adapters::time::monotonic_us;
use crate::sync::lock;

/// Ticket identifier.  Sequential from 1; never reused until [`TicketLedger::reset`].
pub type TicketId = u32;

/// Reserved id meaning "no ticket".
pub const INVALID_TICKET_ID: TicketId = 0;

/// A single parking ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub id: TicketId,
    pub entry_timestamp_us: u64,
    /// Zero while unpaid.
    pub payment_timestamp_us: u64,
    pub is_paid: bool,
    /// Consumed at the exit.  Implies `is_paid`.
    pub is_used: bool,
}

/// Policy outcomes of ledger operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketError {
    /// Every space is taken; no ticket was issued.
    CapacityFull,
    /// No ticket with this id was ever issued (or the ledger was reset).
    UnknownTicket,
    /// The ticket was already consumed at the exit.
    AlreadyUsed,
    /// The ticket has not been paid.
    NotPaid,
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityFull => write!(f, "parking full"),
            Self::UnknownTicket => write!(f, "unknown ticket"),
            Self::AlreadyUsed => write!(f, "ticket already used"),
            Self::NotPaid => write!(f, "ticket not paid"),
        }
    }
}

impl std::error::Error for TicketError {}

struct LedgerState {
    capacity: u32,
    next_id: TicketId,
    tickets: BTreeMap<TicketId, Ticket>,
}

impl LedgerState {
    fn active_count(&self) -> u32 {
        self.tickets.values().filter(|t| !t.is_used).count() as u32
    }
}

/// Thread-safe, capacity-limited ticket store.
pub struct TicketLedger {
    state: Mutex<LedgerState>,
}

impl TicketLedger {
    pub fn new(capacity: u32) -> Self {
        info!("Ledger: initialised with capacity {}", capacity);
        Self {
            state: Mutex::new(LedgerState {
                capacity,
                next_id: 1,
                tickets: BTreeMap::new(),
            }),
        }
    }

    /// Issue the next sequential ticket, unless the garage is full.
    pub fn issue_ticket(&self) -> Result<TicketId, TicketError> {
        let mut state = lock(&self.state);
        let active = state.active_count();
        if active >= state.capacity {
            warn!("Ledger: cannot issue ticket, parking full ({}/{})", active, state.capacity);
            return Err(TicketError::CapacityFull);
        }

        let id = state.next_id;
        state.next_id += 1;
        state.tickets.insert(
            id,
            Ticket {
                id,
                entry_timestamp_us: monotonic_us(),
                payment_timestamp_us: 0,
                is_paid: false,
                is_used: false,
            },
        );
        info!("Ledger: ticket issued ID={} (active: {}/{})", id, active + 1, state.capacity);
        Ok(id)
    }

    /// Mark a ticket paid.  Paying twice is accepted and keeps the first
    /// payment time.
    pub fn pay_ticket(&self, id: TicketId) -> Result<(), TicketError> {
        let mut state = lock(&self.state);
        let Some(ticket) = state.tickets.get_mut(&id) else {
            warn!("Ledger: pay failed, ticket {} not found", id);
            return Err(TicketError::UnknownTicket);
        };
        if ticket.is_paid {
            info!("Ledger: ticket {} already paid", id);
            return Ok(());
        }
        ticket.is_paid = true;
        ticket.payment_timestamp_us = monotonic_us();
        info!("Ledger: ticket {} paid", id);
        Ok(())
    }

    /// Consume a paid ticket at the exit, freeing its space.
    /// Succeeds at most once per id.
    pub fn validate_and_consume(&self, id: TicketId) -> Result<(), TicketError> {
        self.consume(id).map(|_| ())
    }

    /// [`validate_and_consume`](Self::validate_and_consume), returning the
    /// free spaces left right after the consume, under the same lock.
    pub fn consume(&self, id: TicketId) -> Result<u32, TicketError> {
        let mut state = lock(&self.state);
        let Some(ticket) = state.tickets.get_mut(&id) else {
            warn!("Ledger: validation failed, ticket {} not found", id);
            return Err(TicketError::UnknownTicket);
        };
        if ticket.is_used {
            warn!("Ledger: validation failed, ticket {} already used", id);
            return Err(TicketError::AlreadyUsed);
        }
        if !ticket.is_paid {
            warn!("Ledger: validation failed, ticket {} not paid", id);
            return Err(TicketError::NotPaid);
        }
        ticket.is_used = true;
        let active = state.active_count();
        info!("Ledger: ticket {} validated (active: {}/{})", id, active, state.capacity);
        Ok(state.capacity.saturating_sub(active))
    }

    /// Snapshot of one ticket.
    pub fn ticket_info(&self, id: TicketId) -> Option<Ticket> {
        lock(&self.state).tickets.get(&id).copied()
    }

    /// Snapshot of every ticket, ordered by id.
    pub fn tickets(&self) -> Vec<Ticket> {
        lock(&self.state).tickets.values().copied().collect()
    }

    /// Tickets issued and not yet consumed.
    pub fn active_count(&self) -> u32 {
        lock(&self.state).active_count()
    }

    pub fn capacity(&self) -> u32 {
        lock(&self.state).capacity
    }

    pub fn free_spaces(&self) -> u32 {
        let state = lock(&self.state);
        state.capacity.saturating_sub(state.active_count())
    }

    /// Forget every ticket and restart numbering at 1.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.tickets.clear();
        state.next_id = 1;
        info!("Ledger: reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_from_one() {
        let ledger = TicketLedger::new(3);
        assert_eq!(ledger.issue_ticket(), Ok(1));
        assert_eq!(ledger.issue_ticket(), Ok(2));
        assert_eq!(ledger.issue_ticket(), Ok(3));
        assert_eq!(ledger.active_count(), 3);
    }

    #[test]
    fn full_ledger_refuses_to_issue() {
        let ledger = TicketLedger::new(1);
        let id = ledger.issue_ticket().unwrap();
        assert_eq!(ledger.issue_ticket(), Err(TicketError::CapacityFull));
        assert_eq!(ledger.free_spaces(), 0);

        ledger.pay_ticket(id).unwrap();
        ledger.validate_and_consume(id).unwrap();
        assert_eq!(ledger.free_spaces(), 1);
        assert_eq!(ledger.issue_ticket(), Ok(2), "ids are not reused");
    }

    #[test]
    fn new_ticket_is_unpaid_and_unused() {
        let ledger = TicketLedger::new(5);
        let id = ledger.issue_ticket().unwrap();
        let t = ledger.ticket_info(id).unwrap();
        assert!(!t.is_paid);
        assert!(!t.is_used);
        assert_eq!(t.payment_timestamp_us, 0);
        assert!(t.entry_timestamp_us > 0);
    }

    #[test]
    fn paying_twice_keeps_first_timestamp() {
        let ledger = TicketLedger::new(5);
        let id = ledger.issue_ticket().unwrap();
        ledger.pay_ticket(id).unwrap();
        let first = ledger.ticket_info(id).unwrap().payment_timestamp_us;
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(ledger.pay_ticket(id), Ok(()));
        assert_eq!(ledger.ticket_info(id).unwrap().payment_timestamp_us, first);
    }

    #[test]
    fn pay_unknown_ticket_fails() {
        let ledger = TicketLedger::new(5);
        assert_eq!(ledger.pay_ticket(99), Err(TicketError::UnknownTicket));
        assert_eq!(ledger.pay_ticket(INVALID_TICKET_ID), Err(TicketError::UnknownTicket));
    }

    #[test]
    fn validation_checks_in_order() {
        let ledger = TicketLedger::new(5);
        assert_eq!(ledger.validate_and_consume(1), Err(TicketError::UnknownTicket));

        let id = ledger.issue_ticket().unwrap();
        assert_eq!(ledger.validate_and_consume(id), Err(TicketError::NotPaid));

        ledger.pay_ticket(id).unwrap();
        assert_eq!(ledger.validate_and_consume(id), Ok(()));
        assert_eq!(ledger.validate_and_consume(id), Err(TicketError::AlreadyUsed));

        let t = ledger.ticket_info(id).unwrap();
        assert!(t.is_used && t.is_paid);
        assert_eq!(ledger.active_count(), 0);
    }

    #[test]
    fn consume_reports_free_spaces_after_release() {
        let ledger = TicketLedger::new(2);
        let a = ledger.issue_ticket().unwrap();
        let b = ledger.issue_ticket().unwrap();
        ledger.pay_ticket(a).unwrap();
        ledger.pay_ticket(b).unwrap();

        assert_eq!(ledger.consume(a), Ok(1));
        assert_eq!(ledger.consume(a), Err(TicketError::AlreadyUsed));
        assert_eq!(ledger.consume(b), Ok(2));
    }

    #[test]
    fn reset_clears_tickets_and_numbering() {
        let ledger = TicketLedger::new(5);
        ledger.issue_ticket().unwrap();
        ledger.issue_ticket().unwrap();
        ledger.reset();
        assert!(ledger.tickets().is_empty());
        assert_eq!(ledger.ticket_info(1), None);
        assert_eq!(ledger.issue_ticket(), Ok(1));
    }

    #[test]
    fn snapshot_is_ordered_by_id() {
        let ledger = TicketLedger::new(5);
        for _ in 0..4 {
            ledger.issue_ticket().unwrap();
        }
        let ids: Vec<_> = ledger.tickets().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
