//! ISR-side input edge handling: debounce a GPIO edge and map it to an event.
//!
//! ## Hardware
//!
//! Every lane input is active low with a pull-up: the entry button pulls
//! the line to ground while pressed, a light barrier pulls it low while
//! the beam is interrupted.  The GPIO fires on any edge; the trampoline in
//! [`hw_init`](super::hw_init) reads the level and calls
//! [`EdgeBinding::on_edge`] with the current millisecond clock.
//!
//! | Input               | LOW edge                    | HIGH edge                   | Debounce            |
//! |---------------------|-----------------------------|-----------------------------|---------------------|
//! | Entry button        | `EntryButtonPressed`        | `EntryButtonReleased`       | `button_debounce_ms`|
//! | Entry light barrier | `EntryLightBarrierBlocked`  | `EntryLightBarrierCleared`  | none                |
//! | Exit light barrier  | `ExitLightBarrierBlocked`   | `ExitLightBarrierCleared`   | none                |
//!
//! `on_edge` only touches atomics and the bus's critical-section queue, so
//! it never blocks and never logs.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::events::bus::Publisher;
use crate::events::{Event, EventKind};

/// One input pin's edge → event mapping.
pub struct EdgeBinding {
    pin: i32,
    low_kind: EventKind,
    high_kind: EventKind,
    debounce_ms: u32,
    last_accepted_ms: AtomicU32,
    seen: AtomicBool,
    publisher: Publisher,
}

impl EdgeBinding {
    pub fn new(
        pin: i32,
        low_kind: EventKind,
        high_kind: EventKind,
        debounce_ms: u32,
        publisher: Publisher,
    ) -> Self {
        Self {
            pin,
            low_kind,
            high_kind,
            debounce_ms,
            last_accepted_ms: AtomicU32::new(0),
            seen: AtomicBool::new(false),
            publisher,
        }
    }

    /// Entry ticket button, debounced.
    pub fn entry_button(pin: i32, debounce_ms: u32, publisher: Publisher) -> Self {
        Self::new(
            pin,
            EventKind::EntryButtonPressed,
            EventKind::EntryButtonReleased,
            debounce_ms,
            publisher,
        )
    }

    /// A light barrier; every edge is reported.
    pub fn light_barrier(
        pin: i32,
        blocked: EventKind,
        cleared: EventKind,
        publisher: Publisher,
    ) -> Self {
        Self::new(pin, blocked, cleared, 0, publisher)
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    /// Handle one edge.  Returns `true` if an event was queued.
    ///
    /// Edges arriving within `debounce_ms` of the last accepted edge are
    /// dropped.  A full queue also returns `false` (the bus counts it).
    pub fn on_edge(&self, level_high: bool, now_ms: u32) -> bool {
        if self.debounce_ms > 0 && self.seen.load(Ordering::Acquire) {
            let last = self.last_accepted_ms.load(Ordering::Acquire);
            if now_ms.wrapping_sub(last) < self.debounce_ms {
                return false;
            }
        }
        self.last_accepted_ms.store(now_ms, Ordering::Release);
        self.seen.store(true, Ordering::Release);

        let kind = if level_high {
            self.high_kind
        } else {
            self.low_kind
        };
        self.publisher.publish_from_isr(Event::new(kind))
    }
}
