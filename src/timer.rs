//! Software one-shot timers.
//!
//! [`TimerService`] runs one background thread that serves any number of
//! one-shot slots.  Each slot is bound to a timeout [`EventKind`]; when its
//! deadline passes the slot disarms and the event is published with
//! `publish_from_isr`, exactly like a hardware timer callback would.
//!
//! ```text
//!   ServiceTimer::start(ms) ──▶ slots[i].deadline = now + ms ──┐
//!                                                             ▼
//!   timer thread: sleep until earliest deadline ──▶ publish(slots[i].kind)
//! ```
//!
//! [`ManualTimer`] never fires on its own.  It records what the controller
//! asked for so tests can expire it deterministically.
//!
//! On the device, `drivers::hw_timer::EspOneShotTimer` implements the same
//! port on top of `esp_timer`.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::app::ports::OneShotTimer;
use crate::events::bus::Publisher;
use crate::events::{Event, EventKind};
use crate::sync::lock;

const TIMER_THREAD_STACK: usize = 4096;

/// Upper bound on one idle wait, so a stopped service is noticed promptly.
const IDLE_WAIT: Duration = Duration::from_millis(500);

// ───────────────────────────────────────────────────────────────
// TimerService
// ───────────────────────────────────────────────────────────────

struct Slot {
    kind: EventKind,
    period_ms: u32,
    deadline: Option<Instant>,
}

struct TimerShared {
    slots: Mutex<Vec<Slot>>,
    wake: Condvar,
    running: AtomicBool,
    publisher: Publisher,
}

impl TimerShared {
    fn run(&self) {
        info!("TimerService: started");
        let mut slots = lock(&self.slots);
        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            for slot in slots.iter_mut() {
                if slot.deadline.is_some_and(|d| d <= now) {
                    slot.deadline = None;
                    debug!("TimerService: {} fired", slot.kind);
                    if !self.publisher.publish_from_isr(Event::new(slot.kind)) {
                        warn!("TimerService: queue full, {} lost", slot.kind);
                    }
                }
            }

            let wait = slots
                .iter()
                .filter_map(|s| s.deadline)
                .min()
                .map_or(IDLE_WAIT, |d| d.saturating_duration_since(now));

            slots = match self.wake.wait_timeout(slots, wait) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        info!("TimerService: stopped");
    }
}

/// Background thread driving any number of [`ServiceTimer`]s.
pub struct TimerService {
    shared: Arc<TimerShared>,
    worker: Option<JoinHandle<()>>,
}

impl TimerService {
    /// Spawn the timer thread.  Expiries are published through `publisher`.
    pub fn spawn(publisher: Publisher) -> std::io::Result<Self> {
        let shared = Arc::new(TimerShared {
            slots: Mutex::new(Vec::new()),
            wake: Condvar::new(),
            running: AtomicBool::new(true),
            publisher,
        });
        let worker = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("timer-service".into())
                .stack_size(TIMER_THREAD_STACK)
                .spawn(move || shared.run())?
        };
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// A new, disarmed one-shot timer that publishes `kind` on expiry.
    pub fn timer(&self, kind: EventKind) -> ServiceTimer {
        let mut slots = lock(&self.shared.slots);
        slots.push(Slot {
            kind,
            period_ms: 0,
            deadline: None,
        });
        ServiceTimer {
            shared: Arc::clone(&self.shared),
            index: slots.len() - 1,
        }
    }

    /// Stop and join the timer thread.  Pending deadlines never fire.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("TimerService: timer thread panicked");
            }
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One slot of a [`TimerService`].
pub struct ServiceTimer {
    shared: Arc<TimerShared>,
    index: usize,
}

impl ServiceTimer {
    fn with_slot<R>(&self, f: impl FnOnce(&mut Slot) -> R) -> R {
        let mut slots = lock(&self.shared.slots);
        f(&mut slots[self.index])
    }
}

impl OneShotTimer for ServiceTimer {
    fn start(&mut self, period_ms: u32) {
        let deadline = Instant::now().checked_add(Duration::from_millis(u64::from(period_ms)));
        self.with_slot(|slot| {
            slot.period_ms = period_ms;
            slot.deadline = deadline;
        });
        self.shared.wake.notify_all();
    }

    fn stop(&mut self) {
        self.with_slot(|slot| slot.deadline = None);
    }

    fn is_armed(&self) -> bool {
        self.with_slot(|slot| slot.deadline.is_some())
    }

    fn period_ms(&self) -> u32 {
        self.with_slot(|slot| slot.period_ms)
    }
}

// ───────────────────────────────────────────────────────────────
// ManualTimer
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ManualState {
    armed: bool,
    period_ms: u32,
    starts: Vec<u32>,
}

/// Deterministic timer for tests and host simulation.
///
/// Clones share state: the controller owns one, the test keeps another.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every period passed to `start`, oldest first.
    pub fn start_history(&self) -> Vec<u32> {
        lock(&self.state).starts.clone()
    }
}

impl OneShotTimer for ManualTimer {
    fn start(&mut self, period_ms: u32) {
        let mut s = lock(&self.state);
        s.armed = true;
        s.period_ms = period_ms;
        s.starts.push(period_ms);
    }

    fn stop(&mut self) {
        lock(&self.state).armed = false;
    }

    fn is_armed(&self) -> bool {
        lock(&self.state).armed
    }

    fn period_ms(&self) -> u32 {
        lock(&self.state).period_ms
    }
}
