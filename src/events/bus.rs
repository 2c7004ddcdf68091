//! Publish/subscribe event bus.
//!
//! ```text
//!  publish() ─────────┐                    ┌──▶ handler (kind A) #1
//!  publish_from_isr() ┼──▶ Channel<32> ──▶ │──▶ handler (kind A) #2
//!  Publisher::*  ─────┘   (critical sect.) └──▶ handler (kind B) #1
//!                              │
//!                       wait_for_next() / process_all_pending()
//! ```
//!
//! Producers only touch the bounded queue (an `embassy-sync` channel behind
//! a critical section), so they are safe from interrupt context and never
//! contend with dispatch.  Dispatch holds the subscriber lock for the whole
//! of a handler invocation: handlers must be short, and must not subscribe
//! or drain the bus themselves.  Handlers that publish only enqueue; the
//! new event is dispatched on a later drain, never inline.
//!
//! The queue is lossy by policy.  A full queue drops the newest event,
//! bumps [`EventBus::dropped_count`] and logs a warning (task context only).

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::HistoryBuffer;
use log::{debug, info, warn};

use super::{Event, EventKind};
use crate::adapters::time::monotonic_us;
use crate::sync::lock;

/// Maximum number of undispatched events.
pub const QUEUE_DEPTH: usize = 32;

/// Number of recently dispatched events kept for diagnostics.
pub const HISTORY_DEPTH: usize = 16;

/// ISR publishes do not ring the doorbell, so waiters re-check the queue
/// at least this often.
const ISR_POLL_SLICE: Duration = Duration::from_millis(10);

/// Per-iteration wait of the background event loop.
const EVENT_LOOP_SLICE: Duration = Duration::from_millis(100);

const EVENT_LOOP_STACK: usize = 8 * 1024;

type Handler = Box<dyn FnMut(&Event) + Send>;

// ───────────────────────────────────────────────────────────────
// Producer side
// ───────────────────────────────────────────────────────────────

struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, Event, QUEUE_DEPTH>,
    dropped: AtomicU32,
    doorbell: Mutex<bool>,
    doorbell_cv: Condvar,
}

impl EventQueue {
    fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
            doorbell: Mutex::new(false),
            doorbell_cv: Condvar::new(),
        }
    }

    /// Stamp and enqueue.  Lock-free apart from the channel's critical
    /// section; returns `false` when the event was dropped.
    fn push(&self, mut event: Event) -> bool {
        if event.timestamp_us == 0 {
            event.timestamp_us = monotonic_us();
        }
        if self.channel.try_send(event).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    fn publish(&self, event: Event) {
        if self.push(event) {
            self.ring();
        } else {
            warn!("EventBus: event queue full, dropping {}", event.kind);
        }
    }

    fn ring(&self) {
        *lock(&self.doorbell) = true;
        self.doorbell_cv.notify_all();
    }

    fn wait_doorbell(&self, timeout: Duration) {
        let mut rung = lock(&self.doorbell);
        if !*rung {
            rung = match self.doorbell_cv.wait_timeout(rung, timeout) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        *rung = false;
    }
}

/// Cloneable producer handle.
///
/// Controllers and timers hold a `Publisher` instead of the bus itself, so
/// subscribed handlers never keep their own bus alive.
#[derive(Clone)]
pub struct Publisher {
    queue: Arc<EventQueue>,
}

impl Publisher {
    /// Enqueue from task context.  Never blocks; a full queue drops the
    /// event with a warning.
    pub fn publish(&self, event: Event) {
        self.queue.publish(event);
    }

    /// Enqueue from interrupt context.  Never blocks, never logs.
    /// Returns whether the event was queued.
    pub fn publish_from_isr(&self, event: Event) -> bool {
        self.queue.push(event)
    }
}

// ───────────────────────────────────────────────────────────────
// EventBus
// ───────────────────────────────────────────────────────────────

/// Bounded, FIFO, many-producer event bus with per-kind subscribers.
pub struct EventBus {
    queue: Arc<EventQueue>,
    subscribers: Mutex<Vec<(EventKind, Handler)>>,
    history: Mutex<HistoryBuffer<Event, HISTORY_DEPTH>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(EventQueue::new()),
            subscribers: Mutex::new(Vec::new()),
            history: Mutex::new(HistoryBuffer::new()),
        }
    }

    /// A producer handle sharing this bus's queue.
    pub fn publisher(&self) -> Publisher {
        Publisher {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Register `handler` for `kind`.  Handlers for the same kind run in
    /// registration order.  Must not be called from inside a handler.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: FnMut(&Event) + Send + 'static,
    {
        lock(&self.subscribers).push((kind, Box::new(handler)));
        debug!("EventBus: subscribed to {}", kind);
    }

    /// See [`Publisher::publish`].
    pub fn publish(&self, event: Event) {
        self.queue.publish(event);
    }

    /// See [`Publisher::publish_from_isr`].
    pub fn publish_from_isr(&self, event: Event) -> bool {
        self.queue.push(event)
    }

    /// Dispatch every queued event, including ones published by handlers
    /// during this drain.  Returns the number of events dispatched.
    pub fn process_all_pending(&self) -> usize {
        let mut dispatched = 0;
        while self.dispatch_one() {
            dispatched += 1;
        }
        dispatched
    }

    /// Block until an event is available or `timeout` elapses.  Dispatches
    /// at most one event and returns whether it did.
    pub fn wait_for_next(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.dispatch_one() {
                return true;
            }
            let slice = match deadline {
                Some(d) => d.saturating_duration_since(Instant::now()),
                None => ISR_POLL_SLICE,
            };
            if slice.is_zero() {
                return false;
            }
            self.queue.wait_doorbell(slice.min(ISR_POLL_SLICE));
        }
    }

    /// Number of queued, not yet dispatched events.
    pub fn pending(&self) -> usize {
        self.queue.channel.len()
    }

    /// Events dropped because the queue was full, since start-up.
    pub fn dropped_count(&self) -> u32 {
        self.queue.dropped.load(Ordering::Relaxed)
    }

    /// Number of handlers registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        lock(&self.subscribers)
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// The most recently dispatched events, oldest first.
    pub fn history(&self) -> Vec<Event> {
        lock(&self.history).oldest_ordered().copied().collect()
    }

    pub fn clear_history(&self) {
        lock(&self.history).clear();
    }

    fn dispatch_one(&self) -> bool {
        // Receive under the subscriber lock so concurrent drains keep FIFO.
        let mut subscribers = lock(&self.subscribers);
        let Ok(event) = self.queue.channel.try_receive() else {
            return false;
        };
        for (kind, handler) in subscribers.iter_mut() {
            if *kind == event.kind {
                handler(&event);
            }
        }
        drop(subscribers);

        lock(&self.history).write(event);
        true
    }
}

// ───────────────────────────────────────────────────────────────
// Background event loop
// ───────────────────────────────────────────────────────────────

/// Dispatch thread: repeatedly waits on the bus until stopped.
pub struct EventLoop {
    bus: Arc<EventBus>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl EventLoop {
    pub fn spawn(bus: Arc<EventBus>) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let worker = {
            let bus = Arc::clone(&bus);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("event-loop".into())
                .stack_size(EVENT_LOOP_STACK)
                .spawn(move || {
                    info!("EventBus: event loop started");
                    while running.load(Ordering::Acquire) {
                        bus.wait_for_next(EVENT_LOOP_SLICE);
                    }
                    info!("EventBus: event loop stopped");
                })?
        };
        Ok(Self {
            bus,
            running,
            worker: Some(worker),
        })
    }

    /// False once stopped, or once a panicking handler has killed the thread.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Stop the loop and join it.  Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.bus.queue.ring();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("EventBus: event loop thread panicked");
            }
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
