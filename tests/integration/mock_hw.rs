//! Mock hardware adapters for integration tests.
//!
//! Records every barrier command and every derived event so tests can
//! assert on the full history without touching real GPIO/PWM registers.

use std::sync::{Arc, Mutex};

use parkgate::app::ports::{EventSink, GateLane};
use parkgate::app::service::ParkingSystem;
use parkgate::config::GarageConfig;
use parkgate::error::SensorError;
use parkgate::events::bus::EventBus;
use parkgate::events::{Event, EventKind};
use parkgate::fsm::LaneHardware;
use parkgate::timer::ManualTimer;

// ── Gate call record ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCall {
    Open,
    Close,
}

#[derive(Debug, Default)]
struct GateState {
    calls: Vec<GateCall>,
    open: bool,
    car_detected: bool,
    sensor_broken: bool,
}

// ── MockGate ──────────────────────────────────────────────────

/// Clones share state: the controller owns one, the test keeps another.
#[derive(Debug, Clone, Default)]
pub struct MockGate {
    state: Arc<Mutex<GateState>>,
}

#[allow(dead_code)]
impl MockGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GateCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }

    pub fn set_car_detected(&self, detected: bool) {
        self.state.lock().unwrap().car_detected = detected;
    }

    /// Make every later light barrier read fail.
    pub fn break_sensor(&self) {
        self.state.lock().unwrap().sensor_broken = true;
    }
}

impl GateLane for MockGate {
    fn open(&mut self) {
        let mut s = self.state.lock().unwrap();
        s.calls.push(GateCall::Open);
        s.open = true;
    }

    fn close(&mut self) {
        let mut s = self.state.lock().unwrap();
        s.calls.push(GateCall::Close);
        s.open = false;
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }

    fn read_car_detected(&mut self) -> Result<bool, SensorError> {
        let s = self.state.lock().unwrap();
        if s.sensor_broken {
            Err(SensorError::GpioReadFailed)
        } else {
            Ok(s.car_detected)
        }
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    pub fn ticket_ids(&self, kind: EventKind) -> Vec<u32> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .filter_map(Event::ticket_id)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &Event) {
        self.events.lock().unwrap().push(*event);
    }
}

// ── Test garage ───────────────────────────────────────────────

/// Barrier timeout of every [`TestGarage`]; distinct from the post-pass delay.
pub const BARRIER_MS: u32 = 500;

pub struct TestGarage {
    pub system: ParkingSystem,
    pub entry_gate: MockGate,
    pub exit_gate: MockGate,
    pub entry_timer: ManualTimer,
    pub exit_timer: ManualTimer,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl TestGarage {
    pub fn new(capacity: u32) -> Self {
        let config = GarageConfig {
            capacity,
            barrier_timeout_ms: BARRIER_MS,
            ..GarageConfig::default()
        };
        let entry_gate = MockGate::new();
        let exit_gate = MockGate::new();
        let entry_timer = ManualTimer::new();
        let exit_timer = ManualTimer::new();
        let system = ParkingSystem::new(
            config,
            Arc::new(EventBus::new()),
            LaneHardware::new(entry_gate.clone(), entry_timer.clone()),
            LaneHardware::new(exit_gate.clone(), exit_timer.clone()),
        )
        .unwrap();
        let sink = RecordingSink::new();
        system.attach_sink(sink.clone());
        Self {
            system,
            entry_gate,
            exit_gate,
            entry_timer,
            exit_timer,
            sink,
        }
    }

    /// Publish a hardware event and drain the bus.
    pub fn inject(&self, kind: EventKind) {
        self.system.bus().publish(Event::new(kind));
        self.drain();
    }

    pub fn drain(&self) {
        self.system.bus().process_all_pending();
    }

    /// Drive one car through the entry lane; returns its ticket.
    pub fn admit_car(&self) -> u32 {
        self.inject(EventKind::EntryButtonPressed);
        let id = self.system.entry().current_ticket_id();
        self.system.entry().force_barrier_timeout();
        self.inject(EventKind::EntryLightBarrierBlocked);
        self.inject(EventKind::EntryLightBarrierCleared);
        self.system.entry().force_barrier_timeout();
        self.system.entry().force_barrier_timeout();
        self.drain();
        id
    }

    /// Drive one validated car through the exit lane.
    pub fn release_car(&self, id: u32) {
        assert!(self.system.exit().validate_ticket_manually(id));
        self.drain();
        self.system.exit().force_barrier_timeout();
        self.inject(EventKind::ExitLightBarrierBlocked);
        self.inject(EventKind::ExitLightBarrierCleared);
        self.system.exit().force_barrier_timeout();
        self.system.exit().force_barrier_timeout();
        self.drain();
    }
}
