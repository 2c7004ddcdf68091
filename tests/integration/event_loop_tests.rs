//! Threaded end-to-end run: real timer service and background event loop,
//! so timeouts arrive on their own instead of being forced.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parkgate::app::service::ParkingSystem;
use parkgate::config::GarageConfig;
use parkgate::events::bus::{EventBus, EventLoop};
use parkgate::events::{Event, EventKind};
use parkgate::fsm::LaneHardware;
use parkgate::fsm::entry::EntryState;
use parkgate::fsm::exit::ExitState;
use parkgate::timer::TimerService;

use super::mock_hw::{MockGate, RecordingSink};

fn wait_until(what: &str, timeout: Duration, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + timeout;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

struct Rig {
    system: ParkingSystem,
    entry_gate: MockGate,
    sink: RecordingSink,
    _timers: TimerService,
    event_loop: EventLoop,
}

fn rig() -> Rig {
    let bus = Arc::new(EventBus::new());
    let timers = TimerService::spawn(bus.publisher()).unwrap();
    let entry_gate = MockGate::new();
    let config = GarageConfig {
        barrier_timeout_ms: 100,
        ..GarageConfig::default()
    };
    let system = ParkingSystem::new(
        config,
        Arc::clone(&bus),
        LaneHardware::new(entry_gate.clone(), timers.timer(EventKind::EntryBarrierTimeout)),
        LaneHardware::new(MockGate::new(), timers.timer(EventKind::ExitBarrierTimeout)),
    )
    .unwrap();
    let sink = RecordingSink::new();
    system.attach_sink(sink.clone());
    let event_loop = EventLoop::spawn(bus).unwrap();
    Rig {
        system,
        entry_gate,
        sink,
        _timers: timers,
        event_loop,
    }
}

#[test]
fn entry_cycle_runs_on_real_timers() {
    let r = rig();
    let entry = r.system.entry();
    let bus = r.system.bus();
    let step = Duration::from_secs(2);

    bus.publish(Event::new(EventKind::EntryButtonPressed));
    wait_until("barrier timer", step, || entry.state() == EntryState::WaitingForCar);
    assert!(r.entry_gate.is_open());

    bus.publish(Event::new(EventKind::EntryLightBarrierBlocked));
    bus.publish(Event::new(EventKind::EntryLightBarrierCleared));
    wait_until("post-pass delay", step, || {
        entry.state() == EntryState::WaitingBeforeClose
    });

    wait_until("close", Duration::from_secs(4), || entry.state() == EntryState::Idle);
    assert!(!r.entry_gate.is_open());
    assert_eq!(entry.current_ticket_id(), 0);
    assert_eq!(
        r.sink.kinds(),
        [
            EventKind::TicketIssued,
            EventKind::EntryBarrierOpened,
            EventKind::CarEnteredParking,
            EventKind::EntryBarrierClosed,
        ]
    );
}

#[test]
fn exit_cycle_runs_on_real_timers() {
    let r = rig();
    let id = r.system.ledger().issue_ticket().unwrap();
    r.system.ledger().pay_ticket(id).unwrap();
    let exit = r.system.exit();
    let bus = r.system.bus();

    assert!(exit.validate_ticket_manually(id));
    wait_until("barrier timer", Duration::from_secs(2), || {
        exit.state() == ExitState::WaitingForCarToPass
    });

    bus.publish(Event::new(EventKind::ExitLightBarrierBlocked));
    bus.publish(Event::new(EventKind::ExitLightBarrierCleared));
    wait_until("close", Duration::from_secs(5), || exit.state() == ExitState::Idle);

    assert_eq!(r.system.ledger().active_count(), 0);
    assert_eq!(r.sink.count(EventKind::CarExitedParking), 1);
}

#[test]
fn event_loop_stops_cleanly() {
    let mut r = rig();
    assert!(r.event_loop.is_running());
    r.event_loop.stop();
    assert!(!r.event_loop.is_running());
    r.event_loop.stop();

    r.system
        .bus()
        .publish(Event::new(EventKind::EntryButtonPressed));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(r.system.entry().state(), EntryState::Idle);
    assert_eq!(r.system.bus().pending(), 1);
}
