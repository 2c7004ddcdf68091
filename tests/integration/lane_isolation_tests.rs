//! The two lanes share one bus and one ledger but must never react to
//! each other's inputs or timers.

use parkgate::events::EventKind;
use parkgate::fsm::entry::EntryState;
use parkgate::fsm::exit::ExitState;

use super::mock_hw::TestGarage;

#[test]
fn exit_inputs_do_not_touch_entry_lane() {
    let g = TestGarage::new(5);
    g.inject(EventKind::EntryButtonPressed);
    g.system.entry().force_barrier_timeout();
    assert_eq!(g.system.entry().state(), EntryState::WaitingForCar);

    g.inject(EventKind::ExitLightBarrierBlocked);
    g.inject(EventKind::ExitLightBarrierCleared);
    g.inject(EventKind::ExitBarrierTimeout);

    assert_eq!(g.system.entry().state(), EntryState::WaitingForCar);
    assert_eq!(g.entry_gate.calls().len(), 1);
}

#[test]
fn entry_inputs_do_not_touch_exit_lane() {
    let g = TestGarage::new(5);
    let id = g.admit_car();
    g.system.ledger().pay_ticket(id).unwrap();
    assert!(g.system.exit().validate_ticket_manually(id));
    g.system.exit().force_barrier_timeout();
    assert_eq!(g.system.exit().state(), ExitState::WaitingForCarToPass);

    g.inject(EventKind::EntryLightBarrierBlocked);
    g.inject(EventKind::EntryLightBarrierCleared);
    g.inject(EventKind::EntryBarrierTimeout);
    g.inject(EventKind::EntryButtonReleased);

    assert_eq!(g.system.exit().state(), ExitState::WaitingForCarToPass);
    assert!(g.exit_gate.is_open());
    assert_eq!(g.sink.count(EventKind::CarExitedParking), 0);
}

#[test]
fn lanes_run_concurrent_cycles() {
    let g = TestGarage::new(5);
    let parked = g.admit_car();
    g.system.ledger().pay_ticket(parked).unwrap();

    // Car arrives at entry while another leaves.
    g.inject(EventKind::EntryButtonPressed);
    assert!(g.system.exit().validate_ticket_manually(parked));
    g.drain();
    g.system.entry().force_barrier_timeout();
    g.system.exit().force_barrier_timeout();

    g.inject(EventKind::ExitLightBarrierBlocked);
    g.inject(EventKind::EntryLightBarrierBlocked);
    g.inject(EventKind::ExitLightBarrierCleared);

    assert_eq!(g.system.entry().state(), EntryState::CarPassing);
    assert_eq!(g.system.exit().state(), ExitState::WaitingBeforeClose);

    g.inject(EventKind::EntryLightBarrierCleared);
    assert_eq!(g.system.entry().state(), EntryState::WaitingBeforeClose);
    assert_eq!(g.system.ledger().active_count(), 1);
    assert_eq!(g.sink.ticket_ids(EventKind::CarEnteredParking), [1, 2]);
    assert_eq!(g.sink.ticket_ids(EventKind::CarExitedParking), [parked]);
}

#[test]
fn timeouts_only_reach_their_own_lane() {
    let g = TestGarage::new(5);
    g.inject(EventKind::EntryButtonPressed);

    g.inject(EventKind::ExitBarrierTimeout);
    assert_eq!(g.system.entry().state(), EntryState::OpeningBarrier);

    g.inject(EventKind::EntryBarrierTimeout);
    assert_eq!(g.system.entry().state(), EntryState::WaitingForCar);
    assert_eq!(g.system.exit().state(), ExitState::Idle);
}
