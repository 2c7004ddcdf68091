//! End-to-end garage scenarios through the bus, both controllers and the
//! shared ledger, with manual timers so every step is deterministic.

use parkgate::app::commands::{GarageCommand, Lane};
use parkgate::app::status::{CommandError, CommandOutcome};
use parkgate::error::{Error, SensorError};
use parkgate::events::EventKind;
use parkgate::fsm::POST_PASS_DELAY_MS;
use parkgate::fsm::entry::EntryState;
use parkgate::fsm::exit::ExitState;
use parkgate::tickets::TicketError;

use super::mock_hw::{BARRIER_MS, GateCall, TestGarage};

// ── Ledger capacity ───────────────────────────────────────────

#[test]
fn sixth_ticket_refused_at_capacity_five() {
    let g = TestGarage::new(5);
    let ledger = g.system.ledger();
    for expected in 1..=5 {
        assert_eq!(ledger.issue_ticket(), Ok(expected));
    }
    assert_eq!(ledger.issue_ticket(), Err(TicketError::CapacityFull));
    assert_eq!(ledger.active_count(), 5);
}

#[test]
fn full_garage_turns_car_away_without_opening() {
    let g = TestGarage::new(1);
    g.admit_car();
    assert_eq!(g.entry_gate.calls(), [GateCall::Open, GateCall::Close]);

    g.inject(EventKind::EntryButtonPressed);

    assert_eq!(g.system.entry().state(), EntryState::Idle);
    assert_eq!(g.sink.count(EventKind::CapacityFull), 1);
    assert_eq!(g.entry_gate.calls().len(), 2, "barrier must stay shut");
    assert_eq!(g.system.ledger().active_count(), 1);
}

// ── Entry lane ────────────────────────────────────────────────

#[test]
fn button_press_opens_entry_barrier_and_arms_timer() {
    let g = TestGarage::new(5);

    g.inject(EventKind::EntryButtonPressed);

    assert_eq!(g.system.entry().state(), EntryState::OpeningBarrier);
    assert!(g.entry_gate.is_open());
    assert_eq!(g.entry_timer.start_history(), [BARRIER_MS]);

    g.system.entry().force_barrier_timeout();
    assert_eq!(g.system.entry().state(), EntryState::WaitingForCar);
}

#[test]
fn full_entry_cycle_returns_to_idle() {
    let g = TestGarage::new(5);

    let id = g.admit_car();

    assert_eq!(id, 1);
    assert_eq!(g.system.entry().state(), EntryState::Idle);
    assert_eq!(g.system.entry().current_ticket_id(), 0);
    assert!(!g.entry_gate.is_open());
    assert_eq!(
        g.entry_timer.start_history(),
        [BARRIER_MS, POST_PASS_DELAY_MS, BARRIER_MS]
    );
    assert_eq!(
        g.sink.kinds(),
        [
            EventKind::TicketIssued,
            EventKind::EntryBarrierOpened,
            EventKind::CarEnteredParking,
            EventKind::EntryBarrierClosed,
        ]
    );
    assert_eq!(g.sink.ticket_ids(EventKind::CarEnteredParking), [1]);
}

#[test]
fn second_press_mid_cycle_issues_no_ticket() {
    let g = TestGarage::new(5);

    g.inject(EventKind::EntryButtonPressed);
    g.inject(EventKind::EntryButtonPressed);

    assert_eq!(g.system.ledger().active_count(), 1);
    assert_eq!(g.sink.count(EventKind::TicketIssued), 1);
}

// ── Exit lane ─────────────────────────────────────────────────

#[test]
fn paid_ticket_opens_exit_barrier() {
    let g = TestGarage::new(5);
    let id = g.admit_car();
    g.system.ledger().pay_ticket(id).unwrap();

    assert!(g.system.exit().validate_ticket_manually(id));
    assert_eq!(g.system.exit().state(), ExitState::OpeningBarrier);
    assert!(g.exit_gate.is_open());

    g.system.exit().force_barrier_timeout();
    assert_eq!(g.system.exit().state(), ExitState::WaitingForCarToPass);
}

#[test]
fn unpaid_ticket_rejected_and_left_unused() {
    let g = TestGarage::new(5);
    g.admit_car();
    let id = g.admit_car();

    assert!(!g.system.exit().validate_ticket_manually(id));
    g.drain();

    assert_eq!(g.system.exit().state(), ExitState::Idle);
    assert_eq!(g.system.exit().current_ticket_id(), 0);
    assert!(!g.system.ledger().ticket_info(id).unwrap().is_used);
    assert_eq!(g.sink.ticket_ids(EventKind::TicketRejected), [id]);
    assert!(g.exit_gate.calls().is_empty());
}

#[test]
fn unknown_ticket_rejected() {
    let g = TestGarage::new(5);
    assert!(!g.system.exit().validate_ticket_manually(42));
    g.drain();
    assert_eq!(g.sink.ticket_ids(EventKind::TicketRejected), [42]);
    assert_eq!(g.system.exit().state(), ExitState::Idle);
}

#[test]
fn used_ticket_cannot_leave_twice() {
    let g = TestGarage::new(5);
    let id = g.admit_car();
    g.system.ledger().pay_ticket(id).unwrap();
    g.release_car(id);

    assert!(!g.system.exit().validate_ticket_manually(id));
    assert_eq!(g.system.exit().state(), ExitState::Idle);
}

#[test]
fn full_exit_cycle_frees_space_and_announces_it() {
    let g = TestGarage::new(2);
    let first = g.admit_car();
    let second = g.admit_car();
    g.system.ledger().pay_ticket(second).unwrap();

    g.release_car(second);

    assert_eq!(g.system.exit().state(), ExitState::Idle);
    assert!(!g.exit_gate.is_open());
    assert_eq!(g.system.ledger().active_count(), 1);
    assert_eq!(
        g.exit_timer.start_history(),
        [BARRIER_MS, POST_PASS_DELAY_MS, BARRIER_MS]
    );
    assert_eq!(g.sink.count(EventKind::CapacityAvailable), 1);
    assert_eq!(g.sink.ticket_ids(EventKind::CarExitedParking), [second]);
    assert!(!g.system.ledger().ticket_info(first).unwrap().is_used);
}

#[test]
fn validation_refused_while_exit_busy() {
    let g = TestGarage::new(5);
    let a = g.admit_car();
    let b = g.admit_car();
    g.system.ledger().pay_ticket(a).unwrap();
    g.system.ledger().pay_ticket(b).unwrap();

    assert!(g.system.exit().validate_ticket_manually(a));
    assert!(!g.system.exit().validate_ticket_manually(b));

    assert_eq!(g.system.exit().current_ticket_id(), a);
    assert!(!g.system.ledger().ticket_info(b).unwrap().is_used);
}

#[test]
fn car_at_closed_exit_barrier_has_no_effect() {
    let g = TestGarage::new(5);
    g.inject(EventKind::ExitLightBarrierBlocked);
    g.inject(EventKind::ExitLightBarrierCleared);

    assert_eq!(g.system.exit().state(), ExitState::Idle);
    assert!(g.exit_gate.calls().is_empty());
    assert!(g.exit_timer.start_history().is_empty());
    assert!(g.sink.kinds().is_empty());
}

#[test]
fn validation_timeout_is_ignored() {
    let g = TestGarage::new(5);
    g.inject(EventKind::ExitValidationTimeout);
    assert_eq!(g.system.exit().state(), ExitState::Idle);
}

// ── Console workflow ──────────────────────────────────────────

#[test]
fn console_pay_and_validate_workflow() {
    let g = TestGarage::new(3);
    let cars: Vec<u32> = (0..3).map(|_| g.admit_car()).collect();
    assert_eq!(cars, [1, 2, 3]);

    let Ok(CommandOutcome::Status(status)) = g.system.handle_command(GarageCommand::Status) else {
        panic!("status expected");
    };
    assert_eq!((status.active, status.free), (3, 0));
    assert!(status.to_string().contains("Capacity: 3/3 (0 free)"));

    assert_eq!(
        g.system.handle_command(GarageCommand::ValidateTicket(2)),
        Err(CommandError::ValidationRefused(2))
    );
    assert_eq!(
        g.system.handle_command(GarageCommand::PayTicket(2)),
        Ok(CommandOutcome::TicketPaid(2))
    );
    assert_eq!(
        g.system.handle_command(GarageCommand::ValidateTicket(2)),
        Ok(CommandOutcome::TicketAccepted(2))
    );

    let Ok(CommandOutcome::Tickets(tickets)) =
        g.system.handle_command(GarageCommand::ListTickets)
    else {
        panic!("ticket list expected");
    };
    assert_eq!(tickets.len(), 3);
    assert!(tickets.iter().any(|t| t.id == 2 && t.is_used));
    assert_eq!(g.system.ledger().free_spaces(), 1);
}

#[test]
fn console_injected_press_runs_entry_lane() {
    let g = TestGarage::new(5);
    assert_eq!(
        g.system
            .handle_command(GarageCommand::Publish(EventKind::EntryButtonPressed)),
        Ok(CommandOutcome::Published(EventKind::EntryButtonPressed))
    );
    assert_eq!(g.system.entry().state(), EntryState::Idle, "queued only");

    g.drain();
    assert_eq!(g.system.entry().state(), EntryState::OpeningBarrier);
}

#[test]
fn console_reads_light_barrier() {
    let g = TestGarage::new(5);
    g.exit_gate.set_car_detected(true);
    assert_eq!(
        g.system.handle_command(GarageCommand::ReadCarDetected(Lane::Exit)),
        Ok(CommandOutcome::CarDetected {
            lane: Lane::Exit,
            detected: true
        })
    );
    assert!(g.system.status().to_string().contains("Exit Light Barrier: BLOCKED"));
}

#[test]
fn console_reports_failed_light_barrier_read() {
    let g = TestGarage::new(5);
    g.entry_gate.set_car_detected(true);
    g.entry_gate.break_sensor();

    assert_eq!(
        g.system.handle_command(GarageCommand::ReadCarDetected(Lane::Entry)),
        Err(CommandError::Hardware(Error::Sensor(SensorError::GpioReadFailed)))
    );
    assert!(!g.system.status().entry_car_detected, "status degrades to clear");
}
