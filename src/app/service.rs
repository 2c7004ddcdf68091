//! Parking system service: wires the lanes to the shared ledger and bus.
//!
//! [`ParkingSystem`] owns the ticket ledger and both lane controllers.
//! Controllers subscribe to the bus while the system is constructed, so
//! once `new` returns every hardware or timer event published on the bus
//! reaches its lane.
//!
//! ```text
//!  LaneHardware(entry) ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                          │        ParkingSystem          │
//!  LaneHardware(exit)  ──▶ │ EntryController · Ledger ·    │ ◀── GarageCommand
//!                          │ ExitController                │
//!                          └──────────────┬───────────────┘
//!                                         │ subscribe / publish
//!                                      EventBus
//! ```

use std::sync::{Arc, Mutex};

use log::info;

use crate::config::GarageConfig;
use crate::error::{Result, SensorError};
use crate::events::bus::EventBus;
use crate::events::{Event, EventKind};
use crate::fsm::LaneHardware;
use crate::fsm::entry::EntryController;
use crate::fsm::exit::ExitController;
use crate::gate::SimGate;
use crate::sync::lock;
use crate::tickets::TicketLedger;
use crate::timer::ManualTimer;

use super::commands::{GarageCommand, Lane};
use super::ports::{ButtonInput, EventSink};
use super::status::{CommandError, CommandOutcome, GarageStatus};

// ───────────────────────────────────────────────────────────────
// ParkingSystem
// ───────────────────────────────────────────────────────────────

/// The garage: one ledger, one bus, two lanes.
pub struct ParkingSystem {
    config: GarageConfig,
    bus: Arc<EventBus>,
    ledger: Arc<TicketLedger>,
    entry: EntryController,
    exit: ExitController,
    entry_button: Mutex<Option<Box<dyn ButtonInput>>>,
}

/// Observer handles for a [`ParkingSystem::simulated`] garage.
pub struct SimRig {
    pub entry_gate: SimGate,
    pub exit_gate: SimGate,
    pub entry_timer: ManualTimer,
    pub exit_timer: ManualTimer,
}

impl ParkingSystem {
    /// Validate `config`, build the ledger and subscribe both controllers.
    pub fn new(
        config: GarageConfig,
        bus: Arc<EventBus>,
        entry_hw: LaneHardware,
        exit_hw: LaneHardware,
    ) -> Result<Self> {
        config.validate()?;

        let ledger = Arc::new(TicketLedger::new(config.capacity));
        let entry = EntryController::new(
            &bus,
            Arc::clone(&ledger),
            entry_hw,
            config.barrier_timeout_ms,
        );
        let exit = ExitController::new(
            &bus,
            Arc::clone(&ledger),
            exit_hw,
            config.barrier_timeout_ms,
        );

        info!(
            "ParkingSystem: ready (capacity {}, barrier timeout {} ms)",
            config.capacity, config.barrier_timeout_ms
        );
        Ok(Self {
            config,
            bus,
            ledger,
            entry,
            exit,
            entry_button: Mutex::new(None),
        })
    }

    /// A fully in-memory garage with simulated gates and manual timers.
    pub fn simulated(config: GarageConfig) -> Result<(Self, SimRig)> {
        let rig = SimRig {
            entry_gate: SimGate::new(),
            exit_gate: SimGate::new(),
            entry_timer: ManualTimer::new(),
            exit_timer: ManualTimer::new(),
        };
        let system = Self::new(
            config,
            Arc::new(EventBus::new()),
            LaneHardware::new(rig.entry_gate.clone(), rig.entry_timer.clone()),
            LaneHardware::new(rig.exit_gate.clone(), rig.exit_timer.clone()),
        )?;
        Ok((system, rig))
    }

    /// Forward every derived event (tickets, capacity, barriers, cars) to `sink`.
    pub fn attach_sink(&self, sink: impl EventSink + 'static) {
        let sink = Arc::new(Mutex::new(sink));
        for kind in EventKind::ALL.into_iter().filter(|k| k.is_derived()) {
            let sink = Arc::clone(&sink);
            self.bus.subscribe(kind, move |event| lock(&sink).emit(event));
        }
    }

    /// Make the entry button readable from the console.
    pub fn attach_entry_button(&self, button: impl ButtonInput + 'static) {
        *lock(&self.entry_button) = Some(Box::new(button));
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> GarageStatus {
        let capacity = self.ledger.capacity();
        let active = self.ledger.active_count();
        GarageStatus {
            capacity,
            active,
            free: capacity.saturating_sub(active),
            entry_state: self.entry.state(),
            exit_state: self.exit.state(),
            entry_barrier_open: self.entry.is_barrier_open(),
            exit_barrier_open: self.exit.is_barrier_open(),
            entry_car_detected: self.entry.is_car_detected(),
            exit_car_detected: self.exit.is_car_detected(),
            dropped_events: self.bus.dropped_count(),
        }
    }

    pub fn config(&self) -> &GarageConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn ledger(&self) -> &Arc<TicketLedger> {
        &self.ledger
    }

    pub fn entry(&self) -> &EntryController {
        &self.entry
    }

    pub fn exit(&self) -> &ExitController {
        &self.exit
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command.
    ///
    /// Injected events are only queued; they take effect on the next drain
    /// of the bus.
    pub fn handle_command(
        &self,
        cmd: GarageCommand,
    ) -> core::result::Result<CommandOutcome, CommandError> {
        match cmd {
            GarageCommand::Status => Ok(CommandOutcome::Status(self.status())),
            GarageCommand::ListTickets => Ok(CommandOutcome::Tickets(self.ledger.tickets())),
            GarageCommand::PayTicket(id) => {
                self.ledger.pay_ticket(id)?;
                Ok(CommandOutcome::TicketPaid(id))
            }
            GarageCommand::ValidateTicket(id) => {
                if self.exit.validate_ticket_manually(id) {
                    Ok(CommandOutcome::TicketAccepted(id))
                } else {
                    Err(CommandError::ValidationRefused(id))
                }
            }
            GarageCommand::Publish(kind) => {
                if !kind.is_injectable() {
                    return Err(CommandError::NotInjectable(kind));
                }
                info!("ParkingSystem: injecting {}", kind);
                self.bus.publish(Event::new(kind));
                Ok(CommandOutcome::Published(kind))
            }
            GarageCommand::ListEventKinds => Ok(CommandOutcome::EventKinds(
                EventKind::ALL
                    .into_iter()
                    .filter(|k| k.is_injectable())
                    .collect(),
            )),
            GarageCommand::SetBarrier { lane, open } => {
                match lane {
                    Lane::Entry => self.entry.set_barrier(open),
                    Lane::Exit => self.exit.set_barrier(open),
                }
                Ok(CommandOutcome::BarrierSet { lane, open })
            }
            GarageCommand::ReadCarDetected(lane) => {
                let detected = match lane {
                    Lane::Entry => self.entry.read_car_detected()?,
                    Lane::Exit => self.exit.read_car_detected()?,
                };
                Ok(CommandOutcome::CarDetected { lane, detected })
            }
            GarageCommand::ReadEntryButton => {
                let mut button = lock(&self.entry_button);
                let pressed = button
                    .as_mut()
                    .ok_or(SensorError::NotConnected)?
                    .is_pressed()?;
                Ok(CommandOutcome::EntryButton { pressed })
            }
        }
    }
}
