//! GPIO pin assignments for the ParkGate controller board.
//!
//! Single source of truth for the default wiring.  [`GarageConfig`]
//! copies these into its `pins` record, so a board variant only needs a
//! different config, not a code change.
//!
//! [`GarageConfig`]: crate::config::GarageConfig

// ---------------------------------------------------------------------------
// Entry lane
// ---------------------------------------------------------------------------

/// Ticket request push button.  Active LOW with internal pull-up.
pub const ENTRY_BUTTON_GPIO: i32 = 25;
/// Entry light barrier receiver.  LOW = beam interrupted (car present).
pub const ENTRY_LIGHT_BARRIER_GPIO: i32 = 15;
/// Entry barrier servo (LEDC PWM, 50 Hz).
pub const ENTRY_MOTOR_GPIO: i32 = 22;

// ---------------------------------------------------------------------------
// Exit lane
// ---------------------------------------------------------------------------

/// Exit light barrier receiver.  LOW = beam interrupted (car present).
pub const EXIT_LIGHT_BARRIER_GPIO: i32 = 26;
/// Exit barrier servo (LEDC PWM, 50 Hz).
pub const EXIT_MOTOR_GPIO: i32 = 27;
