//! System configuration parameters
//!
//! All tunable parameters for the ParkGate controller.  The record is
//! built once at start-up (defaults, optionally overridden from JSON) and
//! is immutable afterwards.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::pins;

/// Hard limits enforced by [`GarageConfig::validate`].
pub const CAPACITY_RANGE: core::ops::RangeInclusive<u32> = 1..=1000;
pub const BARRIER_TIMEOUT_RANGE_MS: core::ops::RangeInclusive<u32> = 100..=10_000;
pub const DEBOUNCE_RANGE_MS: core::ops::RangeInclusive<u32> = 10..=1000;

/// GPIO wiring of both lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    pub entry_button: i32,
    pub entry_light_barrier: i32,
    pub entry_motor: i32,
    pub exit_light_barrier: i32,
    pub exit_motor: i32,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            entry_button: pins::ENTRY_BUTTON_GPIO,
            entry_light_barrier: pins::ENTRY_LIGHT_BARRIER_GPIO,
            entry_motor: pins::ENTRY_MOTOR_GPIO,
            exit_light_barrier: pins::EXIT_LIGHT_BARRIER_GPIO,
            exit_motor: pins::EXIT_MOTOR_GPIO,
        }
    }
}

impl PinConfig {
    fn as_array(&self) -> [i32; 5] {
        [
            self.entry_button,
            self.entry_light_barrier,
            self.entry_motor,
            self.exit_light_barrier,
            self.exit_motor,
        ]
    }

    /// True when no GPIO is assigned to two functions.
    pub fn all_distinct(&self) -> bool {
        let pins = self.as_array();
        pins.iter()
            .enumerate()
            .all(|(i, p)| !pins[i + 1..].contains(p))
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GarageConfig {
    /// Maximum number of simultaneously active (unused) tickets.
    pub capacity: u32,
    /// Barrier travel time in milliseconds; also the open/close timer period.
    pub barrier_timeout_ms: u32,
    /// Minimum spacing between accepted entry-button edges.
    pub button_debounce_ms: u32,
    pub pins: PinConfig,
}

impl Default for GarageConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            barrier_timeout_ms: 2000,
            button_debounce_ms: 50,
            pins: PinConfig::default(),
        }
    }
}

impl GarageConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pins.all_distinct() {
            return Err(ConfigError::ValidationFailed(
                "pins must all be distinct",
            ));
        }
        if !CAPACITY_RANGE.contains(&self.capacity) {
            return Err(ConfigError::ValidationFailed("capacity must be 1–1000"));
        }
        if !BARRIER_TIMEOUT_RANGE_MS.contains(&self.barrier_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "barrier_timeout_ms must be 100–10000",
            ));
        }
        if !DEBOUNCE_RANGE_MS.contains(&self.button_debounce_ms) {
            return Err(ConfigError::ValidationFailed(
                "button_debounce_ms must be 10–1000",
            ));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Parse a JSON override.  Missing fields fall back to the defaults;
    /// the result is validated before it is returned.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|_| ConfigError::Malformed)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Errors from loading or validating a [`GarageConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The serialised form could not be parsed.
    Malformed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Malformed => write!(f, "malformed config"),
        }
    }
}

impl std::error::Error for ConfigError {}
