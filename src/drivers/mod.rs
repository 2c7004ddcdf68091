//! Input edge handling, interrupt bring-up, and device timers.

pub mod edge;
pub mod hw_init;
#[cfg(target_os = "espidf")]
pub mod hw_timer;
