//! One-shot GPIO interrupt bring-up for the lane inputs.
//!
//! Installs the per-pin GPIO ISR service and registers one trampoline per
//! [`EdgeBinding`].  The binding is passed as the ISR argument, so no
//! global lookup table is needed.  Called once from `main()` after the
//! input pins have been configured (pull-up, input mode) and after the
//! controllers have subscribed, so no early edge is lost to an empty bus.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use super::edge::EdgeBinding;
use crate::error::Result;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot interrupt initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    IsrInstallFailed(i32),
    IsrAddFailed { pin: i32, rc: i32 },
    TimerCreateFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IsrInstallFailed(rc) => {
                write!(f, "GPIO ISR service install failed (rc={})", rc)
            }
            Self::IsrAddFailed { pin, rc } => {
                write!(f, "GPIO{} ISR handler add failed (rc={})", pin, rc)
            }
            Self::TimerCreateFailed(rc) => write!(f, "esp_timer create failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn edge_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static EdgeBinding` registered in
    // `install_edge_isrs`; it is never freed.
    let binding = unsafe { &*(arg as *const EdgeBinding) };
    // SAFETY: register read; safe in ISR context.
    let level_high = unsafe { gpio_get_level(binding.pin()) } != 0;
    binding.on_edge(level_high, crate::adapters::time::monotonic_ms());
}

/// Install the GPIO ISR service and route every edge on each binding's pin
/// to [`EdgeBinding::on_edge`].
#[cfg(target_os = "espidf")]
pub fn install_edge_isrs(bindings: &[&'static EdgeBinding]) -> Result<()> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable). The handler only reads
    // registers and pushes to the critical-section event queue.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret).into());
        }

        for binding in bindings {
            let pin = binding.pin();
            gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_ANYEDGE);
            let arg = *binding as *const EdgeBinding as *mut core::ffi::c_void;
            let ret = gpio_isr_handler_add(pin, Some(edge_isr), arg);
            if ret != ESP_OK {
                return Err(HwInitError::IsrAddFailed { pin, rc: ret }.into());
            }
            gpio_intr_enable(pin);
        }
    }
    log::info!("hw_init: edge ISRs installed on {} pins", bindings.len());
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn install_edge_isrs(bindings: &[&'static EdgeBinding]) -> Result<()> {
    log::info!("hw_init(sim): {} edge ISRs skipped", bindings.len());
    Ok(())
}
