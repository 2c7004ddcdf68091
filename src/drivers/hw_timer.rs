//! One-shot lane timers on ESP-IDF's esp_timer API.
//!
//! Each [`EspOneShotTimer`] owns one esp_timer whose expiry publishes a
//! fixed timeout event (for example `EntryBarrierTimeout`) to the bus.
//! Callbacks run in the esp_timer task (not ISR), but still only use the
//! interrupt-safe publish path so they never contend with dispatch.
//!
//! The host build uses [`TimerService`](crate::timer::TimerService) instead.

use core::ffi::CStr;

use esp_idf_svc::sys::*;
use log::{debug, error};

use super::hw_init::HwInitError;
use crate::app::ports::OneShotTimer;
use crate::error::Result;
use crate::events::bus::Publisher;
use crate::events::{Event, EventKind};

/// Callback context; leaked so the pointer stays valid for the esp_timer's
/// lifetime.
struct TimerContext {
    kind: EventKind,
    publisher: Publisher,
}

unsafe extern "C" fn timeout_cb(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the leaked `TimerContext` passed to esp_timer_create.
    let ctx = unsafe { &*(arg as *const TimerContext) };
    ctx.publisher.publish_from_isr(Event::new(ctx.kind));
}

pub struct EspOneShotTimer {
    handle: esp_timer_handle_t,
    kind: EventKind,
    period_ms: u32,
}

// SAFETY: esp_timer handles may be used from any task; the API serialises
// internally.
unsafe impl Send for EspOneShotTimer {}

impl EspOneShotTimer {
    /// Create a disarmed timer that publishes `kind` on expiry.
    pub fn new(
        name: &'static CStr,
        kind: EventKind,
        publisher: Publisher,
    ) -> Result<Self> {
        let ctx: &'static TimerContext = Box::leak(Box::new(TimerContext { kind, publisher }));
        let args = esp_timer_create_args_t {
            callback: Some(timeout_cb),
            arg: ctx as *const TimerContext as *mut core::ffi::c_void,
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: name.as_ptr(),
            skip_unhandled_events: false,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: `args` and the context outlive the timer (context leaked,
        // args copied by esp_timer_create).
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK {
            return Err(HwInitError::TimerCreateFailed(ret).into());
        }
        Ok(Self {
            handle,
            kind,
            period_ms: 0,
        })
    }
}

impl OneShotTimer for EspOneShotTimer {
    fn start(&mut self, period_ms: u32) {
        self.stop();
        self.period_ms = period_ms;
        // SAFETY: handle is a valid esp_timer created in `new`.
        let ret = unsafe { esp_timer_start_once(self.handle, u64::from(period_ms) * 1_000) };
        if ret != ESP_OK {
            error!("hw_timer: {} start failed (rc={})", self.kind, ret);
        } else {
            debug!("hw_timer: {} armed for {} ms", self.kind, period_ms);
        }
    }

    fn stop(&mut self) {
        // SAFETY: valid handle; ESP_ERR_INVALID_STATE (not running) is benign.
        unsafe {
            esp_timer_stop(self.handle);
        }
    }

    fn is_armed(&self) -> bool {
        // SAFETY: valid handle; read-only query.
        unsafe { esp_timer_is_active(self.handle) }
    }

    fn period_ms(&self) -> u32 {
        self.period_ms
    }
}
