//! Monotonic clock adapter.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic,
//!   callable from ISR context).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` measured
//!   from the first call, for host-side testing and simulation.

/// Microseconds since boot (monotonic).
#[cfg(target_os = "espidf")]
pub fn monotonic_us() -> u64 {
    // SAFETY: esp_timer_get_time is a counter read; safe from any context.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
}

/// Microseconds since the first clock query (monotonic).
#[cfg(not(target_os = "espidf"))]
pub fn monotonic_us() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    // Never report zero: a zero timestamp means "not stamped yet".
    START.get_or_init(Instant::now).elapsed().as_micros() as u64 + 1
}

/// Milliseconds since boot, truncated to `u32` (wraps after ~49 days).
/// Used by the ISR debounce logic, which only compares differences.
pub fn monotonic_ms() -> u32 {
    (monotonic_us() / 1_000) as u32
}
