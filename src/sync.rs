//! Lock helpers shared by the bus, ledger and controllers.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Acquire `m`, recovering the guard if a previous holder panicked.
///
/// Every value guarded in this crate stays consistent between statements,
/// so a poisoned lock carries no torn state worth refusing.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
