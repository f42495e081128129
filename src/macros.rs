//! Internal helper macros for lock handling.
//!
//! Poisoned locks are recovered instead of propagated.

#![allow(unused_macros)]

/// Acquire a `Mutex`, recovering the guard if the lock was poisoned.
macro_rules! lock {
    ($lock:expr) => {
        $lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}
