//! Bounded-wait mutual exclusion.
//!
//! `std::sync::Mutex` has no timed lock, and the command path must report
//! "busy" instead of queueing forever.  [`TimedMutex`] polls `try_lock`
//! until a deadline, yielding between attempts.  The lock is never held
//! while waiting, so a waiter cannot extend another holder's critical
//! section.

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use log::warn;

/// Back-off between `try_lock` attempts.
const RETRY_INTERVAL: Duration = Duration::from_micros(200);

pub struct TimedMutex<T> {
    inner: Mutex<T>,
}

impl<T> TimedMutex<T> {
    pub const fn new(value: T) -> Self {
        Self { inner: Mutex::new(value) }
    }

    /// Acquire the lock, giving up after `timeout`.
    ///
    /// A poisoned lock is recovered: every holder leaves the protected value
    /// consistent before any operation that could panic.
    pub fn lock_within(&self, timeout: Duration) -> Option<MutexGuard<'_, T>> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.inner.try_lock() {
                Ok(guard) => return Some(guard),
                Err(TryLockError::Poisoned(poisoned)) => {
                    warn!("SYNC | recovering poisoned lock");
                    return Some(poisoned.into_inner());
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return None;
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
            }
        }
    }

    /// Acquire without a bound. Only for single-threaded setup and tests.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
