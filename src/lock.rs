use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{Error, Result};

/// A mutex that is only ever acquired with a bounded wait.
///
/// The receive path must never block indefinitely, so every shared table sits behind
/// one of these. A zero wait turns the acquire into a plain `try_lock`.
pub struct BoundedLock<T> {
    name: &'static str,
    wait: Duration,
    inner: Mutex<T>,
}

impl<T> BoundedLock<T> {
    pub fn new(name: &'static str, wait: Duration, value: T) -> Self {
        BoundedLock {
            name,
            wait,
            inner: Mutex::new(value),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Acquire with the configured wait, `LockTimeout` otherwise.
    pub fn acquire(&self) -> Result<MutexGuard<'_, T>> {
        self.acquire_for(self.wait)
    }

    pub fn acquire_for(&self, wait: Duration) -> Result<MutexGuard<'_, T>> {
        let guard = if wait.is_zero() {
            self.inner.try_lock()
        } else {
            self.inner.try_lock_for(wait)
        };
        guard.ok_or(Error::LockTimeout(self.name))
    }
}
