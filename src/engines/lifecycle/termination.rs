use crate::error::{Result, SymregError};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Default interval between re-checks of the termination flag
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One-shot, level-triggered barrier telling the caller the run should end.
///
/// A notification only wakes waiters up; they always re-check the flag, so a
/// signal raised before anybody waits is never lost and duplicate or spurious
/// wakeups are harmless.
#[derive(Debug, Default)]
pub struct TerminationSignal {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl TerminationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip to signaled. Safe to call any number of times from any thread.
    pub fn signal(&self) {
        let mut signaled = self.signaled.lock().unwrap_or_else(PoisonError::into_inner);
        if !*signaled {
            log::debug!("Termination signaled");
        }
        *signaled = true;
        self.condvar.notify_all();
    }

    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One poll cycle: returns immediately when signaled, otherwise waits up
    /// to `poll_interval` and reports the flag.
    ///
    /// Fails with [`SymregError::InterruptedWait`] when a thread panicked
    /// while holding the lock; the poison is cleared and the caller is
    /// expected to poll again.
    pub fn poll(&self, poll_interval: Duration) -> Result<bool> {
        let guard = match self.signaled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let signaled = *poisoned.into_inner();
                self.signaled.clear_poison();
                return if signaled {
                    Ok(true)
                } else {
                    Err(SymregError::InterruptedWait)
                };
            }
        };
        if *guard {
            return Ok(true);
        }

        match self.condvar.wait_timeout(guard, poll_interval) {
            Ok((guard, _)) => Ok(*guard),
            Err(poisoned) => {
                let signaled = *poisoned.into_inner().0;
                self.signaled.clear_poison();
                if signaled {
                    Ok(true)
                } else {
                    Err(SymregError::InterruptedWait)
                }
            }
        }
    }

    /// Block until signaled, re-checking every `poll_interval`.
    pub fn wait(&self, poll_interval: Duration) {
        loop {
            match self.poll(poll_interval) {
                Ok(true) => return,
                Ok(false) => log::debug!("Waiting for the individuals!"),
                Err(e) => log::warn!("{}, re-checking the termination flag", e),
            }
        }
    }
}
