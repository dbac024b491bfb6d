//! Delayed background reconnects.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Stop {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Runs reconnect tasks on background threads after a fixed delay.
///
/// One thread is spawned per scheduled task. [`shutdown`](Reconnector::shutdown)
/// wakes every waiting task, which then exits without running.
#[derive(Debug, Clone)]
pub struct Reconnector {
    interval: Duration,
    stop: Arc<Stop>,
}

impl Reconnector {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stop: Arc::default(),
        }
    }

    /// Run `task` on a background thread once the interval has elapsed.
    ///
    /// Returns `false` if the reconnector is shut down or the thread could not
    /// be spawned.
    pub fn schedule<F>(&self, target: &str, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shut_down() {
            return false;
        }

        let this = self.clone();
        let task_target = target.to_owned();
        let spawned = thread::Builder::new()
            .name("tcp-reconnect".into())
            .spawn(move || {
                if this.wait() {
                    debug!(peer = %task_target, "Reconnecting");
                    task();
                } else {
                    warn!(peer = %task_target, "Error reconnect: [shut down while waiting]");
                }
            });

        match spawned {
            Ok(_) => true,
            Err(e) => {
                warn!(peer = %target, error = %e, "Could not schedule reconnect");
                false
            }
        }
    }

    /// Abort every pending task and refuse new ones.
    pub fn shutdown(&self) {
        let mut stopped = self.stop.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        self.stop.wake.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        *self.stop.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for the interval. Returns `false` if woken by shutdown.
    fn wait(&self) -> bool {
        let stopped = self.stop.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .stop
            .wake
            .wait_timeout_while(stopped, self.interval, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        !*stopped
    }
}
