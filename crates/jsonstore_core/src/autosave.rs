//! Background flush loop.

use crate::error::CoreResult;
use jsonstore_storage::StorageError;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

struct Signal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Periodically runs a flush task on its own thread until stopped.
///
/// The task runs with the stop flag released, so [`stop`](Self::stop) never
/// waits for more than one in-flight flush.
pub(crate) struct AutoSaver {
    signal: Arc<Signal>,
    handle: Option<JoinHandle<()>>,
}

impl AutoSaver {
    /// Starts the loop, calling `tick` every `interval`.
    pub(crate) fn spawn<F>(interval: Duration, mut tick: F) -> CoreResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let signal = Arc::new(Signal {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        });
        let thread_signal = Arc::clone(&signal);

        let handle = thread::Builder::new()
            .name("jsonstore-autosave".to_string())
            .spawn(move || {
                let mut stopped = thread_signal.stopped.lock();
                while !*stopped {
                    thread_signal.wake.wait_for(&mut stopped, interval);
                    if *stopped {
                        break;
                    }
                    MutexGuard::unlocked(&mut stopped, || tick());
                }
                debug!("autosave loop stopped");
            })
            .map_err(StorageError::from)?;

        debug!(interval_ms = interval.as_millis() as u64, "autosave loop started");
        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Stops the loop and waits for the thread to exit.
    pub(crate) fn stop(&mut self) {
        *self.signal.stopped.lock() = true;
        self.signal.wake.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("autosave thread panicked");
            }
        }
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.stop();
    }
}
