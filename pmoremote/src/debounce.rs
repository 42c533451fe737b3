//! Trailing-edge debouncer.
//!
//! Each call restarts the delay; when it finally expires the callback runs
//! once with the most recent value. The pending timer is a tokio task that is
//! aborted on reschedule, on `cancel` and on drop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

type Callback<T> = dyn Fn(Option<T>) + Send + Sync;

pub struct Debouncer<T> {
    delay: Duration,
    callback: Arc<Callback<T>>,
    latest: Arc<Mutex<Option<T>>>,
    timer: Option<JoinHandle<()>>,
}

impl<T> std::fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<T> Debouncer<T> {
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_pending(&self) -> bool {
        self.timer
            .as_ref()
            .map(|timer| !timer.is_finished())
            .unwrap_or(false)
    }
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn(Option<T>) + Send + Sync + 'static,
    {
        Self {
            delay,
            callback: Arc::new(callback),
            latest: Arc::new(Mutex::new(None)),
            timer: None,
        }
    }

    /// Restarts the delay, keeping the last value given to `call_with`.
    pub fn call(&mut self) {
        self.restart();
    }

    /// Restarts the delay; `value` replaces any earlier pending value.
    pub fn call_with(&mut self, value: T) {
        *self.latest.lock().expect("Debouncer mutex poisoned") = Some(value);
        self.restart();
    }

    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.latest.lock().expect("Debouncer mutex poisoned").take();
    }

    fn restart(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let delay = self.delay;
        let callback = Arc::clone(&self.callback);
        let latest = Arc::clone(&self.latest);

        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let value = latest.lock().expect("Debouncer mutex poisoned").take();
            trace!(?delay, "Debounce delay expired");
            callback(value);
        }));
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
