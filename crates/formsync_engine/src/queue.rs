//! Pending action queue and the debounce timer that flushes it.

use formsync_protocol::Action;
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Local actions applied optimistically and awaiting a push.
#[derive(Debug, Default)]
pub struct ActionQueue {
    pending: Mutex<Vec<Action>>,
}

impl ActionQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action.
    pub fn push(&self, action: Action) {
        self.pending.lock().push(action);
    }

    /// Takes every pending action, leaving the queue empty.
    ///
    /// Capture and clear happen under one lock, so an action pushed
    /// concurrently lands either in this batch or in the next one.
    pub fn sweep(&self) -> Vec<Action> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Returns the number of pending actions.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

/// A trailing-edge debounce timer.
///
/// Each [`arm`](Self::arm) cancels the previously armed timer and starts a
/// new one, so the task only runs once the caller has been quiet for a full
/// window. When the window elapses the task is spawned as its own Tokio
/// task: re-arming after that point never interrupts a task that is
/// already running.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Creates a debouncer with the given quiet window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timer: Mutex::new(None),
        }
    }

    /// Returns the quiet window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// (Re)arms the timer to run `task` after the quiet window.
    ///
    /// Returns false, leaving any armed timer untouched, when called
    /// outside a Tokio runtime.
    pub fn arm<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            return false;
        };

        let window = self.window;
        let spawner = handle.clone();
        let timer = handle.spawn(async move {
            tokio::time::sleep(window).await;
            spawner.spawn(task);
        });

        if let Some(previous) = self.timer.lock().replace(timer) {
            previous.abort();
        }
        true
    }

    /// Cancels the armed timer.
    ///
    /// Returns true if a timer was still waiting. Calling this with no
    /// timer armed is a no-op.
    pub fn cancel(&self) -> bool {
        match self.timer.lock().take() {
            Some(timer) => {
                let waiting = !timer.is_finished();
                timer.abort();
                waiting
            }
            None => false,
        }
    }

    /// Returns true if a timer is armed and has not fired yet.
    pub fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}
