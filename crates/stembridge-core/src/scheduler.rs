//! Deferred preparation off the audio thread.
//!
//! When the audio thread finds the bridge unprepared it must not prepare
//! inline. It rings a [`PrepareScheduler`] instead, which later calls back
//! into the bridge from a thread that may block and allocate.
//!
//! Two schedulers are provided:
//!
//! - [`WorkerScheduler`] owns a background thread woken through a
//!   bounded channel. Ringing it is a single `try_send`.
//! - [`ManualScheduler`] only records the request; the host's message
//!   thread runs it by calling [`ManualScheduler::pump`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

/// Work a scheduler runs on behalf of the bridge.
pub trait DeferredTask: Send + Sync {
    /// Run pending work. Called off the audio thread.
    fn run_deferred(&self);
}

/// Runs a [`DeferredTask`] when triggered.
pub trait PrepareScheduler: Send + Sync {
    /// Register the task to run. The scheduler holds it weakly.
    ///
    /// A later call replaces the earlier task.
    fn attach(&self, task: Weak<dyn DeferredTask>);

    /// Request a run. Called from the audio thread: must not block,
    /// allocate, or lock.
    fn trigger(&self);
}

// =============================================================================
// WorkerScheduler
// =============================================================================

type TaskSlot = Arc<Mutex<Option<Weak<dyn DeferredTask>>>>;

/// Scheduler backed by a dedicated background thread.
///
/// The thread is spawned on the first [`attach`](PrepareScheduler::attach)
/// and exits when the scheduler is dropped.
pub struct WorkerScheduler {
    // capacity 1: a pending wake-up already covers any further request
    wake: Option<Sender<()>>,
    receiver: Mutex<Option<Receiver<()>>>,
    task: TaskSlot,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerScheduler {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        Self {
            wake: Some(sender),
            receiver: Mutex::new(Some(receiver)),
            task: Arc::new(Mutex::new(None)),
            worker: Mutex::new(None),
        }
    }

    fn spawn(&self, receiver: Receiver<()>) {
        let task = Arc::clone(&self.task);
        let spawned = std::thread::Builder::new()
            .name("stembridge-prepare".into())
            .spawn(move || {
                while receiver.recv().is_ok() {
                    let current = task.lock().as_ref().and_then(Weak::upgrade);
                    if let Some(current) = current {
                        current.run_deferred();
                    }
                }
                log::debug!("deferred preparation worker stopped");
            });

        match spawned {
            Ok(handle) => *self.worker.lock() = Some(handle),
            Err(e) => log::error!("failed to spawn deferred preparation worker: {e}"),
        }
    }
}

impl Default for WorkerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PrepareScheduler for WorkerScheduler {
    fn attach(&self, task: Weak<dyn DeferredTask>) {
        *self.task.lock() = Some(task);
        if let Some(receiver) = self.receiver.lock().take() {
            self.spawn(receiver);
        }
    }

    fn trigger(&self) {
        if let Some(wake) = &self.wake {
            // Full means a wake-up is already queued
            let _ = wake.try_send(());
        }
    }
}

impl Drop for WorkerScheduler {
    fn drop(&mut self) {
        // disconnects the channel, which ends the worker loop
        self.wake.take();
        if let Some(handle) = self.worker.lock().take() {
            // the last bridge handle can be released by the worker itself
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::error!("deferred preparation worker panicked");
            }
        }
    }
}

// =============================================================================
// ManualScheduler
// =============================================================================

/// Scheduler driven by the host's message thread.
///
/// Mirrors hosts that deliver asynchronous work through their own event
/// loop: [`trigger`](PrepareScheduler::trigger) only raises a flag, and the
/// task runs on the next [`pump`](Self::pump).
#[derive(Default)]
pub struct ManualScheduler {
    task: Mutex<Option<Weak<dyn DeferredTask>>>,
    pending: AtomicBool,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run has been requested since the last pump.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Run the task if a run was requested. Returns whether it ran.
    pub fn pump(&self) -> bool {
        if !self.pending.swap(false, Ordering::AcqRel) {
            return false;
        }
        let task = self.task.lock().as_ref().and_then(Weak::upgrade);
        match task {
            Some(task) => {
                task.run_deferred();
                true
            }
            None => false,
        }
    }
}

impl PrepareScheduler for ManualScheduler {
    fn attach(&self, task: Weak<dyn DeferredTask>) {
        *self.task.lock() = Some(task);
    }

    fn trigger(&self) {
        self.pending.store(true, Ordering::Release);
    }
}
