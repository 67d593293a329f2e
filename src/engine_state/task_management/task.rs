//! # Task System Core Types
//!
//! This module defines the fundamental building blocks of the task system,
//! which provides a framework for executing work asynchronously across multiple threads.
//!
//! ## Core Components
//! - `Task`: Represents a unit of work that can be executed asynchronously
//! - `TaskHandle`: The frame thread's end of a submitted task; polled, taken or cancelled
//! - `TaskCompleter`: The worker's end of the same task; fulfilled exactly once
//! - `TaskReport`: A small summary every worker sends back after running a task
//!
//! ## Task Lifecycle
//! 1. A handle/completer pair is created with [`task_pair`]
//! 2. The completer is moved into a `Task`, which is published via `TaskManager::publish_task()`
//! 3. The task's `process()` method is called on a worker thread and fulfills the completer
//! 4. The frame thread polls `TaskHandle::is_ready()` and collects the value with `take()`
//!
//! ## Cancellation
//! Cancellation is cooperative. `TaskHandle::cancel()` raises a flag the task
//! checks before and after doing its work; a task that is already running may
//! still complete. The frame thread decides whether a late result is still
//! wanted, so no result is ever trusted just because it arrived.
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - The value inside a completer must be `Send` to be transferred back to the frame thread
//! - Handle and completer share one mutex-guarded slot and an atomic cancel flag

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use crate::error::BuildError;

/// A trait representing a unit of work that can be executed asynchronously.
///
/// Tasks are the primary mechanism for offloading work from the frame thread to
/// background workers. They should be self-contained and own all the data they
/// need; the result leaves the task through its [`TaskCompleter`].
///
/// # Implementation Guidelines
/// - Must be `Send` to be transferred between threads
/// - Should be relatively coarse-grained to amortize task scheduling overhead
/// - Should avoid holding references to data that might be modified elsewhere
pub trait Task: Send {
    /// Short label used in logs and reports.
    fn name(&self) -> &'static str;

    /// Whether the submitter has lost interest in this task.
    fn is_cancelled(&self) -> bool;

    /// Performs the work and fulfills the task's completer.
    ///
    /// Runs on a worker thread. Panics are caught by the worker and turned
    /// into [`Task::abandon`] with a `GenerationFailure`.
    fn process(&mut self);

    /// Fulfills the completer with an error, unless it already holds a value.
    fn abandon(&mut self, error: BuildError);
}

/// What happened to a task, sent from the worker back to the task manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    /// The task's name
    pub name: &'static str,
    /// How the task ended
    pub outcome: TaskOutcome,
}

/// How a task ended on its worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// `process()` returned normally
    Completed,
    /// The task was cancelled before it ran
    Skipped,
    /// `process()` panicked
    Panicked(String),
}

/// Contents of the slot shared between a handle and its completer.
#[derive(Debug)]
enum Slot<T> {
    Pending,
    Ready(Result<T, BuildError>),
    Taken,
}

#[derive(Debug)]
struct Shared<T> {
    slot: Mutex<Slot<T>>,
    cancelled: AtomicBool,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // A poisoned slot still holds a consistent enum value
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The submitter's end of a task: poll for readiness, take the result, or cancel.
#[derive(Debug)]
pub struct TaskHandle<T> {
    shared: Arc<Shared<T>>,
}

/// The worker's end of a task.
///
/// The first call to [`TaskCompleter::complete`] wins. A completer that is
/// dropped without completing resolves its handle to
/// [`BuildError::WorkerDisconnected`], so a handle never stays pending after
/// its task is gone.
#[derive(Debug)]
pub struct TaskCompleter<T> {
    shared: Arc<Shared<T>>,
}

/// Creates a connected handle/completer pair.
pub fn task_pair<T>() -> (TaskHandle<T>, TaskCompleter<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        cancelled: AtomicBool::new(false),
    });
    (
        TaskHandle {
            shared: shared.clone(),
        },
        TaskCompleter { shared },
    )
}

impl<T> TaskHandle<T> {
    /// Whether a result (value or error) is waiting to be taken.
    pub fn is_ready(&self) -> bool {
        matches!(*self.shared.lock(), Slot::Ready(_))
    }

    /// Takes the result if it is ready. Returns `None` while pending and after
    /// the result has been taken once.
    pub fn take(&mut self) -> Option<Result<T, BuildError>> {
        let mut slot = self.shared.lock();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(result) => Some(result),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Requests best-effort cancellation of the task.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}

impl<T> TaskCompleter<T> {
    /// Whether the submitter requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Stores the task's result. Ignored if a result was already stored.
    pub fn complete(&self, result: Result<T, BuildError>) {
        let mut slot = self.shared.lock();
        if let Slot::Pending = *slot {
            *slot = Slot::Ready(result);
        }
    }
}

impl<T> Drop for TaskCompleter<T> {
    fn drop(&mut self) {
        self.complete(Err(BuildError::WorkerDisconnected));
    }
}
