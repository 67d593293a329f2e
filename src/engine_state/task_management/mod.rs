//! # Task Management System
//!
//! This module provides the worker pool that runs chunk generation and mesh
//! builds off the frame thread.
//!
//! ## Architecture Overview
//!
//! The task management system consists of several key components:
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed asynchronously
//! - `TaskHandle` / `TaskCompleter`: The cancellable result slot shared by submitter and worker
//! - `TaskChannel`: Communication channel between the frame thread and one worker thread
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers run the task, which fulfills its completer, and send back a `TaskReport`
//! 4. Reports are collected on the frame thread in `process_completed_tasks()`,
//!    which frees the worker for the next task
//! 5. Tasks that found every worker busy wait in a FIFO queue and are sent by
//!    `process_queued_tasks()`
//!
//! Results never travel through the manager: the submitter polls its own
//! `TaskHandle`. The manager only tracks which workers are busy.
//!
//! ## Backpressure
//! A full pool is not an error. `publish_task()` queues the task and returns
//! `false`; callers with a per-frame budget can use that to stop submitting.
//!
//! ## Example Usage
//! ```rust,ignore
//! let mut task_manager = TaskManager::new(num_workers);
//!
//! // Publish a task for background processing
//! task_manager.publish_task(Box::new(MyTask::new(...)));
//!
//! // In the frame loop:
//! task_manager.process_completed_tasks();
//! task_manager.process_queued_tasks();
//! ```

pub mod task;

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use task::{Task, TaskOutcome, TaskReport};

use crate::error::BuildError;

/// A communication channel between the frame thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from the frame thread to the worker
/// - `report_receiver`: Receives task reports from the worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `worker`: Handle to the worker thread, joined on shutdown
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task>>,
    report_receiver: Receiver<TaskReport>,
    num_tasks_in_flight: usize,
    worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// The `TaskManager` is responsible for:
/// - Creating and managing worker threads
/// - Distributing tasks across available workers
/// - Collecting task reports to know when workers are free again
/// - Handling task queuing when all workers are busy
/// - Shutting the workers down and joining them
///
/// # Implementation Notes
/// - Owned by the frame thread; workers only see the tasks sent to them
/// - Panic-safe: a panicking task is reported as a failure, the worker survives
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// This is set to 1 so a queued task is never stuck behind a long build on a
/// worker while another worker sits idle.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

/// Extracts the message of a caught panic.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Runs one task on the current thread and describes how it ended.
fn run_task(mut task: Box<dyn Task>) -> TaskReport {
    let name = task.name();
    if task.is_cancelled() {
        task.abandon(BuildError::Cancelled);
        return TaskReport {
            name,
            outcome: TaskOutcome::Skipped,
        };
    }

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| task.process())) {
        Ok(()) => TaskOutcome::Completed,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            task.abandon(BuildError::GenerationFailure(message.clone()));
            TaskOutcome::Panicked(message)
        }
    };
    TaskReport { name, outcome }
}

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create
    ///
    /// # Panics
    /// Panics if the underlying thread creation fails.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        info!(
            "Starting {} workers, available parallelism: {:?}",
            num_workers,
            thread::available_parallelism()
        );

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task>>();
            let (report_tx, report_rx) = channel::<TaskReport>();

            let task_closure = move || {
                while let Ok(task) = task_rx.recv() {
                    let report = run_task(task);
                    if report_tx.send(report).is_err() {
                        break;
                    }
                }
            };

            let worker = thread::spawn(task_closure);

            channels.push(TaskChannel {
                task_sender: task_tx,
                report_receiver: report_rx,
                num_tasks_in_flight: 0,
                worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of tasks sent to workers whose reports haven't been collected.
    pub fn in_flight_count(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Number of tasks waiting for a free worker.
    pub fn queued_count(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was successfully sent to the worker
    /// - `Err(task)` if the send failed (e.g., worker disconnected)
    fn try_send_task(
        &mut self,
        task: Box<dyn Task>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => Err(task.0),
        }
    }

    /// Finds an available worker channel that can accept a new task.
    ///
    /// This implements a round-robin scheduling strategy starting from the last
    /// used channel to ensure even distribution of tasks across all workers.
    /// Channels that have reached their maximum number of in-flight tasks are
    /// skipped.
    ///
    /// # Returns
    /// - `Some(usize)` index of an available channel that can accept a new task
    /// - `None` if all channels are busy or there are no channels available
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        let start_channel = self.current_channel % self.channels.len();
        let mut current = start_channel;

        loop {
            if self.channels[current].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start_channel {
                return None;
            }
        }
    }

    /// Publishes a new task for execution.
    ///
    /// The task will be executed as soon as a worker becomes available, or queued
    /// if all workers are busy.
    ///
    /// # Returns
    /// - `true` if the task was immediately scheduled on an available worker
    /// - `false` if the task was queued because all workers are busy
    pub fn publish_task(&mut self, task: Box<dyn Task>) -> bool {
        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    warn!("Worker {} disconnected, queueing {}", channel_idx, task.name());
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Sends queued tasks to workers until the queue is empty or every worker
    /// is busy.
    ///
    /// Tasks that were cancelled while they waited are dropped here instead of
    /// occupying a worker.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some(mut task) = self.queued_tasks.pop_front() else {
                break;
            };

            if task.is_cancelled() {
                debug!("Dropping cancelled {} from the queue", task.name());
                task.abandon(BuildError::Cancelled);
                continue;
            }

            match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                }
                Err(task) => {
                    // Channel is disconnected, put task back and stop processing
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Collects the reports of finished tasks, freeing their workers.
    ///
    /// Must be called on the frame thread, typically once per frame before
    /// `process_queued_tasks()`.
    ///
    /// # Returns
    /// The reports in the order they were received per worker.
    pub fn process_completed_tasks(&mut self) -> Vec<TaskReport> {
        let mut reports = Vec::new();
        for channel in &mut self.channels {
            while let Ok(report) = channel.report_receiver.try_recv() {
                channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                if let TaskOutcome::Panicked(message) = &report.outcome {
                    warn!("{} panicked on a worker: {}", report.name, message);
                }
                reports.push(report);
            }
        }
        reports
    }

    /// Cancels every task still waiting in the queue.
    ///
    /// Tasks already running on a worker are not affected here; their
    /// submitters cancel them through their handles.
    pub fn cancel_all(&mut self) {
        let cancelled = self.queued_tasks.len();
        for mut task in self.queued_tasks.drain(..) {
            task.abandon(BuildError::Cancelled);
        }
        if cancelled > 0 {
            debug!("Cancelled {} queued tasks", cancelled);
        }
    }

    /// Cancels queued work, stops every worker and waits for them to exit.
    ///
    /// Tasks that are running finish first; their results stay in their
    /// handles. Calling this twice is harmless.
    pub fn shutdown(&mut self) {
        self.cancel_all();
        if self.channels.is_empty() {
            return;
        }

        let workers = self.channels.len();
        for TaskChannel {
            task_sender,
            worker,
            ..
        } in self.channels.drain(..)
        {
            // Closing the sender ends the worker's receive loop
            drop(task_sender);
            if worker.join().is_err() {
                warn!("A worker thread exited with a panic");
            }
        }
        self.current_channel = 0;
        info!("Task manager shut down {} workers", workers);
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::task::{task_pair, TaskCompleter, TaskHandle};
    use super::*;

    struct SquareTask {
        input: u64,
        completer: TaskCompleter<u64>,
    }

    impl Task for SquareTask {
        fn name(&self) -> &'static str {
            "square"
        }

        fn is_cancelled(&self) -> bool {
            self.completer.is_cancelled()
        }

        fn process(&mut self) {
            if self.input == 13 {
                panic!("unlucky input");
            }
            self.completer.complete(Ok(self.input * self.input));
        }

        fn abandon(&mut self, error: BuildError) {
            self.completer.complete(Err(error));
        }
    }

    fn square(input: u64) -> (TaskHandle<u64>, Box<dyn Task>) {
        let (handle, completer) = task_pair();
        (handle, Box::new(SquareTask { input, completer }))
    }

    fn wait_for(manager: &mut TaskManager, handle: &mut TaskHandle<u64>) -> Result<u64, BuildError> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            manager.process_completed_tasks();
            manager.process_queued_tasks();
            if let Some(result) = handle.take() {
                return result;
            }
            assert!(Instant::now() < deadline, "task never completed");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn runs_more_tasks_than_workers() {
        let mut manager = TaskManager::new(2);
        let mut handles: Vec<_> = (0..10)
            .map(|i| {
                let (handle, task) = square(i);
                manager.publish_task(task);
                (i, handle)
            })
            .collect();

        assert!(manager.queued_count() > 0);
        for (i, handle) in handles.iter_mut() {
            assert_eq!(wait_for(&mut manager, handle), Ok(*i * *i));
        }
    }

    #[test]
    fn panics_become_generation_failures() {
        let mut manager = TaskManager::new(1);
        let (mut bad, task) = square(13);
        manager.publish_task(task);
        let result = wait_for(&mut manager, &mut bad);
        assert!(matches!(result, Err(BuildError::GenerationFailure(message)) if message.contains("unlucky")));

        // The worker survived the panic
        let (mut good, task) = square(3);
        manager.publish_task(task);
        assert_eq!(wait_for(&mut manager, &mut good), Ok(9));
    }

    #[test]
    fn cancelled_queued_tasks_never_run() {
        let mut manager = TaskManager::new(0);
        let (mut handle, task) = square(4);
        assert!(!manager.publish_task(task));
        handle.cancel();
        manager.cancel_all();
        assert_eq!(handle.take(), Some(Err(BuildError::Cancelled)));
        assert_eq!(manager.queued_count(), 0);
    }

    #[test]
    fn shutdown_resolves_every_handle() {
        let mut manager = TaskManager::new(1);
        let mut handles: Vec<_> = (0..5)
            .map(|i| {
                let (handle, task) = square(i);
                manager.publish_task(task);
                handle
            })
            .collect();
        manager.shutdown();
        manager.shutdown();

        for handle in handles.iter_mut() {
            assert!(handle.take().is_some());
        }
        assert_eq!(manager.worker_count(), 0);
    }
}
