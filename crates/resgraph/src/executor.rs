//! Task executors used by [`AsyncResources`](crate::AsyncResources).
//!
//! A [`TaskExecutor`] runs boxed closures somewhere else. The engine only
//! needs [`TaskExecutor::execute`]; [`TaskExecutorExt::submit`] layers a
//! result channel on top and hands back a [`TaskHandle`].
//!
//! [`QueueExecutor`] is the bundled implementation: a fixed set of named
//! worker threads draining a bounded FIFO queue. A `tokio` runtime
//! [`Handle`](tokio::runtime::Handle) can be used instead, in which case tasks
//! run on the runtime's blocking pool.

use std::{
    panic::AssertUnwindSafe,
    pin::Pin,
    task::{Context, Poll},
    thread::JoinHandle,
};

use crossbeam::channel::{Receiver, Sender};
use parking_lot::RwLock;
use tokio::sync::oneshot;

use crate::{
    config::{Config, DefaultConfig},
    error::Error,
};

/// A unit of work accepted by a [`TaskExecutor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks, usually on other threads.
pub trait TaskExecutor: Send + Sync + 'static {
    /// Schedules `task` for execution.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ExecutorShutdown`] if the executor no longer
    /// accepts tasks. The task is dropped unrun in that case.
    fn execute(&self, task: Task) -> Result<(), Error>;
}

/// Adds result-returning submission to every [`TaskExecutor`].
pub trait TaskExecutorExt: TaskExecutor {
    /// Runs `f` on the executor and returns a handle to its outcome.
    ///
    /// A panic inside `f` is caught and reported as
    /// [`Error::TaskPanicked`]; it never takes down the worker.
    fn submit<T, F>(&self, f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, Error> + Send + 'static;
}

impl<E: TaskExecutor + ?Sized> TaskExecutorExt for E {
    fn submit<T, F>(&self, f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, Error> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();

        let task: Task = Box::new(move || {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(f))
                .unwrap_or(Err(Error::TaskPanicked));

            // the handle may have been dropped
            let _ = sender.send(outcome);
        });

        match self.execute(task) {
            Ok(()) => TaskHandle { receiver },
            Err(error) => TaskHandle::ready(Err(error)),
        }
    }
}

/// The outcome of a submitted task.
///
/// The handle can be waited on synchronously with [`wait`](Self::wait),
/// polled with [`try_take`](Self::try_take), or awaited as a future.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<Result<T, Error>>,
}

impl<T> TaskHandle<T> {
    fn ready(outcome: Result<T, Error>) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(outcome);

        Self { receiver }
    }

    /// Blocks the current thread until the task finishes.
    ///
    /// Must not be called from within an asynchronous context; `.await` the
    /// handle there instead.
    ///
    /// # Errors
    ///
    /// Returns the task's own error, [`Error::TaskPanicked`] if it panicked
    /// or [`Error::TaskCancelled`] if it was dropped without running.
    pub fn wait(self) -> Result<T, Error> {
        self.receiver.blocking_recv().unwrap_or(Err(Error::TaskCancelled))
    }

    /// Returns the outcome if the task has finished, without blocking.
    ///
    /// Once the outcome has been taken, later calls report
    /// [`Error::TaskCancelled`].
    pub fn try_take(&mut self) -> Option<Result<T, Error>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Err(Error::TaskCancelled))
            }
        }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, Error>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(Err(Error::TaskCancelled)))
    }
}

/// A fixed pool of worker threads draining a bounded FIFO queue.
///
/// [`execute`](TaskExecutor::execute) blocks only while the queue is full.
/// After [`shutdown`](Self::shutdown) no new tasks are accepted; the workers
/// finish every task already queued and exit. Dropping the executor shuts it
/// down and joins the workers.
#[derive(Debug)]
pub struct QueueExecutor {
    sender: RwLock<Option<Sender<Task>>>,
    workers: Vec<JoinHandle<()>>,
}

impl QueueExecutor {
    /// Spawns `threads` workers (at least one) with the default queue
    /// capacity and thread names.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::WorkerSpawn`] if a thread cannot be spawned.
    pub fn new(threads: usize) -> Result<Self, Error> {
        Self::with_options(
            threads,
            DefaultConfig::task_queue_capacity(),
            DefaultConfig::worker_thread_name,
        )
    }

    /// Spawns a pool sized and named by the configuration `C`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::WorkerSpawn`] if a thread cannot be spawned.
    pub fn from_config<C: Config>() -> Result<Self, Error> {
        Self::with_options(
            C::worker_thread_count(),
            C::task_queue_capacity(),
            C::worker_thread_name,
        )
    }

    fn with_options(
        threads: usize,
        capacity: usize,
        thread_name: fn(usize) -> String,
    ) -> Result<Self, Error> {
        let (sender, receiver) = crossbeam::channel::bounded(capacity.max(1));

        let mut executor =
            Self { sender: RwLock::new(Some(sender)), workers: Vec::new() };

        for index in 0..threads.max(1) {
            let receiver = receiver.clone();

            let worker = std::thread::Builder::new()
                .name(thread_name(index))
                .spawn(move || run_worker(&receiver))
                .map_err(|error| Error::WorkerSpawn(error.into()))?;

            executor.workers.push(worker);
        }

        tracing::debug!(workers = executor.workers.len(), "started executor");

        Ok(executor)
    }

    /// The number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize { self.workers.len() }

    /// Stops accepting tasks. Queued tasks still run.
    pub fn shutdown(&self) {
        if self.sender.write().take().is_some() {
            tracing::debug!("executor shutting down");
        }
    }

    /// Returns whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool { self.sender.read().is_none() }
}

fn run_worker(receiver: &Receiver<Task>) {
    while let Ok(task) = receiver.recv() {
        if std::panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            tracing::warn!("task panicked on executor worker");
        }
    }
}

impl TaskExecutor for QueueExecutor {
    fn execute(&self, task: Task) -> Result<(), Error> {
        // release the lock before a potentially blocking send
        let sender =
            self.sender.read().clone().ok_or(Error::ExecutorShutdown)?;

        sender.send(task).map_err(|_| Error::ExecutorShutdown)
    }
}

impl Drop for QueueExecutor {
    fn drop(&mut self) {
        self.shutdown();

        let current = std::thread::current().id();

        for worker in self.workers.drain(..) {
            // a task may own the last reference to its own executor
            if worker.thread().id() == current {
                continue;
            }

            let _ = worker.join();
        }
    }
}

impl TaskExecutor for tokio::runtime::Handle {
    fn execute(&self, task: Task) -> Result<(), Error> {
        drop(self.spawn_blocking(task));

        Ok(())
    }
}

static_assertions::assert_impl_all!(QueueExecutor: Send, Sync);
