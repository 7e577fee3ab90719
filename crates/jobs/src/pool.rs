//! Fixed-size worker pool.

use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use tracing::{debug, info, warn};

use crate::Task;

/// A pool of worker threads executing submitted closures in FIFO order.
///
/// Dropping the pool performs a graceful shutdown: already-submitted tasks
/// are drained before the workers exit.
pub struct WorkerPool {
    sender: Option<mpsc::Sender<Task>>,
    workers: Vec<thread::JoinHandle<()>>,
    name: String,
}

impl WorkerPool {
    /// Spawn a pool with `size` worker threads. `size` is clamped to at
    /// least one.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        let name = name.into();
        let size = size.max(1);

        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = Arc::clone(&receiver);
            let thread_name = format!("{name}-{index}");
            let handle = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_loop(&thread_name, receiver))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }

        info!(pool = %name, workers = size, "worker pool started");

        Self {
            sender: Some(sender),
            workers,
            name,
        }
    }

    /// Submit a task for execution. Returns `false` if the pool has already
    /// shut down.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.sender {
            Some(sender) => sender.send(Box::new(task)).is_ok(),
            None => false,
        }
    }

    /// Drain queued tasks and join all workers.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        // Closing the channel lets each worker finish its queue and exit.
        if self.sender.take().is_some() {
            for handle in self.workers.drain(..) {
                if handle.join().is_err() {
                    warn!(pool = %self.name, "worker thread panicked");
                }
            }
            info!(pool = %self.name, "worker pool stopped");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

fn worker_loop(name: &str, receiver: Arc<Mutex<mpsc::Receiver<Task>>>) {
    loop {
        let task = {
            let guard = match receiver.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    warn!(worker = %name, "task queue lock poisoned, exiting");
                    return;
                }
            };
            guard.recv()
        };

        match task {
            Ok(task) => {
                debug!(worker = %name, "running task");
                task();
            }
            // Channel closed: pool is shutting down.
            Err(_) => return,
        }
    }
}
