//! Delayed task execution.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::Task;

struct Entry {
    due: Instant,
    seq: u64,
    task: Task,
}

// Min-heap on due time, FIFO among equal deadlines.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

#[derive(Default)]
struct Queue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    shutdown: bool,
}

/// Runs closures after a delay on a dedicated timer thread.
///
/// Scheduled tasks fire at-most-once. Shutdown discards tasks whose delay
/// has not yet elapsed, so a task must tolerate never running at all and
/// must re-check entity state when it does run.
pub struct DelayScheduler {
    shared: Arc<(Mutex<Queue>, Condvar)>,
    timer: Option<thread::JoinHandle<()>>,
}

impl DelayScheduler {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let shared = Arc::new((Mutex::new(Queue::default()), Condvar::new()));

        let timer_shared = Arc::clone(&shared);
        let timer = thread::Builder::new()
            .name(name.clone())
            .spawn(move || timer_loop(timer_shared))
            .expect("failed to spawn scheduler thread");

        info!(scheduler = %name, "delay scheduler started");

        Self {
            shared,
            timer: Some(timer),
        }
    }

    /// Run `task` after `delay`. Returns `false` if the scheduler has shut
    /// down.
    pub fn schedule_after<F>(&self, delay: Duration, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let (queue, wakeup) = &*self.shared;
        let mut queue = match queue.lock() {
            Ok(queue) => queue,
            Err(_) => return false,
        };
        if queue.shutdown {
            return false;
        }

        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.heap.push(Entry {
            due: Instant::now() + delay,
            seq,
            task: Box::new(task),
        });
        debug!(delay_ms = delay.as_millis() as u64, "task scheduled");

        wakeup.notify_one();
        true
    }

    /// Stop the timer thread. Tasks not yet due are discarded.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let (queue, wakeup) = &*self.shared;
        if let Ok(mut queue) = queue.lock() {
            if queue.shutdown {
                return;
            }
            queue.shutdown = true;
            let discarded = queue.heap.len();
            queue.heap.clear();
            if discarded > 0 {
                debug!(discarded, "discarded pending tasks at shutdown");
            }
        }
        wakeup.notify_all();

        if let Some(timer) = self.timer.take() {
            if timer.join().is_err() {
                warn!("scheduler thread panicked");
            }
        }
    }
}

impl Drop for DelayScheduler {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

fn timer_loop(shared: Arc<(Mutex<Queue>, Condvar)>) {
    let (queue, wakeup) = &*shared;
    let mut guard = match queue.lock() {
        Ok(guard) => guard,
        Err(_) => return,
    };

    loop {
        if guard.shutdown {
            return;
        }

        let now = Instant::now();
        match guard.heap.peek().map(|entry| entry.due) {
            Some(due) if due <= now => {
                let entry = guard.heap.pop().expect("peeked entry present");
                // Run without the lock so tasks can schedule more tasks.
                drop(guard);
                (entry.task)();
                guard = match queue.lock() {
                    Ok(guard) => guard,
                    Err(_) => return,
                };
            }
            Some(due) => {
                let timeout = due - now;
                guard = match wakeup.wait_timeout(guard, timeout) {
                    Ok((guard, _)) => guard,
                    Err(_) => return,
                };
            }
            None => {
                guard = match wakeup.wait(guard) {
                    Ok(guard) => guard,
                    Err(_) => return,
                };
            }
        }
    }
}
