// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-size worker pool backing the manager's bulk operations (spec
//! §4.7).
//!
//! Hand-rolled against a `crossbeam::channel` FIFO queue rather than
//! pulled in from `rayon`: the spec pins an explicit enqueue /
//! wait-for-idle / drain-and-join-on-drop contract that a work-stealing
//! pool doesn't expose directly (see DESIGN.md).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::trace;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size FIFO worker pool (spec §4.7).
///
/// Jobs are plain closures enqueued with [`ThreadPool::enqueue`];
/// [`ThreadPool::wait_for_idle`] blocks the caller until every enqueued job
/// (including ones enqueued by other callers concurrently) has completed.
/// Dropping the pool stops accepting new work, drains whatever is already
/// queued, and joins every worker thread before returning.
pub struct ThreadPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    pending: Arc<(Mutex<usize>, Condvar)>,
    stopped: Arc<AtomicBool>,
}

impl ThreadPool {
    /// Spawn a pool with `worker_count` threads (clamped to at least 1).
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = channel::unbounded::<Job>();
        let pending = Arc::new((Mutex::new(0usize), Condvar::new()));
        let stopped = Arc::new(AtomicBool::new(false));

        let workers = (0..worker_count)
            .map(|id| {
                let receiver = receiver.clone();
                let pending = pending.clone();
                thread::Builder::new()
                    .name(format!("ecs-worker-{id}"))
                    .spawn(move || worker_loop(receiver, pending))
                    .expect("failed to spawn ecs worker thread")
            })
            .collect();

        Self { sender: Some(sender), workers, pending, stopped }
    }

    /// Number of worker threads in this pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue `job` for FIFO execution on the next free worker.
    ///
    /// # Panics
    /// Panics if called after the pool has begun shutting down.
    pub fn enqueue(&self, job: impl FnOnce() + Send + 'static) {
        {
            let (count, _cvar) = &*self.pending;
            *count.lock() += 1;
        }
        self.sender
            .as_ref()
            .expect("enqueue called on a ThreadPool that is shutting down")
            .send(Box::new(job))
            .expect("worker threads outlive the pool while sender is alive");
    }

    /// Block until every job enqueued so far has finished running.
    pub fn wait_for_idle(&self) {
        let (count, cvar) = &*self.pending;
        let mut guard = count.lock();
        while *guard > 0 {
            cvar.wait(&mut guard);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

fn worker_loop(receiver: Receiver<Job>, pending: Arc<(Mutex<usize>, Condvar)>) {
    while let Ok(job) = receiver.recv() {
        job();
        let (count, cvar) = &*pending;
        let mut guard = count.lock();
        *guard -= 1;
        if *guard == 0 {
            cvar.notify_all();
        }
    }
    trace!("ecs worker thread exiting, queue drained and closed");
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        // Dropping the sender closes the channel; workers finish whatever
        // is already queued and then see `recv()` return `Err`.
        self.sender = None;
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
