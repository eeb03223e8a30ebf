//! Submission dispatcher
//!
//! An unbounded FIFO queue drained by a fixed pool of workers. At most `W`
//! submissions are judged concurrently; back-pressure lives at admission
//! time (three unresolved submissions per participant), so the queue itself
//! never rejects.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::state::AppState;

use super::worker;

/// One queued submission
#[derive(Debug, Clone)]
pub struct Job {
    pub contest_id: String,
    pub participant_id: String,
    pub task_id: i64,
    pub language: String,
    pub code: String,
}

/// Producer half of the queue, held in application state
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Job>,
    queued: Arc<AtomicI64>,
}

impl Dispatcher {
    /// Create the queue; the receiver goes to `spawn_workers`
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                queued: Arc::new(AtomicI64::new(0)),
            },
            rx,
        )
    }

    /// Append a job; returns the queue size including it
    pub fn enqueue(&self, job: Job) -> i64 {
        let size = self.queued.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(job).is_err() {
            tracing::error!("submission queue is closed, job dropped");
        }
        size
    }

    pub fn queue_size(&self) -> i64 {
        self.queued.load(Ordering::SeqCst).max(0)
    }

    fn job_taken(&self) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Start the worker pool. Workers share the single receiver, preserving
/// FIFO hand-out, and each acquires a sandbox slot before judging.
pub fn spawn_workers(state: AppState, rx: mpsc::UnboundedReceiver<Job>, workers: usize) {
    let rx = Arc::new(tokio::sync::Mutex::new(rx));

    for worker_id in 0..workers {
        let state = state.clone();
        let rx = rx.clone();
        tokio::spawn(async move {
            loop {
                let job = {
                    let mut rx = rx.lock().await;
                    rx.recv().await
                };
                let Some(job) = job else {
                    break;
                };
                state.dispatcher().job_taken();
                worker::process_job(worker_id, &state, job).await;
            }
        });
    }

    tracing::info!(workers, "judging worker pool started");
}
