//! Delayed-job queue for deferred sends and standup flushes.
//!
//! A single task owns a min-heap of pending jobs ordered by deadline (ties in
//! submission order) and sleeps until the earliest one is due. Each job runs
//! under the store lock, so it sees and re-validates the live workspace.
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info};

use treats_store::{JobOutcome, ScheduledJob, Store};

#[derive(Clone)]
pub struct Scheduler {
    tx: mpsc::UnboundedSender<ScheduledJob>,
}

impl Scheduler {
    /// Spawns the queue task. It stops once every `Scheduler` handle has been
    /// dropped and the queue has drained.
    pub fn start(store: Arc<Store>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(store, rx));
        info!("Scheduler started");
        (Self { tx }, handle)
    }

    pub fn submit(&self, job: ScheduledJob) {
        if self.tx.send(job).is_err() {
            error!("Scheduler task is gone; dropping job");
        }
    }
}

struct Pending {
    deadline: Instant,
    seq: u64,
    job: ScheduledJob,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed: BinaryHeap is a max-heap and the earliest deadline must win.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.deadline, other.seq).cmp(&(self.deadline, self.seq))
    }
}

async fn run(store: Arc<Store>, mut rx: mpsc::UnboundedReceiver<ScheduledJob>) {
    let clock = store.clock();
    let mut queue: BinaryHeap<Pending> = BinaryHeap::new();
    let mut seq = 0u64;
    let mut open = true;

    loop {
        let next_deadline = queue.peek().map(|p| p.deadline);
        if !open && next_deadline.is_none() {
            break;
        }

        tokio::select! {
            received = rx.recv(), if open => match received {
                Some(job) => {
                    debug!("Queued {:?} due at {}", job.job, job.due);
                    queue.push(Pending {
                        deadline: clock.deadline(job.due),
                        seq,
                        job,
                    });
                    seq += 1;
                }
                None => open = false,
            },
            _ = sleep_until(next_deadline.unwrap_or_else(Instant::now)), if next_deadline.is_some() => {
                let now = Instant::now();
                while queue.peek().is_some_and(|p| p.deadline <= now) {
                    if let Some(pending) = queue.pop() {
                        fire(&store, pending.job).await;
                    }
                }
            }
        }
    }

    info!("Scheduler stopped");
}

async fn fire(store: &Arc<Store>, job: ScheduledJob) {
    let outcome = store.with_workspace_mut(|ws, now| ws.run_job(job, now));
    match &outcome {
        JobOutcome::Delivered { target, message_id } => {
            info!("Delivered deferred message {} to {:?}", message_id, target)
        }
        JobOutcome::Flushed {
            channel_id,
            message_id,
        } => debug!("Flushed standup in channel {} ({:?})", channel_id, message_id),
        JobOutcome::Dropped | JobOutcome::Stale => {}
    }

    if outcome.changed_state() {
        let store = store.clone();
        match tokio::task::spawn_blocking(move || store.save()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Failed to save snapshot: {:#}", e),
            Err(e) => error!("spawn_blocking join error: {}", e),
        }
    }
}
