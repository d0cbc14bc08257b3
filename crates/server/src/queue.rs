//! Out-of-band job execution

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{ChatError, Result};
use crate::store::ChatStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    MarkRoomRead { room: String, user: String },
}

pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, job: Job) -> Result<()>;
}

/// Queue drained by a single spawned worker
pub struct BackgroundQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl BackgroundQueue {
    /// Spawn the worker. It exits once every queue handle is dropped.
    pub fn spawn(store: Arc<dyn ChatStore>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(e) = run_job(store.as_ref(), &job).await {
                    warn!("[Queue] Job {:?} failed: {}", job, e);
                }
            }
            info!("[Queue] Worker stopped");
        });

        (Self { tx }, handle)
    }
}

impl TaskQueue for BackgroundQueue {
    fn enqueue(&self, job: Job) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|_| ChatError::Internal(anyhow::anyhow!("Background queue is closed")))
    }
}

async fn run_job(store: &dyn ChatStore, job: &Job) -> Result<()> {
    match job {
        Job::MarkRoomRead { room, user } => store.mark_read(room, user).await,
    }
}
