//! Detection work queue for freshly ingested videos.
//!
//! In [`DispatchMode::Background`] jobs go onto a bounded channel drained by a
//! single worker task, so the submitting workflow never waits for detection.
//! A job that does not fit in the queue is dropped with a warning; the video
//! stays unprocessed and the next unprocessed-video sweep tags it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;

use crate::reconcile::Reconciler;

/// How [`Dispatcher::submit`] runs detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Run detection before `submit` returns.
    Inline,
    /// Queue detection for a background worker.
    Background { capacity: usize },
}

/// One video awaiting detection.
#[derive(Debug, Clone)]
pub struct DetectionJob {
    pub video_id: i64,
    pub external_id: String,
    pub title: String,
}

#[derive(Debug, Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    fn start(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn done(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

enum Sink {
    Inline(Arc<Reconciler>),
    Background(mpsc::Sender<DetectionJob>),
}

pub struct Dispatcher {
    sink: Sink,
    pending: Arc<Pending>,
}

impl Dispatcher {
    /// Creates a dispatcher. Background mode spawns its worker on the
    /// current Tokio runtime.
    #[must_use]
    pub fn new(reconciler: Arc<Reconciler>, mode: DispatchMode) -> Self {
        let pending = Arc::new(Pending::default());
        let sink = match mode {
            DispatchMode::Inline => Sink::Inline(reconciler),
            DispatchMode::Background { capacity } => {
                let (tx, rx) = mpsc::channel(capacity.max(1));
                tokio::spawn(run_worker(rx, reconciler, Arc::clone(&pending)));
                Sink::Background(tx)
            }
        };
        Self { sink, pending }
    }

    /// Hands a video to detection. Returns `false` when the job was dropped.
    pub async fn submit(&self, job: DetectionJob) -> bool {
        match &self.sink {
            Sink::Inline(reconciler) => {
                let tags = reconciler.tag_video(job.video_id, &job.title).await;
                tracing::debug!(
                    video = %job.external_id,
                    tags = tags.len(),
                    "inline detection finished"
                );
                true
            }
            Sink::Background(tx) => {
                self.pending.start();
                match tx.try_send(job) {
                    Ok(()) => true,
                    Err(TrySendError::Full(job)) => {
                        self.pending.done();
                        tracing::warn!(
                            video = %job.external_id,
                            "detection queue full; leaving video for the unprocessed sweep"
                        );
                        false
                    }
                    Err(TrySendError::Closed(job)) => {
                        self.pending.done();
                        tracing::error!(video = %job.external_id, "detection worker has stopped");
                        false
                    }
                }
            }
        }
    }

    /// Number of queued or running background jobs.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::Acquire)
    }

    /// Resolves once every submitted job has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.pending.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<DetectionJob>,
    reconciler: Arc<Reconciler>,
    pending: Arc<Pending>,
) {
    while let Some(job) = rx.recv().await {
        let tags = reconciler.tag_video(job.video_id, &job.title).await;
        tracing::debug!(
            video = %job.external_id,
            tags = tags.len(),
            "background detection finished"
        );
        pending.done();
    }
    tracing::debug!("detection worker stopped");
}
