use crate::common::AnalysisFrame;
use crate::error::AppError;
use crate::pipeline::Analyzer;
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

// One frame in flight plus room for the shutdown message.
const QUEUE_CAPACITY: usize = 2;

pub(crate) enum Job {
    Analyze(AnalysisFrame),
    Shutdown,
}

/// Submission side of the analysis queue.
#[derive(Clone)]
pub struct AnalysisSender {
    tx: Sender<Job>,
}

impl AnalysisSender {
    pub(crate) fn new(tx: Sender<Job>) -> Self {
        Self { tx }
    }

    pub(crate) fn try_send(&self, job: Job) -> Result<(), TrySendError<Job>> {
        self.tx.try_send(job)
    }
}

/// A single background thread that runs the analyzer on each submitted frame
/// in order, never two at once.
pub struct AnalysisExecutor {
    cancel_token: CancellationToken,
    sender: AnalysisSender,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl AnalysisExecutor {
    pub fn spawn(analyzer: Box<dyn Analyzer>) -> Result<Self, AppError> {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let worker = std::thread::Builder::new()
            .name("frame-analysis".to_string())
            .spawn(move || run(analyzer, rx, token))?;
        Ok(Self {
            cancel_token,
            sender: AnalysisSender::new(tx),
            worker: Some(worker),
        })
    }

    pub fn sender(&self) -> AnalysisSender {
        self.sender.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Stops accepting work, lets the frame being analyzed finish and joins the thread.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.cancel_token.cancel();
        // Wakes the worker if it is parked on an empty queue. A full queue
        // means it is not parked and sees the cancellation on its next job.
        match self.sender.try_send(Job::Shutdown) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Analysis queue full at shutdown"),
            Err(TrySendError::Closed(_)) => debug!("Analysis thread already gone"),
        }
        if worker.join().is_err() {
            error!("Analysis thread panicked");
        }
    }
}

impl Drop for AnalysisExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(mut analyzer: Box<dyn Analyzer>, mut rx: Receiver<Job>, cancel_token: CancellationToken) {
    info!("Analysis executor started");
    while let Some(job) = rx.blocking_recv() {
        if cancel_token.is_cancelled() {
            if let Job::Analyze(frame) = &job {
                debug!("Discarding frame {} queued before shutdown", frame.image().id());
            }
            break;
        }
        let Job::Analyze(frame) = job else {
            break;
        };
        let frame_id = frame.image().id();
        // A panicking analyzer loses this frame, not the executor.
        if panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(frame))).is_err() {
            error!("Analysis of frame {} panicked, frame skipped", frame_id);
        }
    }
    info!("Analysis executor stopped");
}
