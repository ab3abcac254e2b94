use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;
use traveler_core::report::ReportQueue;
use traveler_core::{CoreError, CoreResult};
use traveler_shared::ReportRequestedEvent;

/// Pending jobs the in-process queue holds before `enqueue` starts waiting.
pub const LOCAL_QUEUE_CAPACITY: usize = 100;

/// In-process job queue. The receiving half is drained by the report worker.
#[derive(Clone)]
pub struct LocalReportQueue {
    tx: mpsc::Sender<ReportRequestedEvent>,
}

impl LocalReportQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ReportRequestedEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ReportQueue for LocalReportQueue {
    async fn enqueue(&self, job: &ReportRequestedEvent) -> CoreResult<()> {
        self.tx
            .send(job.clone())
            .await
            .map_err(|_| CoreError::Queue("report worker is not running".to_string()))?;
        info!(job_id = %job.job_id, "Report job queued");
        Ok(())
    }
}
