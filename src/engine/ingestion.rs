//! Submission ingestion: async channel processor for tag submissions
//!
//! The UI/API layer hands submissions to the engine through an mpsc
//! channel; each request carries a oneshot reply slot so the caller gets
//! its outcome (or error) back without the engine knowing anything about
//! transport.

use super::pipeline::{SubmitError, TagPipeline};
use super::types::{SubmitOutcome, TagSubmission};
use tokio::sync::{mpsc, oneshot};

/// One queued submission plus its reply slot
pub struct SubmissionRequest {
    pub submission: TagSubmission,
    pub reply: oneshot::Sender<Result<SubmitOutcome, SubmitError>>,
}

/// Drain the submission channel through the pipeline.
///
/// Runs until the channel closes (all senders dropped). Concurrent
/// pipelines are represented by concurrent senders; within this loop each
/// submission's writes keep their fixed order.
pub async fn start_submission_ingestion(mut rx: mpsc::Receiver<SubmissionRequest>, pipeline: TagPipeline) {
    log::info!("🚀 Starting submission ingestion");

    let mut processed = 0u64;
    let mut last_log_time = std::time::Instant::now();

    while let Some(request) = rx.recv().await {
        let result = pipeline.submit(&request.submission).await;

        match &result {
            Ok(outcome) if outcome.duplicate => {}
            Ok(outcome) => {
                log::debug!(
                    "🏷️  Tag {} accepted (+{} exp, {} new badges)",
                    outcome.tag_id,
                    outcome.exp_gained,
                    outcome.new_badges.len()
                );
            }
            Err(SubmitError::Validation(e)) => {
                log::debug!("🚫 Submission rejected: {}", e);
            }
            Err(e) => {
                log::error!("⚠️  Submission failed: {}", e);
            }
        }

        // Caller may have gone away; dropping the reply is fine
        let _ = request.reply.send(result);

        processed += 1;
        if last_log_time.elapsed().as_secs() >= 10 {
            let per_sec = processed as f64 / last_log_time.elapsed().as_secs_f64();
            log::info!("📊 Ingestion rate: {:.1} submissions/sec", per_sec);
            last_log_time = std::time::Instant::now();
            processed = 0;
        }
    }

    log::info!("🛑 Submission channel closed, ingestion stopped");
}
