//! Fixed-interval driver for the job processor.

use std::time::Duration;

use barbcut_pipeline::JobProcessor;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct Scheduler {
    processor: JobProcessor,
    interval: Duration,
}

impl Scheduler {
    pub fn new(processor: JobProcessor, interval: Duration) -> Self {
        Self {
            processor,
            interval,
        }
    }

    /// Run ticks until the cancellation token is triggered.
    ///
    /// The first tick fires immediately. A tick in progress is finished
    /// before shutdown is observed.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            batch_size = self.processor.config().batch_size,
            "Job scheduler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.processor.run_tick().await {
                        tracing::error!(error = %e, "Scheduler tick failed");
                    }
                }
            }
        }
    }
}
