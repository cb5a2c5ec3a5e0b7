use std::sync::Arc;
use std::time::Duration;

use barbcut_cloud::BlobConfig;
use barbcut_comfyui::{ComfyUIConfig, ComfyUIGenerator, ImageGenerator};
use barbcut_pipeline::JobProcessor;
use barbcut_worker::{Scheduler, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "barbcut_worker=debug,barbcut_pipeline=debug,barbcut_comfyui=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = WorkerConfig::from_env().expect("Invalid scheduler configuration");
    let blob_config = BlobConfig::from_env().expect("Invalid blob store configuration");
    tracing::info!(?config, bucket = %blob_config.bucket, "Loaded worker configuration");

    let database_url = std::env::var("DATABASE_URL").ok();
    let store = barbcut_db::connect(database_url.as_deref())
        .await
        .expect("Failed to connect to document store");
    let blobs = barbcut_cloud::connect(&blob_config)
        .await
        .expect("Failed to open blob store");

    let generator: Option<Arc<dyn ImageGenerator>> =
        match ComfyUIConfig::from_env().expect("Invalid ComfyUI configuration") {
            Some(comfyui) => {
                tracing::info!(server_url = %comfyui.server_url, "ComfyUI generator configured");
                if let Some(raised) = config.fit_to_generator_timeout(comfyui.timeout) {
                    tracing::warn!(
                        minutes = raised.num_minutes(),
                        "STALE_JOB_MINUTES is below the worst-case generation time, raised"
                    );
                }
                Some(Arc::new(
                    ComfyUIGenerator::new(comfyui).expect("Failed to build ComfyUI generator"),
                ))
            }
            None => {
                tracing::warn!("COMFYUI_SERVER_URL not set; claimed jobs will fail until it is configured");
                None
            }
        };

    let processor = JobProcessor::new(
        store,
        blobs,
        generator,
        config.processor_config(blob_config.bucket),
    );
    let scheduler = Scheduler::new(processor, config.tick_interval);

    let cancel = CancellationToken::new();
    let scheduler_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        scheduler.run(scheduler_cancel).await;
    });

    wait_for_shutdown().await;
    cancel.cancel();

    // A tick may be mid-generation; give it time to finish.
    if tokio::time::timeout(Duration::from_secs(60), handle).await.is_err() {
        tracing::warn!("Scheduler did not stop in time, exiting anyway");
    }
    tracing::info!("Worker stopped");
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.expect("Failed to listen for Ctrl-C");
                tracing::info!("Ctrl-C received, stopping scheduler");
            }
            _ = sigterm.recv() => tracing::info!("SIGTERM received, stopping scheduler"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl-C");
        tracing::info!("Ctrl-C received, stopping scheduler");
    }
}
