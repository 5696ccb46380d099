//! Render/publish worker binary.

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use studio_models::ProjectKind;
use studio_provider::{
    HttpProviderConfig, HttpRenderProvider, MockRenderProvider, RenderProvider,
};
use studio_queue::JobQueue;
use studio_store::{MemoryStore, ProjectStore};
use studio_worker::{
    DestinationRegistry, JobExecutor, PublishProcessor, RenderProcessor, WorkerConfig,
};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting studio-worker");

    if let Err(e) = run().await {
        error!("Worker error: {:#}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

/// Colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("studio=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        info!("Serving metrics on {}", addr);
    }

    let queue = JobQueue::from_env().context("failed to create job queue")?;
    let store: Arc<dyn ProjectStore> = Arc::new(MemoryStore::new());

    let video = provider("VIDEO_PROVIDER", ProjectKind::Video)?;
    let print = provider("PRINT_PROVIDER", ProjectKind::Print)?;
    info!("Render providers: video={}, print={}", video.name(), print.name());

    let render = RenderProcessor::new(Arc::clone(&store), video, print, config.render);
    let publish = PublishProcessor::new(
        Arc::clone(&store),
        queue.clone(),
        DestinationRegistry::with_stubs(config.publish_stub_delay),
    );

    let executor = Arc::new(JobExecutor::new(config, queue, render, publish));

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_executor.shutdown();
    });

    executor.run().await?;
    Ok(())
}

/// HTTP provider when `<prefix>_BASE_URL` is set, mock otherwise.
fn provider(prefix: &str, kind: ProjectKind) -> anyhow::Result<Arc<dyn RenderProvider>> {
    let provider: Arc<dyn RenderProvider> = match HttpProviderConfig::from_env(prefix, kind) {
        Some(config) => Arc::new(
            HttpRenderProvider::new(config)
                .with_context(|| format!("invalid {} configuration", prefix))?,
        ),
        None => match kind {
            ProjectKind::Video => Arc::new(MockRenderProvider::video()),
            ProjectKind::Print => Arc::new(MockRenderProvider::print()),
        },
    };
    Ok(provider)
}
