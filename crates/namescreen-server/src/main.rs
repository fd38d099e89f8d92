//! namescreen
//!
//! HTTP service that decides whether a payment comment names a person and
//! screens detected names against a sanctions list.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

use namescreen_server::{create_router, AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "namescreen")]
#[command(about = "Payment comment name detection and sanctions screening", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Ollama base URL for the fallback tier
    #[arg(long, env = "NAMESCREEN_OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Token-classification endpoint for the accurate NER tier
    #[arg(long)]
    accurate_ner_url: Option<String>,

    /// Sanctions list (tab-separated)
    #[arg(short, long)]
    sanctions: Option<PathBuf>,

    /// Directory for the JSON-lines request log
    #[arg(long)]
    request_log: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(url) = &self.ollama_url {
            config.llm.ollama_url = Some(url.clone());
        }
        if let Some(url) = &self.accurate_ner_url {
            config.accurate_ner_url = Some(url.clone());
            config.pipeline.accurate_ner_enabled = true;
        }
        if let Some(path) = &self.sanctions {
            config.sanctions_path = Some(path.clone());
        }
        if let Some(dir) = &self.request_log {
            config.request_log_dir = Some(dir.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);

    info!("Starting namescreen");

    let mut config = ServerConfig::load(Some(cli.config.as_path()))?;
    cli.apply(&mut config);
    config.validate()?;
    info!("Configuration loaded successfully");
    info!(
        threshold = config.pipeline.confidence_threshold,
        llm_enabled = config.pipeline.llm_enabled,
        max_concurrent_llm = config.pipeline.max_concurrent_llm,
        "Pipeline settings"
    );

    let metrics_handle = init_metrics()?;

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let state = AppState::from_config(config, Some(cli.config.clone()), metrics_handle)?;
    let request_log = state.request_log.clone();
    info!("Application state initialized successfully");

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            warn!("Shutdown signal received, stopping server...");
        })
        .await?;

    if let Some(log) = request_log {
        log.flush();
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("namescreen=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("namescreen=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!("namescreen_requests_total", "Total number of detection requests");
    metrics::describe_counter!("namescreen_cache_hits_total", "Requests answered from the result cache");
    metrics::describe_counter!(
        "namescreen_detections_total",
        "Freshly computed detections by deciding tier"
    );
    metrics::describe_counter!(
        "namescreen_sanctions_matches_total",
        "Detections matching a sanctioned individual"
    );
    metrics::describe_counter!(
        "namescreen_fallback_failures_total",
        "Fallback attempts that produced nothing, by reason"
    );
    metrics::describe_histogram!(
        "namescreen_detect_latency_seconds",
        metrics::Unit::Seconds,
        "End-to-end detection latency"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
