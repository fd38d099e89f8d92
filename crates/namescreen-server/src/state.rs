//! Shared application state

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use namescreen_detectors::{HttpNer, OllamaLlm, Pipeline, SanctionsRegistry};
use namescreen_telemetry::{RequestLog, RequestLogConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Detection pipeline
    pub pipeline: Arc<Pipeline>,

    /// Configuration the server started with
    pub config: Arc<ServerConfig>,

    /// File the configuration was read from, for reloads
    pub config_path: Option<PathBuf>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,

    /// Optional request log
    pub request_log: Option<RequestLog>,
}

impl AppState {
    /// Wire providers, load the sanctions list and open the request log
    pub fn from_config(
        config: ServerConfig,
        config_path: Option<PathBuf>,
        metrics_handle: PrometheusHandle,
    ) -> Result<Self> {
        let mut builder = Pipeline::builder(config.pipeline.clone());

        if let Some(url) = &config.accurate_ner_url {
            info!("Accurate NER endpoint: {}", url);
            let ner = HttpNer::new(
                "accurate_ner",
                url.clone(),
                Duration::from_millis(config.ner_timeout_ms),
            )?;
            builder = builder.accurate_ner(Arc::new(ner));
        }

        if let Some(settings) = config.llm.ollama_settings() {
            info!("LLM fallback: {} ({})", settings.base_url, settings.model);
            builder = builder.llm(Arc::new(OllamaLlm::new(settings)));
        } else {
            info!("No LLM backend configured, fallback tier disabled");
        }

        // A missing or broken list degrades screening but never blocks detection
        let sanctions = Arc::new(SanctionsRegistry::new());
        if let Some(path) = &config.sanctions_path {
            if let Err(e) = sanctions.reload_from(path) {
                warn!("Sanctions list unavailable, names will be reported unchecked: {}", e);
            }
        }
        builder = builder.sanctions(sanctions);

        let request_log = match &config.request_log_dir {
            Some(dir) => Some(RequestLog::open(RequestLogConfig::new(dir))?),
            None => None,
        };

        Ok(Self {
            pipeline: Arc::new(builder.build()?),
            config: Arc::new(config),
            config_path,
            metrics_handle,
            request_log,
        })
    }
}
