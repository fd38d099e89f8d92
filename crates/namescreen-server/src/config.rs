//! Server configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional YAML
//! file, then `NAMESCREEN__*` environment variables. CLI flags are applied
//! on top by the binary.

use anyhow::Context;
use namescreen_detectors::{OllamaSettings, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `NAMESCREEN__PIPELINE__CONFIDENCE_THRESHOLD`
pub const ENV_PREFIX: &str = "NAMESCREEN";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Detection pipeline settings (hot-reloadable)
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Generative fallback backend
    #[serde(default)]
    pub llm: LlmBackendConfig,

    /// Token-classification endpoint for the accurate NER tier
    #[serde(default)]
    pub accurate_ner_url: Option<String>,

    /// Per-call budget for the accurate NER tier in milliseconds
    #[serde(default = "default_ner_timeout_ms")]
    pub ner_timeout_ms: u64,

    /// Tab-separated sanctions list
    #[serde(default)]
    pub sanctions_path: Option<PathBuf>,

    /// Directory for the JSON-lines request log (disabled when unset)
    #[serde(default)]
    pub request_log_dir: Option<PathBuf>,
}

/// Ollama backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmBackendConfig {
    /// Base URL; the fallback tier is absent when unset
    #[serde(default)]
    pub ollama_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LlmBackendConfig {
    /// Provider settings, if a backend is configured
    pub fn ollama_settings(&self) -> Option<OllamaSettings> {
        self.ollama_url.as_ref().map(|url| OllamaSettings {
            base_url: url.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
    }
}

impl Default for LlmBackendConfig {
    fn default() -> Self {
        Self {
            ollama_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional YAML file layered with environment variables
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that deserialization cannot express
    pub fn validate(&self) -> anyhow::Result<()> {
        self.pipeline.validate()?;
        if self.ner_timeout_ms == 0 {
            anyhow::bail!("ner_timeout_ms must be positive");
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            pipeline: PipelineConfig::default(),
            llm: LlmBackendConfig::default(),
            accurate_ner_url: None,
            ner_timeout_ms: default_ner_timeout_ms(),
            sanctions_path: None,
            request_log_dir: None,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_ner_timeout_ms() -> u64 {
    2_000
}

fn default_model() -> String {
    OllamaSettings::default().model
}

fn default_temperature() -> f32 {
    OllamaSettings::default().temperature
}

fn default_max_tokens() -> u32 {
    OllamaSettings::default().max_tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use namescreen_detectors::AdmissionPolicy;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load(Some(Path::new("/nonexistent/namescreen.yaml"))).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert!(config.llm.ollama_settings().is_none());
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
port: 9100
pipeline:
  confidence_threshold: 0.8
  admission_policy: queue
llm:
  ollama_url: http://ollama:11434
  model: qwen2.5:7b
sanctions_path: /data/sanctions.tsv
"#
        )
        .unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.pipeline.confidence_threshold, 0.8);
        assert_eq!(config.pipeline.admission_policy, AdmissionPolicy::Queue);
        assert_eq!(config.pipeline.cache_capacity, 10_000);
        assert_eq!(config.sanctions_path, Some(PathBuf::from("/data/sanctions.tsv")));

        let settings = config.llm.ollama_settings().unwrap();
        assert_eq!(settings.base_url, "http://ollama:11434");
        assert_eq!(settings.model, "qwen2.5:7b");
        assert_eq!(settings.max_tokens, 150);
    }

    #[test]
    fn test_invalid_pipeline_section_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "pipeline:\n  confidence_threshold: 1.5").unwrap();

        assert!(ServerConfig::load(Some(file.path())).is_err());
    }
}
