//! Pipeline configuration

use namescreen_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Largest fallback concurrency bound the gate can represent
pub const MAX_CONCURRENT_LLM: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// What the fallback gate does when every slot is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionPolicy {
    /// Degrade to the prior tier immediately
    #[default]
    Reject,
    /// Wait for a slot within the same deadline as the call itself
    Queue,
}

/// Tunables read once per request; replaceable between requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum tier-2 confidence that avoids escalation
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f32,

    /// Enable the generative fallback tier
    #[serde(default = "default_true")]
    pub llm_enabled: bool,

    /// Run the accurate NER tier next to the fast one
    #[serde(default)]
    pub accurate_ner_enabled: bool,

    /// Maximum fallback calls in flight across all requests
    #[serde(default = "default_max_concurrent_llm")]
    pub max_concurrent_llm: usize,

    /// Per-call fallback budget in milliseconds
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,

    /// Maximum cached results
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Behaviour when the concurrency bound is reached
    #[serde(default)]
    pub admission_policy: AdmissionPolicy,
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse pipeline config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Fallback budget as a duration
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }

    /// Reject values the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::config(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.max_concurrent_llm == 0 {
            return Err(Error::config("max_concurrent_llm must be at least 1"));
        }
        if self.max_concurrent_llm > MAX_CONCURRENT_LLM {
            return Err(Error::config(format!(
                "max_concurrent_llm must be at most {}, got {}",
                MAX_CONCURRENT_LLM, self.max_concurrent_llm
            )));
        }
        if self.llm_timeout_ms == 0 {
            return Err(Error::config("llm_timeout_ms must be positive"));
        }
        if self.cache_capacity == 0 {
            return Err(Error::config("cache_capacity must be at least 1"));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_threshold(),
            llm_enabled: true,
            accurate_ner_enabled: false,
            max_concurrent_llm: default_max_concurrent_llm(),
            llm_timeout_ms: default_llm_timeout_ms(),
            cache_capacity: default_cache_capacity(),
            admission_policy: AdmissionPolicy::default(),
        }
    }
}

fn default_threshold() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_llm() -> usize {
    2
}

fn default_llm_timeout_ms() -> u64 {
    30_000
}

fn default_cache_capacity() -> usize {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.admission_policy, AdmissionPolicy::Reject);
        assert_eq!(config.llm_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "confidence_threshold: 0.8\nadmission_policy: queue").unwrap();

        let config = PipelineConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.confidence_threshold, 0.8);
        assert_eq!(config.admission_policy, AdmissionPolicy::Queue);
        assert_eq!(config.cache_capacity, 10_000);
    }

    #[test]
    fn test_validation() {
        let config = PipelineConfig {
            confidence_threshold: 1.5,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            max_concurrent_llm: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_concurrency_bound_must_fit_semaphore() {
        let config = PipelineConfig {
            max_concurrent_llm: usize::MAX,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = PipelineConfig {
            max_concurrent_llm: MAX_CONCURRENT_LLM,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
