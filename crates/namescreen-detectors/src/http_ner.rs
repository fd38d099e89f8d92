//! Remote token-classification NER (accurate tier)
//!
//! Talks to an inference endpoint that accepts `{"inputs": "..."}` and
//! answers with aggregated entity groups, e.g. a Hugging Face
//! token-classification pipeline serving a Ukrainian XLM-RoBERTa model.

use crate::extractor::NerProvider;
use async_trait::async_trait;
use namescreen_core::{EntitySpan, Error, Result, PERSON_LABEL};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct NerRequest<'a> {
    inputs: &'a str,
}

/// One entity as returned by a token-classification endpoint
#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    entity_group: Option<String>,
    #[serde(default)]
    entity: Option<String>,
    score: f32,
    word: String,
    #[serde(default)]
    start: Option<usize>,
    #[serde(default)]
    end: Option<usize>,
}

/// HTTP-backed NER provider
pub struct HttpNer {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpNer {
    /// Create a provider for the given endpoint
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build NER client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            client,
        })
    }
}

/// Map provider labels onto the person/other taxonomy
fn normalize_label(raw: &str) -> String {
    let bare = raw
        .trim_start_matches("B-")
        .trim_start_matches("I-")
        .to_lowercase();

    match bare.as_str() {
        "per" | "person" | "pers" => PERSON_LABEL.to_string(),
        _ => bare,
    }
}

fn into_spans(raw: Vec<RawEntity>) -> Vec<EntitySpan> {
    raw.into_iter()
        .map(|entity| {
            let label = entity
                .entity_group
                .as_deref()
                .or(entity.entity.as_deref())
                .map(normalize_label)
                .unwrap_or_default();
            let start = entity.start.unwrap_or(0);
            let end = entity.end.unwrap_or(start + entity.word.len());

            EntitySpan {
                text: entity.word.trim().to_string(),
                start,
                end,
                label,
                confidence: entity.score,
            }
        })
        .collect()
}

#[async_trait]
impl NerProvider for HttpNer {
    async fn extract(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&NerRequest { inputs: text })
            .send()
            .await
            .map_err(|e| Error::unavailable(format!("{}: {}", self.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::provider(format!("{} returned {}", self.name, status)));
        }

        let raw: Vec<RawEntity> = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("{}: invalid response: {}", self.name, e)))?;

        debug!(provider = %self.name, entities = raw.len(), "NER response received");
        Ok(into_spans(raw))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
