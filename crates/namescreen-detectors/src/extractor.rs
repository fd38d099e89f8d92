//! Extraction capability traits and the tier wrapper around them

use async_trait::async_trait;
use namescreen_core::{EntitySpan, ExtractedEntity, NameCategory, Result, Tier};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Trait for named-entity-recognition backends
#[async_trait]
pub trait NerProvider: Send + Sync {
    /// Extract labelled spans from the given text
    async fn extract(&self, text: &str) -> Result<Vec<EntitySpan>>;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// Context handed to a generative backend
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Comment text with original casing
    pub comment: String,

    /// Best lower-tier candidate, if any
    pub hint: Option<ExtractedEntity>,
}

/// Structured answer from a generative backend
#[derive(Debug, Clone, PartialEq)]
pub struct LlmAnswer {
    /// Extracted name, `None` when the model states there is no name
    pub name: Option<String>,

    /// Category the model stated, when it stated one
    pub category: Option<NameCategory>,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

/// Trait for generative fallback backends
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run inference for one comment
    async fn infer(&self, request: &LlmRequest) -> Result<LlmAnswer>;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// What one NER tier produced for a segment
#[derive(Debug, Clone)]
pub struct TierOutcome {
    /// Tier that ran
    pub tier: Tier,

    /// Person entities, empty when the provider failed
    pub entities: Vec<ExtractedEntity>,

    /// Whether the provider answered at all
    pub succeeded: bool,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl TierOutcome {
    /// Highest-confidence entity of this tier
    pub fn best(&self) -> Option<&ExtractedEntity> {
        best_entity(&self.entities)
    }
}

/// An NER provider bound to the tier it serves
#[derive(Clone)]
pub struct EntityExtractor {
    tier: Tier,
    provider: Arc<dyn NerProvider>,
}

impl EntityExtractor {
    /// Bind a provider to the fast tier
    pub fn fast(provider: Arc<dyn NerProvider>) -> Self {
        Self {
            tier: Tier::FastNer,
            provider,
        }
    }

    /// Bind a provider to the accurate tier
    pub fn accurate(provider: Arc<dyn NerProvider>) -> Self {
        Self {
            tier: Tier::AccurateNer,
            provider,
        }
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Extract person entities; provider failures yield an empty outcome
    pub async fn extract(&self, segment: &str) -> TierOutcome {
        let start = Instant::now();

        let (entities, succeeded) = match self.provider.extract(segment).await {
            Ok(spans) => {
                let entities: Vec<_> = spans
                    .iter()
                    .filter(|span| span.is_person() && !span.text.trim().is_empty())
                    .map(|span| ExtractedEntity::from_span(span, self.tier))
                    .collect();
                (entities, true)
            }
            Err(e) => {
                warn!(
                    tier = %self.tier,
                    provider = self.provider.name(),
                    "Extraction failed, skipping tier: {}",
                    e
                );
                (Vec::new(), false)
            }
        };

        let latency_us = start.elapsed().as_micros() as u64;
        debug!(tier = %self.tier, found = entities.len(), latency_us, "Extraction finished");

        TierOutcome {
            tier: self.tier,
            entities,
            succeeded,
            latency_us,
        }
    }
}

/// Highest confidence wins; ties go to the longer span, then the earlier one
pub fn best_entity(entities: &[ExtractedEntity]) -> Option<&ExtractedEntity> {
    entities.iter().fold(None, |best: Option<&ExtractedEntity>, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            let better = candidate.confidence > current.confidence
                || (candidate.confidence == current.confidence
                    && candidate.text.chars().count() > current.text.chars().count());
            Some(if better { candidate } else { current })
        }
    })
}

/// Pick the tier-2 candidate from the fast and accurate tiers
///
/// The higher confidence wins outright, whether or not the spans agree.
/// Equal confidence goes to the accurate tier.
pub fn reconcile(
    fast: Option<ExtractedEntity>,
    accurate: Option<ExtractedEntity>,
) -> Option<ExtractedEntity> {
    match (fast, accurate) {
        (Some(fast), Some(accurate)) => {
            if accurate.confidence >= fast.confidence {
                Some(accurate)
            } else {
                Some(fast)
            }
        }
        (fast, accurate) => accurate.or(fast),
    }
}
