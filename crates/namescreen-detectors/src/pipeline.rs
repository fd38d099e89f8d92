//! Detection pipeline
//!
//! Composes the tiers into one decision per comment. The flow is an
//! explicit state machine with one transition per stage:
//!
//! ```text
//! Received ──cache hit──────────────────────────────────────▶ Cached
//!    │
//!    └─▶ quick filter ──no name─────────────────────────────▶ Finalized
//!           │
//!           └─▶ QuickFiltered ─▶ NER tiers ─▶ NerResolved
//!                                               │ confident ─▶ Finalized
//!                                               └─▶ Escalated ─▶ Finalized
//! ```
//!
//! Sanctions matching runs once on the finalized name, then the result is
//! cached. `detect` never fails: every error degrades to a lower-confidence
//! answer from an earlier tier.

use crate::cache::ResultCache;
use crate::config::PipelineConfig;
use crate::escalation::{decide, Escalation};
use crate::extractor::{reconcile, EntityExtractor, LlmProvider, LlmRequest, NerProvider, TierOutcome};
use crate::fallback::{FallbackGate, FallbackVerdict};
use crate::pattern_ner::PatternNer;
use crate::quick_filter::{QuickFilter, QuickFilterOutcome};
use crate::sanctions::{match_name, SanctionsRegistry};
use namescreen_core::{
    Comment, DetectionResult, Error, ExtractedEntity, NameParts, Result, SanctionsVerdict, Tier,
};
use namescreen_telemetry::{DetectionStats, StatsSnapshot, TierShares};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Confidence of a quick-filter "no name" decision
pub const QUICK_FILTER_CONFIDENCE: f32 = 1.0;
/// Confidence of "no name" when an NER tier answered without a person
pub const NER_NO_PERSON_CONFIDENCE: f32 = 0.8;
/// Confidence of "no name" when no extraction tier answered at all
pub const DEGRADED_CONFIDENCE: f32 = 0.5;

/// Pipeline position of one request
#[derive(Debug)]
enum Stage {
    Received(Comment),
    QuickFiltered {
        comment: Comment,
        segment: String,
    },
    NerResolved {
        comment: Comment,
        resolution: NerResolution,
    },
    Escalated {
        comment: Comment,
        resolution: NerResolution,
    },
    Cached(DetectionResult),
    Finalized {
        key: String,
        decision: Decision,
    },
}

impl Stage {
    fn finalized(comment: &Comment, decision: Decision) -> Self {
        Self::Finalized {
            key: comment.normalized().to_string(),
            decision,
        }
    }
}

/// What the NER tiers settled on
#[derive(Debug, Clone)]
struct NerResolution {
    candidate: Option<ExtractedEntity>,
    /// At least one NER tier answered (possibly with nothing)
    answered: bool,
}

/// A decision awaiting sanctions matching
#[derive(Debug)]
struct Decision {
    result: DetectionResult,
    parts: Option<NameParts>,
}

impl Decision {
    fn no_name(confidence: f32, tier: Tier) -> Self {
        Self {
            result: DetectionResult::no_name(confidence, tier),
            parts: None,
        }
    }

    fn named(parts: NameParts, confidence: f32, tier: Tier) -> Self {
        let result = DetectionResult::from_parts(&parts, confidence, tier);
        let parts = result.has_name.then_some(parts);
        Self { result, parts }
    }

    fn from_entity(entity: &ExtractedEntity) -> Self {
        Self::named(NameParts::parse(&entity.text), entity.confidence, entity.source)
    }
}

/// Tiered name detector with caching and sanctions screening
pub struct Pipeline {
    config: RwLock<Arc<PipelineConfig>>,
    quick_filter: QuickFilter,
    fast: EntityExtractor,
    accurate: Option<EntityExtractor>,
    fallback: FallbackGate,
    cache: ResultCache,
    sanctions: Arc<SanctionsRegistry>,
    stats: DetectionStats,
}

impl Pipeline {
    /// Pipeline with the pattern NER fast tier and no optional backends
    pub fn new(config: PipelineConfig) -> Result<Self> {
        PipelineBuilder::new(config).build()
    }

    /// Start building a pipeline
    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Detect a name in one comment
    pub async fn detect(&self, raw: &str) -> DetectionResult {
        self.detect_traced(raw).await.result
    }

    /// Detect a name and report whether the cache answered
    pub async fn detect_traced(&self, raw: &str) -> Detection {
        let start = Instant::now();
        self.stats.record_request();

        let (result, cached) = match Comment::parse(raw) {
            Ok(comment) => self.run(comment).await,
            Err(e) => {
                debug!("Malformed comment: {}", e);
                let result = DetectionResult::no_name(QUICK_FILTER_CONFIDENCE, Tier::QuickFilter);
                self.stats.record_finalized(result.tier_used, false);
                (result, false)
            }
        };

        let latency_us = start.elapsed().as_micros() as u64;
        self.stats.record_latency(latency_us);

        Detection {
            result,
            cached,
            latency_us,
        }
    }

    async fn run(&self, comment: Comment) -> (DetectionResult, bool) {
        // One config snapshot per request; reloads apply to later requests
        let config = self.config();
        let mut stage = Stage::Received(comment);

        loop {
            stage = match stage {
                Stage::Received(comment) => self.on_received(comment),
                Stage::QuickFiltered { comment, segment } => {
                    self.on_quick_filtered(comment, &segment, &config).await
                }
                Stage::NerResolved { comment, resolution } => {
                    Self::on_ner_resolved(comment, resolution, &config)
                }
                Stage::Escalated { comment, resolution } => {
                    self.on_escalated(comment, resolution, &config).await
                }
                Stage::Cached(result) => {
                    self.stats.record_cache_hit();
                    return (result, true);
                }
                Stage::Finalized { key, decision } => return (self.finalize(key, decision), false),
            };
        }
    }

    fn on_received(&self, comment: Comment) -> Stage {
        if let Some(cached) = self.cache.get(comment.normalized()) {
            debug!(comment = %comment.preview(), "Cache hit");
            return Stage::Cached(cached);
        }

        match self.quick_filter.evaluate(&comment) {
            QuickFilterOutcome::DefiniteNoName => {
                debug!(comment = %comment.preview(), "Quick filter: no name");
                Stage::finalized(
                    &comment,
                    Decision::no_name(QUICK_FILTER_CONFIDENCE, Tier::QuickFilter),
                )
            }
            QuickFilterOutcome::Delegate(segment) => Stage::QuickFiltered { comment, segment },
        }
    }

    async fn on_quick_filtered(&self, comment: Comment, segment: &str, config: &PipelineConfig) -> Stage {
        let accurate = self
            .accurate
            .as_ref()
            .filter(|_| config.accurate_ner_enabled);

        let (fast, accurate): (TierOutcome, Option<TierOutcome>) = match accurate {
            Some(extractor) => {
                let (fast, accurate) = futures::join!(self.fast.extract(segment), extractor.extract(segment));
                (fast, Some(accurate))
            }
            None => (self.fast.extract(segment).await, None),
        };

        let answered = fast.succeeded || accurate.as_ref().map_or(false, |o| o.succeeded);
        let candidate = reconcile(
            fast.best().cloned(),
            accurate.as_ref().and_then(|o| o.best().cloned()),
        );

        debug!(
            segment = %preview(segment),
            candidate = ?candidate.as_ref().map(|c| (&c.text, c.confidence, c.source)),
            "NER tiers resolved"
        );

        Stage::NerResolved {
            comment,
            resolution: NerResolution { candidate, answered },
        }
    }

    fn on_ner_resolved(comment: Comment, resolution: NerResolution, config: &PipelineConfig) -> Stage {
        if decide(resolution.candidate.as_ref(), config.confidence_threshold) == Escalation::Finalize {
            if let Some(candidate) = &resolution.candidate {
                return Stage::finalized(&comment, Decision::from_entity(candidate));
            }
        }

        Stage::Escalated { comment, resolution }
    }

    async fn on_escalated(&self, comment: Comment, resolution: NerResolution, config: &PipelineConfig) -> Stage {
        if config.llm_enabled && self.fallback.is_available() {
            let request = LlmRequest {
                comment: comment.text().to_string(),
                hint: resolution.candidate.clone(),
            };

            match self
                .fallback
                .attempt(request, config.admission_policy, config.llm_timeout())
                .await
            {
                Ok(FallbackVerdict::Name { entity, category }) => {
                    let parts = match category {
                        Some(category) => NameParts::parse_as(&entity.text, category),
                        None => NameParts::parse(&entity.text),
                    };
                    return Stage::finalized(&comment, Decision::named(parts, entity.confidence, Tier::Llm));
                }
                Ok(FallbackVerdict::NoName { confidence }) => {
                    return Stage::finalized(&comment, Decision::no_name(confidence, Tier::Llm));
                }
                Err(e) => {
                    let reason = match &e {
                        Error::Timeout => "timeout",
                        Error::AdmissionRejected => "rejected",
                        Error::ProviderUnavailable(_) => "unavailable",
                        _ => "error",
                    };
                    warn!(comment = %comment.preview(), reason, "Fallback failed, keeping NER result: {}", e);
                    self.stats.record_fallback_failure(reason);
                }
            }
        }

        let decision = match &resolution.candidate {
            Some(candidate) => Decision::from_entity(candidate),
            None if resolution.answered => Decision::no_name(NER_NO_PERSON_CONFIDENCE, Tier::FastNer),
            None => Decision::no_name(DEGRADED_CONFIDENCE, Tier::FastNer),
        };
        Stage::finalized(&comment, decision)
    }

    /// Attach the sanctions verdict, store and count the result
    fn finalize(&self, key: String, decision: Decision) -> DetectionResult {
        let Decision { result, parts } = decision;

        let result = match parts {
            Some(parts) => {
                let verdict = match self.sanctions.snapshot() {
                    Some(index) => match_name(&parts, &index),
                    None => {
                        debug!("Sanctions index not loaded, skipping check");
                        SanctionsVerdict::unchecked()
                    }
                };
                result.with_sanctions(verdict)
            }
            None => result,
        };

        debug!(
            has_name = result.has_name,
            tier = %result.tier_used,
            confidence = result.confidence,
            "Detection finalized"
        );
        self.cache.put(key, result.clone());
        self.stats.record_finalized(result.tier_used, result.sanctions_found());
        result
    }

    /// Current configuration snapshot
    pub fn config(&self) -> Arc<PipelineConfig> {
        self.config.read().clone()
    }

    /// Replace the configuration between requests
    ///
    /// In-flight requests keep the snapshot they started with. The fallback
    /// concurrency bound and the cache capacity are adjusted in place.
    pub fn reload_config(&self, config: PipelineConfig) -> Result<()> {
        config.validate()?;

        let mut current = self.config.write();
        if config.max_concurrent_llm != current.max_concurrent_llm {
            self.fallback.resize(config.max_concurrent_llm);
        }
        if config.cache_capacity != current.cache_capacity {
            let evicted = self.cache.set_capacity(config.cache_capacity);
            debug!(evicted, "Cache resized");
        }

        info!(
            threshold = config.confidence_threshold,
            llm_enabled = config.llm_enabled,
            max_concurrent_llm = config.max_concurrent_llm,
            admission_policy = ?config.admission_policy,
            "Pipeline configuration reloaded"
        );
        *current = Arc::new(config);
        Ok(())
    }

    /// Sanctions registry used for matching
    pub fn sanctions(&self) -> &Arc<SanctionsRegistry> {
        &self.sanctions
    }

    /// Result cache
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Fallback gate
    pub fn fallback(&self) -> &FallbackGate {
        &self.fallback
    }

    /// Raw detection counters
    pub fn detection_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Operational statistics
    pub fn stats(&self) -> PipelineStats {
        let detections = self.stats.snapshot();
        PipelineStats {
            shares: detections.shares(),
            avg_latency_us: detections.avg_latency_us(),
            detections,
            cache: CacheStats {
                entries: self.cache.len(),
                capacity: self.cache.capacity(),
                hits: self.cache.hits(),
                misses: self.cache.misses(),
            },
            fallback: FallbackStats {
                limit: self.fallback.limit(),
                in_flight: self.fallback.in_flight(),
                peak_in_flight: self.fallback.peak_in_flight(),
            },
        }
    }

    /// Component availability
    pub fn health(&self) -> PipelineHealth {
        let config = self.config();
        PipelineHealth {
            fast_ner: self.fast.provider_name().to_string(),
            accurate_ner: self.accurate.as_ref().map(|e| e.provider_name().to_string()),
            accurate_ner_enabled: config.accurate_ner_enabled && self.accurate.is_some(),
            llm: self.fallback.provider_name().map(str::to_string),
            llm_enabled: config.llm_enabled && self.fallback.is_available(),
            sanctions_loaded: self.sanctions.is_loaded(),
            sanctions_records: self.sanctions.len(),
            cache_entries: self.cache.len(),
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(40).collect()
}

/// One answered request
#[derive(Debug, Clone)]
pub struct Detection {
    pub result: DetectionResult,
    /// Served from the result cache
    pub cached: bool,
    pub latency_us: u64,
}

/// Cache section of [`PipelineStats`]
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Fallback section of [`PipelineStats`]
#[derive(Debug, Clone, Serialize)]
pub struct FallbackStats {
    pub limit: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

/// Statistics exposed to operators
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    #[serde(flatten)]
    pub detections: StatsSnapshot,
    pub shares: TierShares,
    pub avg_latency_us: u64,
    pub cache: CacheStats,
    pub fallback: FallbackStats,
}

/// Which components are wired and ready
#[derive(Debug, Clone, Serialize)]
pub struct PipelineHealth {
    pub fast_ner: String,
    pub accurate_ner: Option<String>,
    pub accurate_ner_enabled: bool,
    pub llm: Option<String>,
    pub llm_enabled: bool,
    pub sanctions_loaded: bool,
    pub sanctions_records: usize,
    pub cache_entries: usize,
}

/// Builder for assembling a pipeline from providers
pub struct PipelineBuilder {
    config: PipelineConfig,
    fast: Option<Arc<dyn NerProvider>>,
    accurate: Option<Arc<dyn NerProvider>>,
    llm: Option<Arc<dyn LlmProvider>>,
    sanctions: Option<Arc<SanctionsRegistry>>,
    stats: Option<DetectionStats>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            fast: None,
            accurate: None,
            llm: None,
            sanctions: None,
            stats: None,
        }
    }

    /// Fast NER provider (defaults to [`PatternNer`])
    pub fn fast_ner(mut self, provider: Arc<dyn NerProvider>) -> Self {
        self.fast = Some(provider);
        self
    }

    /// Accurate NER provider
    pub fn accurate_ner(mut self, provider: Arc<dyn NerProvider>) -> Self {
        self.accurate = Some(provider);
        self
    }

    /// Generative fallback provider
    pub fn llm(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(provider);
        self
    }

    /// Shared sanctions registry
    pub fn sanctions(mut self, registry: Arc<SanctionsRegistry>) -> Self {
        self.sanctions = Some(registry);
        self
    }

    /// Shared statistics sink
    pub fn stats(mut self, stats: DetectionStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;

        let fast: Arc<dyn NerProvider> = match self.fast {
            Some(provider) => provider,
            None => Arc::new(PatternNer::new()?),
        };

        Ok(Pipeline {
            quick_filter: QuickFilter::new()?,
            fast: EntityExtractor::fast(fast),
            accurate: self.accurate.map(EntityExtractor::accurate),
            fallback: FallbackGate::new(self.llm, self.config.max_concurrent_llm),
            cache: ResultCache::new(self.config.cache_capacity),
            sanctions: self.sanctions.unwrap_or_default(),
            stats: self.stats.unwrap_or_default(),
            config: RwLock::new(Arc::new(self.config)),
        })
    }
}
