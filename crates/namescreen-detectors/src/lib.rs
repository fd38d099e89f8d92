//! namescreen detectors
//!
//! Tiered detection of person names in payment comments.
//!
//! Tiers are ordered by cost and only run when the cheaper ones are
//! inconclusive:
//! - Tier 1: Quick filter (regex / keyword tables, no model)
//! - Tier 2: Fast NER, optionally paired with an accurate NER backend
//! - Tier 3: LLM fallback behind a concurrency bound and a deadline
//!
//! Finalized names are screened against a sanctions index, and results are
//! memoized in a bounded LRU cache.

pub mod cache;
pub mod config;
pub mod escalation;
pub mod extractor;
pub mod fallback;
pub mod http_ner;
pub mod llm;
pub mod pattern_ner;
pub mod pipeline;
pub mod quick_filter;
pub mod sanctions;

pub use cache::ResultCache;
pub use config::{AdmissionPolicy, PipelineConfig, MAX_CONCURRENT_LLM};
pub use escalation::{decide, Escalation};
pub use extractor::{
    best_entity, reconcile, EntityExtractor, LlmAnswer, LlmProvider, LlmRequest, NerProvider,
    TierOutcome,
};
pub use fallback::{FallbackGate, FallbackVerdict};
pub use http_ner::HttpNer;
pub use llm::{parse_llm_output, OllamaLlm, OllamaSettings};
pub use pattern_ner::PatternNer;
pub use pipeline::{Detection, Pipeline, PipelineBuilder, PipelineHealth, PipelineStats};
pub use quick_filter::{QuickFilter, QuickFilterOutcome};
pub use sanctions::{
    load_sanctions_tsv, match_name, normalize_name, SanctionsIndex, SanctionsRecord,
    SanctionsRegistry,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{AdmissionPolicy, PipelineConfig};
    pub use crate::extractor::{LlmProvider, NerProvider};
    pub use crate::pipeline::{Pipeline, PipelineBuilder};
    pub use crate::sanctions::SanctionsRegistry;
}
