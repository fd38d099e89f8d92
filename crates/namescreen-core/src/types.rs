//! Core types for namescreen

use crate::error::{Error, Result};
use crate::names::NameParts;
use serde::{Deserialize, Serialize};

/// Label a provider span must carry to be treated as a person name
pub const PERSON_LABEL: &str = "person";

/// A payment comment, normalized once at pipeline entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Whitespace-collapsed text with original casing
    text: String,

    /// Case-folded form of `text`, used as the cache key
    normalized: String,
}

impl Comment {
    /// Normalize a raw comment, rejecting empty or non-text input
    pub fn parse(raw: &str) -> Result<Self> {
        let text = raw
            .split(|c: char| c.is_whitespace() || c.is_control())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            return Err(Error::malformed("comment is empty"));
        }

        let normalized = text.to_lowercase();
        Ok(Self { text, normalized })
    }

    /// Text with original casing (what the extractors see)
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Case-folded text (what the cache and pattern tables see)
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Truncated form suitable for log lines
    pub fn preview(&self) -> String {
        self.text.chars().take(40).collect()
    }
}

/// Pipeline tier, ordered by increasing cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Deterministic pattern filter
    QuickFilter,
    /// Lightweight NER
    FastNer,
    /// Heavier, more precise NER
    AccurateNer,
    /// Generative fallback
    Llm,
}

impl Tier {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuickFilter => "quick_filter",
            Self::FastNer => "fast_ner",
            Self::AccurateNer => "accurate_ner",
            Self::Llm => "llm",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of name a comment carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameCategory {
    /// No person name
    None,
    /// Given name (optionally with patronymic) but no surname
    GivenNameOnly,
    /// A lone surname
    SurnameOnly,
    /// Surname and given name
    GivenPlusSurname,
    /// Surname, given name and patronymic
    FullTriple,
}

impl NameCategory {
    /// Whether names of this category include a surname component
    pub fn has_surname(&self) -> bool {
        matches!(
            self,
            Self::SurnameOnly | Self::GivenPlusSurname | Self::FullTriple
        )
    }
}

/// A span reported by an NER provider, before person filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Surface text of the span
    pub text: String,

    /// Byte offsets into the segment
    pub start: usize,
    pub end: usize,

    /// Provider label, lowercased (e.g. "person", "loc")
    pub label: String,

    /// Provider confidence (0.0-1.0)
    pub confidence: f32,
}

impl EntitySpan {
    /// Create a person span
    pub fn person(text: impl Into<String>, start: usize, end: usize, confidence: f32) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            label: PERSON_LABEL.to_string(),
            confidence,
        }
    }

    /// Whether this span names a person
    pub fn is_person(&self) -> bool {
        self.label == PERSON_LABEL
    }
}

/// A candidate name produced by an NER or LLM tier
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntity {
    /// Candidate name text
    pub text: String,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Tier that produced the candidate
    pub source: Tier,
}

impl ExtractedEntity {
    /// Create a new extracted entity, clamping confidence into [0, 1]
    pub fn new(text: impl Into<String>, confidence: f32, source: Tier) -> Self {
        Self {
            text: text.into(),
            confidence: clamp_confidence(confidence),
            source,
        }
    }

    /// Convert a person span from a provider
    pub fn from_span(span: &EntitySpan, source: Tier) -> Self {
        Self::new(span.text.trim(), span.confidence, source)
    }
}

/// Outcome of checking a name against the sanctions list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SanctionsVerdict {
    /// Whether a lookup was actually performed
    pub checked: bool,

    /// Whether a sanctioned individual matched
    pub found: bool,

    /// Source identifier of the matching record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_record_id: Option<String>,
}

impl SanctionsVerdict {
    /// No lookup performed (no surname, or no index loaded)
    pub fn unchecked() -> Self {
        Self::default()
    }

    /// Lookup performed, nothing matched
    pub fn clear() -> Self {
        Self {
            checked: true,
            found: false,
            matched_record_id: None,
        }
    }

    /// Lookup performed, matched the given record
    pub fn matched(record_id: impl Into<String>) -> Self {
        Self {
            checked: true,
            found: true,
            matched_record_id: Some(record_id.into()),
        }
    }
}

/// Final decision for one comment; the unit cached and returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub has_name: bool,

    pub category: NameCategory,

    #[serde(default)]
    pub detected_name: Option<String>,

    pub confidence: f32,

    /// Tier that produced the decision (not merely the last one invoked)
    pub tier_used: Tier,

    #[serde(rename = "sanctions_check", default, skip_serializing_if = "Option::is_none")]
    pub sanctions: Option<SanctionsVerdict>,
}

impl DetectionResult {
    /// A "no name" decision
    pub fn no_name(confidence: f32, tier_used: Tier) -> Self {
        Self {
            has_name: false,
            category: NameCategory::None,
            detected_name: None,
            confidence: clamp_confidence(confidence),
            tier_used,
            sanctions: None,
        }
    }

    /// Build a decision from parsed name components
    ///
    /// Parts with no usable component collapse to a "no name" decision so
    /// that `has_name = false` never carries a name.
    pub fn from_parts(parts: &NameParts, confidence: f32, tier_used: Tier) -> Self {
        let category = parts.category();
        match (category, parts.display()) {
            (NameCategory::None, _) | (_, None) => Self::no_name(confidence, tier_used),
            (category, Some(name)) => Self {
                has_name: true,
                category,
                detected_name: Some(name),
                confidence: clamp_confidence(confidence),
                tier_used,
                sanctions: None,
            },
        }
    }

    /// Attach a sanctions verdict
    pub fn with_sanctions(mut self, verdict: SanctionsVerdict) -> Self {
        self.sanctions = Some(verdict);
        self
    }

    /// Whether the attached verdict flags a sanctioned individual
    pub fn sanctions_found(&self) -> bool {
        self.sanctions.as_ref().map_or(false, |v| v.found)
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
