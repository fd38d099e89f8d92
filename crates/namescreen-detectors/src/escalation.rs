//! Escalation gate: whether the tier-2 candidate is good enough

use namescreen_core::ExtractedEntity;

/// Decision taken on the best tier-2 candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Finalize with the tier-2 candidate
    Finalize,
    /// Hand the request to the fallback tier
    Escalate,
}

/// Escalate when there is no candidate or its confidence is strictly below the threshold
pub fn decide(candidate: Option<&ExtractedEntity>, threshold: f32) -> Escalation {
    match candidate {
        Some(entity) if entity.confidence >= threshold => Escalation::Finalize,
        _ => Escalation::Escalate,
    }
}
