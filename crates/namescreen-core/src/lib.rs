//! namescreen Core
//!
//! Core types and utilities shared across namescreen components.
//!
//! This crate provides:
//! - The detection data model (comments, extracted entities, results, verdicts)
//! - Name component parsing (surname / given name / patronymic)
//! - Error types and result handling

pub mod error;
pub mod names;
pub mod types;

pub use error::{Error, Result};
pub use names::NameParts;
pub use types::{
    Comment, DetectionResult, EntitySpan, ExtractedEntity, NameCategory, SanctionsVerdict, Tier,
    PERSON_LABEL,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::names::NameParts;
    pub use crate::types::{
        Comment, DetectionResult, ExtractedEntity, NameCategory, SanctionsVerdict, Tier,
    };
}
