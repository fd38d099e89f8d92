//! Sanctions index, matcher and loader
//!
//! The index is an immutable snapshot. [`SanctionsRegistry`] hands out
//! `Arc` clones of the current snapshot and swaps in a freshly built one on
//! reload, so a lookup that started before a reload finishes against the
//! index it started with.

use namescreen_core::{Error, NameParts, Result, SanctionsVerdict};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold a name component for comparison
///
/// Decomposes, drops combining marks, lowercases, removes apostrophes and
/// hyphens, and collapses whitespace.
pub fn normalize_name(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| !matches!(c, '\'' | '’' | 'ʼ' | '`' | '-'))
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One sanctioned individual (or one alias of one), normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanctionsRecord {
    pub surname: String,
    pub given_name: Option<String>,
    pub patronymic: Option<String>,
    /// Identifier in the source list
    pub source_id: String,
    /// Name as written in the source list
    pub display_name: String,
    pub status: Option<String>,
}

impl SanctionsRecord {
    /// Build a record from a "Surname GivenName Patronymic" string
    ///
    /// Returns `None` when the name has no usable words.
    pub fn from_full_name(name: &str, source_id: impl Into<String>) -> Option<Self> {
        let normalized = normalize_name(name);
        let mut words = normalized.split(' ').filter(|w| !w.is_empty());

        let surname = words.next()?.to_string();
        let given_name = words.next().map(str::to_string);
        let rest: Vec<&str> = words.collect();
        let patronymic = (!rest.is_empty()).then(|| rest.join(" "));

        Some(Self {
            surname,
            given_name,
            patronymic,
            source_id: source_id.into(),
            display_name: name.trim().to_string(),
            status: None,
        })
    }

    /// Attach the listing status
    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = status.filter(|s| !s.trim().is_empty());
        self
    }
}

/// Immutable, surname-keyed view over a record list
#[derive(Debug, Default)]
pub struct SanctionsIndex {
    records: Vec<SanctionsRecord>,
    by_surname: HashMap<String, Vec<usize>>,
}

impl SanctionsIndex {
    /// Build an index; records keep their input order within a surname bucket
    pub fn new(records: Vec<SanctionsRecord>) -> Self {
        let mut by_surname: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_surname.entry(record.surname.clone()).or_default().push(idx);
        }

        Self { records, by_surname }
    }

    /// Number of records (aliases count separately)
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct listed individuals
    pub fn individuals(&self) -> usize {
        let mut ids: Vec<&str> = self.records.iter().map(|r| r.source_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Records sharing a normalized surname, in input order
    pub fn candidates(&self, surname: &str) -> impl Iterator<Item = &SanctionsRecord> {
        self.by_surname
            .get(surname)
            .into_iter()
            .flatten()
            .map(|&idx| &self.records[idx])
    }
}

/// Check a parsed name against an index
///
/// The surname must match exactly after folding. A candidate whose given
/// name is present and differs from a present extracted given name is
/// disqualified. Names without a surname are never checked.
pub fn match_name(parts: &NameParts, index: &SanctionsIndex) -> SanctionsVerdict {
    let Some(surname) = parts.surname.as_deref().map(normalize_name).filter(|s| !s.is_empty()) else {
        return SanctionsVerdict::unchecked();
    };
    let given = parts
        .given_name
        .as_deref()
        .map(normalize_name)
        .filter(|g| !g.is_empty());

    let hit = index.candidates(&surname).find(|record| {
        match (given.as_deref(), record.given_name.as_deref()) {
            (Some(extracted), Some(listed)) => extracted == listed,
            _ => true,
        }
    });

    match hit {
        Some(record) => {
            debug!(source_id = %record.source_id, "Sanctions candidate matched");
            SanctionsVerdict::matched(record.source_id.clone())
        }
        None => SanctionsVerdict::clear(),
    }
}

/// Holder of the current index snapshot
#[derive(Debug, Default)]
pub struct SanctionsRegistry {
    current: RwLock<Option<Arc<SanctionsIndex>>>,
}

impl SanctionsRegistry {
    /// Create an empty registry (lookups report `checked = false`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry already holding an index
    pub fn with_index(index: SanctionsIndex) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(index))),
        }
    }

    /// Current snapshot, if one is loaded
    pub fn snapshot(&self) -> Option<Arc<SanctionsIndex>> {
        self.current.read().clone()
    }

    /// Swap in a new index; readers holding the old snapshot are unaffected
    pub fn replace(&self, index: SanctionsIndex) {
        let index = Arc::new(index);
        *self.current.write() = Some(index);
    }

    /// Load a list from disk and swap it in; on failure the old index stays
    pub fn reload_from(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let index = load_sanctions_tsv(path)?;
        let records = index.len();
        self.replace(index);
        info!(path = %path.display(), records, "Sanctions index loaded");
        Ok(records)
    }

    /// Whether an index is loaded
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Records in the current index
    pub fn len(&self) -> usize {
        self.current.read().as_ref().map_or(0, |index| index.len())
    }

    /// Whether the current index is missing or empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
struct SanctionsRow {
    #[serde(default)]
    sid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    aliases: String,
    #[serde(default)]
    status: String,
}

fn is_cyrillic(text: &str) -> bool {
    text.chars().any(|c| matches!(c, '\u{0400}'..='\u{04FF}'))
}

/// Parse a tab-separated list with header `sid name translit_name aliases status`
///
/// Each row's `name` and each `;`-separated Cyrillic alias becomes a record
/// carrying the row's `sid`. Rows without a name are skipped.
pub fn load_sanctions_tsv(path: impl AsRef<Path>) -> Result<SanctionsIndex> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::data(format!("Failed to open sanctions list {}: {}", path.display(), e)))?;

    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<SanctionsRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(row = line + 1, "Skipping malformed sanctions row: {}", e);
                continue;
            }
        };

        let status = Some(row.status.clone());
        let Some(primary) = SanctionsRecord::from_full_name(&row.name, row.sid.clone()) else {
            continue;
        };
        records.push(primary.with_status(status.clone()));

        for alias in row.aliases.split(';').map(str::trim).filter(|a| is_cyrillic(a)) {
            if let Some(record) = SanctionsRecord::from_full_name(alias, row.sid.clone()) {
                records.push(record.with_status(status.clone()));
            }
        }
    }

    Ok(SanctionsIndex::new(records))
}
