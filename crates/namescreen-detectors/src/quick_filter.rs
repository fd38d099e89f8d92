//! Quick filter (Tier 1)
//!
//! Deterministic first pass over a comment. It never produces a name: it
//! either decides "no name" outright or hands a candidate segment to the
//! NER tiers. All patterns run on the `regex` and `aho-corasick` engines,
//! so matching is linear in the comment length.

use aho_corasick::{AhoCorasick, MatchKind};
use namescreen_core::{Comment, Error, Result};
use regex::{Regex, RegexSet};
use tracing::debug;

/// Comments shorter than this (in characters) carry no name
const MIN_LENGTH: usize = 3;

/// Separators between the purpose part and the name part of a comment
const SEPARATORS: &[char] = &['-', '–', '—'];

/// Known non-name comments, matched against the case-folded text
const NO_NAME_PATTERNS: &[&str] = &[
    // Salary and payments
    r"^(зарплата|зп|з/п|заробітна плата)(\s|$|\.)",
    r"^(аванс|премія|премия|виплата|выплата)(\s|$|\.)",
    r"^(відпускні|отпускные|лікарняні|больничные)(\s|$|\.)",
    r"^(компенсація|компенсация|допомога|помощь)(\s|$|\.)",
    // Taxes and fees
    r"^(податки|податок|налоги|налог)(\s|$|\.)",
    r"^(єсв|ндфл|пдв|ндс|єдиний внесок)(\s|$|\.)",
    r"^(військовий збір|военный сбор)(\s|$|\.)",
    // Transfers without names
    r"^(поповнення|пополнение)(\s|$|\.)",
    r"^(переказ коштів|перевод средств)$",
    r"^(переказ|перевод)$",
    r"^(оплата послуг|оплата услуг)(\s|$|\.)",
    r"^(комунальні|коммунальные)(\s|$|\.)",
    // Amounts
    r"^\d+[\s.]*(грн|uah|₴|usd|\$|eur|€)?$",
    r"^[\d\s.,]+$",
    // Documents
    r"^(рахунок|счет|invoice|інвойс)(\s|#|№|\d)",
    r"^(замовлення|заказ|order)(\s|#|№|\d)",
    r"^(договір|договор|contract)(\s|#|№|\d)",
    r"^(акт|рахунок-фактура)(\s|#|№|\d)",
    // Services
    r"^(за (послуги|товари|роботи|services))(\s|$|\.)",
    r"^(оренда|аренда|rent)(\s|$|\.)",
    r"^(кредит|позика|займ|loan)(\s|$|\.)",
    r"^(повернення|возврат|refund)(\s|$|\.)",
    // Utilities
    r"^(електроенергія|электроэнергия|gas|газ|вода|water)(\s|$|\.)",
    r"^(інтернет|internet|телефон|phone)(\s|$|\.)",
    // Business terms
    r"^(прибуток|прибыль|дохід|доход)(\s|$|\.)",
    r"^(витрати|расходы|costs)(\s|$|\.)",
    r"^(бюджет|budget)(\s|$|\.)",
    // Periods
    r"^за\s+(січень|лютий|березень|квітень|травень|червень)",
    r"^за\s+(липень|серпень|вересень|жовтень|листопад|грудень)",
    r"^за\s+(январь|февраль|март|апрель|май|июнь)",
    r"^за\s+(июль|август|сентябрь|октябрь|ноябрь|декабрь)",
    r"^за\s+\d+\s*(місяць|месяц|квартал|рік|год)",
    r"^за\s+\d{1,2}[./]\d{2,4}",
    // Greetings and slogans
    r"^слава україні!?$",
    r"^зі святим миколаєм!?$",
    r"^з новим роком!?$",
    r"^вітаю з різдвом!?$",
    r"^з днем народження!?$",
    r"^з 8 березня!?$",
];

/// Only digits, punctuation and currency markers
const NUMERIC_ONLY: &str = r"^[\d\s.,\-+/\\()₴$€грнuahsder]+$";

/// Payment purposes that mark the non-name side of a segmented comment
const PURPOSE_KEYWORDS: &[&str] = &[
    "зарплата",
    "заробітна плата",
    "заработная плата",
    "зп",
    "з/п",
    "аванс",
    "премія",
    "премия",
    "виплата",
    "выплата",
    "відпускні",
    "отпускные",
    "лікарняні",
    "больничные",
    "компенсація",
    "компенсация",
    "допомога",
    "матеріальна допомога",
    "материальная помощь",
    "помощь",
    "стипендія",
    "стипендия",
    "аліменти",
    "алименты",
    "переказ",
    "перевод",
    "поповнення",
    "пополнение",
    "оплата",
    "повернення",
    "возврат",
    "подарунок",
    "подарок",
    "дивіденди",
    "дивиденды",
    "оренда",
    "аренда",
];

/// Outcome of the quick filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickFilterOutcome {
    /// The comment certainly carries no name
    DefiniteNoName,

    /// Hand this segment (original casing) to the NER tiers
    Delegate(String),
}

/// Pattern-based first-pass classifier
pub struct QuickFilter {
    no_name: RegexSet,
    numeric_only: Regex,
    purposes: AhoCorasick,
}

impl QuickFilter {
    /// Create a new quick filter with the built-in pattern tables
    pub fn new() -> Result<Self> {
        Ok(Self {
            no_name: RegexSet::new(NO_NAME_PATTERNS)
                .map_err(|e| Error::config(format!("Failed to compile no-name patterns: {}", e)))?,
            numeric_only: Regex::new(NUMERIC_ONLY)
                .map_err(|e| Error::config(format!("Failed to compile numeric regex: {}", e)))?,
            purposes: AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .build(PURPOSE_KEYWORDS)
                .map_err(|e| Error::config(format!("Failed to build purpose matcher: {}", e)))?,
        })
    }

    /// Classify a normalized comment
    pub fn evaluate(&self, comment: &Comment) -> QuickFilterOutcome {
        let normalized = comment.normalized();

        if normalized.chars().count() < MIN_LENGTH || self.numeric_only.is_match(normalized) {
            debug!("Quick filter: too short or numeric-only");
            return QuickFilterOutcome::DefiniteNoName;
        }

        let segment = match self.segment(comment.text()) {
            Some(segment) => segment,
            None => comment.text().to_string(),
        };

        if segment.is_empty() {
            debug!("Quick filter: purpose without a name segment");
            return QuickFilterOutcome::DefiniteNoName;
        }

        let folded = segment.to_lowercase();
        if self.is_no_name(&folded) {
            debug!("Quick filter: no-name pattern matched for '{}'", preview(&segment));
            return QuickFilterOutcome::DefiniteNoName;
        }

        QuickFilterOutcome::Delegate(segment)
    }

    /// Whether case-folded text matches the no-name table
    pub fn is_no_name(&self, folded: &str) -> bool {
        self.no_name.is_match(folded.trim()) || self.numeric_only.is_match(folded.trim())
    }

    /// Split a "Purpose-Name" or "Name - Purpose" comment
    ///
    /// Returns the non-purpose side (possibly empty) when one side is a
    /// known payment purpose, `None` when the layout is not recognized.
    pub fn segment(&self, text: &str) -> Option<String> {
        if let Some((purpose, name)) = text.split_once(SEPARATORS) {
            if self.is_purpose(purpose) {
                return Some(name.trim().to_string());
            }
        }

        if let Some((name, purpose)) = text.rsplit_once(SEPARATORS) {
            if self.is_purpose(purpose) {
                return Some(name.trim().to_string());
            }
        }

        None
    }

    /// Whether a side of the comment starts with a purpose keyword
    fn is_purpose(&self, side: &str) -> bool {
        let folded = side.trim().to_lowercase();

        match self.purposes.find(&folded) {
            Some(m) if m.start() == 0 => folded[m.end()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric()),
            _ => false,
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(40).collect()
}
