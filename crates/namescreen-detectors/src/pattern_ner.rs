//! Pattern-based person extraction (default fast NER tier)
//!
//! Finds runs of capitalised Cyrillic words and scores them by shape:
//! a trailing patronymic, surname-like endings, and whether the run
//! covers the whole segment.

use crate::extractor::NerProvider;
use async_trait::async_trait;
use namescreen_core::names::{is_patronymic, looks_like_surname};
use namescreen_core::{EntitySpan, Error, Result};
use regex::Regex;

/// Capitalised words that open payment comments but are never names
const STOPWORDS: &[&str] = &[
    "переказ", "перевод", "для", "від", "от", "на", "карту", "картку", "кому", "оплата", "зарплата",
    "аванс", "премія", "за", "допомога", "повернення", "подарунок", "поповнення", "рахунок",
    "послуги", "товари", "пан", "пані", "гр", "громадянин", "громадянка", "фоп", "тов", "дякую",
    "січень", "лютий", "березень", "квітень", "травень", "червень", "липень", "серпень",
    "вересень", "жовтень", "листопад", "грудень",
];

/// Confidence for a full triple ending in a patronymic
pub const TRIPLE_CONFIDENCE: f32 = 0.9;
/// Confidence for three capitalised words without a patronymic
pub const LOOSE_TRIPLE_CONFIDENCE: f32 = 0.7;
/// Confidence for given name + patronymic
pub const GIVEN_PATRONYMIC_CONFIDENCE: f32 = 0.85;
/// Confidence for a pair covering the whole segment
pub const PAIR_CONFIDENCE: f32 = 0.8;
/// Confidence for "Surname I.I." initials
pub const INITIALS_CONFIDENCE: f32 = 0.75;
/// Confidence for a pair embedded in longer text
pub const EMBEDDED_PAIR_CONFIDENCE: f32 = 0.6;
/// Confidence for a lone surname-like word
pub const SURNAME_CONFIDENCE: f32 = 0.6;
/// Confidence for a lone given-name-like word
pub const GIVEN_CONFIDENCE: f32 = 0.5;

/// In-process NER provider built on word-shape patterns
pub struct PatternNer {
    token: Regex,
    name_word: Regex,
    initials: Regex,
}

#[derive(Debug, Clone, Copy)]
struct Word<'a> {
    text: &'a str,
    start: usize,
    end: usize,
    /// Token was followed by punctuation, so a run cannot continue past it
    closes_run: bool,
}

impl PatternNer {
    /// Create a new pattern NER provider
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::config(format!("Failed to compile name pattern: {}", e)))
        };

        Ok(Self {
            token: compile(r"\S+")?,
            name_word: compile(r"^[А-ЯІЇЄҐЁ][а-яіїєґё'’]+(?:-[А-ЯІЇЄҐЁ][а-яіїєґё'’]+)?$")?,
            initials: compile(r"[А-ЯІЇЄҐ][а-яіїєґ'’]+\s+[А-ЯІЇЄҐ]\.\s*[А-ЯІЇЄҐ]\.")?,
        })
    }

    fn words<'a>(&self, text: &'a str) -> Vec<Word<'a>> {
        self.token
            .find_iter(text)
            .map(|m| {
                let raw = m.as_str();
                let trimmed = raw.trim_end_matches(|c: char| ",.;:!?)".contains(c));
                Word {
                    text: trimmed,
                    start: m.start(),
                    end: m.start() + trimmed.len(),
                    closes_run: trimmed.len() != raw.len(),
                }
            })
            .collect()
    }

    fn is_name_word(&self, word: &str) -> bool {
        self.name_word.is_match(word) && !STOPWORDS.contains(&word.to_lowercase().as_str())
    }

    /// Maximal runs of consecutive name-shaped words
    fn runs<'a>(&self, words: &[Word<'a>]) -> Vec<Vec<Word<'a>>> {
        let mut runs = Vec::new();
        let mut current: Vec<Word<'a>> = Vec::new();

        for word in words {
            if self.is_name_word(word.text) {
                current.push(*word);
                if word.closes_run {
                    runs.push(std::mem::take(&mut current));
                }
            } else if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }

        runs
    }

    fn score(run: &[Word<'_>], covers_segment: bool) -> f32 {
        match run {
            [first, _, third, ..] => {
                if is_patronymic(third.text) && (looks_like_surname(first.text) || first.text.chars().count() > 3) {
                    TRIPLE_CONFIDENCE
                } else if is_patronymic(third.text) {
                    GIVEN_PATRONYMIC_CONFIDENCE
                } else {
                    LOOSE_TRIPLE_CONFIDENCE
                }
            }
            [_, second] => {
                if is_patronymic(second.text) {
                    GIVEN_PATRONYMIC_CONFIDENCE
                } else if covers_segment {
                    PAIR_CONFIDENCE
                } else {
                    EMBEDDED_PAIR_CONFIDENCE
                }
            }
            [single] => {
                if looks_like_surname(single.text) {
                    SURNAME_CONFIDENCE
                } else {
                    GIVEN_CONFIDENCE
                }
            }
            [] => 0.0,
        }
    }

    /// Extract person spans synchronously
    pub fn extract_spans(&self, text: &str) -> Vec<EntitySpan> {
        let words = self.words(text);
        let mut spans: Vec<EntitySpan> = self
            .runs(&words)
            .into_iter()
            .map(|run| {
                let run = &run[..run.len().min(3)];
                let (start, end) = (run[0].start, run[run.len() - 1].end);
                let covers_segment = words.len() == run.len();
                EntitySpan::person(&text[start..end], start, end, Self::score(run, covers_segment))
            })
            .collect();

        for m in self.initials.find_iter(text) {
            if !spans.iter().any(|s| s.start <= m.start() && s.end >= m.end()) {
                spans.push(EntitySpan::person(m.as_str(), m.start(), m.end(), INITIALS_CONFIDENCE));
            }
        }

        spans
    }
}

#[async_trait]
impl NerProvider for PatternNer {
    async fn extract(&self, text: &str) -> Result<Vec<EntitySpan>> {
        Ok(self.extract_spans(text))
    }

    fn name(&self) -> &str {
        "pattern_ner"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn best(text: &str) -> Option<EntitySpan> {
        let ner = PatternNer::new().unwrap();
        ner.extract_spans(text)
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }

    #[test]
    fn test_full_triple() {
        let span = best("Булатов Руслан Олександрович").unwrap();
        assert_eq!(span.text, "Булатов Руслан Олександрович");
        assert_eq!(span.confidence, TRIPLE_CONFIDENCE);
        assert!(span.is_person());
    }

    #[test]
    fn test_stopwords_are_skipped() {
        let span = best("Переказ Іванову Петру").unwrap();
        assert_eq!(span.text, "Іванову Петру");
        assert_eq!(span.confidence, EMBEDDED_PAIR_CONFIDENCE);
    }

    #[test]
    fn test_pair_covering_segment() {
        let span = best("Шевченко Тарас").unwrap();
        assert_eq!(span.confidence, PAIR_CONFIDENCE);

        let span = best("Олена Петрівна").unwrap();
        assert_eq!(span.confidence, GIVEN_PATRONYMIC_CONFIDENCE);
    }

    #[test]
    fn test_single_words() {
        assert_eq!(best("Коваленко").unwrap().confidence, SURNAME_CONFIDENCE);
        assert_eq!(best("Марія").unwrap().confidence, GIVEN_CONFIDENCE);
    }

    #[test]
    fn test_initials() {
        let span = best("оплата від Іванов І.І.").unwrap();
        assert_eq!(span.text, "Іванов І.І.");
        assert_eq!(span.confidence, INITIALS_CONFIDENCE);
    }

    #[test]
    fn test_lowercase_text_has_no_names() {
        assert!(best("якийсь текст без імен").is_none());
    }

    #[test]
    fn test_punctuation_ends_a_run() {
        let ner = PatternNer::new().unwrap();
        let spans = ner.extract_spans("Коваленко, Марія");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "Коваленко");
    }
}
