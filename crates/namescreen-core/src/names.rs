//! Splitting a detected name into surname / given name / patronymic

use crate::types::NameCategory;

/// Patronymic endings (Ukrainian and Russian forms)
pub const PATRONYMIC_SUFFIXES: &[&str] = &["ович", "евич", "івич", "ич", "івна", "ївна", "овна", "евна"];

/// Common Ukrainian surname endings
pub const SURNAME_SUFFIXES: &[&str] = &[
    "енко", "ко", "чук", "ук", "юк", "ський", "цький", "ов", "ев", "єв", "ін", "їн", "ак", "як", "ик",
];

/// Whether a word ends like a patronymic
pub fn is_patronymic(word: &str) -> bool {
    let lower = word.to_lowercase();
    PATRONYMIC_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Whether a word ends like a Ukrainian surname
pub fn looks_like_surname(word: &str) -> bool {
    let lower = word.to_lowercase();
    SURNAME_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Components of a person name, best-effort
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameParts {
    pub surname: Option<String>,
    pub given_name: Option<String>,
    pub patronymic: Option<String>,
}

impl NameParts {
    /// Parse a name written in "Surname GivenName Patronymic" order
    pub fn parse(text: &str) -> Self {
        let words = words(text);

        match words.as_slice() {
            [] => Self::default(),
            [single] => {
                if looks_like_surname(single) {
                    Self::surname_only(single)
                } else {
                    Self::given_only(single, None)
                }
            }
            [first, second] => {
                if is_patronymic(second) {
                    Self::given_only(first, Some(second))
                } else {
                    Self {
                        surname: Some(first.to_string()),
                        given_name: Some(second.to_string()),
                        patronymic: None,
                    }
                }
            }
            [surname, given, patronymic, ..] => Self {
                surname: Some(surname.to_string()),
                given_name: Some(given.to_string()),
                patronymic: Some(patronymic.to_string()),
            },
        }
    }

    /// Parse a name whose category is already known (e.g. stated by an LLM)
    pub fn parse_as(text: &str, category: NameCategory) -> Self {
        let words = words(text);

        match (category, words.as_slice()) {
            (NameCategory::None, _) | (_, []) => Self::default(),
            (NameCategory::SurnameOnly, [surname, ..]) => Self::surname_only(surname),
            (NameCategory::GivenNameOnly, [given]) => Self::given_only(given, None),
            (NameCategory::GivenNameOnly, [given, patronymic, ..]) => {
                Self::given_only(given, Some(patronymic))
            }
            (NameCategory::GivenPlusSurname, [surname, given, ..]) => Self {
                surname: Some(surname.to_string()),
                given_name: Some(given.to_string()),
                patronymic: None,
            },
            _ => Self::parse(text),
        }
    }

    fn surname_only(surname: &str) -> Self {
        Self {
            surname: Some(surname.to_string()),
            ..Self::default()
        }
    }

    fn given_only(given: &str, patronymic: Option<&str>) -> Self {
        Self {
            surname: None,
            given_name: Some(given.to_string()),
            patronymic: patronymic.map(str::to_string),
        }
    }

    /// Category implied by which components are present
    pub fn category(&self) -> NameCategory {
        match (&self.surname, &self.given_name, &self.patronymic) {
            (Some(_), Some(_), Some(_)) => NameCategory::FullTriple,
            (Some(_), Some(_), None) => NameCategory::GivenPlusSurname,
            (Some(_), None, _) => NameCategory::SurnameOnly,
            (None, Some(_), _) | (None, None, Some(_)) => NameCategory::GivenNameOnly,
            (None, None, None) => NameCategory::None,
        }
    }

    /// Whether a surname component is present
    pub fn has_surname(&self) -> bool {
        self.surname.is_some()
    }

    /// Components joined back in canonical order
    pub fn display(&self) -> Option<String> {
        let joined = [&self.surname, &self.given_name, &self.patronymic]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");

        (!joined.is_empty()).then_some(joined)
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '’' || c == '-')))
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_triple() {
        let parts = NameParts::parse("Булатов Руслан Олександрович");
        assert_eq!(parts.surname.as_deref(), Some("Булатов"));
        assert_eq!(parts.given_name.as_deref(), Some("Руслан"));
        assert_eq!(parts.patronymic.as_deref(), Some("Олександрович"));
        assert_eq!(parts.category(), NameCategory::FullTriple);
    }

    #[test]
    fn test_given_plus_patronymic_has_no_surname() {
        let parts = NameParts::parse("Олена Петрівна");
        assert_eq!(parts.category(), NameCategory::GivenNameOnly);
        assert!(!parts.has_surname());
        assert_eq!(parts.display().as_deref(), Some("Олена Петрівна"));
    }

    #[test]
    fn test_pair_and_single_words() {
        assert_eq!(NameParts::parse("Шевченко Тарас").category(), NameCategory::GivenPlusSurname);
        assert_eq!(NameParts::parse("Коваленко").category(), NameCategory::SurnameOnly);
        assert_eq!(NameParts::parse("Марія").category(), NameCategory::GivenNameOnly);
        assert_eq!(NameParts::parse("  ").category(), NameCategory::None);
    }

    #[test]
    fn test_punctuation_is_stripped() {
        let parts = NameParts::parse("Іванов, Іван.");
        assert_eq!(parts.display().as_deref(), Some("Іванов Іван"));
    }

    #[test]
    fn test_parse_as_respects_stated_category() {
        let parts = NameParts::parse_as("Петро", NameCategory::SurnameOnly);
        assert_eq!(parts.category(), NameCategory::SurnameOnly);

        let parts = NameParts::parse_as("Іван Іванович", NameCategory::GivenNameOnly);
        assert_eq!(parts.given_name.as_deref(), Some("Іван"));
        assert_eq!(parts.patronymic.as_deref(), Some("Іванович"));
    }

    #[test]
    fn test_suffix_heuristics() {
        assert!(is_patronymic("Олександрович"));
        assert!(is_patronymic("ПЕТРІВНА"));
        assert!(!is_patronymic("Руслан"));
        assert!(looks_like_surname("Шевченко"));
        assert!(looks_like_surname("Грушевський"));
        assert!(!looks_like_surname("Марія"));
    }

    mod properties {
        use super::*;
        use crate::types::{DetectionResult, Tier};
        use proptest::prelude::*;

        fn name_words() -> impl Strategy<Value = Vec<String>> {
            prop::collection::vec("[А-ЯІЇЄ][а-яіїє]{1,10}", 0..5)
        }

        proptest! {
            #[test]
            fn reparsing_display_is_stable(words in name_words()) {
                let parts = NameParts::parse(&words.join(" "));
                let reparsed = NameParts::parse(&parts.display().unwrap_or_default());
                prop_assert_eq!(reparsed, parts);
            }

            #[test]
            fn detected_name_present_iff_has_name(words in name_words(), confidence in 0.0f32..=1.0) {
                let parts = NameParts::parse(&words.join(" "));
                let result = DetectionResult::from_parts(&parts, confidence, Tier::FastNer);
                prop_assert_eq!(result.has_name, result.detected_name.is_some());
                prop_assert_eq!(result.has_name, result.category != NameCategory::None);
            }
        }
    }
}
