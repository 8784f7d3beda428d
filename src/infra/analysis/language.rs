// Stopword-based language classifier.
//
// A deliberately small stand-in for the external classifier: counts
// high-frequency function words per language and picks the best match.
// The pipeline only uses the result as an informational field, so "good
// enough on obvious text, inconclusive otherwise" is the right tradeoff.

use crate::core::analysis::{LanguageDetector, LanguageError};
use async_trait::async_trait;

const STOPWORDS: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "and", "is", "are", "was", "this", "that", "with", "for", "you", "have", "not",
            "a", "an", "of",
        ],
    ),
    (
        "es",
        &[
            "el", "la", "los", "las", "que", "de", "es", "en", "un", "una", "con", "por", "para",
            "no",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "et", "est", "que", "des", "une", "dans", "pour", "pas", "vous",
            "ce", "je",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "mit", "ich", "sie", "zu",
            "den",
        ],
    ),
];

pub struct HeuristicLanguageDetector;

impl HeuristicLanguageDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicLanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageDetector for HeuristicLanguageDetector {
    async fn detect(&self, content: &str) -> Result<String, LanguageError> {
        let words: Vec<String> = content
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();

        if words.is_empty() {
            return Err(LanguageError::Inconclusive);
        }

        let mut best: Option<(&str, usize)> = None;
        for &(code, stopwords) in STOPWORDS {
            let hits = words.iter().filter(|w| stopwords.contains(&w.as_str())).count();
            match best {
                Some((_, best_hits)) if hits <= best_hits => {}
                _ if hits > 0 => best = Some((code, hits)),
                _ => {}
            }
        }

        match best {
            Some((code, _)) => Ok(code.to_string()),
            None => Err(LanguageError::Inconclusive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classifies_obvious_english() {
        let detector = HeuristicLanguageDetector::new();

        let code = detector
            .detect("Hello, this is an English text for testing")
            .await
            .unwrap();

        assert_eq!(code, "en");
    }

    #[tokio::test]
    async fn classifies_obvious_spanish() {
        let detector = HeuristicLanguageDetector::new();

        let code = detector
            .detect("el perro corre por la calle con una pelota")
            .await
            .unwrap();

        assert_eq!(code, "es");
    }

    #[tokio::test]
    async fn gibberish_is_inconclusive() {
        let detector = HeuristicLanguageDetector::new();

        let err = detector.detect("qwzx vbnm plok").await.unwrap_err();
        assert!(matches!(err, LanguageError::Inconclusive));

        let err = detector.detect("   ").await.unwrap_err();
        assert!(matches!(err, LanguageError::Inconclusive));
    }
}
