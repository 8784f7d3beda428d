// Language detection port.
//
// Detection is an external classifier as far as the pipeline is
// concerned; the result is informational and never drives the decision.

use async_trait::async_trait;
use thiserror::Error;

/// Language code used when the classifier cannot answer.
pub const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("unable to classify language")]
    Inconclusive,

    #[error("language classifier unavailable: {0}")]
    Unavailable(String),
}

/// A black-box language classifier.
///
/// Implementations may be remote services; the pipeline treats any error
/// as "assume the fallback language" and moves on.
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    /// Classify the language of `content`, returning an ISO 639-1 code.
    async fn detect(&self, content: &str) -> Result<String, LanguageError>;
}
