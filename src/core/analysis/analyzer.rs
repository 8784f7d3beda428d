// Analyzer port - the contract every scoring backend implements.
//
// The pipeline never cares whether scores come from the keyword rules or
// from a language model; it talks to this trait. Backends are injected
// once, at startup, at the composition root.

use async_trait::async_trait;
use thiserror::Error;

/// Scores and findings for one piece of content text.
///
/// All scores lie in [0, 1]. Identical input must produce identical
/// output; at-least-once redelivery leans on that.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentAnalysis {
    pub toxicity: f64,
    pub spam: f64,
    pub sarcasm: f64,
    pub issues: Vec<String>,
    pub rationale: String,
}

/// Why an analyzer call failed.
///
/// These are the typed reasons the fallback policy switches on. The
/// rule-based backend never produces any of them.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis call timed out")]
    Timeout,

    #[error("analysis transport error: {0}")]
    Transport(String),

    #[error("analysis response was malformed: {0}")]
    MalformedResponse(String),
}

/// A scoring backend for content text.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Score `content` for toxicity, spam, and sarcasm.
    ///
    /// Must be deterministic for a given input and safe to call
    /// concurrently and repeatedly.
    async fn analyze(&self, content: &str) -> Result<ContentAnalysis, AnalysisError>;
}

// Blanket implementation for Box<dyn Analyzer>.
// This lets the composition root pick the backend at runtime (rules only,
// or LLM with rule fallback) while the pipeline stays generic.
#[async_trait]
impl Analyzer for Box<dyn Analyzer> {
    async fn analyze(&self, content: &str) -> Result<ContentAnalysis, AnalysisError> {
        (**self).analyze(content).await
    }
}

/// Fallback policy: try the primary backend, recover with the rules.
///
/// The fallback is mandatory for the LLM backend, so it is modelled as a
/// wrapper the composition root installs rather than error handling
/// buried inside a client. The wrapped analyzer never fails.
pub struct FallbackAnalyzer<P: Analyzer> {
    primary: P,
    rules: super::rule_based::RuleBasedAnalyzer,
}

impl<P: Analyzer> FallbackAnalyzer<P> {
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            rules: super::rule_based::RuleBasedAnalyzer::new(),
        }
    }
}

#[async_trait]
impl<P: Analyzer> Analyzer for FallbackAnalyzer<P> {
    async fn analyze(&self, content: &str) -> Result<ContentAnalysis, AnalysisError> {
        match self.primary.analyze(content).await {
            Ok(analysis) => Ok(analysis),
            Err(err) => {
                tracing::warn!(error = %err, "primary analyzer failed, falling back to rules");
                self.rules.analyze(content).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Primary that always fails with the given reason.
    struct FailingAnalyzer;

    #[async_trait]
    impl Analyzer for FailingAnalyzer {
        async fn analyze(&self, _content: &str) -> Result<ContentAnalysis, AnalysisError> {
            Err(AnalysisError::Timeout)
        }
    }

    /// Primary that reports fixed scores so we can tell who answered.
    struct CannedAnalyzer;

    #[async_trait]
    impl Analyzer for CannedAnalyzer {
        async fn analyze(&self, _content: &str) -> Result<ContentAnalysis, AnalysisError> {
            Ok(ContentAnalysis {
                toxicity: 0.42,
                spam: 0.0,
                sarcasm: 0.0,
                issues: vec!["canned".to_string()],
                rationale: "canned".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn fallback_recovers_from_primary_failure() {
        let analyzer = FallbackAnalyzer::new(FailingAnalyzer);

        let analysis = analyzer.analyze("buy now click here").await.unwrap();

        // The rules answered: spam indicators found, nothing canned.
        assert!(analysis.spam > 0.0);
        assert!(analysis.issues.iter().any(|i| i == "spam indicators"));
    }

    #[tokio::test]
    async fn fallback_prefers_the_primary_when_it_works() {
        let analyzer = FallbackAnalyzer::new(CannedAnalyzer);

        let analysis = analyzer.analyze("buy now click here").await.unwrap();

        assert_eq!(analysis.toxicity, 0.42);
        assert_eq!(analysis.issues, vec!["canned"]);
    }

    #[tokio::test]
    async fn boxed_analyzer_delegates() {
        let boxed: Box<dyn Analyzer> = Box::new(CannedAnalyzer);

        let analysis = boxed.analyze("anything").await.unwrap();

        assert_eq!(analysis.toxicity, 0.42);
    }
}
