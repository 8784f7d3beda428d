// Analysis backends - implementations of the core analysis ports.

pub mod language;
pub mod llm_client;

pub use language::HeuristicLanguageDetector;
pub use llm_client::ClaudeAnalyzer;
