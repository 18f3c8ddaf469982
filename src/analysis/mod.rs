//! Pitch scoring stage
//!
//! Wraps a remote LLM service behind the [`PitchAnalyzer`] trait. The
//! verdict is always well-formed: the score sits inside 1-10 and both
//! feedback lists carry one or two entries.

pub mod chat;

pub use chat::{ChatAnalyzer, ChatAnalyzerConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Upper bound on strengths/improvements entries kept per verdict.
pub const MAX_FEEDBACK_ITEMS: usize = 2;

/// Normalized scoring verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Overall score, 1-10 inclusive.
    pub score: i64,
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to analyze pitch: {0}")]
    Request(String),
}

/// Scores a pitch transcript. A malformed service payload is not an
/// error; only a failed request is.
#[async_trait]
pub trait PitchAnalyzer: Send + Sync {
    async fn analyze(&self, transcript: &str) -> Result<Verdict, AnalysisError>;
}
