//! Speech-to-text stage
//!
//! Wraps a remote transcription service behind the [`Transcriber`]
//! trait and normalizes its output into derived metrics.

pub mod remote;

pub use remote::{RemoteTranscriber, RemoteTranscriberConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Confidence assumed when the service reports none.
const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Normalized transcription result.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Confidence as a percentage (0-100).
    pub confidence: i64,
    pub word_count: i64,
    /// Audio length in seconds.
    pub duration: i64,
}

impl Transcript {
    /// Normalize the raw fields a transcription service reports.
    /// Confidence defaults to 0.95 and duration to 0 when absent.
    pub fn from_remote(text: String, confidence: Option<f64>, duration: Option<f64>) -> Self {
        let word_count = text.split_whitespace().count() as i64;
        let confidence = (confidence.unwrap_or(DEFAULT_CONFIDENCE) * 100.0).round() as i64;
        let duration = duration.unwrap_or(0.0).round() as i64;
        Self {
            text,
            confidence,
            word_count,
            duration,
        }
    }
}

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Failed to upload audio: {0}")]
    Upload(String),
    #[error("Failed to request transcription: {0}")]
    Request(String),
    #[error("Failed to check transcription status: {0}")]
    Status(String),
    #[error("Transcription failed: {0}")]
    Failed(String),
    #[error("Transcription did not complete after {attempts} status checks")]
    TimedOut { attempts: u32 },
}

/// Converts an audio byte blob into a [`Transcript`]. No state is
/// retained between calls.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcript, TranscriptionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_splits_on_whitespace() {
        let transcript = Transcript::from_remote(
            "hello world  hello\nworld".to_string(),
            Some(0.9),
            Some(10.0),
        );
        assert_eq!(transcript.word_count, 4);
        assert_eq!(transcript.confidence, 90);
        assert_eq!(transcript.duration, 10);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let transcript = Transcript::from_remote("one two three".to_string(), None, None);
        assert_eq!(transcript.confidence, 95);
        assert_eq!(transcript.duration, 0);
        assert_eq!(transcript.word_count, 3);
    }

    #[test]
    fn test_empty_text_has_zero_words() {
        let transcript = Transcript::from_remote(String::new(), Some(0.5), Some(2.4));
        assert_eq!(transcript.word_count, 0);
        assert_eq!(transcript.confidence, 50);
        assert_eq!(transcript.duration, 2);
    }
}
