// Storage models - pitch analyses and users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted pitch analysis. Created only after transcription and
/// analysis both completed; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchAnalysis {
    pub id: i64,
    pub user_id: Option<i64>,
    pub file_name: String,
    pub file_size: i64,
    /// Audio length in seconds.
    pub duration: Option<i64>,
    pub transcription: Option<String>,
    pub word_count: Option<i64>,
    /// Transcription confidence as a percentage (0-100).
    pub confidence: Option<i64>,
    pub words_per_minute: Option<i64>,
    /// Overall pitch score (1-10).
    pub overall_score: Option<i64>,
    pub summary: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub improvements: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for a pitch analysis; the store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPitchAnalysis {
    pub user_id: Option<i64>,
    pub file_name: String,
    pub file_size: i64,
    pub duration: Option<i64>,
    pub transcription: Option<String>,
    pub word_count: Option<i64>,
    pub confidence: Option<i64>,
    pub words_per_minute: Option<i64>,
    pub overall_score: Option<i64>,
    pub summary: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub improvements: Option<Vec<String>>,
}

impl NewPitchAnalysis {
    /// Attach the store-assigned identity to produce the final record.
    pub fn into_record(self, id: i64, created_at: DateTime<Utc>) -> PitchAnalysis {
        PitchAnalysis {
            id,
            user_id: self.user_id,
            file_name: self.file_name,
            file_size: self.file_size,
            duration: self.duration,
            transcription: self.transcription,
            word_count: self.word_count,
            confidence: self.confidence,
            words_per_minute: self.words_per_minute,
            overall_score: self.overall_score,
            summary: self.summary,
            strengths: self.strengths,
            improvements: self.improvements,
            created_at,
        }
    }
}

/// A user account. Not exercised by the pitch pipeline itself; part of
/// the store contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
}

/// Insert shape for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
}
