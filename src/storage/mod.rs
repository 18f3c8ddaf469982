// Storage module - keyed persistence for analysis records and users
// Provides an in-memory store and a SQLite-backed store

pub mod memory;
pub mod migrations;
pub mod models;
pub mod sqlite;

pub use memory::MemStorage;
pub use models::{NewPitchAnalysis, NewUser, PitchAnalysis, User};
pub use sqlite::SqliteStorage;

use anyhow::Result;
use async_trait::async_trait;

/// Keyed storage for pitch analyses and user accounts.
///
/// Implementations own record identity: ids are sequential, assigned
/// at creation, never reused, and assignment is serialized across
/// concurrent callers.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    async fn create_pitch_analysis(&self, new_analysis: NewPitchAnalysis)
        -> Result<PitchAnalysis>;
    async fn get_pitch_analysis(&self, id: i64) -> Result<Option<PitchAnalysis>>;
    /// List analyses, filtered by exact user match when `user_id` is
    /// given. Ordering is implementation-defined.
    async fn list_pitch_analyses(&self, user_id: Option<i64>) -> Result<Vec<PitchAnalysis>>;
}
