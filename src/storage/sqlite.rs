// SQLite-backed store
// Owns the connection behind a mutex and runs queries through it

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::migrations;
use super::models::{NewPitchAnalysis, NewUser, PitchAnalysis, User};
use super::Storage;

/// SQLite implementation of [`Storage`].
///
/// Ids come from `AUTOINCREMENT`, so they are monotonic and never
/// reused; the connection mutex serializes assignment. The strengths
/// and improvements lists are stored as JSON text columns.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Open (or create) the database at the given path and bring the
    /// schema up to date.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&db_path).context("Failed to open database")?;

        conn.execute("PRAGMA foreign_keys = ON", [])
            .context("Failed to enable foreign keys")?;

        migrations::run_migrations(&conn).context("Failed to run database migrations")?;

        log::info!("Database initialized at: {:?}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock database connection: {}", e))?;
        f(&conn)
    }
}

const ANALYSIS_COLUMNS: &str = "id, user_id, file_name, file_size, duration, transcription, \
     word_count, confidence, words_per_minute, overall_score, summary, strengths, \
     improvements, created_at";

fn read_analysis(row: &rusqlite::Row<'_>) -> rusqlite::Result<PitchAnalysis> {
    Ok(PitchAnalysis {
        id: row.get(0)?,
        user_id: row.get(1)?,
        file_name: row.get(2)?,
        file_size: row.get(3)?,
        duration: row.get(4)?,
        transcription: row.get(5)?,
        word_count: row.get(6)?,
        confidence: row.get(7)?,
        words_per_minute: row.get(8)?,
        overall_score: row.get(9)?,
        summary: row.get(10)?,
        strengths: read_json_list(row.get(11)?),
        improvements: read_json_list(row.get(12)?),
        created_at: row.get(13)?,
    })
}

fn read_json_list(raw: Option<String>) -> Option<Vec<String>> {
    raw.and_then(|text| serde_json::from_str(&text).ok())
}

fn write_json_list(list: &Option<Vec<String>>) -> Result<Option<String>> {
    list.as_ref()
        .map(|entries| serde_json::to_string(entries))
        .transpose()
        .context("Failed to encode feedback list")
}

fn read_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
    })
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_connection(|conn| {
            let result = conn.query_row(
                "SELECT id, username, password FROM users WHERE id = ?",
                params![id],
                read_user,
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e).context("Failed to get user"),
            }
        })
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_connection(|conn| {
            let result = conn.query_row(
                "SELECT id, username, password FROM users WHERE username = ?",
                params![username],
                read_user,
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e).context("Failed to get user by username"),
            }
        })
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                params![new_user.username, new_user.password],
            )
            .context("Failed to create user")?;

            Ok(User {
                id: conn.last_insert_rowid(),
                username: new_user.username,
                password: new_user.password,
            })
        })
    }

    async fn create_pitch_analysis(
        &self,
        new_analysis: NewPitchAnalysis,
    ) -> Result<PitchAnalysis> {
        self.with_connection(|conn| {
            let created_at: DateTime<Utc> = Utc::now();
            conn.execute(
                r#"
                INSERT INTO pitch_analyses (
                    user_id, file_name, file_size, duration, transcription,
                    word_count, confidence, words_per_minute, overall_score,
                    summary, strengths, improvements, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
                params![
                    new_analysis.user_id,
                    new_analysis.file_name,
                    new_analysis.file_size,
                    new_analysis.duration,
                    new_analysis.transcription,
                    new_analysis.word_count,
                    new_analysis.confidence,
                    new_analysis.words_per_minute,
                    new_analysis.overall_score,
                    new_analysis.summary,
                    write_json_list(&new_analysis.strengths)?,
                    write_json_list(&new_analysis.improvements)?,
                    created_at,
                ],
            )
            .context("Failed to create pitch analysis")?;

            Ok(new_analysis.into_record(conn.last_insert_rowid(), created_at))
        })
    }

    async fn get_pitch_analysis(&self, id: i64) -> Result<Option<PitchAnalysis>> {
        self.with_connection(|conn| {
            let query = format!("SELECT {} FROM pitch_analyses WHERE id = ?", ANALYSIS_COLUMNS);
            let result = conn.query_row(&query, params![id], read_analysis);
            match result {
                Ok(analysis) => Ok(Some(analysis)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e).context("Failed to get pitch analysis"),
            }
        })
    }

    async fn list_pitch_analyses(&self, user_id: Option<i64>) -> Result<Vec<PitchAnalysis>> {
        self.with_connection(|conn| {
            let rows = match user_id {
                Some(uid) => {
                    let query = format!(
                        "SELECT {} FROM pitch_analyses WHERE user_id = ? ORDER BY id",
                        ANALYSIS_COLUMNS
                    );
                    let mut stmt = conn
                        .prepare(&query)
                        .context("Failed to prepare list query")?;
                    let mapped = stmt
                        .query_map(params![uid], read_analysis)
                        .context("Failed to query pitch analyses")?;
                    mapped.collect::<std::result::Result<Vec<_>, _>>()
                }
                None => {
                    let query = format!(
                        "SELECT {} FROM pitch_analyses ORDER BY id",
                        ANALYSIS_COLUMNS
                    );
                    let mut stmt = conn
                        .prepare(&query)
                        .context("Failed to prepare list query")?;
                    let mapped = stmt
                        .query_map([], read_analysis)
                        .context("Failed to query pitch analyses")?;
                    mapped.collect::<std::result::Result<Vec<_>, _>>()
                }
            };

            rows.context("Failed to read pitch analysis rows")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_db() -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteStorage::new(db_path).unwrap();
        (dir, store)
    }

    fn scored_analysis(file_name: &str) -> NewPitchAnalysis {
        NewPitchAnalysis {
            file_name: file_name.to_string(),
            file_size: 2048,
            duration: Some(30),
            transcription: Some("a short pitch".to_string()),
            word_count: Some(3),
            confidence: Some(92),
            words_per_minute: Some(6),
            overall_score: Some(8),
            summary: Some("Short but clear".to_string()),
            strengths: Some(vec!["clear".to_string(), "short".to_string()]),
            improvements: Some(vec!["longer".to_string(), "louder".to_string()]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let (_dir, store) = create_test_db();

        let created = store
            .create_pitch_analysis(scored_analysis("demo.wav"))
            .await
            .unwrap();
        assert_eq!(created.id, 1);

        let loaded = store
            .get_pitch_analysis(created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.id, created.id);
        assert_eq!(loaded.file_name, "demo.wav");
        assert_eq!(loaded.overall_score, Some(8));
        assert_eq!(loaded.words_per_minute, Some(6));
        assert_eq!(
            loaded.strengths,
            Some(vec!["clear".to_string(), "short".to_string()])
        );
        assert_eq!(
            loaded.improvements,
            Some(vec!["longer".to_string(), "louder".to_string()])
        );
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let (_dir, store) = create_test_db();

        let first = store
            .create_pitch_analysis(scored_analysis("one.wav"))
            .await
            .unwrap();
        let second = store
            .create_pitch_analysis(scored_analysis("two.wav"))
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_list_filters_by_user() {
        let (_dir, store) = create_test_db();

        let mut owned = scored_analysis("mine.wav");
        owned.user_id = Some(3);
        store.create_pitch_analysis(owned).await.unwrap();
        store
            .create_pitch_analysis(scored_analysis("anon.wav"))
            .await
            .unwrap();

        assert_eq!(store.list_pitch_analyses(None).await.unwrap().len(), 2);
        let filtered = store.list_pitch_analyses(Some(3)).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].file_name, "mine.wav");
    }

    #[tokio::test]
    async fn test_absent_lists_stay_absent() {
        let (_dir, store) = create_test_db();

        let bare = NewPitchAnalysis {
            file_name: "bare.mp3".to_string(),
            file_size: 1,
            ..Default::default()
        };
        let created = store.create_pitch_analysis(bare).await.unwrap();

        let loaded = store
            .get_pitch_analysis(created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.strengths, None);
        assert_eq!(loaded.improvements, None);
        assert_eq!(loaded.overall_score, None);
    }

    #[tokio::test]
    async fn test_user_round_trip() {
        let (_dir, store) = create_test_db();

        let user = store
            .create_user(NewUser {
                username: "demo".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        let by_id = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "demo");

        let by_name = store.get_user_by_username("demo").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(store.get_user(99).await.unwrap().is_none());
    }
}
