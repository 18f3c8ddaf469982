// Database migrations
// Creates and updates the SQLite schema

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Run all necessary migrations to bring the database up to date
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Initial schema creation (version 1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pitch_analyses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER,
            file_name TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            duration INTEGER,
            transcription TEXT,
            word_count INTEGER,
            confidence INTEGER,
            words_per_minute INTEGER,
            overall_score INTEGER,
            summary TEXT,
            strengths TEXT,
            improvements TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .context("Failed to create initial schema")?;

    conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])
        .context("Failed to record schema version")?;

    Ok(())
}
