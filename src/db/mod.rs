//! Database module
//!
//! Store handle, idempotent schema bootstrap, and repositories.

pub mod repositories;
pub mod store;

pub use store::Store;

use crate::error::AppResult;

/// Create every table the judge needs. Safe to run on every startup.
pub async fn init_schema(store: &Store) -> AppResult<()> {
    let _guard = store.write().await;

    let statements = [
        r#"CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            difficulty TEXT NOT NULL DEFAULT '',
            topic TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            attachment BLOB,
            file_format TEXT,
            checker_code TEXT
        )"#,
        r#"CREATE TABLE IF NOT EXISTS tests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id INTEGER NOT NULL,
            input TEXT NOT NULL,
            expected_output TEXT NOT NULL,
            time_limit REAL NOT NULL DEFAULT 1.0,
            FOREIGN KEY(task_id) REFERENCES tasks(id)
        )"#,
        r#"CREATE TABLE IF NOT EXISTS contest_configs (
            contest_id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            task_ids_json TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'waiting',
            duration_minutes INTEGER NOT NULL DEFAULT 300,
            scoring_type TEXT NOT NULL DEFAULT 'icpc',
            mode TEXT NOT NULL DEFAULT 'free',
            allowed_languages TEXT,
            freeze_minutes INTEGER,
            start_time REAL
        )"#,
        r#"CREATE TABLE IF NOT EXISTS contest_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contest_id TEXT NOT NULL,
            participant_id TEXT NOT NULL,
            nickname TEXT NOT NULL,
            organization TEXT,
            total_score INTEGER NOT NULL DEFAULT 0,
            task_scores TEXT,
            disqualified INTEGER NOT NULL DEFAULT 0,
            UNIQUE(contest_id, participant_id)
        )"#,
        r#"CREATE TABLE IF NOT EXISTS contest_submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contest_id TEXT NOT NULL,
            participant_id TEXT NOT NULL,
            nickname TEXT NOT NULL,
            task_submissions TEXT,
            UNIQUE(contest_id, participant_id)
        )"#,
        r#"CREATE TABLE IF NOT EXISTS contest_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contest_id TEXT NOT NULL,
            participant_id TEXT NOT NULL,
            task_id INTEGER NOT NULL,
            language TEXT NOT NULL DEFAULT '',
            verdict TEXT NOT NULL DEFAULT '',
            tests_passed INTEGER NOT NULL DEFAULT 0,
            total_tests INTEGER NOT NULL DEFAULT 0,
            timestamp REAL NOT NULL
        )"#,
        r#"CREATE INDEX IF NOT EXISTS idx_history_contest
            ON contest_history(contest_id, timestamp)"#,
        r#"CREATE TABLE IF NOT EXISTS whitelist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contest_id TEXT NOT NULL,
            nickname TEXT NOT NULL,
            organization TEXT,
            password_hash TEXT NOT NULL,
            UNIQUE(contest_id, nickname)
        )"#,
        r#"CREATE TABLE IF NOT EXISTS scheduled_contests (
            contest_id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            start_time REAL NOT NULL,
            config_json TEXT NOT NULL,
            task_ids_json TEXT NOT NULL
        )"#,
        r#"CREATE TABLE IF NOT EXISTS frozen_boards (
            contest_id TEXT PRIMARY KEY,
            frozen_scoreboard_json TEXT,
            final_scoreboard_json TEXT,
            freeze_time REAL,
            is_revealed INTEGER NOT NULL DEFAULT 0
        )"#,
    ];

    for stmt in statements {
        sqlx::query(stmt).execute(store.pool()).await?;
    }

    Ok(())
}
