//! Task and test case models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A problem with a statement, an optional checker script, and an ordered
/// list of tests. Immutable while a contest references it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub difficulty: String,
    pub topic: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub attachment: Option<Vec<u8>>,
    pub file_format: Option<String>,
    pub checker_code: Option<String>,
}

/// A single test: input fed to stdin, expected output, wall-clock limit.
/// Stored with `\n` newlines; CRLF is stripped on write.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub task_id: i64,
    pub input: String,
    pub expected_output: String,
    pub time_limit: f64,
}
