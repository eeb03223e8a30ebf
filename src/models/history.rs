//! Submission history model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One judged submission, append-only. Timestamps are epoch seconds with
/// millisecond precision, assigned at result-application time; `id` breaks
/// ties within the same instant.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub contest_id: String,
    pub participant_id: String,
    pub task_id: i64,
    pub language: String,
    pub verdict: String,
    pub tests_passed: i64,
    pub total_tests: i64,
    pub timestamp: f64,
}
