//! Contest request payloads

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContestRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[validate(length(min = 1, max = 10))]
    pub task_ids: Vec<i64>,
    #[validate(range(min = 1))]
    pub duration_minutes: i64,
    pub scoring: String,
    pub mode: String,
    pub allowed_languages: Option<Vec<String>>,
    /// RFC 3339; present means the contest is scheduled
    pub start_time: Option<String>,
    pub freeze_minutes: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct JoinRequest {
    #[validate(length(min = 1, max = 64))]
    pub nickname: String,
    pub organization: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[validate(length(min = 1))]
    pub participant_id: String,
    pub task_id: i64,
    #[validate(length(min = 1))]
    pub language: String,
    #[validate(length(min = 1))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FinishEarlyRequest {
    #[validate(length(min = 1))]
    pub participant_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartTimeRequest {
    /// RFC 3339
    #[validate(length(min = 1))]
    pub start_time: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RosterAddRequest {
    #[validate(length(min = 1, max = 64))]
    pub nickname: String,
    #[serde(default)]
    pub organization: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub participant_id: String,
}
