//! Whitelist (closed-mode roster) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One roster row for a closed contest, unique by `(contest_id, nickname)`.
/// The row id doubles as the participant id once the entry joins.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub id: i64,
    pub contest_id: String,
    pub nickname: String,
    pub organization: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
}
