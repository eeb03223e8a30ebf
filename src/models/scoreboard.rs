//! Scoreboard view types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ContestStatus, ScoringMode, TaskScore};

/// One scoreboard cell as shown to clients. `pending` is set while the cell
/// is hidden by a scoreboard freeze.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCell {
    pub score: i64,
    pub attempts: i64,
    pub passed: bool,
    pub penalty: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}

impl From<&TaskScore> for ScoreCell {
    fn from(s: &TaskScore) -> Self {
        Self {
            score: s.score,
            attempts: s.attempts,
            passed: s.passed,
            penalty: s.penalty,
            pending: false,
        }
    }
}

/// One ranked scoreboard row. Task keys are the decimal string form of the
/// task id, as everywhere on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreboardRow {
    pub participant_id: String,
    pub nickname: String,
    pub organization: Option<String>,
    pub scores: BTreeMap<String, ScoreCell>,
    pub total_score: i64,
    pub total_penalty: i64,
    pub solved_count: i64,
    pub disqualified: bool,
}

/// Full scoreboard snapshot pushed to rooms and returned by the snapshot
/// endpoint. `remaining_seconds` and `status` are overlaid live and never
/// cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreboardView {
    pub status: ContestStatus,
    pub remaining_seconds: i64,
    pub name: String,
    pub duration_minutes: i64,
    pub scoring: ScoringMode,
    pub task_ids: Vec<i64>,
    pub scoreboard: Vec<ScoreboardRow>,
    pub first_solves: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub frozen: bool,
}

/// Frozen and final boards stored for the ICPC reveal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrozenBoard {
    pub contest_id: String,
    pub frozen_scoreboard: Vec<ScoreboardRow>,
    pub final_scoreboard: Vec<ScoreboardRow>,
    pub freeze_time: f64,
    pub is_revealed: bool,
}

/// One step of the reveal stream: a frozen cell resolving to its final value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealStep {
    pub participant_id: String,
    pub task_id: i64,
    pub new_score: ScoreCell,
}
