//! Participant state and per-task scores

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-task scoring state for one participant.
///
/// Invariants: `passed` implies `score > 0` (exactly 1 in ICPC scoring);
/// `penalty > 0` implies `passed`. Once `passed` is set, `attempts` and
/// `penalty` never change again for this cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskScore {
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub penalty: i64,
}

/// One contest participant. Created lazily on first join, never removed;
/// disqualification is a flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub nickname: String,
    pub organization: Option<String>,
    /// task id -> score cell
    pub scores: HashMap<i64, TaskScore>,
    /// task id -> last submitted code
    pub last_submissions: HashMap<i64, String>,
    pub pending_submissions: i64,
    pub finished_early: bool,
    pub disqualified: bool,
}

impl Participant {
    /// Fresh participant with zeroed scores for every contest task
    pub fn new(
        id: String,
        nickname: String,
        organization: Option<String>,
        task_ids: &[i64],
    ) -> Self {
        Self {
            id,
            nickname,
            organization,
            scores: task_ids.iter().map(|&t| (t, TaskScore::default())).collect(),
            last_submissions: task_ids.iter().map(|&t| (t, String::new())).collect(),
            pending_submissions: 0,
            finished_early: false,
            disqualified: false,
        }
    }
}
