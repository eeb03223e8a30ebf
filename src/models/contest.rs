//! Contest model and lifecycle types

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Participant, ScoreboardView, TaskScore};

/// Scoring policy for a contest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    Icpc,
    AllOrNothing,
    Points,
}

impl ScoringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icpc => "icpc",
            Self::AllOrNothing => "all_or_nothing",
            Self::Points => "points",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "icpc" => Some(Self::Icpc),
            "all_or_nothing" => Some(Self::AllOrNothing),
            "points" => Some(Self::Points),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry policy: free entry by nickname, or closed entry against a whitelist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestMode {
    Free,
    Closed,
}

impl ContestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Contest lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Scheduled,
    Waiting,
    Running,
    Finished,
}

impl ContestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "waiting" => Some(Self::Waiting),
            "running" => Some(Self::Running),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed contest configuration record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestConfig {
    pub duration_minutes: i64,
    pub scoring: ScoringMode,
    pub mode: ContestMode,
    pub allowed_languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_minutes: Option<i64>,
}

/// Scoreboard-freeze bookkeeping for an ICPC contest in its final window.
///
/// `frozen_scores` is the per-cell state at the freeze boundary; `pending`
/// collects cells whose score changed after it.
#[derive(Debug, Clone)]
pub struct FreezeState {
    pub freeze_time: f64,
    pub frozen_scores: HashMap<String, HashMap<i64, TaskScore>>,
    pub pending: HashSet<(String, i64)>,
}

/// Authoritative in-memory contest record, owned by the registry while the
/// contest is not finished.
#[derive(Debug, Clone)]
pub struct Contest {
    pub id: String,
    pub name: String,
    pub task_ids: Vec<i64>,
    pub config: ContestConfig,
    pub status: ContestStatus,
    /// Epoch seconds of the actual (or scheduled) start
    pub start_time: Option<i64>,
    pub participants: HashMap<String, Participant>,
    /// task id -> participant id of the earliest Accepted
    pub first_solves: HashMap<i64, String>,
    pub cached_scoreboard: Option<ScoreboardView>,
    pub is_dirty: bool,
    pub freeze: Option<FreezeState>,
}

impl Contest {
    pub fn new(
        id: String,
        name: String,
        task_ids: Vec<i64>,
        config: ContestConfig,
        status: ContestStatus,
        start_time: Option<i64>,
    ) -> Self {
        Self {
            id,
            name,
            task_ids,
            config,
            status,
            start_time,
            participants: HashMap::new(),
            first_solves: HashMap::new(),
            cached_scoreboard: None,
            is_dirty: true,
            freeze: None,
        }
    }

    /// Seconds of contest time elapsed at `now`; zero before the start
    pub fn elapsed_seconds(&self, now: i64) -> i64 {
        match self.start_time {
            Some(start) if self.status == ContestStatus::Running => (now - start).max(0),
            _ => 0,
        }
    }

    /// Seconds left on the clock at `now`; zero once the duration is spent
    pub fn remaining_seconds(&self, now: i64) -> i64 {
        if self.status != ContestStatus::Running {
            return 0;
        }
        let duration = self.config.duration_minutes * 60;
        (duration - self.elapsed_seconds(now)).max(0)
    }

    /// Whether the clock has run out at `now`
    pub fn is_time_over(&self, now: i64) -> bool {
        match self.start_time {
            Some(start) => now - start > self.config.duration_minutes * 60,
            None => false,
        }
    }

    /// Epoch second at which the scoreboard freezes, if configured
    pub fn freeze_boundary(&self) -> Option<i64> {
        let freeze_minutes = self.config.freeze_minutes?;
        let start = self.start_time?;
        Some(start + (self.config.duration_minutes - freeze_minutes) * 60)
    }

    /// Task letter (A..J) by position in `task_ids`
    pub fn letter_of(&self, task_id: i64) -> char {
        self.task_ids
            .iter()
            .position(|&t| t == task_id)
            .and_then(|i| crate::constants::TASK_LETTERS.chars().nth(i))
            .unwrap_or('?')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_contest(start: i64, duration: i64) -> Contest {
        let mut c = Contest::new(
            "c1".into(),
            "Test".into(),
            vec![1, 2],
            ContestConfig {
                duration_minutes: duration,
                scoring: ScoringMode::Icpc,
                mode: ContestMode::Free,
                allowed_languages: vec!["Python".into()],
                freeze_minutes: None,
            },
            ContestStatus::Running,
            Some(start),
        );
        c.is_dirty = true;
        c
    }

    #[test]
    fn remaining_clamps_at_zero() {
        let c = running_contest(1000, 60);
        assert_eq!(c.remaining_seconds(1000), 3600);
        assert_eq!(c.remaining_seconds(1000 + 3600), 0);
        assert_eq!(c.remaining_seconds(1000 + 7200), 0);
    }

    #[test]
    fn time_over_boundary() {
        let c = running_contest(1000, 60);
        // last valid second
        assert!(!c.is_time_over(1000 + 3600 - 1));
        assert!(!c.is_time_over(1000 + 3600));
        assert!(c.is_time_over(1000 + 3600 + 1));
    }

    #[test]
    fn freeze_boundary_from_config() {
        let mut c = running_contest(1000, 60);
        c.config.freeze_minutes = Some(15);
        assert_eq!(c.freeze_boundary(), Some(1000 + 45 * 60));
    }

    #[test]
    fn task_letters() {
        let c = running_contest(0, 10);
        assert_eq!(c.letter_of(1), 'A');
        assert_eq!(c.letter_of(2), 'B');
        assert_eq!(c.letter_of(99), '?');
    }
}
