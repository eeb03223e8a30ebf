//! Contest state registry
//!
//! Owner of every in-memory contest record. All reads and writes go through
//! one process-wide mutex; critical sections are short field updates and map
//! lookups, never I/O. Callers persist and broadcast after the lock drops,
//! using the snapshots these operations return.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::constants::MAX_PENDING_PER_PARTICIPANT;
use crate::db::repositories::contest_repo::StoredProgress;
use crate::error::{AppError, AppResult};
use crate::models::{
    Contest, ContestMode, ContestStatus, FreezeState, Participant, ScoreboardRow, ScoreboardView,
    TaskScore,
};

use super::scoring;

/// What `apply_result` did, captured for persistence and broadcast after
/// the lock is released
#[derive(Debug, Clone)]
pub struct AppliedResult {
    pub score: TaskScore,
    pub accepted: bool,
    /// This submission made its participant the first solver of the task
    pub first_solve: bool,
    /// Post-mutation snapshot of the whole contest
    pub contest: Contest,
}

/// In-memory contest map under a single coarse mutex
#[derive(Default)]
pub struct ContestRegistry {
    contests: Mutex<HashMap<String, Contest>>,
}

impl ContestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Contest>> {
        self.contests.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace a contest record (creation and recovery)
    pub fn insert(&self, contest: Contest) {
        self.lock().insert(contest.id.clone(), contest);
    }

    pub fn contains(&self, contest_id: &str) -> bool {
        self.lock().contains_key(contest_id)
    }

    pub fn get_clone(&self, contest_id: &str) -> Option<Contest> {
        self.lock().get(contest_id).cloned()
    }

    pub fn status_of(&self, contest_id: &str) -> Option<ContestStatus> {
        self.lock().get(contest_id).map(|c| c.status)
    }

    pub fn mode_of(&self, contest_id: &str) -> Option<ContestMode> {
        self.lock().get(contest_id).map(|c| c.config.mode)
    }

    /// Find a participant by nickname; returns `(id, finished_early)`
    pub fn participant_by_nickname(
        &self,
        contest_id: &str,
        nickname: &str,
    ) -> Option<(String, bool)> {
        let contests = self.lock();
        let contest = contests.get(contest_id)?;
        contest
            .participants
            .values()
            .find(|p| p.nickname == nickname)
            .map(|p| (p.id.clone(), p.finished_early))
    }

    pub fn participant_flags(
        &self,
        contest_id: &str,
        participant_id: &str,
    ) -> Option<(bool, bool)> {
        let contests = self.lock();
        let p = contests.get(contest_id)?.participants.get(participant_id)?;
        Some((p.finished_early, p.disqualified))
    }

    /// Create the participant entry if it does not exist yet, seeding it
    /// from stored progress when rejoining after a restart
    pub fn ensure_participant(
        &self,
        contest_id: &str,
        participant_id: &str,
        nickname: &str,
        organization: Option<String>,
        restored: Option<StoredProgress>,
    ) -> AppResult<()> {
        let mut contests = self.lock();
        let contest = contests.get_mut(contest_id).ok_or(AppError::ContestNotFound)?;

        if let Some(existing) = contest.participants.get(participant_id) {
            if existing.finished_early {
                return Err(AppError::AlreadyFinishedEarly);
            }
            return Ok(());
        }

        let mut participant = Participant::new(
            participant_id.to_string(),
            nickname.to_string(),
            organization,
            &contest.task_ids,
        );
        if let Some(progress) = restored {
            participant.scores.extend(progress.scores);
            participant.last_submissions.extend(progress.last_submissions);
            participant.disqualified = progress.disqualified;
            if participant.organization.is_none() {
                participant.organization = progress.organization;
            }
        }

        contest
            .participants
            .insert(participant_id.to_string(), participant);
        contest.is_dirty = true;

        Ok(())
    }

    /// Admission control for one submission. On success the code is stored
    /// as the participant's last submission and their pending counter grows
    /// by one; the caller enqueues the job and persists the code.
    pub fn admit(
        &self,
        contest_id: &str,
        participant_id: &str,
        task_id: i64,
        language: &str,
        code: &str,
        now: i64,
    ) -> AppResult<String> {
        let mut contests = self.lock();
        let contest = contests.get_mut(contest_id).ok_or(AppError::ContestNotFound)?;

        if contest.status != ContestStatus::Running {
            return Err(AppError::ContestNotRunning);
        }
        if contest.is_time_over(now) {
            return Err(AppError::TimeOver);
        }
        if !contest
            .config
            .allowed_languages
            .iter()
            .any(|l| l == language)
        {
            return Err(AppError::LanguageNotAllowed(language.to_string()));
        }

        let participant = contest
            .participants
            .get_mut(participant_id)
            .ok_or(AppError::Unauthorized)?;

        if participant.disqualified {
            return Err(AppError::Disqualified);
        }
        if participant.finished_early {
            return Err(AppError::AlreadyFinishedEarly);
        }
        if participant.pending_submissions >= MAX_PENDING_PER_PARTICIPANT {
            return Err(AppError::TooManyPending);
        }

        participant
            .last_submissions
            .insert(task_id, code.to_string());
        participant.pending_submissions += 1;

        Ok(participant.nickname.clone())
    }

    /// Release one pending slot without applying a result (system-error
    /// paths). Returns whether the participant was found.
    pub fn resolve_pending(&self, contest_id: &str, participant_id: &str) -> bool {
        let mut contests = self.lock();
        let Some(participant) = contests
            .get_mut(contest_id)
            .and_then(|c| c.participants.get_mut(participant_id))
        else {
            return false;
        };
        participant.pending_submissions = (participant.pending_submissions - 1).max(0);
        true
    }

    /// Apply a judged result. Always decrements the pending counter when the
    /// participant exists; returns `None` (dropping the result) when the
    /// contest is gone, the participant is unknown, or disqualified.
    pub fn apply_result(
        &self,
        contest_id: &str,
        participant_id: &str,
        task_id: i64,
        passed_count: i64,
        total: i64,
        fatal: bool,
        now: i64,
    ) -> Option<AppliedResult> {
        let mut contests = self.lock();
        let contest = contests.get_mut(contest_id)?;
        let scoring_mode = contest.config.scoring;
        let start_time = contest.start_time;

        let participant = contest.participants.get_mut(participant_id)?;
        participant.pending_submissions = (participant.pending_submissions - 1).max(0);

        if participant.disqualified {
            return None;
        }

        let elapsed_minutes = start_time.map(|s| (now - s).max(0) / 60).unwrap_or(0);
        let cell = participant.scores.entry(task_id).or_default();
        let accepted = scoring::apply(
            scoring_mode,
            cell,
            passed_count,
            total,
            fatal,
            elapsed_minutes,
        );
        let score = cell.clone();

        let mut first_solve = false;
        if accepted && !contest.first_solves.contains_key(&task_id) {
            contest
                .first_solves
                .insert(task_id, participant_id.to_string());
            first_solve = true;
        }

        if !fatal {
            if let Some(freeze) = &mut contest.freeze {
                freeze
                    .pending
                    .insert((participant_id.to_string(), task_id));
            }
        }

        contest.is_dirty = true;

        Some(AppliedResult {
            score,
            accepted,
            first_solve,
            contest: contest.clone(),
        })
    }

    /// Scoreboard snapshot: cached while clean, recomputed when dirty.
    /// `remaining_seconds` and `status` are always overlaid live.
    pub fn snapshot(&self, contest_id: &str, now: i64) -> Option<ScoreboardView> {
        let mut contests = self.lock();
        let contest = contests.get_mut(contest_id)?;

        if !contest.is_dirty {
            if let Some(cached) = &contest.cached_scoreboard {
                let mut view = cached.clone();
                view.remaining_seconds = contest.remaining_seconds(now);
                view.status = contest.status;
                return Some(view);
            }
        }

        let view = scoring::compute_view(contest, now);
        contest.cached_scoreboard = Some(view.clone());
        contest.is_dirty = false;
        Some(view)
    }

    pub fn finish_early(&self, contest_id: &str, participant_id: &str) -> AppResult<()> {
        let mut contests = self.lock();
        let contest = contests.get_mut(contest_id).ok_or(AppError::ContestNotFound)?;
        let participant = contest
            .participants
            .get_mut(participant_id)
            .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;

        participant.finished_early = true;
        contest.is_dirty = true;
        Ok(())
    }

    /// Disqualify: reset every score cell, flag the participant, keep them
    /// on the board. Returns a contest snapshot for persistence.
    pub fn disqualify(&self, contest_id: &str, participant_id: &str) -> AppResult<Contest> {
        let mut contests = self.lock();
        let contest = contests.get_mut(contest_id).ok_or(AppError::ContestNotFound)?;
        let participant = contest
            .participants
            .get_mut(participant_id)
            .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;

        participant.disqualified = true;
        participant.finished_early = true;
        for cell in participant.scores.values_mut() {
            *cell = TaskScore::default();
        }
        contest.is_dirty = true;

        Ok(contest.clone())
    }

    /// Transition to running at `now`
    pub fn start(&self, contest_id: &str, now: i64) -> AppResult<Contest> {
        let mut contests = self.lock();
        let contest = contests.get_mut(contest_id).ok_or(AppError::ContestNotFound)?;
        contest.status = ContestStatus::Running;
        contest.start_time = Some(now);
        contest.is_dirty = true;
        Ok(contest.clone())
    }

    /// Move the (scheduled or actual) start time; returns the status so the
    /// caller knows which table to persist to
    pub fn set_start_time(&self, contest_id: &str, start_time: i64) -> AppResult<ContestStatus> {
        let mut contests = self.lock();
        let contest = contests.get_mut(contest_id).ok_or(AppError::ContestNotFound)?;
        contest.start_time = Some(start_time);
        contest.is_dirty = true;
        Ok(contest.status)
    }

    /// Transition to finished and evict from memory. The returned record is
    /// the caller's to persist; the registry no longer knows the contest.
    pub fn close(&self, contest_id: &str) -> Option<Contest> {
        let mut contests = self.lock();
        let mut contest = contests.remove(contest_id)?;
        contest.status = ContestStatus::Finished;
        Some(contest)
    }

    /// Scheduled contests whose start time has arrived
    pub fn due_scheduled(&self, now: i64) -> Vec<String> {
        self.lock()
            .values()
            .filter(|c| {
                c.status == ContestStatus::Scheduled
                    && c.start_time.map(|s| now >= s).unwrap_or(false)
            })
            .map(|c| c.id.clone())
            .collect()
    }

    /// Running contests whose duration (plus slack) has elapsed
    pub fn expired_running(&self, now: i64, slack_seconds: i64) -> Vec<String> {
        self.lock()
            .values()
            .filter(|c| {
                c.status == ContestStatus::Running
                    && c.start_time
                        .map(|s| now - s > c.config.duration_minutes * 60 + slack_seconds)
                        .unwrap_or(false)
            })
            .map(|c| c.id.clone())
            .collect()
    }

    /// Running ICPC contests that entered their freeze window and have no
    /// active freeze yet
    pub fn freeze_due(&self, now: i64) -> Vec<String> {
        self.lock()
            .values()
            .filter(|c| {
                c.status == ContestStatus::Running
                    && c.config.scoring == crate::models::ScoringMode::Icpc
                    && c.freeze.is_none()
                    && c.freeze_boundary().map(|b| now >= b).unwrap_or(false)
            })
            .map(|c| c.id.clone())
            .collect()
    }

    /// Snapshot the board and begin hiding score changes. Returns the frozen
    /// rows (for persistence) and the freeze boundary as epoch seconds.
    pub fn activate_freeze(&self, contest_id: &str) -> Option<(Vec<ScoreboardRow>, f64)> {
        let mut contests = self.lock();
        let contest = contests.get_mut(contest_id)?;
        let boundary = contest.freeze_boundary()? as f64;

        let frozen_rows = scoring::compute_rows(contest);
        let frozen_scores = contest
            .participants
            .values()
            .map(|p| (p.id.clone(), p.scores.clone()))
            .collect();

        contest.freeze = Some(FreezeState {
            freeze_time: boundary,
            frozen_scores,
            pending: HashSet::new(),
        });
        contest.is_dirty = true;

        Some((frozen_rows, boundary))
    }

    /// Drop the freeze after a reveal so the live board shows final values
    pub fn clear_freeze(&self, contest_id: &str) {
        let mut contests = self.lock();
        if let Some(contest) = contests.get_mut(contest_id) {
            contest.freeze = None;
            contest.is_dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContestConfig, ScoringMode};

    fn registry_with_contest(scoring: ScoringMode, start: i64) -> ContestRegistry {
        let registry = ContestRegistry::new();
        registry.insert(Contest::new(
            "c1".into(),
            "Round".into(),
            vec![1, 2],
            ContestConfig {
                duration_minutes: 60,
                scoring,
                mode: ContestMode::Free,
                allowed_languages: vec!["Python".into(), "C++".into()],
                freeze_minutes: None,
            },
            ContestStatus::Running,
            Some(start),
        ));
        registry
            .ensure_participant("c1", "p1", "alice", None, None)
            .unwrap();
        registry
    }

    #[test]
    fn admit_checks_in_order() {
        let registry = registry_with_contest(ScoringMode::Icpc, 1000);

        // unknown contest
        assert!(matches!(
            registry.admit("nope", "p1", 1, "Python", "x", 1010),
            Err(AppError::ContestNotFound)
        ));

        // disallowed language
        assert!(matches!(
            registry.admit("c1", "p1", 1, "C#", "x", 1010),
            Err(AppError::LanguageNotAllowed(_))
        ));

        // unknown participant
        assert!(matches!(
            registry.admit("c1", "ghost", 1, "Python", "x", 1010),
            Err(AppError::Unauthorized)
        ));

        // happy path stores the code and bumps pending
        registry.admit("c1", "p1", 1, "Python", "print(1)", 1010).unwrap();
        let contest = registry.get_clone("c1").unwrap();
        let p = &contest.participants["p1"];
        assert_eq!(p.last_submissions[&1], "print(1)");
        assert_eq!(p.pending_submissions, 1);
    }

    #[test]
    fn admit_time_boundary() {
        let registry = registry_with_contest(ScoringMode::Icpc, 1000);
        let end = 1000 + 60 * 60;

        assert!(registry.admit("c1", "p1", 1, "Python", "x", end - 1).is_ok());
        assert!(matches!(
            registry.admit("c1", "p1", 1, "Python", "x", end + 1),
            Err(AppError::TimeOver)
        ));
    }

    #[test]
    fn fourth_pending_submission_is_rejected() {
        let registry = registry_with_contest(ScoringMode::Icpc, 1000);

        for _ in 0..3 {
            registry.admit("c1", "p1", 1, "Python", "x", 1010).unwrap();
        }
        assert!(matches!(
            registry.admit("c1", "p1", 1, "Python", "x", 1010),
            Err(AppError::TooManyPending)
        ));

        // resolving one submission frees a slot
        registry
            .apply_result("c1", "p1", 1, 0, 2, false, 1020)
            .unwrap();
        assert!(registry.admit("c1", "p1", 1, "Python", "x", 1030).is_ok());
    }

    #[test]
    fn apply_result_updates_score_and_first_solve() {
        let registry = registry_with_contest(ScoringMode::Icpc, 1000);
        registry.admit("c1", "p1", 1, "Python", "x", 1010).unwrap();

        let applied = registry
            .apply_result("c1", "p1", 1, 2, 2, false, 1000 + 30)
            .unwrap();
        assert!(applied.accepted);
        assert!(applied.first_solve);
        assert_eq!(applied.score.score, 1);
        assert_eq!(applied.score.penalty, 0);
        assert_eq!(applied.contest.participants["p1"].pending_submissions, 0);
        assert_eq!(applied.contest.first_solves[&1], "p1");
    }

    #[test]
    fn first_solve_is_not_overwritten() {
        let registry = registry_with_contest(ScoringMode::Icpc, 1000);
        registry
            .ensure_participant("c1", "p2", "bob", None, None)
            .unwrap();

        registry.admit("c1", "p1", 1, "Python", "x", 1010).unwrap();
        registry.admit("c1", "p2", 1, "Python", "x", 1010).unwrap();

        let first = registry.apply_result("c1", "p1", 1, 2, 2, false, 1020).unwrap();
        let second = registry.apply_result("c1", "p2", 1, 2, 2, false, 1030).unwrap();
        assert!(first.first_solve);
        assert!(!second.first_solve);
        assert_eq!(second.contest.first_solves[&1], "p1");
    }

    #[test]
    fn disqualified_results_are_dropped_but_pending_decrements() {
        let registry = registry_with_contest(ScoringMode::Points, 1000);
        registry.admit("c1", "p1", 1, "Python", "x", 1010).unwrap();
        registry.disqualify("c1", "p1").unwrap();

        let applied = registry.apply_result("c1", "p1", 1, 2, 2, false, 1020);
        assert!(applied.is_none());

        let contest = registry.get_clone("c1").unwrap();
        let p = &contest.participants["p1"];
        assert_eq!(p.pending_submissions, 0);
        assert!(p.scores.values().all(|s| s.score == 0));
        assert!(p.disqualified);
        assert!(p.finished_early);
    }

    #[test]
    fn disqualifying_a_solver_erases_her_icpc_standing() {
        let registry = registry_with_contest(ScoringMode::Icpc, 1000);
        registry
            .ensure_participant("c1", "p2", "bob", None, None)
            .unwrap();

        // alice solves task 1 at five minutes with one wrong attempt behind her
        registry.admit("c1", "p1", 1, "Python", "x", 1010).unwrap();
        registry.apply_result("c1", "p1", 1, 0, 2, false, 1000 + 60).unwrap();
        registry.admit("c1", "p1", 1, "Python", "x", 1020).unwrap();
        let applied = registry
            .apply_result("c1", "p1", 1, 2, 2, false, 1000 + 300)
            .unwrap();
        assert!(applied.score.passed);
        assert_eq!(applied.score.penalty, 5 + 20);

        // bob solves task 2 late
        registry.admit("c1", "p2", 2, "Python", "x", 1030).unwrap();
        registry
            .apply_result("c1", "p2", 2, 2, 2, false, 1000 + 1800)
            .unwrap();

        registry.disqualify("c1", "p1").unwrap();

        let contest = registry.get_clone("c1").unwrap();
        let cell = &contest.participants["p1"].scores[&1];
        assert!(!cell.passed);
        assert_eq!(cell.score, 0);
        assert_eq!(cell.attempts, 0);
        assert_eq!(cell.penalty, 0);

        let view = registry.snapshot("c1", 1000 + 1900).unwrap();
        // bob's real solve now outranks alice; she stays on the board as DQ
        assert_eq!(view.scoreboard[0].participant_id, "p2");
        assert_eq!(view.scoreboard[1].participant_id, "p1");
        let alice = &view.scoreboard[1];
        assert!(alice.disqualified);
        assert_eq!(alice.solved_count, 0);
        assert_eq!(alice.total_penalty, 0);
        assert_eq!(alice.total_score, 0);
    }

    #[test]
    fn late_results_for_closed_contest_are_dropped() {
        let registry = registry_with_contest(ScoringMode::Icpc, 1000);
        registry.admit("c1", "p1", 1, "Python", "x", 1010).unwrap();

        let closed = registry.close("c1").unwrap();
        assert_eq!(closed.status, ContestStatus::Finished);

        assert!(registry.apply_result("c1", "p1", 1, 2, 2, false, 1020).is_none());
        assert!(!registry.contains("c1"));
    }

    #[test]
    fn snapshot_caches_until_dirty() {
        let registry = registry_with_contest(ScoringMode::Icpc, 1000);

        let first = registry.snapshot("c1", 1010).unwrap();
        assert_eq!(first.scoreboard.len(), 1);

        // clean snapshot still overlays the live clock
        let second = registry.snapshot("c1", 1100).unwrap();
        assert_eq!(second.remaining_seconds, 3600 - 100);

        registry.admit("c1", "p1", 1, "Python", "x", 1110).unwrap();
        registry.apply_result("c1", "p1", 1, 2, 2, false, 1120).unwrap();

        let third = registry.snapshot("c1", 1130).unwrap();
        assert_eq!(third.scoreboard[0].solved_count, 1);
    }

    #[test]
    fn finished_early_is_terminal() {
        let registry = registry_with_contest(ScoringMode::Icpc, 1000);
        registry.finish_early("c1", "p1").unwrap();

        assert!(matches!(
            registry.admit("c1", "p1", 1, "Python", "x", 1010),
            Err(AppError::AlreadyFinishedEarly)
        ));
        assert!(matches!(
            registry.ensure_participant("c1", "p1", "alice", None, None),
            Err(AppError::AlreadyFinishedEarly)
        ));
    }

    #[test]
    fn freeze_lifecycle_marks_and_clears() {
        let registry = ContestRegistry::new();
        registry.insert(Contest::new(
            "c1".into(),
            "Finals".into(),
            vec![1],
            ContestConfig {
                duration_minutes: 60,
                scoring: ScoringMode::Icpc,
                mode: ContestMode::Free,
                allowed_languages: vec!["Python".into()],
                freeze_minutes: Some(15),
            },
            ContestStatus::Running,
            Some(1000),
        ));
        registry.ensure_participant("c1", "p1", "alice", None, None).unwrap();

        let boundary = 1000 + 45 * 60;
        assert!(registry.freeze_due(boundary - 1).is_empty());
        assert_eq!(registry.freeze_due(boundary), vec!["c1".to_string()]);

        let (frozen_rows, freeze_time) = registry.activate_freeze("c1").unwrap();
        assert_eq!(frozen_rows.len(), 1);
        assert_eq!(freeze_time as i64, boundary);
        // no longer due once active
        assert!(registry.freeze_due(boundary + 10).is_empty());

        registry.admit("c1", "p1", 1, "Python", "x", boundary + 10).unwrap();
        registry
            .apply_result("c1", "p1", 1, 1, 1, false, boundary + 20)
            .unwrap();

        let view = registry.snapshot("c1", boundary + 30).unwrap();
        assert!(view.frozen);
        let cell = &view.scoreboard[0].scores["1"];
        assert!(cell.pending);
        assert!(!cell.passed);

        registry.clear_freeze("c1");
        let view = registry.snapshot("c1", boundary + 40).unwrap();
        assert!(!view.frozen);
        assert!(view.scoreboard[0].scores["1"].passed);
    }
}
