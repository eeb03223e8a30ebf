//! Contest service
//!
//! Orchestrates the registry, the store, the dispatcher, and the broadcast
//! layer for every contest operation. Registry mutations happen first;
//! persistence and pushes follow outside the lock.

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::{
    constants::{languages, MAX_CONTEST_TASKS, MIN_CONTEST_TASKS},
    db::repositories::{
        ContestRepository, HistoryRepository, TaskRepository, WhitelistRepository,
    },
    error::{AppError, AppResult},
    judge::Job,
    models::{
        Contest, ContestConfig, ContestMode, ContestStatus, FrozenBoard, RevealStep,
        ScoreboardRow, ScoreboardView, ScoringMode, WhitelistEntry,
    },
    services::{auth_service::AuthService, lifecycle, scoring},
    state::AppState,
    utils::time,
    ws::ContestEvent,
};

/// Outcome of creating a contest
#[derive(Debug, Clone, serde::Serialize)]
pub struct CreatedContest {
    pub contest_id: String,
    pub status: ContestStatus,
}

/// Outcome of joining a contest
#[derive(Debug, Clone, serde::Serialize)]
pub struct JoinResult {
    pub participant_id: String,
    pub status: ContestStatus,
}

/// One personal history line, task labelled by its contest letter
#[derive(Debug, Clone, serde::Serialize)]
pub struct HistoryLine {
    pub letter: String,
    pub time: String,
    pub language: String,
    pub verdict: String,
    pub tests: String,
}

/// Stored results of a (usually finished) contest
#[derive(Debug, Clone, serde::Serialize)]
pub struct ArchivedResults {
    pub contest_id: String,
    pub name: String,
    pub status: ContestStatus,
    pub scoring: ScoringMode,
    pub task_ids: Vec<i64>,
    pub scoreboard: Vec<ScoreboardRow>,
}

/// Contest service for business logic
pub struct ContestService;

impl ContestService {
    /// Create a contest. With a start time it is scheduled; otherwise it
    /// waits for a manual start.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        state: &AppState,
        name: &str,
        task_ids: Vec<i64>,
        duration_minutes: i64,
        scoring: &str,
        mode: &str,
        allowed_languages: Vec<String>,
        start_time: Option<i64>,
        freeze_minutes: Option<i64>,
    ) -> AppResult<CreatedContest> {
        if !(MIN_CONTEST_TASKS..=MAX_CONTEST_TASKS).contains(&task_ids.len()) {
            return Err(AppError::Validation(format!(
                "a contest needs between {} and {} tasks",
                MIN_CONTEST_TASKS, MAX_CONTEST_TASKS
            )));
        }
        let scoring = ScoringMode::parse(scoring)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown scoring mode: {}", scoring)))?;
        let mode = ContestMode::parse(mode)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown contest mode: {}", mode)))?;

        let allowed_languages = if allowed_languages.is_empty() {
            languages::ALL.iter().map(|s| s.to_string()).collect()
        } else {
            allowed_languages
        };
        if let Some(unknown) = allowed_languages
            .iter()
            .find(|l| !languages::ALL.contains(&l.as_str()))
        {
            return Err(AppError::LanguageNotAllowed(unknown.clone()));
        }

        for &task_id in &task_ids {
            if TaskRepository::find_by_id(state.store(), task_id).await?.is_none() {
                return Err(AppError::NotFound(format!("task {} does not exist", task_id)));
            }
        }

        let mut contest_id = short_id();
        while state.registry().contains(&contest_id) {
            contest_id = short_id();
        }

        let status = if start_time.is_some() {
            ContestStatus::Scheduled
        } else {
            ContestStatus::Waiting
        };

        let contest = Contest::new(
            contest_id.clone(),
            name.to_string(),
            task_ids,
            ContestConfig {
                duration_minutes,
                scoring,
                mode,
                allowed_languages,
                freeze_minutes,
            },
            status,
            start_time,
        );

        ContestRepository::save_config(state.store(), &contest).await?;
        if let Some(start) = start_time {
            ContestRepository::add_scheduled(state.store(), &contest, start).await?;
        }
        state.registry().insert(contest);

        Ok(CreatedContest { contest_id, status })
    }

    /// Join a contest. Free mode reuses an existing participant by nickname
    /// (memory first, then the store); closed mode validates against the
    /// whitelist and uses the whitelist row id as the participant id.
    pub async fn join(
        state: &AppState,
        contest_id: &str,
        nickname: &str,
        organization: Option<String>,
        password: Option<String>,
    ) -> AppResult<JoinResult> {
        if !state.registry().contains(contest_id) {
            // a finished contest exists only in the store
            return match ContestRepository::load_config(state.store(), contest_id).await? {
                Some(_) => Err(AppError::ContestClosed),
                None => Err(AppError::ContestNotFound),
            };
        }

        let mode = state
            .registry()
            .mode_of(contest_id)
            .ok_or(AppError::ContestNotFound)?;

        let (participant_id, organization) = match mode {
            ContestMode::Free => {
                let in_memory = state.registry().participant_by_nickname(contest_id, nickname);
                let participant_id = match in_memory {
                    Some((_, true)) => return Err(AppError::AlreadyFinishedEarly),
                    Some((pid, false)) => pid,
                    None => ContestRepository::participant_id_by_nickname(
                        state.store(),
                        contest_id,
                        nickname,
                    )
                    .await?
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                };
                (participant_id, organization)
            }
            ContestMode::Closed => {
                let password = password.ok_or(AppError::AuthFailed)?;
                let entry = WhitelistRepository::find(state.store(), contest_id, nickname)
                    .await?
                    .ok_or(AppError::AuthFailed)?;
                if !AuthService::verify_password(&password, &entry.password_hash)? {
                    return Err(AppError::AuthFailed);
                }
                let participant_id = entry.id.to_string();
                if let Some((finished_early, _)) =
                    state.registry().participant_flags(contest_id, &participant_id)
                {
                    if finished_early {
                        return Err(AppError::AlreadyFinishedEarly);
                    }
                }
                (participant_id, entry.organization)
            }
        };

        let restored = ContestRepository::participant_progress(
            state.store(),
            contest_id,
            &participant_id,
        )
        .await
        .unwrap_or_else(|e| {
            tracing::error!(contest_id, "failed to read stored progress: {}", e);
            None
        });

        state.registry().ensure_participant(
            contest_id,
            &participant_id,
            nickname,
            organization,
            restored,
        )?;

        let status = state
            .registry()
            .status_of(contest_id)
            .ok_or(AppError::ContestNotFound)?;

        if let Some(view) = state.registry().snapshot(contest_id, time::now_epoch()) {
            state
                .broadcaster()
                .publish(contest_id, &ContestEvent::FullStatusUpdate(view));
        }

        Ok(JoinResult {
            participant_id,
            status,
        })
    }

    /// Admit and enqueue one submission; returns the queue size
    pub async fn submit(
        state: &AppState,
        contest_id: &str,
        participant_id: &str,
        task_id: i64,
        language: &str,
        code: &str,
    ) -> AppResult<i64> {
        let nickname = state.registry().admit(
            contest_id,
            participant_id,
            task_id,
            language,
            code,
            time::now_epoch(),
        )?;

        // the code is durable even if judging never happens
        if let Err(e) = ContestRepository::save_last_submission(
            state.store(),
            contest_id,
            participant_id,
            &nickname,
            task_id,
            code,
        )
        .await
        {
            tracing::error!(contest_id, "failed to persist submitted code: {}", e);
        }

        // pending must reach the room before any personal result can
        state.broadcaster().publish(
            contest_id,
            &ContestEvent::SubmissionPending {
                participant_id: participant_id.to_string(),
                task_id,
            },
        );

        let queue_size = state.dispatcher().enqueue(Job {
            contest_id: contest_id.to_string(),
            participant_id: participant_id.to_string(),
            task_id,
            language: language.to_string(),
            code: code.to_string(),
        });

        Ok(queue_size)
    }

    pub async fn finish_early(
        state: &AppState,
        contest_id: &str,
        participant_id: &str,
    ) -> AppResult<()> {
        state.registry().finish_early(contest_id, participant_id)?;
        if let Some(view) = state.registry().snapshot(contest_id, time::now_epoch()) {
            state
                .broadcaster()
                .publish(contest_id, &ContestEvent::FullStatusUpdate(view));
        }
        Ok(())
    }

    /// Manual start by the organizer
    pub async fn start(state: &AppState, contest_id: &str) -> AppResult<()> {
        let now = time::now_epoch();
        let contest = state.registry().start(contest_id, now)?;
        ContestRepository::set_start_time(state.store(), contest_id, now).await?;
        ContestRepository::save_config(state.store(), &contest).await?;
        ContestRepository::remove_scheduled(state.store(), contest_id).await?;

        state.broadcaster().publish(contest_id, &ContestEvent::Started);
        if let Some(view) = state.registry().snapshot(contest_id, now) {
            state
                .broadcaster()
                .publish(contest_id, &ContestEvent::FullStatusUpdate(view));
        }
        Ok(())
    }

    /// Manual close by the organizer
    pub async fn finish(state: &AppState, contest_id: &str) -> AppResult<()> {
        lifecycle::close_contest(state, contest_id).await
    }

    pub async fn disqualify(
        state: &AppState,
        contest_id: &str,
        participant_id: &str,
    ) -> AppResult<()> {
        let contest = state.registry().disqualify(contest_id, participant_id)?;
        ContestRepository::persist_snapshot(state.store(), &contest).await?;

        if let Some(view) = state.registry().snapshot(contest_id, time::now_epoch()) {
            state
                .broadcaster()
                .publish(contest_id, &ContestEvent::FullStatusUpdate(view));
        }
        Ok(())
    }

    /// Move the start time of a scheduled or running contest
    pub async fn edit_start_time(
        state: &AppState,
        contest_id: &str,
        start_time: i64,
    ) -> AppResult<()> {
        let status = state.registry().set_start_time(contest_id, start_time)?;
        match status {
            ContestStatus::Running => {
                ContestRepository::set_start_time(state.store(), contest_id, start_time).await?;
            }
            _ => {
                ContestRepository::update_scheduled_time(state.store(), contest_id, start_time)
                    .await?;
            }
        }
        Ok(())
    }

    /// Live scoreboard; for a finished contest, a static board from the store
    pub async fn scoreboard(state: &AppState, contest_id: &str) -> AppResult<ScoreboardView> {
        if let Some(view) = state.registry().snapshot(contest_id, time::now_epoch()) {
            return Ok(view);
        }

        let archived = Self::archived_results(state, contest_id).await?;
        Ok(ScoreboardView {
            status: archived.status,
            remaining_seconds: 0,
            name: archived.name,
            duration_minutes: 0,
            scoring: archived.scoring,
            task_ids: archived.task_ids,
            first_solves: HistoryRepository::first_solvers(state.store(), contest_id)
                .await?
                .into_iter()
                .map(|(task_id, pid)| (task_id.to_string(), pid))
                .collect(),
            scoreboard: archived.scoreboard,
            frozen: false,
        })
    }

    /// Stored results of any persisted contest
    pub async fn archived_results(state: &AppState, contest_id: &str) -> AppResult<ArchivedResults> {
        let contest = ContestRepository::load_config(state.store(), contest_id)
            .await?
            .ok_or(AppError::ContestNotFound)?;

        let progress = ContestRepository::all_progress(state.store(), contest_id).await?;
        let scoring = crate::db::repositories::contest_repo::detect_scoring(
            contest.config.scoring,
            &progress,
        );
        let scoreboard = scoring::rows_from_progress(&progress, &contest.task_ids, scoring);

        Ok(ArchivedResults {
            contest_id: contest_id.to_string(),
            name: contest.name,
            status: contest.status,
            scoring,
            task_ids: contest.task_ids,
            scoreboard,
        })
    }

    /// Personal history, newest first, tasks labelled A..J
    pub async fn history(
        state: &AppState,
        contest_id: &str,
        participant_id: &str,
    ) -> AppResult<Vec<HistoryLine>> {
        let task_ids = match state.registry().get_clone(contest_id) {
            Some(contest) => contest.task_ids,
            None => ContestRepository::load_config(state.store(), contest_id)
                .await?
                .map(|c| c.task_ids)
                .unwrap_or_default(),
        };

        let records =
            HistoryRepository::for_participant(state.store(), contest_id, participant_id).await?;

        Ok(records
            .into_iter()
            .map(|r| {
                let letter = task_ids
                    .iter()
                    .position(|&t| t == r.task_id)
                    .and_then(|i| crate::constants::TASK_LETTERS.chars().nth(i))
                    .unwrap_or('?');
                let time = Utc
                    .timestamp_opt(r.timestamp as i64, 0)
                    .single()
                    .map(|dt| dt.format("%H:%M:%S").to_string())
                    .unwrap_or_default();
                HistoryLine {
                    letter: letter.to_string(),
                    time,
                    language: r.language,
                    verdict: r.verdict,
                    tests: format!("{} / {}", r.tests_passed, r.total_tests),
                }
            })
            .collect())
    }

    /// Replay the freeze window and publish the reveal stream. Returns the
    /// steps in replay order.
    pub async fn reveal(state: &AppState, contest_id: &str) -> AppResult<Vec<RevealStep>> {
        let board = ContestRepository::get_frozen_board(state.store(), contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("no frozen board for this contest".to_string()))?;

        // final standings: live board sans freeze, or stored rows
        let final_rows = if state.registry().contains(contest_id) {
            state.registry().clear_freeze(contest_id);
            state
                .registry()
                .snapshot(contest_id, time::now_epoch())
                .map(|v| v.scoreboard)
                .unwrap_or_default()
        } else {
            Self::archived_results(state, contest_id).await?.scoreboard
        };

        let freeze_window =
            HistoryRepository::after(state.store(), contest_id, board.freeze_time).await?;
        let steps = scoring::reveal_steps(&board.frozen_scoreboard, &final_rows, &freeze_window);

        for step in &steps {
            state
                .broadcaster()
                .publish(contest_id, &ContestEvent::RevealStep(step.clone()));
        }

        ContestRepository::save_frozen_board(
            state.store(),
            &FrozenBoard {
                contest_id: contest_id.to_string(),
                frozen_scoreboard: board.frozen_scoreboard,
                final_scoreboard: final_rows,
                freeze_time: board.freeze_time,
                is_revealed: true,
            },
        )
        .await?;
        ContestRepository::mark_revealed(state.store(), contest_id).await?;

        if let Some(view) = state.registry().snapshot(contest_id, time::now_epoch()) {
            state
                .broadcaster()
                .publish(contest_id, &ContestEvent::FullStatusUpdate(view));
        }

        Ok(steps)
    }

    // =========================================================================
    // Roster management (closed mode)
    // =========================================================================

    pub async fn add_roster_entry(
        state: &AppState,
        contest_id: &str,
        nickname: &str,
        organization: &str,
        password: &str,
    ) -> AppResult<WhitelistEntry> {
        let hash = AuthService::hash_password(password)?;
        WhitelistRepository::add(
            state.store(),
            contest_id,
            nickname,
            Some(organization).filter(|o| !o.is_empty()),
            &hash,
        )
        .await
    }

    /// Import a roster spreadsheet; returns `(added, failed)`
    pub async fn upload_roster(
        state: &AppState,
        contest_id: &str,
        data: &[u8],
    ) -> AppResult<(usize, usize)> {
        let entries = crate::services::import_service::parse_roster_csv(data)?;

        let mut added = 0;
        let mut failed = 0;
        for entry in entries {
            match Self::add_roster_entry(
                state,
                contest_id,
                &entry.nickname,
                &entry.organization,
                &entry.password,
            )
            .await
            {
                Ok(_) => added += 1,
                Err(_) => failed += 1,
            }
        }

        Ok((added, failed))
    }

    pub async fn list_roster(state: &AppState, contest_id: &str) -> AppResult<Vec<WhitelistEntry>> {
        WhitelistRepository::list(state.store(), contest_id).await
    }

    pub async fn remove_roster_entry(state: &AppState, entry_id: i64) -> AppResult<()> {
        WhitelistRepository::remove(state.store(), entry_id).await
    }
}

/// Short opaque contest id
fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids_are_short_and_distinct() {
        let a = short_id();
        let b = short_id();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }
}
