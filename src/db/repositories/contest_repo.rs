//! Contest repository
//!
//! Durable rows for contest configuration, per-participant progress, last
//! submitted code, scheduled starts, and frozen boards. Restart recovery
//! loads everything that is not finished back into memory.

use std::collections::HashMap;

use sqlx::Row;

use crate::{
    db::Store,
    error::AppResult,
    models::{
        Contest, ContestConfig, ContestMode, ContestStatus, FrozenBoard, Participant, ScoringMode,
        TaskScore,
    },
    utils::time,
};

use super::HistoryRepository;

/// Progress of one participant as stored in the results tables
#[derive(Debug, Clone)]
pub struct StoredProgress {
    pub participant_id: String,
    pub nickname: String,
    pub organization: Option<String>,
    pub scores: HashMap<i64, TaskScore>,
    pub last_submissions: HashMap<i64, String>,
    pub disqualified: bool,
}

/// One scheduled-contest row
#[derive(Debug, Clone)]
pub struct ScheduledContest {
    pub contest_id: String,
    pub name: String,
    pub start_time: f64,
    pub config: ContestConfig,
    pub task_ids: Vec<i64>,
}

/// Archive listing entry
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContestListEntry {
    pub contest_id: String,
    pub name: String,
    pub status: String,
    pub start_time: Option<f64>,
    pub scoring: String,
}

/// Parse a stored task-score map, tolerating legacy shapes: keys may be
/// decimal strings or stray text, values may be full records or bare
/// integers (upgraded in place to a full `TaskScore`).
pub fn parse_scores_json(raw: &str) -> HashMap<i64, TaskScore> {
    let mut scores = HashMap::new();
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return scores;
    };
    let Some(map) = value.as_object() else {
        return scores;
    };

    for (key, val) in map {
        let Ok(task_id) = key.parse::<i64>() else {
            continue;
        };
        let score = match val {
            serde_json::Value::Object(_) => {
                serde_json::from_value::<TaskScore>(val.clone()).unwrap_or_default()
            }
            serde_json::Value::Number(n) => TaskScore {
                score: n.as_i64().unwrap_or(0),
                ..TaskScore::default()
            },
            _ => TaskScore::default(),
        };
        scores.insert(task_id, score);
    }

    scores
}

fn parse_code_json(raw: &str) -> HashMap<i64, String> {
    let mut code = HashMap::new();
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return code;
    };
    let Some(map) = value.as_object() else {
        return code;
    };
    for (key, val) in map {
        if let (Ok(task_id), Some(s)) = (key.parse::<i64>(), val.as_str()) {
            code.insert(task_id, s.to_string());
        }
    }
    code
}

fn parse_task_ids(raw: &str) -> Vec<i64> {
    serde_json::from_str::<Vec<serde_json::Value>>(raw)
        .map(|vals| {
            vals.into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::Number(n) => n.as_i64(),
                    serde_json::Value::String(s) => s.parse().ok(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// If a contest claims ICPC scoring but carries scores above 1, the stored
/// values are the truth: it was really a points contest.
pub fn detect_scoring(declared: ScoringMode, progress: &[StoredProgress]) -> ScoringMode {
    if declared == ScoringMode::Icpc
        && progress
            .iter()
            .flat_map(|p| p.scores.values())
            .any(|s| s.score > 1)
    {
        ScoringMode::Points
    } else {
        declared
    }
}

/// Repository for contest persistence
pub struct ContestRepository;

impl ContestRepository {
    /// UPSERT the configuration row for a contest
    pub async fn save_config(store: &Store, contest: &Contest) -> AppResult<()> {
        let task_ids_json = serde_json::to_string(&contest.task_ids)?;
        let languages_json = serde_json::to_string(&contest.config.allowed_languages)?;

        let _guard = store.write().await;
        sqlx::query(
            r#"
            INSERT INTO contest_configs
                (contest_id, name, task_ids_json, status, duration_minutes,
                 scoring_type, mode, allowed_languages, freeze_minutes, start_time)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(contest_id) DO UPDATE SET
                name = excluded.name,
                task_ids_json = excluded.task_ids_json,
                status = excluded.status,
                duration_minutes = excluded.duration_minutes,
                scoring_type = excluded.scoring_type,
                mode = excluded.mode,
                allowed_languages = excluded.allowed_languages,
                freeze_minutes = excluded.freeze_minutes,
                start_time = excluded.start_time
            "#,
        )
        .bind(&contest.id)
        .bind(&contest.name)
        .bind(task_ids_json)
        .bind(contest.status.as_str())
        .bind(contest.config.duration_minutes)
        .bind(contest.config.scoring.as_str())
        .bind(contest.config.mode.as_str())
        .bind(languages_json)
        .bind(contest.config.freeze_minutes)
        .bind(contest.start_time.map(|t| t as f64))
        .execute(store.pool())
        .await?;

        Ok(())
    }

    /// Record the actual start and flip the stored status to running
    pub async fn set_start_time(store: &Store, contest_id: &str, start_time: i64) -> AppResult<()> {
        let _guard = store.write().await;
        sqlx::query(
            r#"UPDATE contest_configs SET start_time = ?2, status = 'running' WHERE contest_id = ?1"#,
        )
        .bind(contest_id)
        .bind(start_time as f64)
        .execute(store.pool())
        .await?;

        Ok(())
    }

    pub async fn mark_finished(store: &Store, contest_id: &str) -> AppResult<()> {
        let _guard = store.write().await;
        sqlx::query(r#"UPDATE contest_configs SET status = 'finished' WHERE contest_id = ?1"#)
            .bind(contest_id)
            .execute(store.pool())
            .await?;

        Ok(())
    }

    /// UPSERT every participant's scores and last code in one write section
    pub async fn persist_snapshot(store: &Store, contest: &Contest) -> AppResult<()> {
        let _guard = store.write().await;
        for participant in contest.participants.values() {
            let total_score: i64 = participant.scores.values().map(|s| s.score).sum();
            let scores_json = serde_json::to_string(&participant.scores)?;
            let code_json = serde_json::to_string(&participant.last_submissions)?;

            sqlx::query(
                r#"
                INSERT INTO contest_results
                    (contest_id, participant_id, nickname, organization, total_score, task_scores, disqualified)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(contest_id, participant_id) DO UPDATE SET
                    organization = excluded.organization,
                    total_score = excluded.total_score,
                    task_scores = excluded.task_scores,
                    disqualified = excluded.disqualified
                "#,
            )
            .bind(&contest.id)
            .bind(&participant.id)
            .bind(&participant.nickname)
            .bind(&participant.organization)
            .bind(total_score)
            .bind(scores_json)
            .bind(participant.disqualified)
            .execute(store.pool())
            .await?;

            sqlx::query(
                r#"
                INSERT INTO contest_submissions (contest_id, participant_id, nickname, task_submissions)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(contest_id, participant_id) DO UPDATE SET
                    task_submissions = excluded.task_submissions
                "#,
            )
            .bind(&contest.id)
            .bind(&participant.id)
            .bind(&participant.nickname)
            .bind(code_json)
            .execute(store.pool())
            .await?;
        }

        Ok(())
    }

    /// Record a participant's submitted code the moment it is admitted
    pub async fn save_last_submission(
        store: &Store,
        contest_id: &str,
        participant_id: &str,
        nickname: &str,
        task_id: i64,
        code: &str,
    ) -> AppResult<()> {
        let existing: Option<String> = sqlx::query_scalar(
            r#"SELECT task_submissions FROM contest_submissions
               WHERE contest_id = ?1 AND participant_id = ?2"#,
        )
        .bind(contest_id)
        .bind(participant_id)
        .fetch_optional(store.pool())
        .await?;

        let mut code_map = existing.as_deref().map(parse_code_json).unwrap_or_default();
        code_map.insert(task_id, code.to_string());
        let code_json = serde_json::to_string(&code_map)?;

        let _guard = store.write().await;
        sqlx::query(
            r#"
            INSERT INTO contest_submissions (contest_id, participant_id, nickname, task_submissions)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(contest_id, participant_id) DO UPDATE SET
                task_submissions = excluded.task_submissions
            "#,
        )
        .bind(contest_id)
        .bind(participant_id)
        .bind(nickname)
        .bind(code_json)
        .execute(store.pool())
        .await?;

        Ok(())
    }

    /// Saved progress of one participant, if any
    pub async fn participant_progress(
        store: &Store,
        contest_id: &str,
        participant_id: &str,
    ) -> AppResult<Option<StoredProgress>> {
        let row = sqlx::query(
            r#"SELECT nickname, organization, task_scores, disqualified
               FROM contest_results WHERE contest_id = ?1 AND participant_id = ?2"#,
        )
        .bind(contest_id)
        .bind(participant_id)
        .fetch_optional(store.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let code_json: Option<String> = sqlx::query_scalar(
            r#"SELECT task_submissions FROM contest_submissions
               WHERE contest_id = ?1 AND participant_id = ?2"#,
        )
        .bind(contest_id)
        .bind(participant_id)
        .fetch_optional(store.pool())
        .await?;

        Ok(Some(StoredProgress {
            participant_id: participant_id.to_string(),
            nickname: row.try_get("nickname")?,
            organization: row.try_get("organization")?,
            scores: row
                .try_get::<Option<String>, _>("task_scores")?
                .as_deref()
                .map(parse_scores_json)
                .unwrap_or_default(),
            last_submissions: code_json.as_deref().map(parse_code_json).unwrap_or_default(),
            disqualified: row.try_get("disqualified")?,
        }))
    }

    /// Look up the stored participant id for a nickname (free-mode rejoin)
    pub async fn participant_id_by_nickname(
        store: &Store,
        contest_id: &str,
        nickname: &str,
    ) -> AppResult<Option<String>> {
        let id: Option<String> = sqlx::query_scalar(
            r#"SELECT participant_id FROM contest_results
               WHERE contest_id = ?1 AND nickname = ?2"#,
        )
        .bind(contest_id)
        .bind(nickname)
        .fetch_optional(store.pool())
        .await?;

        Ok(id)
    }

    /// All stored progress rows of a contest
    pub async fn all_progress(store: &Store, contest_id: &str) -> AppResult<Vec<StoredProgress>> {
        let rows = sqlx::query(
            r#"SELECT participant_id, nickname, organization, task_scores, disqualified
               FROM contest_results WHERE contest_id = ?1"#,
        )
        .bind(contest_id)
        .fetch_all(store.pool())
        .await?;

        let code_rows = sqlx::query(
            r#"SELECT participant_id, task_submissions FROM contest_submissions
               WHERE contest_id = ?1"#,
        )
        .bind(contest_id)
        .fetch_all(store.pool())
        .await?;

        let mut code_by_participant: HashMap<String, HashMap<i64, String>> = HashMap::new();
        for row in code_rows {
            let pid: String = row.try_get("participant_id")?;
            let raw: Option<String> = row.try_get("task_submissions")?;
            code_by_participant.insert(pid, raw.as_deref().map(parse_code_json).unwrap_or_default());
        }

        let mut progress = Vec::with_capacity(rows.len());
        for row in rows {
            let pid: String = row.try_get("participant_id")?;
            progress.push(StoredProgress {
                last_submissions: code_by_participant.remove(&pid).unwrap_or_default(),
                participant_id: pid,
                nickname: row.try_get("nickname")?,
                organization: row.try_get("organization")?,
                scores: row
                    .try_get::<Option<String>, _>("task_scores")?
                    .as_deref()
                    .map(parse_scores_json)
                    .unwrap_or_default(),
                disqualified: row.try_get("disqualified")?,
            });
        }

        Ok(progress)
    }

    /// Load the stored configuration row into a bare contest record
    pub async fn load_config(store: &Store, contest_id: &str) -> AppResult<Option<Contest>> {
        let row = sqlx::query(r#"SELECT * FROM contest_configs WHERE contest_id = ?1"#)
            .bind(contest_id)
            .fetch_optional(store.pool())
            .await?;

        Ok(row.map(|row| Self::contest_from_row(&row)).transpose()?)
    }

    fn contest_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<Contest> {
        let languages: Option<String> = row.try_get("allowed_languages")?;
        let allowed_languages = languages
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .unwrap_or_else(|| {
                crate::constants::languages::ALL
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        let config = ContestConfig {
            duration_minutes: row.try_get("duration_minutes")?,
            scoring: ScoringMode::parse(row.try_get::<String, _>("scoring_type")?.as_str())
                .unwrap_or(ScoringMode::Icpc),
            mode: ContestMode::parse(row.try_get::<String, _>("mode")?.as_str())
                .unwrap_or(ContestMode::Free),
            allowed_languages,
            freeze_minutes: row.try_get("freeze_minutes")?,
        };

        let status = ContestStatus::parse(row.try_get::<String, _>("status")?.as_str())
            .unwrap_or(ContestStatus::Waiting);
        let start_time: Option<f64> = row.try_get("start_time")?;
        let task_ids = parse_task_ids(row.try_get::<String, _>("task_ids_json")?.as_str());

        Ok(Contest::new(
            row.try_get("contest_id")?,
            row.try_get("name")?,
            task_ids,
            config,
            status,
            start_time.map(|t| t as i64),
        ))
    }

    /// Restart recovery: every contest whose stored status is not finished,
    /// hydrated with participants, first solves, and an inferred start time
    /// when the row lacks one but history exists. Running contests whose end
    /// passed more than an hour ago are dropped as stale.
    pub async fn load_all_active(store: &Store) -> AppResult<Vec<Contest>> {
        let rows = sqlx::query(r#"SELECT * FROM contest_configs WHERE status != 'finished'"#)
            .fetch_all(store.pool())
            .await?;

        let now = time::now_epoch();
        let mut contests = Vec::new();

        for row in rows {
            let mut contest = Self::contest_from_row(&row)?;

            if contest.start_time.is_none() {
                if let Some(first_ts) =
                    HistoryRepository::earliest_timestamp(store, &contest.id).await?
                {
                    contest.start_time = Some(first_ts as i64);
                    contest.status = ContestStatus::Running;
                }
            }

            if contest.status == ContestStatus::Running {
                if let Some(start) = contest.start_time {
                    let end = start + contest.config.duration_minutes * 60;
                    if now - end > crate::constants::RECOVERY_STALE_SECONDS {
                        tracing::info!(contest_id = %contest.id, "skipping stale contest on recovery");
                        continue;
                    }
                }
            }

            let progress = Self::all_progress(store, &contest.id).await?;
            contest.config.scoring = detect_scoring(contest.config.scoring, &progress);

            for p in progress {
                let mut participant = Participant::new(
                    p.participant_id.clone(),
                    p.nickname,
                    p.organization,
                    &contest.task_ids,
                );
                participant.scores.extend(p.scores);
                participant.last_submissions.extend(p.last_submissions);
                participant.disqualified = p.disqualified;
                contest.participants.insert(p.participant_id, participant);
            }

            contest.first_solves = HistoryRepository::first_solvers(store, &contest.id).await?;
            contest.is_dirty = true;
            contests.push(contest);
        }

        Ok(contests)
    }

    /// Every stored contest, for the archive browser
    pub async fn list_all(store: &Store) -> AppResult<Vec<ContestListEntry>> {
        let rows = sqlx::query(
            r#"SELECT contest_id, name, status, start_time, scoring_type
               FROM contest_configs ORDER BY start_time DESC"#,
        )
        .fetch_all(store.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ContestListEntry {
                    contest_id: row.try_get("contest_id")?,
                    name: row.try_get("name")?,
                    status: row.try_get("status")?,
                    start_time: row.try_get("start_time")?,
                    scoring: row.try_get("scoring_type")?,
                })
            })
            .collect()
    }

    /// Remove a contest and every row that references it
    pub async fn delete(store: &Store, contest_id: &str) -> AppResult<()> {
        let _guard = store.write().await;
        for table in [
            "contest_configs",
            "contest_results",
            "contest_submissions",
            "contest_history",
            "whitelist",
            "scheduled_contests",
            "frozen_boards",
        ] {
            sqlx::query(&format!("DELETE FROM {} WHERE contest_id = ?1", table))
                .bind(contest_id)
                .execute(store.pool())
                .await?;
        }

        Ok(())
    }

    // =========================================================================
    // Scheduled contests
    // =========================================================================

    pub async fn add_scheduled(
        store: &Store,
        contest: &Contest,
        start_time: i64,
    ) -> AppResult<()> {
        let config_json = serde_json::to_string(&contest.config)?;
        let task_ids_json = serde_json::to_string(&contest.task_ids)?;

        let _guard = store.write().await;
        sqlx::query(
            r#"
            INSERT INTO scheduled_contests (contest_id, name, start_time, config_json, task_ids_json)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(contest_id) DO UPDATE SET
                start_time = excluded.start_time,
                config_json = excluded.config_json,
                task_ids_json = excluded.task_ids_json
            "#,
        )
        .bind(&contest.id)
        .bind(&contest.name)
        .bind(start_time as f64)
        .bind(config_json)
        .bind(task_ids_json)
        .execute(store.pool())
        .await?;

        Ok(())
    }

    pub async fn load_scheduled(store: &Store) -> AppResult<Vec<ScheduledContest>> {
        let rows = sqlx::query(r#"SELECT * FROM scheduled_contests"#)
            .fetch_all(store.pool())
            .await?;

        rows.into_iter()
            .map(|row| {
                let config_raw: String = row.try_get("config_json")?;
                let config = serde_json::from_str::<ContestConfig>(&config_raw)?;
                Ok(ScheduledContest {
                    contest_id: row.try_get("contest_id")?,
                    name: row.try_get("name")?,
                    start_time: row.try_get("start_time")?,
                    config,
                    task_ids: parse_task_ids(row.try_get::<String, _>("task_ids_json")?.as_str()),
                })
            })
            .collect()
    }

    pub async fn update_scheduled_time(
        store: &Store,
        contest_id: &str,
        start_time: i64,
    ) -> AppResult<()> {
        let _guard = store.write().await;
        sqlx::query(r#"UPDATE scheduled_contests SET start_time = ?2 WHERE contest_id = ?1"#)
            .bind(contest_id)
            .bind(start_time as f64)
            .execute(store.pool())
            .await?;

        Ok(())
    }

    pub async fn remove_scheduled(store: &Store, contest_id: &str) -> AppResult<()> {
        let _guard = store.write().await;
        sqlx::query(r#"DELETE FROM scheduled_contests WHERE contest_id = ?1"#)
            .bind(contest_id)
            .execute(store.pool())
            .await?;

        Ok(())
    }

    // =========================================================================
    // Frozen boards
    // =========================================================================

    pub async fn save_frozen_board(store: &Store, board: &FrozenBoard) -> AppResult<()> {
        let frozen_json = serde_json::to_string(&board.frozen_scoreboard)?;
        let final_json = serde_json::to_string(&board.final_scoreboard)?;

        let _guard = store.write().await;
        sqlx::query(
            r#"
            INSERT INTO frozen_boards
                (contest_id, frozen_scoreboard_json, final_scoreboard_json, freeze_time, is_revealed)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(contest_id) DO UPDATE SET
                frozen_scoreboard_json = excluded.frozen_scoreboard_json,
                final_scoreboard_json = excluded.final_scoreboard_json,
                freeze_time = excluded.freeze_time
            "#,
        )
        .bind(&board.contest_id)
        .bind(frozen_json)
        .bind(final_json)
        .bind(board.freeze_time)
        .bind(board.is_revealed)
        .execute(store.pool())
        .await?;

        Ok(())
    }

    pub async fn get_frozen_board(store: &Store, contest_id: &str) -> AppResult<Option<FrozenBoard>> {
        let row = sqlx::query(r#"SELECT * FROM frozen_boards WHERE contest_id = ?1"#)
            .bind(contest_id)
            .fetch_optional(store.pool())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let frozen_raw: Option<String> = row.try_get("frozen_scoreboard_json")?;
        let final_raw: Option<String> = row.try_get("final_scoreboard_json")?;

        Ok(Some(FrozenBoard {
            contest_id: contest_id.to_string(),
            frozen_scoreboard: frozen_raw
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default(),
            final_scoreboard: final_raw
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default(),
            freeze_time: row.try_get::<Option<f64>, _>("freeze_time")?.unwrap_or(0.0),
            is_revealed: row.try_get("is_revealed")?,
        }))
    }

    pub async fn mark_revealed(store: &Store, contest_id: &str) -> AppResult<()> {
        let _guard = store.write().await;
        sqlx::query(r#"UPDATE frozen_boards SET is_revealed = 1 WHERE contest_id = ?1"#)
            .bind(contest_id)
            .execute(store.pool())
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db"), 2).await.unwrap();
        db::init_schema(&store).await.unwrap();
        (dir, store)
    }

    fn sample_contest(id: &str, scoring: ScoringMode) -> Contest {
        Contest::new(
            id.to_string(),
            "Spring Round".to_string(),
            vec![1, 2],
            ContestConfig {
                duration_minutes: 60,
                scoring,
                mode: ContestMode::Free,
                allowed_languages: vec!["Python".to_string()],
                freeze_minutes: None,
            },
            ContestStatus::Running,
            Some(time::now_epoch()),
        )
    }

    #[test]
    fn scores_json_upgrades_bare_integers() {
        let scores = parse_scores_json(r#"{"1": 42, "2": {"score": 100, "attempts": 1, "passed": true, "penalty": 0}}"#);
        assert_eq!(scores[&1].score, 42);
        assert!(!scores[&1].passed);
        assert_eq!(scores[&1].attempts, 0);
        assert_eq!(scores[&2].score, 100);
        assert!(scores[&2].passed);
    }

    #[test]
    fn scores_json_tolerates_junk_keys() {
        let scores = parse_scores_json(r#"{"1": {"score": 5}, "junk": {"score": 9}}"#);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[&1].score, 5);
    }

    #[test]
    fn icpc_with_big_scores_promotes_to_points() {
        let progress = vec![StoredProgress {
            participant_id: "p".into(),
            nickname: "n".into(),
            organization: None,
            scores: HashMap::from([(1, TaskScore { score: 75, ..Default::default() })]),
            last_submissions: HashMap::new(),
            disqualified: false,
        }];
        assert_eq!(detect_scoring(ScoringMode::Icpc, &progress), ScoringMode::Points);

        let ones = vec![StoredProgress {
            scores: HashMap::from([(1, TaskScore { score: 1, passed: true, ..Default::default() })]),
            ..progress[0].clone()
        }];
        assert_eq!(detect_scoring(ScoringMode::Icpc, &ones), ScoringMode::Icpc);
    }

    #[tokio::test]
    async fn config_round_trip() {
        let (_dir, store) = test_store().await;
        let contest = sample_contest("abc123", ScoringMode::Points);
        ContestRepository::save_config(&store, &contest).await.unwrap();

        let loaded = ContestRepository::load_config(&store, "abc123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.name, "Spring Round");
        assert_eq!(loaded.task_ids, vec![1, 2]);
        assert_eq!(loaded.config.scoring, ScoringMode::Points);
        assert_eq!(loaded.config.duration_minutes, 60);
        assert_eq!(loaded.status, ContestStatus::Running);
    }

    #[tokio::test]
    async fn snapshot_round_trip_restores_scores_and_code() {
        let (_dir, store) = test_store().await;
        let mut contest = sample_contest("rt1", ScoringMode::Icpc);

        let mut alice = Participant::new("p1".into(), "alice".into(), None, &contest.task_ids);
        alice.scores.insert(
            1,
            TaskScore { score: 1, attempts: 2, passed: true, penalty: 45 },
        );
        alice
            .last_submissions
            .insert(1, "print(42)".to_string());
        alice.pending_submissions = 2;
        contest.participants.insert("p1".into(), alice);

        ContestRepository::save_config(&store, &contest).await.unwrap();
        ContestRepository::persist_snapshot(&store, &contest).await.unwrap();

        let restored = ContestRepository::load_all_active(&store).await.unwrap();
        assert_eq!(restored.len(), 1);
        let contest = &restored[0];
        let alice = &contest.participants["p1"];
        assert_eq!(alice.scores[&1], TaskScore { score: 1, attempts: 2, passed: true, penalty: 45 });
        assert_eq!(alice.last_submissions[&1], "print(42)");
        // pending counters do not survive a restart
        assert_eq!(alice.pending_submissions, 0);
        assert!(contest.is_dirty);
    }

    #[tokio::test]
    async fn recovery_infers_start_time_from_history() {
        let (_dir, store) = test_store().await;
        let mut contest = sample_contest("inf1", ScoringMode::Icpc);
        contest.status = ContestStatus::Waiting;
        contest.start_time = None;
        ContestRepository::save_config(&store, &contest).await.unwrap();

        let ts = time::now_epoch_f64() - 120.0;
        HistoryRepository::append(&store, "inf1", "p1", 1, "Python", "Accepted", 2, 2, ts)
            .await
            .unwrap();

        let restored = ContestRepository::load_all_active(&store).await.unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].status, ContestStatus::Running);
        assert_eq!(restored[0].start_time, Some(ts as i64));
    }

    #[tokio::test]
    async fn recovery_drops_stale_runaways() {
        let (_dir, store) = test_store().await;
        let mut contest = sample_contest("stale1", ScoringMode::Icpc);
        // ended more than an hour ago
        contest.start_time = Some(time::now_epoch() - 60 * 60 - 60 * 60 - 10);
        ContestRepository::save_config(&store, &contest).await.unwrap();

        let restored = ContestRepository::load_all_active(&store).await.unwrap();
        assert!(restored.is_empty());
    }

    #[tokio::test]
    async fn scheduled_round_trip() {
        let (_dir, store) = test_store().await;
        let mut contest = sample_contest("sch1", ScoringMode::AllOrNothing);
        contest.status = ContestStatus::Scheduled;
        let start = time::now_epoch() + 600;
        ContestRepository::add_scheduled(&store, &contest, start).await.unwrap();

        let scheduled = ContestRepository::load_scheduled(&store).await.unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].contest_id, "sch1");
        assert_eq!(scheduled[0].start_time as i64, start);
        assert_eq!(scheduled[0].config.scoring, ScoringMode::AllOrNothing);

        ContestRepository::remove_scheduled(&store, "sch1").await.unwrap();
        assert!(ContestRepository::load_scheduled(&store).await.unwrap().is_empty());
    }
}
