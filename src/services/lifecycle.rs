//! Contest lifecycle controller
//!
//! A single loop ticking every ~10 seconds: starts scheduled contests,
//! freezes ICPC boards entering their final window, and closes contests
//! whose duration has elapsed. Also performs restart recovery at boot.

use std::time::Duration;

use crate::constants::LIFECYCLE_TICK_SECONDS;
use crate::db::repositories::ContestRepository;
use crate::models::{Contest, ContestStatus, FrozenBoard};
use crate::state::AppState;
use crate::utils::time;
use crate::ws::ContestEvent;

/// Hydrate contest state from the store after a process restart
pub async fn recover(state: &AppState) -> crate::error::AppResult<()> {
    let active = ContestRepository::load_all_active(state.store()).await?;
    let mut restored = 0;
    for contest in active {
        tracing::info!(contest_id = %contest.id, status = %contest.status, "recovered contest");
        state.registry().insert(contest);
        restored += 1;
    }

    // scheduled rows not already hydrated above
    let scheduled = ContestRepository::load_scheduled(state.store()).await?;
    for row in scheduled {
        if state.registry().contains(&row.contest_id) {
            continue;
        }
        tracing::info!(contest_id = %row.contest_id, start_time = row.start_time, "loaded scheduled contest");
        state.registry().insert(Contest::new(
            row.contest_id,
            row.name,
            row.task_ids,
            row.config,
            ContestStatus::Scheduled,
            Some(row.start_time as i64),
        ));
        restored += 1;
    }

    tracing::info!(restored, "contest state restored");
    Ok(())
}

/// Spawn the background ticker
pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(LIFECYCLE_TICK_SECONDS));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            tick(&state).await;
        }
    });
}

/// One controller pass
pub async fn tick(state: &AppState) {
    let now = time::now_epoch();

    for contest_id in state.registry().due_scheduled(now) {
        tracing::info!(contest_id = %contest_id, "starting scheduled contest");
        if let Err(e) = start_contest(state, &contest_id, now).await {
            tracing::error!(contest_id = %contest_id, "scheduled start failed: {}", e);
        }
    }

    for contest_id in state.registry().freeze_due(now) {
        tracing::info!(contest_id = %contest_id, "freezing scoreboard");
        freeze_contest(state, &contest_id).await;
    }

    for contest_id in state
        .registry()
        .expired_running(now, LIFECYCLE_TICK_SECONDS as i64)
    {
        tracing::info!(contest_id = %contest_id, "contest duration elapsed, closing");
        if let Err(e) = close_contest(state, &contest_id).await {
            tracing::error!(contest_id = %contest_id, "close failed: {}", e);
        }
    }
}

async fn start_contest(state: &AppState, contest_id: &str, now: i64) -> crate::error::AppResult<()> {
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

async fn freeze_contest(state: &AppState, contest_id: &str) {
    let Some((frozen_rows, freeze_time)) = state.registry().activate_freeze(contest_id) else {
        return;
    };

    let board = FrozenBoard {
        contest_id: contest_id.to_string(),
        frozen_scoreboard: frozen_rows,
        final_scoreboard: Vec::new(),
        freeze_time,
        is_revealed: false,
    };
    if let Err(e) = ContestRepository::save_frozen_board(state.store(), &board).await {
        tracing::error!(contest_id, "failed to persist frozen board: {}", e);
    }

    if let Some(view) = state.registry().snapshot(contest_id, time::now_epoch()) {
        state
            .broadcaster()
            .publish(contest_id, &ContestEvent::FullStatusUpdate(view));
    }
}

/// Persist and evict a contest whose time is up (or that an admin closed)
pub async fn close_contest(state: &AppState, contest_id: &str) -> crate::error::AppResult<()> {
    let Some(contest) = state.registry().close(contest_id) else {
        return Err(crate::error::AppError::ContestNotFound);
    };

    ContestRepository::persist_snapshot(state.store(), &contest).await?;
    ContestRepository::save_config(state.store(), &contest).await?;
    ContestRepository::mark_finished(state.store(), contest_id).await?;

    state.broadcaster().publish(contest_id, &ContestEvent::Finished);
    state.broadcaster().drop_room(contest_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContestConfig, ContestMode, ScoringMode};
    use crate::services::registry::ContestRegistry;

    fn contest(id: &str, status: ContestStatus, start: Option<i64>, duration: i64) -> Contest {
        Contest::new(
            id.to_string(),
            "Round".into(),
            vec![1],
            ContestConfig {
                duration_minutes: duration,
                scoring: ScoringMode::Icpc,
                mode: ContestMode::Free,
                allowed_languages: vec!["Python".into()],
                freeze_minutes: None,
            },
            status,
            start,
        )
    }

    #[test]
    fn due_scheduled_respects_start_time() {
        let registry = ContestRegistry::new();
        registry.insert(contest("early", ContestStatus::Scheduled, Some(100), 60));
        registry.insert(contest("late", ContestStatus::Scheduled, Some(500), 60));
        registry.insert(contest("running", ContestStatus::Running, Some(50), 60));

        let due = registry.due_scheduled(200);
        assert_eq!(due, vec!["early".to_string()]);
    }

    #[test]
    fn expired_running_waits_for_slack() {
        let registry = ContestRegistry::new();
        registry.insert(contest("c", ContestStatus::Running, Some(0), 1));

        assert!(registry.expired_running(60, 10).is_empty());
        assert!(registry.expired_running(70, 10).is_empty());
        assert_eq!(registry.expired_running(71, 10), vec!["c".to_string()]);
    }
}
