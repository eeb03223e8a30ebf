//! Worker procedure
//!
//! Judges one queued submission end to end: load the tests and checker, run
//! the sandbox under a slot, apply scoring, persist, append history, and
//! push results to the contest room. Store and broadcast failures are
//! logged and never crash the worker; the pending counter is released on
//! every exit path.

use crate::{
    db::repositories::{ContestRepository, HistoryRepository, TaskRepository},
    state::AppState,
    utils::time,
    ws::ContestEvent,
};

use super::{Job, JudgeOutcome, PersonalResult, TestDetail, Verdict};

pub async fn process_job(worker_id: usize, state: &AppState, job: Job) {
    tracing::info!(
        worker_id,
        contest_id = %job.contest_id,
        participant_id = %job.participant_id,
        task_id = job.task_id,
        language = %job.language,
        "judging submission"
    );

    let tests = match TaskRepository::tests_for_task(state.store(), job.task_id).await {
        Ok(tests) => tests,
        Err(e) => {
            tracing::error!(task_id = job.task_id, "failed to load tests: {}", e);
            system_failure(state, &job, "failed to load tests").await;
            return;
        }
    };

    if tests.is_empty() {
        tracing::warn!(task_id = job.task_id, "no tests defined, submission not judged");
        system_failure(state, &job, "no tests are defined for this task").await;
        return;
    }

    let checker = match TaskRepository::find_by_id(state.store(), job.task_id).await {
        Ok(task) => task
            .and_then(|t| t.checker_code)
            .filter(|c| !c.trim().is_empty()),
        Err(e) => {
            tracing::error!(task_id = job.task_id, "failed to load checker: {}", e);
            None
        }
    };

    let outcome = {
        let _slot = match state.sandbox_slots().acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                system_failure(state, &job, "sandbox slots closed").await;
                return;
            }
        };
        state
            .sandbox()
            .run(&job.language, &job.code, &tests, checker.as_deref())
            .await
    };

    let total = tests.len() as i64;
    let passed_count = outcome.passed_count();
    let fatal = outcome.fatal.is_some();
    let now = time::now_epoch();

    let Some(applied) = state.registry().apply_result(
        &job.contest_id,
        &job.participant_id,
        job.task_id,
        passed_count,
        total,
        fatal,
        now,
    ) else {
        tracing::warn!(
            contest_id = %job.contest_id,
            participant_id = %job.participant_id,
            "result dropped: contest gone or participant disqualified"
        );
        return;
    };

    if let Err(e) = ContestRepository::persist_snapshot(state.store(), &applied.contest).await {
        tracing::error!(contest_id = %job.contest_id, "failed to persist snapshot: {}", e);
    }

    let verdict = outcome.history_verdict(total);
    if let Err(e) = HistoryRepository::append(
        state.store(),
        &job.contest_id,
        &job.participant_id,
        job.task_id,
        &job.language,
        &verdict,
        passed_count,
        total,
        time::now_epoch_f64(),
    )
    .await
    {
        tracing::error!(contest_id = %job.contest_id, "failed to append history: {}", e);
    }

    let result = PersonalResult {
        task_id: job.task_id,
        passed_count,
        total_tests: total,
        new_score: applied.score.score,
        passed: applied.score.passed,
        verdict,
        details: details_of(&outcome),
    };
    state.broadcaster().publish(
        &job.contest_id,
        &ContestEvent::PersonalResult {
            participant_id: job.participant_id.clone(),
            result,
        },
    );

    if let Some(view) = state.registry().snapshot(&job.contest_id, time::now_epoch()) {
        state
            .broadcaster()
            .publish(&job.contest_id, &ContestEvent::FullStatusUpdate(view));
    }
}

/// Per-test lines for the personal result; a fatal run produces one line
/// with the failure text
fn details_of(outcome: &JudgeOutcome) -> Vec<TestDetail> {
    if let Some(fatal) = &outcome.fatal {
        let error = match fatal {
            super::FatalError::Compilation(diag) => diag.clone(),
            super::FatalError::OverallTimeout => "overall time limit exceeded".to_string(),
            super::FatalError::System(msg) => msg.clone(),
        };
        return vec![TestDetail {
            test_num: 1,
            verdict: fatal.verdict_str().to_string(),
            error,
        }];
    }

    outcome
        .verdicts
        .iter()
        .enumerate()
        .map(|(i, v)| TestDetail {
            test_num: i + 1,
            verdict: v.verdict.as_str().to_string(),
            error: if v.verdict == Verdict::Accepted {
                String::new()
            } else {
                v.stderr.clone()
            },
        })
        .collect()
}

/// Release the pending slot, record the failure, and tell the participant.
/// Used when judging could not run at all.
async fn system_failure(state: &AppState, job: &Job, message: &str) {
    state
        .registry()
        .resolve_pending(&job.contest_id, &job.participant_id);

    if let Err(e) = HistoryRepository::append(
        state.store(),
        &job.contest_id,
        &job.participant_id,
        job.task_id,
        &job.language,
        Verdict::InternalError.as_str(),
        0,
        0,
        time::now_epoch_f64(),
    )
    .await
    {
        tracing::error!(contest_id = %job.contest_id, "failed to record system error: {}", e);
    }

    let result = PersonalResult {
        task_id: job.task_id,
        passed_count: 0,
        total_tests: 0,
        new_score: 0,
        passed: false,
        verdict: Verdict::InternalError.as_str().to_string(),
        details: vec![TestDetail {
            test_num: 0,
            verdict: Verdict::InternalError.as_str().to_string(),
            error: message.to_string(),
        }],
    };
    state.broadcaster().publish(
        &job.contest_id,
        &ContestEvent::PersonalResult {
            participant_id: job.participant_id.clone(),
            result,
        },
    );
}
