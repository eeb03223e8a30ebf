//! Scoring engine
//!
//! Pure functions over contest state: the three scoring models, scoreboard
//! computation and ranking, freeze masking, and the reveal replay. The
//! registry calls these under its lock; nothing here blocks.

use std::collections::{BTreeMap, HashSet};

use crate::db::repositories::contest_repo::StoredProgress;
use crate::models::{
    Contest, HistoryRecord, RevealStep, ScoreCell, ScoreboardRow, ScoreboardView, ScoringMode,
    TaskScore,
};

/// A submission is accepted when every test passed and nothing was fatal
pub fn is_accepted(passed_count: i64, total: i64, fatal: bool) -> bool {
    !fatal && total > 0 && passed_count == total
}

/// Apply one judged result to a score cell. Returns whether the submission
/// was accepted.
///
/// Scores never decrease. Once a cell has `passed`, its `attempts` and
/// `penalty` are frozen. Fatal results (compilation errors, sandbox
/// failures) change nothing, not even `attempts`.
pub fn apply(
    mode: ScoringMode,
    cell: &mut TaskScore,
    passed_count: i64,
    total: i64,
    fatal: bool,
    elapsed_minutes: i64,
) -> bool {
    let accepted = is_accepted(passed_count, total, fatal);

    if cell.passed {
        return accepted;
    }

    match mode {
        ScoringMode::Icpc => {
            if accepted {
                cell.passed = true;
                cell.score = 1;
                cell.penalty = elapsed_minutes.max(0)
                    + cell.attempts * crate::constants::ICPC_PENALTY_MINUTES;
            } else if !fatal {
                cell.attempts += 1;
            }
        }
        ScoringMode::AllOrNothing => {
            if accepted {
                cell.score = 100;
                cell.passed = true;
            } else if !fatal {
                cell.attempts += 1;
            }
        }
        ScoringMode::Points => {
            if total > 0 {
                let earned = 100 * passed_count / total;
                if earned > cell.score {
                    cell.score = earned;
                }
            }
            if accepted {
                cell.passed = true;
            } else if !fatal {
                cell.attempts += 1;
            }
        }
    }

    accepted
}

fn row_totals(row: &mut ScoreboardRow) {
    row.total_score = row.scores.values().map(|c| c.score).sum();
    row.total_penalty = row
        .scores
        .values()
        .filter(|c| c.passed)
        .map(|c| c.penalty)
        .sum();
    row.solved_count = row.scores.values().filter(|c| c.passed).count() as i64;
}

/// Order rows: ICPC by solved count then penalty, the other models by total
/// score. Participant id breaks every tie so the board is stable.
pub fn rank_rows(mode: ScoringMode, rows: &mut [ScoreboardRow]) {
    match mode {
        ScoringMode::Icpc => rows.sort_by(|a, b| {
            b.solved_count
                .cmp(&a.solved_count)
                .then(a.total_penalty.cmp(&b.total_penalty))
                .then(a.participant_id.cmp(&b.participant_id))
        }),
        _ => rows.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then(a.participant_id.cmp(&b.participant_id))
        }),
    }
}

/// Ranked rows of the live board. During a freeze, cells touched after the
/// boundary display their frozen value and are flagged pending.
pub fn compute_rows(contest: &Contest) -> Vec<ScoreboardRow> {
    let mut rows: Vec<ScoreboardRow> = contest
        .participants
        .values()
        .map(|p| {
            let mut scores = BTreeMap::new();
            for &task_id in &contest.task_ids {
                let mut cell: ScoreCell = p
                    .scores
                    .get(&task_id)
                    .map(ScoreCell::from)
                    .unwrap_or_default();

                if let Some(freeze) = &contest.freeze {
                    if freeze.pending.contains(&(p.id.clone(), task_id)) {
                        cell = freeze
                            .frozen_scores
                            .get(&p.id)
                            .and_then(|scores| scores.get(&task_id))
                            .map(ScoreCell::from)
                            .unwrap_or_default();
                        cell.pending = true;
                    }
                }

                scores.insert(task_id.to_string(), cell);
            }

            let mut row = ScoreboardRow {
                participant_id: p.id.clone(),
                nickname: p.nickname.clone(),
                organization: p.organization.clone(),
                scores,
                total_score: 0,
                total_penalty: 0,
                solved_count: 0,
                disqualified: p.disqualified,
            };
            row_totals(&mut row);
            row
        })
        .collect();

    rank_rows(contest.config.scoring, &mut rows);
    rows
}

/// Full scoreboard view for a contest at `now`. The caller overlays nothing;
/// `remaining_seconds` and `status` are computed here and never cached.
pub fn compute_view(contest: &Contest, now: i64) -> ScoreboardView {
    ScoreboardView {
        status: contest.status,
        remaining_seconds: contest.remaining_seconds(now),
        name: contest.name.clone(),
        duration_minutes: contest.config.duration_minutes,
        scoring: contest.config.scoring,
        task_ids: contest.task_ids.clone(),
        scoreboard: compute_rows(contest),
        first_solves: contest
            .first_solves
            .iter()
            .map(|(task_id, pid)| (task_id.to_string(), pid.clone()))
            .collect(),
        frozen: contest.freeze.is_some(),
    }
}

/// Ranked rows built from stored progress, for archives, exports, and the
/// final board of a reveal
pub fn rows_from_progress(
    progress: &[StoredProgress],
    task_ids: &[i64],
    mode: ScoringMode,
) -> Vec<ScoreboardRow> {
    let mut rows: Vec<ScoreboardRow> = progress
        .iter()
        .map(|p| {
            let mut scores = BTreeMap::new();
            for &task_id in task_ids {
                let cell = p
                    .scores
                    .get(&task_id)
                    .map(ScoreCell::from)
                    .unwrap_or_default();
                scores.insert(task_id.to_string(), cell);
            }
            let mut row = ScoreboardRow {
                participant_id: p.participant_id.clone(),
                nickname: p.nickname.clone(),
                organization: p.organization.clone(),
                scores,
                total_score: 0,
                total_penalty: 0,
                solved_count: 0,
                disqualified: p.disqualified,
            };
            row_totals(&mut row);
            row
        })
        .collect();

    rank_rows(mode, &mut rows);
    rows
}

fn cell_of<'a>(rows: &'a [ScoreboardRow], participant_id: &str, task_id: i64) -> Option<&'a ScoreCell> {
    rows.iter()
        .find(|r| r.participant_id == participant_id)
        .and_then(|r| r.scores.get(&task_id.to_string()))
}

/// Replay the freeze window: walk history in `(timestamp, id)` order and
/// emit one step per cell whose final value differs from its frozen value.
pub fn reveal_steps(
    frozen_rows: &[ScoreboardRow],
    final_rows: &[ScoreboardRow],
    freeze_window: &[HistoryRecord],
) -> Vec<RevealStep> {
    let mut seen: HashSet<(String, i64)> = HashSet::new();
    let mut steps = Vec::new();

    for record in freeze_window {
        let key = (record.participant_id.clone(), record.task_id);
        if seen.contains(&key) {
            continue;
        }
        seen.insert(key);

        let frozen = cell_of(frozen_rows, &record.participant_id, record.task_id)
            .cloned()
            .unwrap_or_default();
        let final_cell = cell_of(final_rows, &record.participant_id, record.task_id)
            .cloned()
            .unwrap_or_default();

        if frozen != final_cell {
            steps.push(RevealStep {
                participant_id: record.participant_id.clone(),
                task_id: record.task_id,
                new_score: final_cell,
            });
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContestConfig, ContestMode, ContestStatus, FreezeState, Participant};
    use std::collections::HashMap;

    fn contest_with(mode: ScoringMode, start: i64) -> Contest {
        Contest::new(
            "c1".into(),
            "Round".into(),
            vec![1],
            ContestConfig {
                duration_minutes: 60,
                scoring: mode,
                mode: ContestMode::Free,
                allowed_languages: vec!["Python".into()],
                freeze_minutes: None,
            },
            ContestStatus::Running,
            Some(start),
        )
    }

    // S1: first accepted submission in ICPC at 30 seconds elapsed
    #[test]
    fn icpc_first_accept_no_penalty() {
        let mut cell = TaskScore::default();
        let accepted = apply(ScoringMode::Icpc, &mut cell, 2, 2, false, 0);
        assert!(accepted);
        assert_eq!(
            cell,
            TaskScore { score: 1, attempts: 0, passed: true, penalty: 0 }
        );
    }

    // S2: wrong attempt then accept at five minutes
    #[test]
    fn icpc_penalty_counts_time_and_attempts() {
        let mut cell = TaskScore::default();
        apply(ScoringMode::Icpc, &mut cell, 0, 2, false, 2);
        assert_eq!(cell.attempts, 1);
        assert!(!cell.passed);
        assert_eq!(cell.penalty, 0);

        let accepted = apply(ScoringMode::Icpc, &mut cell, 2, 2, false, 5);
        assert!(accepted);
        assert_eq!(cell.score, 1);
        assert!(cell.passed);
        assert_eq!(cell.penalty, 5 + 20);
    }

    // S3: points model keeps the best score; attempts stop once passed
    #[test]
    fn points_keeps_best_score() {
        let mut cell = TaskScore::default();
        apply(ScoringMode::Points, &mut cell, 3, 4, false, 10);
        assert_eq!(
            cell,
            TaskScore { score: 75, attempts: 1, passed: false, penalty: 0 }
        );

        apply(ScoringMode::Points, &mut cell, 4, 4, false, 20);
        assert_eq!(
            cell,
            TaskScore { score: 100, attempts: 1, passed: true, penalty: 0 }
        );
    }

    #[test]
    fn points_partial_never_lowers_score() {
        let mut cell = TaskScore::default();
        apply(ScoringMode::Points, &mut cell, 3, 4, false, 0);
        apply(ScoringMode::Points, &mut cell, 1, 4, false, 0);
        assert_eq!(cell.score, 75);
        assert_eq!(cell.attempts, 2);
    }

    // S4: all-or-nothing
    #[test]
    fn all_or_nothing_is_binary() {
        let mut cell = TaskScore::default();
        apply(ScoringMode::AllOrNothing, &mut cell, 4, 5, false, 0);
        assert_eq!(
            cell,
            TaskScore { score: 0, attempts: 1, passed: false, penalty: 0 }
        );

        apply(ScoringMode::AllOrNothing, &mut cell, 5, 5, false, 0);
        assert_eq!(cell.score, 100);
        assert!(cell.passed);
    }

    #[test]
    fn fatal_results_change_nothing() {
        for mode in [ScoringMode::Icpc, ScoringMode::AllOrNothing, ScoringMode::Points] {
            let mut cell = TaskScore::default();
            let accepted = apply(mode, &mut cell, 0, 3, true, 7);
            assert!(!accepted);
            assert_eq!(cell, TaskScore::default(), "mode {:?}", mode);
        }
    }

    #[test]
    fn passed_cell_is_frozen() {
        let mut cell = TaskScore { score: 1, attempts: 2, passed: true, penalty: 45 };
        // later wrong submission must not move anything
        apply(ScoringMode::Icpc, &mut cell, 0, 2, false, 50);
        assert_eq!(cell, TaskScore { score: 1, attempts: 2, passed: true, penalty: 45 });

        // later accepted submission must not lower the penalty either
        apply(ScoringMode::Icpc, &mut cell, 2, 2, false, 55);
        assert_eq!(cell, TaskScore { score: 1, attempts: 2, passed: true, penalty: 45 });
    }

    #[test]
    fn icpc_ranking_by_solved_then_penalty() {
        let mut contest = contest_with(ScoringMode::Icpc, 0);
        contest.task_ids = vec![1, 2];

        let mut a = Participant::new("a".into(), "alice".into(), None, &contest.task_ids);
        a.scores.insert(1, TaskScore { score: 1, attempts: 0, passed: true, penalty: 30 });
        a.scores.insert(2, TaskScore { score: 1, attempts: 1, passed: true, penalty: 60 });

        let mut b = Participant::new("b".into(), "bob".into(), None, &contest.task_ids);
        b.scores.insert(1, TaskScore { score: 1, attempts: 0, passed: true, penalty: 10 });

        let mut c = Participant::new("c".into(), "carol".into(), None, &contest.task_ids);
        c.scores.insert(1, TaskScore { score: 1, attempts: 0, passed: true, penalty: 5 });
        c.scores.insert(2, TaskScore { score: 1, attempts: 0, passed: true, penalty: 100 });

        contest.participants.insert("a".into(), a);
        contest.participants.insert("b".into(), b);
        contest.participants.insert("c".into(), c);

        let rows = compute_rows(&contest);
        let order: Vec<&str> = rows.iter().map(|r| r.participant_id.as_str()).collect();
        // a and c both solved 2; a has penalty 90, c has 105
        assert_eq!(order, vec!["a", "c", "b"]);
    }

    #[test]
    fn score_ranking_ties_break_by_id() {
        let mut contest = contest_with(ScoringMode::Points, 0);

        for (pid, score) in [("z", 50), ("y", 50), ("x", 80)] {
            let mut p = Participant::new(pid.into(), pid.into(), None, &contest.task_ids);
            p.scores.insert(1, TaskScore { score, ..Default::default() });
            contest.participants.insert(pid.into(), p);
        }

        let rows = compute_rows(&contest);
        let order: Vec<&str> = rows.iter().map(|r| r.participant_id.as_str()).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    #[test]
    fn frozen_cells_show_frozen_value_as_pending() {
        let mut contest = contest_with(ScoringMode::Icpc, 0);

        let mut a = Participant::new("a".into(), "alice".into(), None, &contest.task_ids);
        a.scores.insert(1, TaskScore { score: 1, attempts: 1, passed: true, penalty: 50 });
        contest.participants.insert("a".into(), a);

        let frozen_scores = HashMap::from([(
            "a".to_string(),
            HashMap::from([(1i64, TaskScore { score: 0, attempts: 1, passed: false, penalty: 0 })]),
        )]);
        contest.freeze = Some(FreezeState {
            freeze_time: 100.0,
            frozen_scores,
            pending: HashSet::from([("a".to_string(), 1i64)]),
        });

        let rows = compute_rows(&contest);
        let cell = &rows[0].scores["1"];
        assert!(cell.pending);
        assert!(!cell.passed);
        assert_eq!(cell.attempts, 1);
        // totals reflect the frozen value, not the hidden solve
        assert_eq!(rows[0].solved_count, 0);
    }

    #[test]
    fn reveal_emits_one_step_per_changed_cell() {
        let frozen = vec![ScoreboardRow {
            participant_id: "a".into(),
            nickname: "alice".into(),
            organization: None,
            scores: BTreeMap::from([(
                "1".to_string(),
                ScoreCell { score: 0, attempts: 1, passed: false, penalty: 0, pending: false },
            )]),
            total_score: 0,
            total_penalty: 0,
            solved_count: 0,
            disqualified: false,
        }];

        let final_rows = vec![ScoreboardRow {
            scores: BTreeMap::from([(
                "1".to_string(),
                ScoreCell { score: 1, attempts: 1, passed: true, penalty: 70, pending: false },
            )]),
            total_score: 1,
            total_penalty: 70,
            solved_count: 1,
            ..frozen[0].clone()
        }];

        let record = |pid: &str, task: i64, ts: f64, id: i64| HistoryRecord {
            id,
            contest_id: "c".into(),
            participant_id: pid.into(),
            task_id: task,
            language: "Python".into(),
            verdict: "Accepted".into(),
            tests_passed: 2,
            total_tests: 2,
            timestamp: ts,
        };

        // two freeze-window submissions for the same cell: one step only
        let steps = reveal_steps(
            &frozen,
            &final_rows,
            &[record("a", 1, 100.0, 1), record("a", 1, 101.0, 2)],
        );
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].participant_id, "a");
        assert_eq!(steps[0].task_id, 1);
        assert!(steps[0].new_score.passed);

        // a cell whose value did not change produces no step
        let steps = reveal_steps(&frozen, &frozen, &[record("a", 1, 100.0, 1)]);
        assert!(steps.is_empty());
    }
}
