//! Results export
//!
//! Per-contest rollup as a spreadsheet: one row per participant with
//! totals and one column per task. ICPC cells use the classic textual
//! encoding: `+` solved first try, `+k` solved after k wrong attempts,
//! `-k` k wrong attempts without a solve, `.` untouched.

use crate::constants::TASK_LETTERS;
use crate::error::AppResult;
use crate::models::{ScoreboardRow, ScoringMode, TaskScore};

/// Textual ICPC cell for one score
pub fn icpc_cell(score: &TaskScore) -> String {
    if score.passed {
        if score.attempts > 0 {
            format!("+{}", score.attempts)
        } else {
            "+".to_string()
        }
    } else if score.attempts > 0 {
        format!("-{}", score.attempts)
    } else {
        ".".to_string()
    }
}

/// Build the CSV rollup from ranked rows. `tasks` pairs each task id with
/// its title, in contest order.
pub fn build_results_csv(
    rows: &[ScoreboardRow],
    tasks: &[(i64, String)],
    scoring: ScoringMode,
) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Nickname".to_string(), "Organization".to_string(), "Total".to_string()];
    if scoring == ScoringMode::Icpc {
        header.push("Penalty".to_string());
        header.push("Solved".to_string());
    }
    for (i, (task_id, title)) in tasks.iter().enumerate() {
        let letter = TASK_LETTERS.chars().nth(i).unwrap_or('?');
        header.push(format!("Task {} - {} ({})", letter, title, task_id));
    }
    writer
        .write_record(&header)
        .map_err(|e| crate::error::AppError::Internal(e.into()))?;

    for row in rows {
        let mut record = vec![
            row.nickname.clone(),
            row.organization.clone().unwrap_or_default(),
            row.total_score.to_string(),
        ];
        if scoring == ScoringMode::Icpc {
            record.push(row.total_penalty.to_string());
            record.push(row.solved_count.to_string());
        }
        for (task_id, _) in tasks {
            let cell = row.scores.get(&task_id.to_string());
            let text = match scoring {
                ScoringMode::Icpc => cell
                    .map(|c| {
                        icpc_cell(&TaskScore {
                            score: c.score,
                            attempts: c.attempts,
                            passed: c.passed,
                            penalty: c.penalty,
                        })
                    })
                    .unwrap_or_else(|| ".".to_string()),
                _ => cell.map(|c| c.score.to_string()).unwrap_or_else(|| "0".to_string()),
            };
            record.push(text);
        }
        writer
            .write_record(&record)
            .map_err(|e| crate::error::AppError::Internal(e.into()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| crate::error::AppError::Internal(e.into()))?;
    String::from_utf8(bytes).map_err(|e| crate::error::AppError::Internal(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoreCell;
    use std::collections::BTreeMap;

    #[test]
    fn icpc_cell_encoding() {
        let solved_clean = TaskScore { score: 1, attempts: 0, passed: true, penalty: 10 };
        let solved_retry = TaskScore { score: 1, attempts: 3, passed: true, penalty: 90 };
        let failed = TaskScore { score: 0, attempts: 2, passed: false, penalty: 0 };
        let untouched = TaskScore::default();

        assert_eq!(icpc_cell(&solved_clean), "+");
        assert_eq!(icpc_cell(&solved_retry), "+3");
        assert_eq!(icpc_cell(&failed), "-2");
        assert_eq!(icpc_cell(&untouched), ".");
    }

    fn row(nickname: &str, cells: Vec<(i64, ScoreCell)>) -> ScoreboardRow {
        let scores: BTreeMap<String, ScoreCell> = cells
            .into_iter()
            .map(|(id, c)| (id.to_string(), c))
            .collect();
        let total_score = scores.values().map(|c| c.score).sum();
        let total_penalty = scores.values().filter(|c| c.passed).map(|c| c.penalty).sum();
        let solved_count = scores.values().filter(|c| c.passed).count() as i64;
        ScoreboardRow {
            participant_id: nickname.to_string(),
            nickname: nickname.to_string(),
            organization: Some("Org".to_string()),
            scores,
            total_score,
            total_penalty,
            solved_count,
            disqualified: false,
        }
    }

    #[test]
    fn icpc_csv_has_penalty_columns() {
        let rows = vec![row(
            "alice",
            vec![
                (1, ScoreCell { score: 1, attempts: 0, passed: true, penalty: 12, pending: false }),
                (2, ScoreCell { score: 0, attempts: 1, passed: false, penalty: 0, pending: false }),
            ],
        )];
        let tasks = vec![(1, "Sum".to_string()), (2, "Graph".to_string())];

        let csv = build_results_csv(&rows, &tasks, ScoringMode::Icpc).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Nickname,Organization,Total,Penalty,Solved"));
        assert!(header.contains("Task A - Sum (1)"));
        assert!(header.contains("Task B - Graph (2)"));

        let data = lines.next().unwrap();
        assert_eq!(data, "alice,Org,1,12,1,+,-1");
    }

    #[test]
    fn points_csv_shows_numeric_scores() {
        let rows = vec![row(
            "bob",
            vec![(1, ScoreCell { score: 75, attempts: 2, passed: false, penalty: 0, pending: false })],
        )];
        let tasks = vec![(1, "Sum".to_string())];

        let csv = build_results_csv(&rows, &tasks, ScoringMode::Points).unwrap();
        let data = csv.lines().nth(1).unwrap();
        assert_eq!(data, "bob,Org,75,75");
    }
}
