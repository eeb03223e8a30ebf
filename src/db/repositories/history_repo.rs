//! Submission history repository

use std::collections::HashMap;

use sqlx::Row;

use crate::{db::Store, error::AppResult, models::HistoryRecord};

/// Repository for the append-only history table
pub struct HistoryRepository;

impl HistoryRepository {
    /// Append one judged submission; returns the insertion id
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        store: &Store,
        contest_id: &str,
        participant_id: &str,
        task_id: i64,
        language: &str,
        verdict: &str,
        tests_passed: i64,
        total_tests: i64,
        timestamp: f64,
    ) -> AppResult<i64> {
        let _guard = store.write().await;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO contest_history
                (contest_id, participant_id, task_id, language, verdict, tests_passed, total_tests, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id
            "#,
        )
        .bind(contest_id)
        .bind(participant_id)
        .bind(task_id)
        .bind(language)
        .bind(verdict)
        .bind(tests_passed)
        .bind(total_tests)
        .bind(timestamp)
        .fetch_one(store.pool())
        .await?;

        Ok(id)
    }

    /// Earliest Accepted participant per task. Insertion id breaks ties, so
    /// the winner is well defined even within one millisecond.
    pub async fn first_solvers(store: &Store, contest_id: &str) -> AppResult<HashMap<i64, String>> {
        let rows = sqlx::query(
            r#"
            SELECT task_id, participant_id FROM contest_history
            WHERE contest_id = ?1 AND verdict = 'Accepted'
              AND id IN (
                SELECT MIN(id) FROM contest_history
                WHERE contest_id = ?1 AND verdict = 'Accepted'
                GROUP BY task_id
              )
            "#,
        )
        .bind(contest_id)
        .fetch_all(store.pool())
        .await?;

        let mut solvers = HashMap::new();
        for row in rows {
            solvers.insert(row.try_get("task_id")?, row.try_get("participant_id")?);
        }

        Ok(solvers)
    }

    /// One participant's rows, newest first
    pub async fn for_participant(
        store: &Store,
        contest_id: &str,
        participant_id: &str,
    ) -> AppResult<Vec<HistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRecord>(
            r#"
            SELECT * FROM contest_history
            WHERE contest_id = ?1 AND participant_id = ?2
            ORDER BY id DESC
            "#,
        )
        .bind(contest_id)
        .bind(participant_id)
        .fetch_all(store.pool())
        .await?;

        Ok(rows)
    }

    /// Timestamp of the oldest row for a contest, used to infer a lost
    /// start time on recovery
    pub async fn earliest_timestamp(store: &Store, contest_id: &str) -> AppResult<Option<f64>> {
        let ts: Option<f64> = sqlx::query_scalar(
            r#"SELECT MIN(timestamp) FROM contest_history WHERE contest_id = ?1"#,
        )
        .bind(contest_id)
        .fetch_one(store.pool())
        .await?;

        Ok(ts)
    }

    /// Rows after a point in time in replay order `(timestamp, id)`, for the
    /// reveal stream
    pub async fn after(
        store: &Store,
        contest_id: &str,
        after_ts: f64,
    ) -> AppResult<Vec<HistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRecord>(
            r#"
            SELECT * FROM contest_history
            WHERE contest_id = ?1 AND timestamp > ?2
            ORDER BY timestamp, id
            "#,
        )
        .bind(contest_id)
        .bind(after_ts)
        .fetch_all(store.pool())
        .await?;

        Ok(rows)
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

    #[tokio::test]
    async fn first_solver_is_earliest_accepted() {
        let (_dir, store) = test_store().await;

        HistoryRepository::append(&store, "c", "bob", 1, "Python", "Wrong Answer", 1, 2, 100.0)
            .await
            .unwrap();
        HistoryRepository::append(&store, "c", "bob", 1, "Python", "Accepted", 2, 2, 200.0)
            .await
            .unwrap();
        HistoryRepository::append(&store, "c", "alice", 1, "Python", "Accepted", 2, 2, 300.0)
            .await
            .unwrap();
        HistoryRepository::append(&store, "c", "alice", 2, "C++", "Accepted", 1, 1, 150.0)
            .await
            .unwrap();

        let solvers = HistoryRepository::first_solvers(&store, "c").await.unwrap();
        assert_eq!(solvers[&1], "bob");
        assert_eq!(solvers[&2], "alice");
        // unsolved tasks have no entry
        assert!(!solvers.contains_key(&3));
    }

    #[tokio::test]
    async fn same_instant_ties_break_by_insertion_id() {
        let (_dir, store) = test_store().await;

        HistoryRepository::append(&store, "c", "first", 1, "Python", "Accepted", 1, 1, 500.0)
            .await
            .unwrap();
        HistoryRepository::append(&store, "c", "second", 1, "Python", "Accepted", 1, 1, 500.0)
            .await
            .unwrap();

        let solvers = HistoryRepository::first_solvers(&store, "c").await.unwrap();
        assert_eq!(solvers[&1], "first");
    }

    #[tokio::test]
    async fn after_orders_by_timestamp_then_id() {
        let (_dir, store) = test_store().await;

        HistoryRepository::append(&store, "c", "a", 1, "Python", "Accepted", 1, 1, 100.0)
            .await
            .unwrap();
        HistoryRepository::append(&store, "c", "b", 2, "Python", "Accepted", 1, 1, 300.0)
            .await
            .unwrap();
        HistoryRepository::append(&store, "c", "d", 1, "Python", "Wrong Answer", 0, 1, 300.0)
            .await
            .unwrap();
        HistoryRepository::append(&store, "c", "e", 1, "Python", "Accepted", 1, 1, 200.0)
            .await
            .unwrap();

        let rows = HistoryRepository::after(&store, "c", 150.0).await.unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r.participant_id.as_str()).collect();
        assert_eq!(order, vec!["e", "b", "d"]);
    }
}
