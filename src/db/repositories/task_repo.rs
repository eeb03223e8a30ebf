//! Task and test repository

use crate::{
    db::Store,
    error::AppResult,
    models::{Task, TestCase},
};

/// Strip CRLF so stored test data always uses `\n`
fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Repository for task and test rows
pub struct TaskRepository;

impl TaskRepository {
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        store: &Store,
        title: &str,
        difficulty: &str,
        topic: &str,
        description: &str,
        attachment: Option<&[u8]>,
        file_format: Option<&str>,
        checker_code: Option<&str>,
    ) -> AppResult<Task> {
        let _guard = store.write().await;
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, difficulty, topic, description, attachment, file_format, checker_code)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(difficulty)
        .bind(topic)
        .bind(description)
        .bind(attachment)
        .bind(file_format)
        .bind(checker_code)
        .fetch_one(store.pool())
        .await?;

        Ok(task)
    }

    pub async fn find_by_id(store: &Store, id: i64) -> AppResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(r#"SELECT * FROM tasks WHERE id = ?1"#)
            .bind(id)
            .fetch_optional(store.pool())
            .await?;

        Ok(task)
    }

    pub async fn list(store: &Store) -> AppResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, difficulty, topic, description,
                   NULL AS attachment, file_format, checker_code
            FROM tasks ORDER BY id
            "#,
        )
        .fetch_all(store.pool())
        .await?;

        Ok(tasks)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        store: &Store,
        id: i64,
        title: &str,
        difficulty: &str,
        topic: &str,
        description: &str,
        attachment: Option<&[u8]>,
        file_format: Option<&str>,
        checker_code: Option<&str>,
    ) -> AppResult<Task> {
        let _guard = store.write().await;
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = ?2,
                difficulty = ?3,
                topic = ?4,
                description = ?5,
                attachment = COALESCE(?6, attachment),
                file_format = COALESCE(?7, file_format),
                checker_code = ?8
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(difficulty)
        .bind(topic)
        .bind(description)
        .bind(attachment)
        .bind(file_format)
        .bind(checker_code)
        .fetch_one(store.pool())
        .await?;

        Ok(task)
    }

    /// Delete a task together with its tests
    pub async fn delete(store: &Store, id: i64) -> AppResult<()> {
        let _guard = store.write().await;
        sqlx::query(r#"DELETE FROM tests WHERE task_id = ?1"#)
            .bind(id)
            .execute(store.pool())
            .await?;
        sqlx::query(r#"DELETE FROM tasks WHERE id = ?1"#)
            .bind(id)
            .execute(store.pool())
            .await?;

        Ok(())
    }

    pub async fn add_test(
        store: &Store,
        task_id: i64,
        input: &str,
        expected_output: &str,
        time_limit: f64,
    ) -> AppResult<TestCase> {
        let _guard = store.write().await;
        let test = sqlx::query_as::<_, TestCase>(
            r#"
            INSERT INTO tests (task_id, input, expected_output, time_limit)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(normalize(input))
        .bind(normalize(expected_output))
        .bind(time_limit)
        .fetch_one(store.pool())
        .await?;

        Ok(test)
    }

    /// Tests of a task in their defined order
    pub async fn tests_for_task(store: &Store, task_id: i64) -> AppResult<Vec<TestCase>> {
        let tests = sqlx::query_as::<_, TestCase>(
            r#"SELECT * FROM tests WHERE task_id = ?1 ORDER BY id"#,
        )
        .bind(task_id)
        .fetch_all(store.pool())
        .await?;

        Ok(tests)
    }

    pub async fn update_test(
        store: &Store,
        test_id: i64,
        input: &str,
        expected_output: &str,
        time_limit: f64,
    ) -> AppResult<TestCase> {
        let _guard = store.write().await;
        let test = sqlx::query_as::<_, TestCase>(
            r#"
            UPDATE tests
            SET input = ?2, expected_output = ?3, time_limit = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(test_id)
        .bind(normalize(input))
        .bind(normalize(expected_output))
        .bind(time_limit)
        .fetch_one(store.pool())
        .await?;

        Ok(test)
    }

    pub async fn delete_test(store: &Store, test_id: i64) -> AppResult<()> {
        let _guard = store.write().await;
        sqlx::query(r#"DELETE FROM tests WHERE id = ?1"#)
            .bind(test_id)
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

    #[tokio::test]
    async fn create_and_fetch_task() {
        let (_dir, store) = test_store().await;
        let task = TaskRepository::create(
            &store,
            "Sum",
            "easy",
            "math",
            "Add two numbers",
            None,
            None,
            None,
        )
        .await
        .unwrap();

        let found = TaskRepository::find_by_id(&store, task.id).await.unwrap();
        assert_eq!(found.unwrap().title, "Sum");
    }

    #[tokio::test]
    async fn tests_are_normalized_and_ordered() {
        let (_dir, store) = test_store().await;
        let task = TaskRepository::create(&store, "T", "", "", "", None, None, None)
            .await
            .unwrap();

        TaskRepository::add_test(&store, task.id, "1 2\r\n", "3\r\n", 1.0)
            .await
            .unwrap();
        TaskRepository::add_test(&store, task.id, "5 5", "10", 2.0)
            .await
            .unwrap();

        let tests = TaskRepository::tests_for_task(&store, task.id).await.unwrap();
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].input, "1 2\n");
        assert_eq!(tests[0].expected_output, "3\n");
        assert_eq!(tests[1].time_limit, 2.0);
    }

    #[tokio::test]
    async fn delete_task_removes_tests() {
        let (_dir, store) = test_store().await;
        let task = TaskRepository::create(&store, "T", "", "", "", None, None, None)
            .await
            .unwrap();
        TaskRepository::add_test(&store, task.id, "in", "out", 1.0)
            .await
            .unwrap();

        TaskRepository::delete(&store, task.id).await.unwrap();

        assert!(TaskRepository::find_by_id(&store, task.id).await.unwrap().is_none());
        assert!(TaskRepository::tests_for_task(&store, task.id).await.unwrap().is_empty());
    }
}
