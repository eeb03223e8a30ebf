//! Task response payloads

use serde::Serialize;

use crate::models::Task;

/// Task as shown to participants; the checker stays private
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub difficulty: String,
    pub topic: String,
    pub description: String,
    pub has_attachment: bool,
    pub file_format: Option<String>,
}

impl TaskResponse {
    pub fn from_task(task: &Task, has_attachment: bool) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            difficulty: task.difficulty.clone(),
            topic: task.topic.clone(),
            description: task.description.clone(),
            has_attachment,
            file_format: task.file_format.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub added: usize,
}

/// One test line of a trial run, with full context for the admin
#[derive(Debug, Serialize)]
pub struct TrialDetail {
    pub test_num: usize,
    pub verdict: String,
    pub input: String,
    pub expected: String,
    pub output: String,
    pub error: String,
    pub passed: bool,
}

#[derive(Debug, Serialize)]
pub struct TrialRunResponse {
    pub passed_count: i64,
    pub total_tests: usize,
    pub details: Vec<TrialDetail>,
}
