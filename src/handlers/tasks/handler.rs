//! Task handler implementations

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    constants::DEFAULT_TEST_TIME_LIMIT,
    db::repositories::TaskRepository,
    error::{AppError, AppResult},
    judge::Verdict,
    models::TestCase,
    services::import_service,
    state::AppState,
};

use super::{
    request::{AddTestRequest, TrialRunRequest},
    response::{ImportResponse, TaskResponse, TrialDetail, TrialRunResponse},
};

/// Task form fields collected from a multipart body
#[derive(Default)]
struct TaskForm {
    title: String,
    difficulty: String,
    topic: String,
    description: String,
    checker_code: String,
    attachment: Option<(Vec<u8>, String)>,
}

async fn read_task_form(mut multipart: Multipart) -> AppResult<TaskForm> {
    let mut form = TaskForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("bad multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "attachment" => {
                let format = field
                    .file_name()
                    .and_then(|f| f.rsplit('.').next())
                    .unwrap_or_default()
                    .to_lowercase();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("bad attachment: {}", e)))?;
                if !data.is_empty() {
                    form.attachment = Some((data.to_vec(), format));
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("bad field {}: {}", name, e)))?;
                match name.as_str() {
                    "title" => form.title = value,
                    "difficulty" => form.difficulty = value,
                    "topic" => form.topic = value,
                    "description" => form.description = value,
                    "checker_code" => form.checker_code = value,
                    _ => {}
                }
            }
        }
    }

    if form.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }

    Ok(form)
}

pub async fn list_tasks(State(state): State<AppState>) -> AppResult<Json<Vec<TaskResponse>>> {
    let tasks = TaskRepository::list(state.store()).await?;
    Ok(Json(
        tasks
            .iter()
            .map(|t| TaskResponse::from_task(t, t.file_format.is_some()))
            .collect(),
    ))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<TaskResponse>> {
    let task = TaskRepository::find_by_id(state.store(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;
    let has_attachment = task.attachment.as_ref().map(|a| !a.is_empty()).unwrap_or(false);
    Ok(Json(TaskResponse::from_task(&task, has_attachment)))
}

pub async fn create_task(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<TaskResponse>)> {
    let form = read_task_form(multipart).await?;

    let task = TaskRepository::create(
        state.store(),
        &form.title,
        &form.difficulty,
        &form.topic,
        &form.description,
        form.attachment.as_ref().map(|(data, _)| data.as_slice()),
        form.attachment.as_ref().map(|(_, format)| format.as_str()),
        Some(form.checker_code.as_str()).filter(|c| !c.trim().is_empty()),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::from_task(&task, form.attachment.is_some())),
    ))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<TaskResponse>> {
    TaskRepository::find_by_id(state.store(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    let form = read_task_form(multipart).await?;
    let task = TaskRepository::update(
        state.store(),
        id,
        &form.title,
        &form.difficulty,
        &form.topic,
        &form.description,
        form.attachment.as_ref().map(|(data, _)| data.as_slice()),
        form.attachment.as_ref().map(|(_, format)| format.as_str()),
        Some(form.checker_code.as_str()).filter(|c| !c.trim().is_empty()),
    )
    .await?;

    Ok(Json(TaskResponse::from_task(&task, task.attachment.is_some())))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    TaskRepository::delete(state.store(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_attachment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let task = TaskRepository::find_by_id(state.store(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    let data = task
        .attachment
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::NotFound("Task has no attachment".to_string()))?;

    let mime = match task.file_format.as_deref() {
        Some("pdf") => "application/pdf",
        Some("html") => "text/html",
        _ => "application/octet-stream",
    };

    Ok(([(header::CONTENT_TYPE, mime.to_string())], data))
}

// =============================================================================
// Tests
// =============================================================================

pub async fn list_tests(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<TestCase>>> {
    let tests = TaskRepository::tests_for_task(state.store(), id).await?;
    Ok(Json(tests))
}

pub async fn add_test(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AddTestRequest>,
) -> AppResult<(StatusCode, Json<TestCase>)> {
    payload.validate()?;

    let test = TaskRepository::add_test(
        state.store(),
        id,
        &payload.input,
        &payload.expected_output,
        payload.time_limit.unwrap_or(DEFAULT_TEST_TIME_LIMIT),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(test)))
}

pub async fn update_test(
    State(state): State<AppState>,
    Path((_, test_id)): Path<(i64, i64)>,
    Json(payload): Json<AddTestRequest>,
) -> AppResult<Json<TestCase>> {
    payload.validate()?;

    let test = TaskRepository::update_test(
        state.store(),
        test_id,
        &payload.input,
        &payload.expected_output,
        payload.time_limit.unwrap_or(DEFAULT_TEST_TIME_LIMIT),
    )
    .await?;

    Ok(Json(test))
}

pub async fn delete_test(
    State(state): State<AppState>,
    Path((_, test_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    TaskRepository::delete_test(state.store(), test_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Shared by the two import endpoints: pulls the uploaded file and the
/// optional default time limit out of the multipart body
async fn read_upload(mut multipart: Multipart) -> AppResult<(Vec<u8>, f64)> {
    let mut data = Vec::new();
    let mut time_limit = DEFAULT_TEST_TIME_LIMIT;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("bad multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("bad upload: {}", e)))?
                    .to_vec();
            }
            "time_limit" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("bad time limit: {}", e)))?;
                time_limit = text
                    .trim()
                    .parse()
                    .map_err(|_| AppError::InvalidInput(format!("bad time limit: {}", text)))?;
            }
            _ => {}
        }
    }

    if data.is_empty() {
        return Err(AppError::InvalidInput("no file uploaded".to_string()));
    }

    Ok((data, time_limit))
}

pub async fn import_tests(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<ImportResponse>> {
    let (data, time_limit) = read_upload(multipart).await?;
    let tests = import_service::parse_tests_csv(&data)?;

    let mut added = 0;
    for test in &tests {
        TaskRepository::add_test(state.store(), id, &test.input, &test.expected_output, time_limit)
            .await?;
        added += 1;
    }

    Ok(Json(ImportResponse { added }))
}

pub async fn import_tests_archive(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<ImportResponse>> {
    let (data, time_limit) = read_upload(multipart).await?;
    let tests = import_service::parse_tests_archive(&data)?;

    let mut added = 0;
    for test in &tests {
        TaskRepository::add_test(state.store(), id, &test.input, &test.expected_output, time_limit)
            .await?;
        added += 1;
    }

    Ok(Json(ImportResponse { added }))
}

// =============================================================================
// Trial run
// =============================================================================

/// Judge arbitrary code against a task's tests, outside any contest. Takes
/// one sandbox slot from the same semaphore as the worker pool.
pub async fn trial_run(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TrialRunRequest>,
) -> AppResult<Json<TrialRunResponse>> {
    payload.validate()?;

    let task = TaskRepository::find_by_id(state.store(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;
    let checker = task.checker_code.filter(|c| !c.trim().is_empty());

    let mut tests = TaskRepository::tests_for_task(state.store(), id).await?;
    if tests.is_empty() {
        if checker.is_some() {
            // smoke run against the checker alone
            tests.push(TestCase {
                id: 0,
                task_id: id,
                input: String::new(),
                expected_output: String::new(),
                time_limit: 2.0,
            });
        } else {
            return Err(AppError::NoTestsDefined);
        }
    }

    let outcome = {
        let _slot = state
            .sandbox_slots()
            .acquire()
            .await
            .map_err(|_| AppError::Sandbox("sandbox slots closed".to_string()))?;
        state
            .sandbox()
            .run(&payload.language, &payload.code, &tests, checker.as_deref())
            .await
    };

    let mut details = Vec::new();
    if let Some(fatal) = &outcome.fatal {
        let error = match fatal {
            crate::judge::FatalError::Compilation(diag) => diag.clone(),
            crate::judge::FatalError::OverallTimeout => "overall time limit exceeded".to_string(),
            crate::judge::FatalError::System(msg) => msg.clone(),
        };
        details.push(TrialDetail {
            test_num: 1,
            verdict: fatal.verdict_str().to_string(),
            input: "(system)".to_string(),
            expected: "-".to_string(),
            output: String::new(),
            error,
            passed: false,
        });
    } else {
        for (i, verdict) in outcome.verdicts.iter().enumerate() {
            let test = &tests[i];
            details.push(TrialDetail {
                test_num: i + 1,
                verdict: verdict.verdict.as_str().to_string(),
                input: test.input.clone(),
                expected: test.expected_output.clone(),
                output: verdict.stdout.clone(),
                error: verdict.stderr.clone(),
                passed: verdict.verdict == Verdict::Accepted,
            });
        }
    }

    Ok(Json(TrialRunResponse {
        passed_count: outcome.passed_count(),
        total_tests: tests.len(),
        details,
    }))
}
