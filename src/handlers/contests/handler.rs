//! Contest handler implementations

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use validator::Validate;

use crate::{
    db::repositories::{ContestRepository, TaskRepository},
    error::{AppError, AppResult},
    services::{contest_service::HistoryLine, export_service, ContestService},
    state::AppState,
    utils::time,
    ws::ContestEvent,
};

use super::{
    request::{
        CreateContestRequest, FinishEarlyRequest, HistoryQuery, JoinRequest, RosterAddRequest,
        StartTimeRequest, SubmitRequest,
    },
    response::{
        MessageResponse, ModeResponse, RevealResponse, RosterResponse, RosterUploadResponse,
        SubmitResponse,
    },
};

pub async fn create_contest(
    State(state): State<AppState>,
    Json(payload): Json<CreateContestRequest>,
) -> AppResult<(StatusCode, Json<crate::services::contest_service::CreatedContest>)> {
    payload.validate()?;

    let start_time = payload
        .start_time
        .as_deref()
        .map(|s| {
            time::parse_start_time(s)
                .ok_or_else(|| AppError::InvalidInput(format!("bad start time: {}", s)))
        })
        .transpose()?;

    let created = ContestService::create(
        &state,
        &payload.name,
        payload.task_ids,
        payload.duration_minutes,
        &payload.scoring,
        &payload.mode,
        payload.allowed_languages.unwrap_or_default(),
        start_time,
        payload.freeze_minutes,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn join(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    Json(payload): Json<JoinRequest>,
) -> AppResult<Json<crate::services::contest_service::JoinResult>> {
    payload.validate()?;

    let joined = ContestService::join(
        &state,
        &contest_id,
        payload.nickname.trim(),
        payload
            .organization
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty()),
        payload.password,
    )
    .await?;

    Ok(Json(joined))
}

pub async fn get_mode(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> AppResult<Json<ModeResponse>> {
    let mode = state
        .registry()
        .mode_of(&contest_id)
        .ok_or(AppError::ContestNotFound)?;
    Ok(Json(ModeResponse { mode }))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    Json(payload): Json<SubmitRequest>,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    payload.validate()?;

    let queue_size = ContestService::submit(
        &state,
        &contest_id,
        &payload.participant_id,
        payload.task_id,
        &payload.language,
        &payload.code,
    )
    .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            status: "queued",
            queue_size,
        }),
    ))
}

pub async fn finish_early(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    Json(payload): Json<FinishEarlyRequest>,
) -> AppResult<Json<MessageResponse>> {
    payload.validate()?;

    ContestService::finish_early(&state, &contest_id, &payload.participant_id).await?;
    Ok(Json(MessageResponse {
        message: "finished".to_string(),
    }))
}

pub async fn scoreboard(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> AppResult<Json<crate::models::ScoreboardView>> {
    let view = ContestService::scoreboard(&state, &contest_id).await?;
    Ok(Json(view))
}

pub async fn history(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<HistoryLine>>> {
    let lines = ContestService::history(&state, &contest_id, &query.participant_id).await?;
    Ok(Json(lines))
}

// =============================================================================
// Websocket room
// =============================================================================

pub async fn contest_ws(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| room_socket(state, contest_id, socket))
}

/// Pump room events into one websocket. The socket first receives a full
/// snapshot, then every published event until either side disconnects.
async fn room_socket(state: AppState, contest_id: String, mut socket: WebSocket) {
    let mut events = state.broadcaster().subscribe(&contest_id);

    if let Some(view) = state.registry().snapshot(&contest_id, time::now_epoch()) {
        if let Ok(payload) = serde_json::to_string(&ContestEvent::FullStatusUpdate(view)) {
            if socket.send(Message::Text(payload.into())).await.is_err() {
                return;
            }
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(payload) => {
                    if socket.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(contest_id, skipped, "websocket client lagged");
                }
                Err(_) => break,
            },
            incoming = socket.recv() => match incoming {
                // clients only send keepalives; drop anything else
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
}

// =============================================================================
// Organizer operations
// =============================================================================

pub async fn start_contest(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    ContestService::start(&state, &contest_id).await?;
    Ok(Json(MessageResponse {
        message: "started".to_string(),
    }))
}

pub async fn finish_contest(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    ContestService::finish(&state, &contest_id).await?;
    Ok(Json(MessageResponse {
        message: "finished".to_string(),
    }))
}

pub async fn edit_start_time(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    Json(payload): Json<StartTimeRequest>,
) -> AppResult<Json<MessageResponse>> {
    payload.validate()?;

    let start_time = time::parse_start_time(&payload.start_time).ok_or_else(|| {
        AppError::InvalidInput(format!("bad start time: {}", payload.start_time))
    })?;

    ContestService::edit_start_time(&state, &contest_id, start_time).await?;
    Ok(Json(MessageResponse {
        message: "start time updated".to_string(),
    }))
}

pub async fn disqualify(
    State(state): State<AppState>,
    Path((contest_id, participant_id)): Path<(String, String)>,
) -> AppResult<Json<MessageResponse>> {
    ContestService::disqualify(&state, &contest_id, &participant_id).await?;
    Ok(Json(MessageResponse {
        message: "participant disqualified, scores zeroed".to_string(),
    }))
}

pub async fn reveal(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> AppResult<Json<RevealResponse>> {
    let steps = ContestService::reveal(&state, &contest_id).await?;
    Ok(Json(RevealResponse { steps }))
}

// =============================================================================
// Roster
// =============================================================================

pub async fn list_roster(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> AppResult<Json<RosterResponse>> {
    let entries = ContestService::list_roster(&state, &contest_id).await?;
    Ok(Json(RosterResponse { entries }))
}

pub async fn add_roster_entry(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    Json(payload): Json<RosterAddRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    payload.validate()?;

    ContestService::add_roster_entry(
        &state,
        &contest_id,
        payload.nickname.trim(),
        payload.organization.trim(),
        &payload.password,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "participant added".to_string(),
        }),
    ))
}

pub async fn upload_roster(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
    mut multipart: axum::extract::Multipart,
) -> AppResult<Json<RosterUploadResponse>> {
    let mut data = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("bad multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("bad upload: {}", e)))?
                .to_vec();
        }
    }
    if data.is_empty() {
        return Err(AppError::InvalidInput("no file uploaded".to_string()));
    }

    let (added, failed) = ContestService::upload_roster(&state, &contest_id, &data).await?;
    Ok(Json(RosterUploadResponse { added, failed }))
}

pub async fn remove_roster_entry(
    State(state): State<AppState>,
    Path((_, entry_id)): Path<(String, i64)>,
) -> AppResult<StatusCode> {
    ContestService::remove_roster_entry(&state, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Archive and export
// =============================================================================

pub async fn archive_list(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<crate::db::repositories::contest_repo::ContestListEntry>>> {
    let entries = ContestRepository::list_all(state.store()).await?;
    Ok(Json(entries))
}

pub async fn archive_view(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> AppResult<Json<crate::services::contest_service::ArchivedResults>> {
    let results = ContestService::archived_results(&state, &contest_id).await?;
    Ok(Json(results))
}

pub async fn archive_delete(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> AppResult<StatusCode> {
    ContestRepository::delete(state.store(), &contest_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Results rollup as a CSV download
pub async fn export_results(
    State(state): State<AppState>,
    Path(contest_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let results = ContestService::archived_results(&state, &contest_id).await?;

    let mut tasks = Vec::with_capacity(results.task_ids.len());
    for &task_id in &results.task_ids {
        let title = TaskRepository::find_by_id(state.store(), task_id)
            .await?
            .map(|t| t.title)
            .unwrap_or_default();
        tasks.push((task_id, title));
    }

    let csv = export_service::build_results_csv(&results.scoreboard, &tasks, results.scoring)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"results_{}.csv\"", contest_id),
            ),
        ],
        csv,
    ))
}
