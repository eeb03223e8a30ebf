//! Contest handlers

mod handler;
pub mod request;
pub mod response;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::{constants::MAX_UPLOAD_SIZE, state::AppState};

/// Participant-facing routes
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}/join", post(handler::join))
        .route("/{id}/mode", get(handler::get_mode))
        .route("/{id}/submit", post(handler::submit))
        .route("/{id}/finish-early", post(handler::finish_early))
        .route("/{id}/scoreboard", get(handler::scoreboard))
        .route("/{id}/history", get(handler::history))
        .route("/{id}/ws", get(handler::contest_ws))
}

/// Organizer routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handler::create_contest))
        .route("/{id}/start", post(handler::start_contest))
        .route("/{id}/finish", post(handler::finish_contest))
        .route("/{id}/start-time", post(handler::edit_start_time))
        .route("/{id}/disqualify/{participant_id}", post(handler::disqualify))
        .route("/{id}/reveal", post(handler::reveal))
        // roster (closed mode)
        .route("/{id}/roster", get(handler::list_roster))
        .route("/{id}/roster", post(handler::add_roster_entry))
        .route("/{id}/roster/upload", post(handler::upload_roster))
        .route("/{id}/roster/{entry_id}", delete(handler::remove_roster_entry))
        // archive browser and export
        .route("/archive", get(handler::archive_list))
        .route("/archive/{id}", get(handler::archive_view))
        .route("/archive/{id}", delete(handler::archive_delete))
        .route("/{id}/export", get(handler::export_results))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
}
