//! Task and test management handlers

mod handler;
pub mod request;
pub mod response;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::{constants::MAX_UPLOAD_SIZE, state::AppState};

/// Routes participants may hit: task statements and attachments
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(handler::get_task))
        .route("/{id}/attachment", get(handler::get_attachment))
}

/// Administrative routes: CRUD, tests, imports, trial runs
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_tasks))
        .route("/", post(handler::create_task))
        .route("/{id}", put(handler::update_task))
        .route("/{id}", delete(handler::delete_task))
        // tests
        .route("/{id}/tests", get(handler::list_tests))
        .route("/{id}/tests", post(handler::add_test))
        .route("/{id}/tests/{test_id}", put(handler::update_test))
        .route("/{id}/tests/{test_id}", delete(handler::delete_test))
        .route("/{id}/tests/import", post(handler::import_tests))
        .route("/{id}/tests/import-archive", post(handler::import_tests_archive))
        // judge arbitrary code against a task outside any contest
        .route("/{id}/run", post(handler::trial_run))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
}
