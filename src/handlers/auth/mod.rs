//! Administrator authentication handlers

mod handler;
pub mod request;
pub mod response;

use axum::{routing::post, Router};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/login", post(handler::login))
}
