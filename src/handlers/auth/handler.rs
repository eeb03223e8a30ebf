//! Auth handler implementations

use axum::{extract::State, Json};
use validator::Validate;

use crate::{error::AppResult, services::AuthService, state::AppState};

use super::{request::LoginRequest, response::LoginResponse};

/// Exchange the administrator password for a session token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    payload.validate()?;

    let (token, expires_in) = AuthService::login(state.config(), &payload.password)?;

    Ok(Json(LoginResponse { token, expires_in }))
}
