//! Administrator authentication middleware

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{error::AppError, services::AuthService, state::AppState};

/// Guard for administrative routes: requires a valid bearer token issued by
/// the login endpoint
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();

    let Some(auth_header) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        debug!(path, "auth failed: no Authorization header");
        return Err(AppError::Unauthorized);
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        debug!(path, "auth failed: expected 'Bearer <token>'");
        return Err(AppError::Unauthorized);
    };

    AuthService::verify_token(token, &state.config().security.secret_key).map_err(|e| {
        debug!(path, "auth failed: token rejected");
        e
    })?;

    Ok(next.run(request).await)
}
