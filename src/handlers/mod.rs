//! HTTP request handlers
//!
//! Thin handlers organized by domain. Administrative routers are wrapped in
//! the bearer-token middleware at composition time.

pub mod auth;
pub mod contests;
pub mod health;
pub mod tasks;

use axum::{middleware, Router};

use crate::{middleware::auth::admin_middleware, state::AppState};

/// Create all API routes
pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .nest("/tasks", tasks::admin_routes())
        .nest("/contests", contests::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .nest("/auth", auth::routes())
        .nest("/tasks", tasks::public_routes())
        .nest("/contests", contests::public_routes())
        .merge(admin)
}
