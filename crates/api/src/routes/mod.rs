pub mod auth;
pub mod content_agent;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(content_agent::routes())
        .merge(auth::routes())
        .with_state(state)
}
