use axum::{Router, routing::{get, post}};
use crate::state::AppState;
use crate::handlers::claim::{check_claim, acquire_claim, release_claim};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests/{id}/claim", get(check_claim).post(acquire_claim))
        .route("/requests/{id}/claim/release", post(release_claim))
}
