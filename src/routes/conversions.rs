use axum::{Router, routing::post};
use crate::state::AppState;
use crate::handlers::conversion::{
    begin_conversion, commit_conversion, abandon_conversion, transition_status,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests/{id}/conversion/begin", post(begin_conversion))
        .route("/requests/{id}/conversion/commit", post(commit_conversion))
        .route("/requests/{id}/conversion/abandon", post(abandon_conversion))
        .route("/transition-status", post(transition_status))
}
