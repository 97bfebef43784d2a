use axum::{Router, routing::{get, post}};
use crate::state::AppState;
use crate::handlers::archive::{archive_eligibility, archive_entity, clear_archive};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/archive", post(archive_entity).delete(clear_archive))
        .route("/archive/eligibility", get(archive_eligibility))
}
