use axum::{Router, routing::{get, put}};
use crate::state::AppState;
use crate::handlers::delivery_request::{
    create_request, list_requests, get_request, replace_items, delete_request,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests", get(list_requests).post(create_request))
        .route("/requests/{id}", get(get_request).delete(delete_request))
        .route("/requests/{id}/items", put(replace_items))
}
