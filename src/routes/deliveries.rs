use axum::{Router, routing::{get, post}};
use crate::state::AppState;
use crate::handlers::delivery::{
    create_delivery, list_deliveries, get_delivery, advance_delivery, delete_delivery,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/deliveries", get(list_deliveries).post(create_delivery))
        .route("/deliveries/{id}", get(get_delivery).delete(delete_delivery))
        .route("/deliveries/{id}/advance", post(advance_delivery))
}
