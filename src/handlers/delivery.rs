use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::auth::Role;
use crate::dtos::delivery::CreateDeliveryRequest;
use crate::dtos::delivery_request::{DeleteQuery, ListQuery};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::delivery::{Delivery, DeliveryFilter};
use crate::models::status::{DeliveryStatus, EntityKind};
use crate::state::AppState;

pub async fn create_delivery(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateDeliveryRequest>,
) -> Result<(StatusCode, Json<Delivery>), AppError> {
    auth.require_operator("create deliveries")?;
    let delivery = state
        .deliveries()
        .create_direct(req.branch_id, req.fields, &auth.operator())
        .await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

pub async fn list_deliveries(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Delivery>>, AppError> {
    let status = q
        .status
        .as_deref()
        .map(|s| s.parse::<DeliveryStatus>())
        .transpose()
        .map_err(|_| AppError::validation("Unknown delivery status"))?;
    let branch_id = match auth.role {
        Role::Branch => Some(auth.branch_id.ok_or_else(|| AppError::forbidden("Branch account is not linked to a branch"))?),
        _ => q.branch_id,
    };

    let filter = DeliveryFilter { archived: q.archived.unwrap_or(false), status, branch_id };
    Ok(Json(state.deliveries().list(&filter).await?))
}

pub async fn get_delivery(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = state.deliveries().get(id).await?;
    auth.ensure_branch_access(delivery.branch_id)?;
    Ok(Json(delivery))
}

pub async fn advance_delivery(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<Delivery>, AppError> {
    auth.require_operator("update deliveries")?;
    Ok(Json(state.transitions().advance_delivery(id, &auth.operator()).await?))
}

pub async fn delete_delivery(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Query(q): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    auth.require_operator("delete deliveries")?;
    if q.override_delivered {
        auth.require_admin("delete delivered records")?;
    }
    state.archive().delete(EntityKind::Delivery, id, q.override_delivered).await?;
    Ok(StatusCode::NO_CONTENT)
}
