use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::auth::Role;
use crate::dtos::delivery_request::{CreateDeliveryRequest, DeleteQuery, ListQuery, ReplaceItemsRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::delivery_request::{DeliveryRequest, RequestFilter};
use crate::models::status::{EntityKind, RequestStatus};
use crate::state::AppState;

pub async fn create_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateDeliveryRequest>,
) -> Result<(StatusCode, Json<DeliveryRequest>), AppError> {
    let branch_id = match auth.role {
        Role::Branch => auth
            .branch_id
            .ok_or_else(|| AppError::forbidden("Branch account is not linked to a branch"))?,
        Role::Admin => req
            .branch_id
            .ok_or_else(|| AppError::validation("branch_id is required when filing for a branch"))?,
        Role::Warehouse => return Err(AppError::forbidden("Only branch or admin users can create requests")),
    };

    let created = state.requests().create(branch_id, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<DeliveryRequest>>, AppError> {
    let status = q
        .status
        .as_deref()
        .map(|s| s.parse::<RequestStatus>())
        .transpose()
        .map_err(|_| AppError::validation("Unknown request status"))?;
    let branch_id = match auth.role {
        Role::Branch => Some(auth.branch_id.ok_or_else(|| AppError::forbidden("Branch account is not linked to a branch"))?),
        _ => q.branch_id,
    };

    let filter = RequestFilter { archived: q.archived.unwrap_or(false), status, branch_id };
    Ok(Json(state.requests().list(&filter).await?))
}

pub async fn get_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<DeliveryRequest>, AppError> {
    let request = state.requests().get(id).await?;
    auth.ensure_branch_access(request.branch_id)?;
    Ok(Json(request))
}

pub async fn replace_items(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<ReplaceItemsRequest>,
) -> Result<Json<DeliveryRequest>, AppError> {
    let requests = state.requests();
    let current = requests.get(id).await?;
    match auth.role {
        Role::Admin => {}
        Role::Branch => auth.ensure_branch_access(current.branch_id)?,
        Role::Warehouse => return Err(AppError::forbidden("Only the owning branch or an admin can edit items")),
    }
    Ok(Json(requests.replace_items(id, &req.items).await?))
}

pub async fn delete_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Query(q): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    auth.require_operator("delete requests")?;
    if q.override_delivered {
        auth.require_admin("delete delivered records")?;
    }
    state.archive().delete(EntityKind::Request, id, q.override_delivered).await?;
    Ok(StatusCode::NO_CONTENT)
}
