use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dtos::conversion::{CommitConversionRequest, TransitionStatusRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::delivery::Delivery;
use crate::models::status::EntityKind;
use crate::services::conversion::ConversionDraft;
use crate::services::transitions::Transitioned;
use crate::state::AppState;

pub async fn begin_conversion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ConversionDraft>, AppError> {
    auth.require_operator("convert requests")?;
    Ok(Json(state.conversions().begin(id, &auth.operator()).await?))
}

pub async fn commit_conversion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<CommitConversionRequest>,
) -> Result<(StatusCode, Json<Delivery>), AppError> {
    auth.require_operator("convert requests")?;
    let delivery = state.conversions().commit(id, &auth.operator(), req.fields).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

pub async fn abandon_conversion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.conversions().abandon(id, &auth.operator()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn transition_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<TransitionStatusRequest>,
) -> Result<Json<Transitioned>, AppError> {
    match req.entity_kind {
        EntityKind::Request => auth.require_admin("approve or reject requests")?,
        EntityKind::Delivery => auth.require_operator("update deliveries")?,
    }
    let updated = state
        .transitions()
        .transition(req.entity_kind, req.id, &req.new_status, &auth.operator())
        .await?;
    Ok(Json(updated))
}
