use axum::extract::{Extension, Query, State};
use axum::Json;

use crate::dtos::archive::{ArchiveEligibility, ArchiveRequest, ArchiveResponse, ClearArchiveQuery};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;
use crate::store::ClearedCounts;

/// Re-evaluated on every call; listings never carry the flag.
pub async fn archive_eligibility(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(q): Query<ArchiveRequest>,
) -> Result<Json<ArchiveEligibility>, AppError> {
    auth.require_operator("check archive eligibility")?;
    let archivable = state.archive().can_archive(q.entity_kind, q.id).await?;
    Ok(Json(ArchiveEligibility { entity_kind: q.entity_kind, id: q.id, archivable }))
}

pub async fn archive_entity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ArchiveRequest>,
) -> Result<Json<ArchiveResponse>, AppError> {
    auth.require_operator("archive records")?;
    state.archive().archive(req.entity_kind, req.id).await?;
    Ok(Json(ArchiveResponse { entity_kind: req.entity_kind, id: req.id, is_archived: true }))
}

pub async fn clear_archive(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(q): Query<ClearArchiveQuery>,
) -> Result<Json<ClearedCounts>, AppError> {
    auth.require_admin("clear the archive")?;
    Ok(Json(state.archive().clear(q.confirm).await?))
}
