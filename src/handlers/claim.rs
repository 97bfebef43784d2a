use axum::extract::{Extension, Path, State};
use axum::Json;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::claim::ClaimStatus;
use crate::state::AppState;

pub async fn check_claim(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ClaimStatus>, AppError> {
    let request = state.requests().get(id).await?;
    auth.ensure_branch_access(request.branch_id)?;
    Ok(Json(state.claims().check(id).await?))
}

pub async fn acquire_claim(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ClaimStatus>, AppError> {
    auth.require_operator("claim requests")?;
    Ok(Json(state.claims().acquire(id, &auth.operator()).await?))
}

/// Returns the claim as it stands afterwards; releasing a claim held by
/// someone else leaves it untouched.
pub async fn release_claim(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ClaimStatus>, AppError> {
    let claims = state.claims();
    claims.release(id, auth.user_id).await?;
    Ok(Json(claims.check(id).await?))
}
