use axum::response::{IntoResponse, Response};
use axum::extract::{Request, State};
use axum::middleware::Next;
use crate::auth::{jwt::verify_token, Role};
use crate::error::AppError;
use crate::models::claim::Operator;
use crate::state::AppState;

#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
    pub username: String,
    pub branch_id: Option<i64>,
}

impl AuthContext {
    pub fn operator(&self) -> Operator {
        Operator { id: self.user_id, name: self.username.clone() }
    }

    pub fn require_operator(&self, action: &str) -> Result<(), AppError> {
        if self.role.is_operator() {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("Only admin or warehouse users can {action}")))
        }
    }

    /// Branch users only ever see their own branch's records.
    pub fn ensure_branch_access(&self, branch_id: i64) -> Result<(), AppError> {
        match self.role {
            Role::Branch if self.branch_id != Some(branch_id) => {
                Err(AppError::forbidden("Record belongs to another branch"))
            }
            _ => Ok(()),
        }
    }

    pub fn require_admin(&self, action: &str) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("Only admins can {action}")))
        }
    }
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let auth_header = match req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok()) {
        Some(h) => h,
        None => return unauthorized("Missing Authorization header"),
    };

    // Expect "Bearer <token>"
    let token = match auth_header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return unauthorized("Invalid Authorization format"),
    };

    let claims = match verify_token(token, &state.config.jwt_secret) {
        Ok(c) => c,
        Err(e) => return unauthorized(&e.to_string()),
    };

    let role = match claims.role.parse::<Role>() {
        Ok(r) => r,
        Err(_) => return unauthorized("Unknown role"),
    };

    // Attach context
    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        role,
        username: claims.username,
        branch_id: claims.branch_id,
    });

    next.run(req).await
}

fn unauthorized(msg: &str) -> Response {
    AppError::Unauthorized(msg.to_string()).into_response()
}
