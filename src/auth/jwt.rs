use chrono::{Utc, Duration};
use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Serialize, Deserialize};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
}

pub fn sign_token(
    user_id: i64,
    role: &str,
    username: &str,
    branch_id: Option<i64>,
    secret: &str,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(8);
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
        username: username.to_string(),
        branch_id,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("Token signing failed: {e}")))
}

/// Checks signature and expiry. Any failure is an authentication failure.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| AppError::Unauthorized(format!("Invalid or expired token: {e}")))?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_token_verifies_with_same_secret_only() {
        let token = sign_token(42, "warehouse", "wes", None, "s3cret").unwrap();
        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "warehouse");
        assert_eq!(claims.branch_id, None);

        assert!(matches!(verify_token(&token, "other"), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn branch_id_survives_the_round_trip() {
        let token = sign_token(7, "branch", "bea", Some(3), "s3cret").unwrap();
        assert_eq!(verify_token(&token, "s3cret").unwrap().branch_id, Some(3));
    }
}
