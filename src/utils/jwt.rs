// src/utils/jwt.rs

//! Bearer-token authentication.
//!
//! Tokens are minted by the school's identity service with the shared
//! `JWT_SECRET`; this crate only verifies them. [`sign_jwt`] issues tokens
//! with the same claims for local tooling and the HTTP tests.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    /// Reads every student's quizzes and stats.
    Admin,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Student id every quiz, submission and chat message is keyed by.
    pub sub: String,
    pub role: Role,
    /// Unix timestamp.
    pub exp: usize,
}

pub fn sign_jwt(
    student_id: &str,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs();

    let claims = Claims {
        sub: student_id.to_owned(),
        role,
        exp: (now + expiration_seconds) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Decodes a token. Expired tokens, foreign signatures, unknown roles and
/// blank student ids are all rejected as `AuthError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::AuthError("Invalid token".to_string())
    })?
    .claims;

    if claims.sub.trim().is_empty() {
        return Err(AppError::AuthError("Token has no student id".to_string()));
    }
    Ok(claims)
}

/// Puts the caller's `Claims` into the request extensions, or answers 401.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    let claims = verify_jwt(token, &config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Layered inside `auth_middleware`. Only admins get through.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::AuthError("Missing credentials".to_string()))?;

    if claims.role != Role::Admin {
        tracing::info!("Student {} tried an admin route", claims.sub);
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let token = sign_jwt("student_demo", Role::Student, "secret", 60).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "student_demo");
        assert_eq!(claims.role, Role::Student);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign_jwt("student_demo", Role::Student, "secret", 60).unwrap();
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn test_blank_student_id_rejected() {
        let token = sign_jwt("  ", Role::Student, "secret", 60).unwrap();
        assert!(matches!(
            verify_jwt(&token, "secret"),
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let claims = serde_json::json!({"sub": "s1", "role": "teacher", "exp": 4_102_444_800u64});
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(
            verify_jwt(&token, "secret"),
            Err(AppError::AuthError(_))
        ));
    }
}
