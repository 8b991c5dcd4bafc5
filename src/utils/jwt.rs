// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{authoring::Author, config::Config, error::AppError};

/// Roles allowed to author quizzes.
const AUTHOR_ROLES: [&str; 2] = ["teacher", "admin"];

/// JWT Claims structure.
/// Tokens are issued by the identity provider; this service only verifies them.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// User's role ('student', 'teacher' or 'admin').
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Signs a token for a user. Used by tooling and tests that need a valid bearer token.
pub fn sign_jwt(
    id: i64,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| AppError::AuthenticationRequired)?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        role: role.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Failed to sign token: {:?}", e);
        AppError::AuthenticationRequired
    })
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationRequired)?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects `Claims`
/// into the request extensions. Missing or invalid tokens get 401.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(AppError::AuthenticationRequired),
    };

    let claims = verify_jwt(token, &config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Axum Middleware: Author Authorization.
///
/// Must be used AFTER `auth_middleware`. Only teachers and admins may author quizzes.
pub async fn author_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !AUTHOR_ROLES.contains(&claims.role.as_str()) {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

/// Extracts the acting author from the claims placed by `auth_middleware`.
impl<S> FromRequestParts<S> for Author
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Author::from_claims(parts.extensions.get::<Claims>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_token_round_trips() {
        let token = sign_jwt(12, "teacher", "secret", 60).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "12");
        assert_eq!(claims.role, "teacher");
    }

    #[test]
    fn wrong_secret_requires_authentication() {
        let token = sign_jwt(12, "teacher", "secret", 60).unwrap();
        assert_eq!(
            verify_jwt(&token, "other").unwrap_err(),
            AppError::AuthenticationRequired
        );
    }
}
