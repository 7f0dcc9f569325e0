// src/utils/jwt.rs

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

/// Identity carried by a bearer token.
/// Tokens are minted by the account service; this service only checks them.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Numeric user id, as a string.
    pub sub: String,
    /// 'learner' or 'admin'.
    pub role: String,
    /// Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid subject in token".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

pub const ADMIN_ROLE: &str = "admin";

/// Mints a token valid for `ttl_seconds`. Used by tooling and tests.
pub fn sign_jwt(user_id: i64, role: &str, secret: &str, ttl_seconds: u64) -> Result<String, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_owned(),
        exp: (now.as_secs() + ttl_seconds) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Checks the HS256 signature and expiry of `token`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AppError::AuthError("Invalid token".to_string())
    })
}

/// The token of an `Authorization: Bearer <token>` header.
fn bearer_token(req: &Request<Body>) -> Result<&str, AppError> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))
}

/// Verifies the bearer token and stores its `Claims` in the request
/// extensions. Answers 401 otherwise.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = verify_jwt(bearer_token(&req)?, &config.jwt_secret)?;
    // Reject tokens whose subject is not a user id up front.
    claims.user_id()?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Requires the 'admin' role. Runs inside `auth_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<Claims>() {
        Some(claims) if claims.is_admin() => Ok(next.run(req).await),
        Some(_) => Err(AppError::AccessDenied("Admin role required".to_string())),
        None => Err(AppError::AuthError("Missing credentials".to_string())),
    }
}
