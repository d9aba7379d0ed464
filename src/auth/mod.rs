//! Bearer-token authentication interface.
//!
//! Token issuance, refresh, and credential storage belong to the external
//! auth service; this module only validates HS256 JWTs it issued and exposes
//! the resulting identity to handlers through the [`AuthUser`] extractor.
//! `roles` containing `admin` is the sole authorization predicate for
//! administrator-gated operations.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ServiceError;
use crate::AppState;

pub const ADMIN_ROLE: &str = "admin";

/// Claim structure for JWT tokens issued by the auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated user data extracted from the JWT token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

/// Decodes and validates a bearer token against the configured secret.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ServiceError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        debug!(error = %e, "Token validation failed");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token expired".to_string())
            }
            _ => ServiceError::Unauthorized("Invalid token".to_string()),
        }
    })?;

    Ok(data.claims)
}

/// Signs a token for the given identity. Intended for local development and
/// tests; production tokens come from the auth service.
pub fn mint_token(
    secret: &str,
    user_id: i64,
    name: Option<&str>,
    email: Option<&str>,
    roles: &[&str],
    ttl: Duration,
) -> Result<String, ServiceError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        name: name.map(str::to_string),
        email: email.map(str::to_string),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("token signing failed: {e}")))
}

impl TryFrom<Claims> for AuthUser {
    type Error = ServiceError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".to_string()))?;

        Ok(Self {
            user_id,
            name: claims.name,
            email: claims.email,
            roles: claims.roles,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("No token provided".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::Unauthorized("No token provided".to_string()))?;

        let claims = validate_token(token, &state.config.jwt_secret)?;
        claims.try_into()
    }
}
