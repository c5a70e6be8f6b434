//! JWT authentication extractor
//!
//! `AuthUser` validates the bearer token on each request and hands handlers
//! the principal the authentication provider vouched for.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};

use crate::domain::{Requester, Role, StringUuid};
use crate::error::AppError;
use crate::jwt::PortalClaims;
use crate::service::Viewer;
use crate::state::HasServices;

/// Authenticated principal extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    /// Principal ID from the token's `sub` claim
    pub user_id: StringUuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub manager_level: Option<String>,
}

impl AuthUser {
    pub fn from_claims(claims: PortalClaims) -> Result<Self, AuthError> {
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidToken("Invalid user ID in token".to_string()))?;

        Ok(Self {
            user_id,
            email: claims.email,
            name: claims.name,
            role: claims.role,
            manager_level: claims.manager_level,
        })
    }

    pub fn is_it_admin(&self) -> bool {
        self.role == Role::ItAdmin
    }

    pub fn as_requester(&self) -> Requester {
        Requester {
            id: self.user_id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    pub fn as_viewer(&self) -> Viewer {
        Viewer {
            id: self.user_id,
            sees_all: self.is_it_admin(),
        }
    }
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header present
    MissingToken,
    /// Invalid Authorization header format
    InvalidHeader(String),
    /// Token validation failed
    InvalidToken(String),
    /// Token has expired
    TokenExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Missing authorization token",
            AuthError::InvalidHeader(_) => "Invalid authorization header",
            AuthError::InvalidToken(_) => "Invalid token",
            AuthError::TokenExpired => "Token has expired",
        };

        AppError::Unauthorized(message.to_string()).into_response()
    }
}

/// Extract the Bearer token from the Authorization header
fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader("Invalid header encoding".to_string()))?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AuthError::InvalidHeader("Authorization header must use Bearer scheme".to_string())
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: HasServices + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;

        match state.jwt_manager().verify_token(token) {
            Ok(claims) => AuthUser::from_claims(claims),
            Err(AppError::Jwt(e)) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                Err(AuthError::TokenExpired)
            }
            Err(e) => Err(AuthError::InvalidToken(e.to_string())),
        }
    }
}
