//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::token::decode_token;
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Validates the bearer session token and exposes its claims to the handler.
/// A missing token is a 401; a token that is present but unverifiable or
/// expired is a 403. No database lookup happens here - handlers that need
/// the full user row fetch it themselves.
#[derive(Debug)]
pub struct AuthedUser {
    pub id: i64,
    pub email: String,
    pub provider: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let token = match token {
            Some(t) => t,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized("No token provided".into()));
            }
        };

        // Handle "Bearer <token>" format or raw token
        let bare_token = if let Some(rest) = token.strip_prefix("Bearer ") {
            rest.to_string()
        } else {
            token
        };

        let claims = match decode_token(&bare_token, &app_state.jwt_secret) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Session token validation failed");
                return Err(ApiError::Forbidden("Token invalid or expired".into()));
            }
        };

        debug!(
            user_id = claims.id,
            email = %safe_email_log(&claims.email),
            provider = %claims.provider,
            "Session token accepted"
        );

        Ok(AuthedUser {
            id: claims.id,
            email: claims.email,
            provider: claims.provider,
        })
    }
}
