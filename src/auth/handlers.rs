//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::extractors::AuthedUser;
use super::models::{
    AppleLoginPayload, FacebookLoginPayload, GoogleLoginPayload, Provider, User, VerifiedIdentity,
};
use super::{providers, token, users};
use crate::common::{safe_email_log, safe_token_log, ApiError, AppState};

/// GET /
/// Static welcome payload
pub async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to Amibara store" }))
}

/// POST /api/google
/// Authenticates a user via a Google OAuth ID token
///
/// # Request Body
/// ```json
/// {
///   "idToken": "<google id token>"
/// }
/// ```
///
/// # Response
/// ```json
/// {
///   "success": true,
///   "user": { ... },
///   "token": "<session token>"
/// }
/// ```
pub async fn google_login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<GoogleLoginPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("Received Google auth request");
    let state = state_lock.read().await.clone();

    let identity = providers::verify_google(&state.http, &payload.id_token).await?;
    complete_login(&state, identity, Provider::Google).await
}

/// POST /api/facebook
/// Authenticates a user via a Facebook access token
///
/// # Request Body
/// ```json
/// {
///   "accessToken": "<facebook access token>"
/// }
/// ```
pub async fn facebook_login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<FacebookLoginPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("Received Facebook auth request");
    let state = state_lock.read().await.clone();

    let identity = providers::verify_facebook(&state.http, &payload.access_token).await?;
    complete_login(&state, identity, Provider::Facebook).await
}

/// POST /api/apple
/// Authenticates a user via an Apple ID token (locally decoded)
///
/// # Request Body
/// ```json
/// {
///   "idToken": "<apple id token>"
/// }
/// ```
pub async fn apple_login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<AppleLoginPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("Received Apple auth request");
    let state = state_lock.read().await.clone();

    let identity = providers::decode_apple(&payload.id_token)?;
    complete_login(&state, identity, Provider::Apple).await
}

/// Shared tail of every login pipeline: resolve the identity to a local
/// user, mint a session token, shape the response body.
async fn complete_login(
    state: &AppState,
    identity: VerifiedIdentity,
    provider: Provider,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = users::upsert_user(&state.db, &identity, provider).await?;
    let session_token = token::issue_token(&user, &state.jwt_secret)?;

    debug!(
        user_id = user.id,
        token = %safe_token_log(&session_token),
        "Issued session token"
    );

    info!(
        user_id = user.id,
        email = %safe_email_log(&user.email),
        provider = %provider,
        "User authentication successful"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "user": user,
        "token": session_token,
    })))
}

/// GET /api/profile
/// Returns the authenticated user's row, or `null` if it was since deleted
///
/// # Response
/// ```json
/// {
///   "user": { ... }
/// }
/// ```
pub async fn profile(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user: Option<User> = users::find_by_id(&state.db, authed.id)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(serde_json::json!({ "user": user })))
}
