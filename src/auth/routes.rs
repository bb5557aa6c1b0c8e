//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /` - Welcome payload
/// - `POST /api/google` - Google ID token login
/// - `POST /api/facebook` - Facebook access token login
/// - `POST /api/apple` - Apple ID token login
/// - `GET /api/profile` - Current user's profile (requires session token)
pub fn auth_routes() -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/api/google", post(handlers::google_login))
        .route("/api/facebook", post(handlers::facebook_login))
        .route("/api/apple", post(handlers::apple_login))
        .route("/api/profile", get(handlers::profile))
}
