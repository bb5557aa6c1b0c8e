// Application state shared across all modules

use reqwest::Client;
use sqlx::SqlitePool;

/// Application state containing the database pool, the shared HTTP client
/// used for provider verification calls, and the session signing secret.
///
/// Everything here is initialized once at startup and injected via an
/// `Extension` layer; no component reads configuration from the environment
/// after boot.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub http: Client,
    pub jwt_secret: String,
}
