// src/main.rs
use anyhow::Context;
use axum::{extract::Extension, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod common;

use common::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    // Both are startup-fatal when absent: the service must never run with a
    // default signing secret or an implicit database location.
    let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    let connect_options = SqliteConnectOptions::from_str(&database_url)
        .context("invalid DATABASE_URL")?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await
        .context("failed to connect to database")?;

    common::migrations::run_migrations(&pool)
        .await
        .context("database migration failed")?;

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let http_client = Client::builder().build()?;

    let app_state = AppState {
        db: pool,
        http: http_client,
        jwt_secret,
    };

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(auth::auth_routes())
        .layer(Extension(shared.clone()))
        .layer({
            let cors_origins = std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Auth server listening on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind listen address")?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
