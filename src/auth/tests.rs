//! Tests for auth module
//!
//! These tests verify core authentication functionality including:
//! - Session token round-trip, wrong-secret and expiry rejection
//! - Provider response normalization (including missing-field rejection)
//! - Find-or-create user resolution against an in-memory store
//! - Username generation format and uniqueness

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::migrations::run_migrations;
    use crate::common::{ApiError, AppState};
    use axum::extract::FromRequestParts;
    use axum::http::{header::AUTHORIZATION, request::Parts, Request};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    // A single connection keeps every query on the same in-memory database.
    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database");
        run_migrations(&pool).await.expect("Migrations failed");
        pool
    }

    fn test_user(id: i64) -> models::User {
        models::User {
            id,
            email: "a@b.com".to_string(),
            name: "Ann".to_string(),
            picture: String::new(),
            username: "user_0a1b2c3d".to_string(),
            provider: "google".to_string(),
            provider_id: "g-123".to_string(),
            last_login: None,
        }
    }

    fn google_identity(email: &str, sub: &str) -> models::VerifiedIdentity {
        models::VerifiedIdentity {
            email: email.to_string(),
            name: "Test User".to_string(),
            picture: "http://img.example/a.png".to_string(),
            provider_id: sub.to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Session tokens
    // ------------------------------------------------------------------

    #[test]
    fn test_token_round_trip() {
        let secret = "test_secret_key";
        let user = test_user(1);

        let token = token::issue_token(&user, secret).expect("Failed to issue token");
        let claims = token::decode_token(&token, secret).expect("Failed to decode token");

        assert_eq!(claims.id, 1);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.provider, "google");
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let user = test_user(1);

        let token = token::issue_token(&user, "test_secret_key").expect("Failed to issue token");
        let result = token::decode_token(&token, "wrong_secret_key");

        assert!(
            result.is_err(),
            "Token validation should fail with wrong secret"
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let secret = "test_secret_key";
        let claims = models::Claims {
            id: 1,
            email: "a@b.com".to_string(),
            provider: "google".to_string(),
            exp: 1_000_000, // 1970, far past any validation leeway
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("Failed to encode token");

        let result = token::decode_token(&token, secret);
        assert!(result.is_err(), "Expired token should be rejected");
    }

    // ------------------------------------------------------------------
    // Provider response normalization
    // ------------------------------------------------------------------

    #[test]
    fn test_google_response_missing_email_is_rejected() {
        let body = serde_json::json!({
            "sub": "g-123",
            "name": "No Email",
        });

        let result = providers::identity_from_google(&body);
        assert!(result.is_err(), "Missing email should be rejected");
    }

    #[test]
    fn test_google_response_normalization() {
        let body = serde_json::json!({
            "email": "ann@x.com",
            "sub": "g-123",
            "name": "Ann",
            "picture": "http://img",
        });

        let identity = providers::identity_from_google(&body).expect("Should normalize");
        assert_eq!(identity.email, "ann@x.com");
        assert_eq!(identity.provider_id, "g-123");
        assert_eq!(identity.name, "Ann");
        assert_eq!(identity.picture, "http://img");
    }

    #[test]
    fn test_google_response_optional_fields_default_empty() {
        let body = serde_json::json!({
            "email": "ann@x.com",
            "sub": "g-123",
        });

        let identity = providers::identity_from_google(&body).expect("Should normalize");
        assert_eq!(identity.name, "");
        assert_eq!(identity.picture, "");
    }

    #[test]
    fn test_facebook_nested_picture_extraction() {
        let body = serde_json::json!({
            "id": "fb1",
            "name": "Ann",
            "email": "ann@x.com",
            "picture": { "data": { "url": "http://img" } },
        });

        let identity = providers::identity_from_facebook(&body).expect("Should normalize");
        assert_eq!(identity.provider_id, "fb1");
        assert_eq!(identity.picture, "http://img");
    }

    #[test]
    fn test_facebook_missing_picture_defaults_empty() {
        let body = serde_json::json!({
            "id": "fb1",
            "name": "Ann",
            "email": "ann@x.com",
        });

        let identity = providers::identity_from_facebook(&body).expect("Should normalize");
        assert_eq!(identity.picture, "");
    }

    #[test]
    fn test_apple_token_payload_decode() {
        // Unsigned compact JWT: the decoder only looks at the payload segment.
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"test"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"email":"ann@x.com","sub":"apple-1"}"#);
        let token = format!("{}.{}.sig", header, payload);

        let identity = providers::decode_apple(&token).expect("Should decode");
        assert_eq!(identity.email, "ann@x.com");
        assert_eq!(identity.provider_id, "apple-1");
        assert_eq!(identity.name, "");
        assert_eq!(identity.picture, "");
    }

    #[test]
    fn test_apple_token_missing_claims_rejected() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"apple-1"}"#);
        let token = format!("{}.{}.sig", header, payload);

        assert!(providers::decode_apple(&token).is_err());
    }

    #[test]
    fn test_apple_garbage_token_rejected() {
        assert!(providers::decode_apple("not-a-jwt").is_err());
        assert!(providers::decode_apple("").is_err());
        assert!(providers::decode_apple("a.%%%.c").is_err());
    }

    // ------------------------------------------------------------------
    // Username generation
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_username_format() {
        let pool = test_pool().await;

        let username = users::generate_unique_username(&pool)
            .await
            .expect("Failed to generate username");

        let suffix = username.strip_prefix("user_").expect("Missing user_ prefix");
        assert_eq!(suffix.len(), 8);
        assert!(
            suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
            "Suffix '{}' is not lowercase hex",
            suffix
        );
    }

    #[tokio::test]
    async fn test_generated_usernames_are_unique() {
        let pool = test_pool().await;
        let mut seen = HashSet::new();

        for i in 0..50 {
            let identity = google_identity(&format!("user{}@x.com", i), &format!("g-{}", i));
            let user = users::upsert_user(&pool, &identity, models::Provider::Google)
                .await
                .expect("Upsert failed");
            assert!(
                seen.insert(user.username.clone()),
                "Duplicate username persisted: {}",
                user.username
            );
        }
    }

    // ------------------------------------------------------------------
    // Identity resolution
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_relogin_is_idempotent() {
        let pool = test_pool().await;
        let identity = google_identity("ann@x.com", "g-1");

        let first = users::upsert_user(&pool, &identity, models::Provider::Google)
            .await
            .expect("First login failed");

        // Second login from a different provider: same row, updated
        // provider/provider_id, untouched id/email/username.
        let second_identity = models::VerifiedIdentity {
            email: "ann@x.com".to_string(),
            name: "Ann Updated".to_string(),
            picture: "http://img2".to_string(),
            provider_id: "fb-9".to_string(),
        };
        let second = users::upsert_user(&pool, &second_identity, models::Provider::Facebook)
            .await
            .expect("Second login failed");

        assert_eq!(second.id, first.id);
        assert_eq!(second.username, first.username);
        assert_eq!(second.email, "ann@x.com");
        assert_eq!(second.name, "Ann Updated");
        assert_eq!(second.picture, "http://img2");
        assert_eq!(second.provider, "facebook");
        assert_eq!(second.provider_id, "fb-9");

        // Still exactly one row for that email
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind("ann@x.com")
            .fetch_one(&pool)
            .await
            .expect("Count failed");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_fresh_facebook_signup_scenario() {
        let pool = test_pool().await;

        // Mocked Graph API response for accessToken "tok1"
        let body = serde_json::json!({
            "id": "fb1",
            "name": "Ann",
            "email": "ann@x.com",
            "picture": { "data": { "url": "http://img" } },
        });
        let identity = providers::identity_from_facebook(&body).expect("Should normalize");

        let user = users::upsert_user(&pool, &identity, models::Provider::Facebook)
            .await
            .expect("Signup failed");

        assert_eq!(user.provider, "facebook");
        assert_eq!(user.provider_id, "fb1");
        assert_eq!(user.name, "Ann");
        assert_eq!(user.picture, "http://img");
        assert!(user.last_login.is_some());

        let suffix = user.username.strip_prefix("user_").expect("Missing prefix");
        assert_eq!(suffix.len(), 8);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        // Issued session token carries the new user's claims
        let token = token::issue_token(&user, "test_secret_key").expect("Failed to issue token");
        let claims = token::decode_token(&token, "test_secret_key").expect("Failed to decode");
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.email, "ann@x.com");
        assert_eq!(claims.provider, "facebook");
    }

    #[tokio::test]
    async fn test_lookup_of_deleted_user_returns_none() {
        let pool = test_pool().await;
        let identity = google_identity("gone@x.com", "g-2");

        let user = users::upsert_user(&pool, &identity, models::Provider::Google)
            .await
            .expect("Signup failed");

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user.id)
            .execute(&pool)
            .await
            .expect("Delete failed");

        let found = users::find_by_id(&pool, user.id).await.expect("Lookup failed");
        assert!(found.is_none());
    }

    // ------------------------------------------------------------------
    // Protected-route gating
    // ------------------------------------------------------------------

    async fn test_state(secret: &str) -> Arc<RwLock<AppState>> {
        Arc::new(RwLock::new(AppState {
            db: test_pool().await,
            http: reqwest::Client::new(),
            jwt_secret: secret.to_string(),
        }))
    }

    fn request_parts(state: &Arc<RwLock<AppState>>, auth_header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/profile");
        if let Some(value) = auth_header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).expect("Failed to build request").into_parts();
        parts.extensions.insert(state.clone());
        parts
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let state = test_state("test_secret_key").await;
        let mut parts = request_parts(&state, None);

        let err = AuthedUser::from_request_parts(&mut parts, &())
            .await
            .expect_err("Request without a token should be rejected");
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_invalid_token_is_forbidden() {
        let state = test_state("test_secret_key").await;
        let mut parts = request_parts(&state, Some("Bearer not.a.jwt"));

        let err = AuthedUser::from_request_parts(&mut parts, &())
            .await
            .expect_err("Garbage token should be rejected");
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_expired_token_is_forbidden() {
        let secret = "test_secret_key";
        let claims = models::Claims {
            id: 7,
            email: "a@b.com".to_string(),
            provider: "google".to_string(),
            exp: 1_000_000,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("Failed to encode token");

        let state = test_state(secret).await;
        let mut parts = request_parts(&state, Some(&format!("Bearer {}", token)));

        let err = AuthedUser::from_request_parts(&mut parts, &())
            .await
            .expect_err("Expired token should be rejected");
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_valid_token_attaches_claims() {
        let secret = "test_secret_key";
        let mut user = test_user(7);
        user.email = "ann@x.com".to_string();
        let token = token::issue_token(&user, secret).expect("Failed to issue token");

        let state = test_state(secret).await;
        let mut parts = request_parts(&state, Some(&format!("Bearer {}", token)));

        let authed = AuthedUser::from_request_parts(&mut parts, &())
            .await
            .expect("Valid token should be accepted");
        assert_eq!(authed.id, 7);
        assert_eq!(authed.email, "ann@x.com");
        assert_eq!(authed.provider, "google");
    }

    // ------------------------------------------------------------------
    // Models
    // ------------------------------------------------------------------

    #[test]
    fn test_provider_names() {
        assert_eq!(models::Provider::Google.as_str(), "google");
        assert_eq!(models::Provider::Facebook.as_str(), "facebook");
        assert_eq!(models::Provider::Apple.as_str(), "apple");
    }

    #[test]
    fn test_login_payload_field_names() {
        let google: models::GoogleLoginPayload =
            serde_json::from_str(r#"{"idToken":"t1"}"#).expect("Should parse");
        assert_eq!(google.id_token, "t1");

        let facebook: models::FacebookLoginPayload =
            serde_json::from_str(r#"{"accessToken":"t2"}"#).expect("Should parse");
        assert_eq!(facebook.access_token, "t2");

        let apple: models::AppleLoginPayload =
            serde_json::from_str(r#"{"idToken":"t3"}"#).expect("Should parse");
        assert_eq!(apple.id_token, "t3");
    }
}
