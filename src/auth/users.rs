//! User store and identity resolution
//!
//! Find-or-create of local users keyed on email. All queries are
//! parameterized; the insert path is a single conditional upsert so two
//! concurrent first logins for the same email cannot create two rows.

use rand::Rng;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::models::{Provider, User, VerifiedIdentity};
use crate::common::{safe_email_log, ApiError};

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Generate a unique random username of the form `user_` + 8 lowercase hex
/// characters, drawing fresh random bytes until the store reports the
/// candidate free. Only the creation path calls this; existing users keep
/// their username forever.
pub async fn generate_unique_username(pool: &SqlitePool) -> Result<String, sqlx::Error> {
    loop {
        let candidate = format!("user_{:08x}", rand::thread_rng().gen::<u32>());
        if !username_exists(pool, &candidate).await? {
            return Ok(candidate);
        }
        debug!(username = %candidate, "Username collision, retrying");
    }
}

/// Find-or-create the local user for a verified external identity
///
/// A new email gets a fresh row with a generated username; a known email gets
/// its display fields, provider, provider id and last_login updated in place
/// (`id`, `email`, `username` never change). The insert is conditional on the
/// unique email constraint, so a racing first login degrades to an update
/// instead of a duplicate row.
pub async fn upsert_user(
    pool: &SqlitePool,
    identity: &VerifiedIdentity,
    provider: Provider,
) -> Result<User, ApiError> {
    let existing = find_by_email(pool, &identity.email)
        .await
        .map_err(ApiError::DatabaseError)?;

    let user = match existing {
        None => {
            let username = generate_unique_username(pool)
                .await
                .map_err(ApiError::DatabaseError)?;

            let user = sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (email, name, picture, provider, provider_id, last_login, username)
                VALUES (?, ?, ?, ?, ?, datetime('now'), ?)
                ON CONFLICT(email) DO UPDATE SET
                    name = excluded.name,
                    picture = excluded.picture,
                    provider = excluded.provider,
                    provider_id = excluded.provider_id,
                    last_login = excluded.last_login
                RETURNING *
                "#,
            )
            .bind(&identity.email)
            .bind(&identity.name)
            .bind(&identity.picture)
            .bind(provider.as_str())
            .bind(&identity.provider_id)
            .bind(&username)
            .fetch_one(pool)
            .await
            .map_err(ApiError::DatabaseError)?;

            info!(
                user_id = user.id,
                email = %safe_email_log(&user.email),
                provider = %provider,
                "Created new user account"
            );
            user
        }
        Some(existing) => {
            let user = sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET name = ?,
                    picture = ?,
                    provider = ?,
                    provider_id = ?,
                    last_login = datetime('now')
                WHERE email = ?
                RETURNING *
                "#,
            )
            .bind(&identity.name)
            .bind(&identity.picture)
            .bind(provider.as_str())
            .bind(&identity.provider_id)
            .bind(&identity.email)
            .fetch_one(pool)
            .await
            .map_err(ApiError::DatabaseError)?;

            debug!(
                user_id = existing.id,
                provider = %provider,
                "Updated existing user on login"
            );
            user
        }
    };

    Ok(user)
}
