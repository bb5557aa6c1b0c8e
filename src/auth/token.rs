//! Session token issuing and validation

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use tracing::error;

use super::models::{Claims, User};
use crate::common::ApiError;

/// Session tokens are valid for 3 days from issuance
pub const TOKEN_TTL_DAYS: i64 = 3;

/// Mint a signed session token for a resolved user
pub fn issue_token(user: &User, secret: &str) -> Result<String, ApiError> {
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize;
    let claims = Claims {
        id: user.id,
        email: user.email.clone(),
        provider: user.provider.clone(),
        exp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, user_id = user.id, "JWT encoding error");
        ApiError::InternalServer("jwt error".to_string())
    })
}

/// Validate a session token's signature and expiry and return its claims
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data: TokenData<Claims> = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}
