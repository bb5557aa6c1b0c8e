//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Session token claims
///
/// `exp` is seconds since the epoch; tokens expire 3 days after issuance.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    pub provider: String,
    pub exp: usize,
}

/// User database model
///
/// One row per email. `username` is assigned on first login and immutable;
/// `provider`/`provider_id` track whichever provider was used last.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub picture: String,
    pub username: String,
    pub provider: String,
    pub provider_id: String,
    pub last_login: Option<String>,
}

/// Supported social login providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Facebook,
    Apple,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
            Provider::Apple => "apple",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized output of a provider verifier: the fields the identity
/// resolver needs, regardless of which provider supplied them.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: String,
    pub picture: String,
    pub provider_id: String,
}

/// Google login request body
#[derive(Deserialize)]
pub struct GoogleLoginPayload {
    #[serde(rename = "idToken")]
    pub id_token: String,
}

/// Facebook login request body
#[derive(Deserialize)]
pub struct FacebookLoginPayload {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// Apple login request body
#[derive(Deserialize)]
pub struct AppleLoginPayload {
    #[serde(rename = "idToken")]
    pub id_token: String,
}
