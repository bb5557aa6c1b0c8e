//! Provider verifier adapters
//!
//! Each adapter takes the credential a provider hands to the client app,
//! checks it with (or decodes it from) that provider, and normalizes the
//! result into a [`VerifiedIdentity`]. Any failure along the way maps to a
//! 401 via `ApiError::Unauthorized`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use reqwest::Client;
use tracing::{debug, error, warn};

use super::models::VerifiedIdentity;
use crate::common::ApiError;

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const FACEBOOK_GRAPH_URL: &str = "https://graph.facebook.com/me";

/// Verify a Google ID token against Google's tokeninfo endpoint
///
/// Docs: https://developers.google.com/identity/sign-in/web/backend-auth
pub async fn verify_google(http: &Client, id_token: &str) -> Result<VerifiedIdentity, ApiError> {
    let url = format!("{}?id_token={}", GOOGLE_TOKENINFO_URL, id_token);

    let resp = http.get(&url).send().await.map_err(|e| {
        error!(error = %e, "HTTP error contacting Google tokeninfo endpoint");
        ApiError::Unauthorized("Invalid Google ID token".to_string())
    })?;

    let status = resp.status();
    debug!(http_status = %status, "Received response from Google tokeninfo endpoint");

    if !status.is_success() {
        warn!(http_status = %status, "Google rejected ID token");
        return Err(ApiError::Unauthorized("Invalid Google ID token".to_string()));
    }

    let body: serde_json::Value = resp.json().await.map_err(|e| {
        error!(error = %e, "Failed to parse Google tokeninfo response");
        ApiError::Unauthorized("Invalid Google ID token".to_string())
    })?;

    identity_from_google(&body)
}

/// Extract the normalized identity from a Google tokeninfo response body
pub(crate) fn identity_from_google(body: &serde_json::Value) -> Result<VerifiedIdentity, ApiError> {
    let email = body.get("email").and_then(|v| v.as_str());
    let sub = body.get("sub").and_then(|v| v.as_str());

    let (email, sub) = match (email, sub) {
        (Some(email), Some(sub)) => (email, sub),
        _ => {
            warn!(
                has_email = email.is_some(),
                has_sub = sub.is_some(),
                "Google tokeninfo response missing required fields"
            );
            return Err(ApiError::Unauthorized("Invalid Google ID token".to_string()));
        }
    };

    Ok(VerifiedIdentity {
        email: email.to_string(),
        name: body
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        picture: body
            .get("picture")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        provider_id: sub.to_string(),
    })
}

/// Verify a Facebook access token by asking the Graph API who it belongs to
pub async fn verify_facebook(
    http: &Client,
    access_token: &str,
) -> Result<VerifiedIdentity, ApiError> {
    let url = format!(
        "{}?access_token={}&fields=id,name,email,picture",
        FACEBOOK_GRAPH_URL, access_token
    );

    let resp = http.get(&url).send().await.map_err(|e| {
        error!(error = %e, "HTTP error contacting Facebook Graph API");
        ApiError::Unauthorized("Invalid Facebook access token".to_string())
    })?;

    let status = resp.status();
    debug!(http_status = %status, "Received response from Facebook Graph API");

    if !status.is_success() {
        warn!(http_status = %status, "Facebook rejected access token");
        return Err(ApiError::Unauthorized(
            "Invalid Facebook access token".to_string(),
        ));
    }

    let body: serde_json::Value = resp.json().await.map_err(|e| {
        error!(error = %e, "Failed to parse Facebook Graph response");
        ApiError::Unauthorized("Invalid Facebook access token".to_string())
    })?;

    identity_from_facebook(&body)
}

/// Extract the normalized identity from a Facebook Graph `/me` response body
///
/// The avatar sits under `picture.data.url`; accounts without one get the
/// empty string.
pub(crate) fn identity_from_facebook(
    body: &serde_json::Value,
) -> Result<VerifiedIdentity, ApiError> {
    let email = body.get("email").and_then(|v| v.as_str());
    let id = body.get("id").and_then(|v| v.as_str());

    let (email, id) = match (email, id) {
        (Some(email), Some(id)) => (email, id),
        _ => {
            warn!(
                has_email = email.is_some(),
                has_id = id.is_some(),
                "Facebook Graph response missing required fields"
            );
            return Err(ApiError::Unauthorized(
                "Invalid Facebook access token".to_string(),
            ));
        }
    };

    Ok(VerifiedIdentity {
        email: email.to_string(),
        name: body
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        picture: body
            .get("picture")
            .and_then(|p| p.get("data"))
            .and_then(|d| d.get("url"))
            .and_then(|u| u.as_str())
            .unwrap_or_default()
            .to_string(),
        provider_id: id.to_string(),
    })
}

/// Decode an Apple ID token's payload and extract `email` and `sub`
///
/// The signature is NOT checked against Apple's published keys; the claims
/// are trusted as decoded. Apple provides no name or picture here, so both
/// come back empty.
pub fn decode_apple(id_token: &str) -> Result<VerifiedIdentity, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid Apple ID token".to_string());

    let mut segments = id_token.split('.');
    let (_header, payload) = match (segments.next(), segments.next()) {
        (Some(h), Some(p)) if !h.is_empty() && !p.is_empty() => (h, p),
        _ => {
            warn!("Apple ID token is not a compact JWT");
            return Err(invalid());
        }
    };

    let decoded = URL_SAFE_NO_PAD.decode(payload).map_err(|e| {
        warn!(error = %e, "Apple ID token payload is not valid base64url");
        invalid()
    })?;

    let claims: serde_json::Value = serde_json::from_slice(&decoded).map_err(|e| {
        warn!(error = %e, "Apple ID token payload is not valid JSON");
        invalid()
    })?;

    let email = claims.get("email").and_then(|v| v.as_str());
    let sub = claims.get("sub").and_then(|v| v.as_str());

    match (email, sub) {
        (Some(email), Some(sub)) => Ok(VerifiedIdentity {
            email: email.to_string(),
            name: String::new(),
            picture: String::new(),
            provider_id: sub.to_string(),
        }),
        _ => {
            warn!(
                has_email = email.is_some(),
                has_sub = sub.is_some(),
                "Apple ID token payload missing required claims"
            );
            Err(invalid())
        }
    }
}
