//! Reading user and app permissions out of the dashboard token.
//!
//! The bridge never verifies the token; it only reads the claims the
//! dashboard put there so the app can render accordingly. Verification is
//! the backend's job.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::ClaimsError;
use crate::state::User;

/// Extracts session claims from a dashboard token.
///
/// Implementations may fail on malformed input; callers treat a failure as
/// "claims unavailable", not as a protocol violation.
pub trait ClaimsExtractor: Send + Sync + 'static {
    /// The signed-in user's email and permissions.
    fn user(&self, token: &str) -> Result<User, ClaimsError>;

    /// Permissions granted to the app itself.
    fn app_permissions(&self, token: &str) -> Result<Vec<String>, ClaimsError>;
}

/// Default extractor that decodes the payload segment of a JWT.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtClaims;

#[derive(Debug, Deserialize)]
struct DashboardClaims {
    #[serde(default)]
    email: String,
    #[serde(default)]
    user_permissions: Vec<String>,
    #[serde(default)]
    permissions: Vec<String>,
}

impl JwtClaims {
    fn decode(token: &str) -> Result<DashboardClaims, ClaimsError> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ClaimsError::Malformed);
        };
        // Some issuers pad the segment; base64url in JWTs is unpadded.
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl ClaimsExtractor for JwtClaims {
    fn user(&self, token: &str) -> Result<User, ClaimsError> {
        let claims = Self::decode(token)?;
        Ok(User {
            email: claims.email,
            permissions: claims.user_permissions,
        })
    }

    fn app_permissions(&self, token: &str) -> Result<Vec<String>, ClaimsError> {
        Ok(Self::decode(token)?.permissions)
    }
}
