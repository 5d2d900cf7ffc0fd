/*!
 * # Authentication and Authorization Module
 *
 * Authentication is delegated to an external identity provider; this module
 * validates the JWT bearer tokens it issues and bridges provider identities
 * to local user rows. Authorization is role-based: roles and their
 * permissions are seeded by migration and loaded once at startup into an
 * immutable catalog consulted by the guard.
 */

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::errors::ServiceError;

mod guard;
mod identity;
mod roles;

pub use guard::*;
pub use identity::*;
pub use roles::*;

/// Claims carried by provider-issued access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Identity extracted from a validated bearer token. This is the provider's
/// view of the caller; the local user row is resolved lazily by the bridge.
#[derive(Debug, Clone)]
pub struct Principal {
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            external_id: claims.sub,
            email: claims.email,
            first_name: claims.given_name,
            last_name: claims.family_name,
        }
    }
}

/// Token verifier shared through application state.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl TokenVerifier {
    /// Issuer and audience checks apply only when configured; the provider
    /// decides which claims it stamps.
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        // An unset audience is simply not checked.
        if let Some(audience) = audience {
            validation.set_audience(&[audience]);
        }
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Principal, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("Token validation failed: {}", e);
                ServiceError::Unauthenticated("Invalid or expired token".to_string())
            })?;
        Ok(data.claims.into())
    }
}

/// Middleware that validates the bearer token and stores the Principal in
/// request extensions. Requests without a valid token are rejected here;
/// per-route authorization happens in the handlers via the guard.
pub async fn auth_middleware(
    State(state): State<crate::AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthenticated("Missing bearer token".to_string()))?;

    let principal = state.token_verifier.verify(token)?;
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
