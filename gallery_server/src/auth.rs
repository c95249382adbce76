//! Dashboard authorization.
//!
//! Admin and author dashboards authenticate with a bearer JWT in the `Authorization` header, signed with the
//! server's HS256 secret. Token issuance itself (login, password handling, session management) lives in the
//! identity service that fronts the dashboards; this server only validates tokens and enforces scopes.
//!
//! Claims carry a `role` and, for authors, the list of artist ids the account manages. Admins see everything;
//! authors are confined to orders containing their own artists' works.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

const TOKEN_VALIDITY_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Author,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Account identifier, opaque to this server.
    pub sub: String,
    pub role: Role,
    /// The artist ids this account manages. Ignored for admins.
    #[serde(default)]
    pub artist_ids: Vec<i64>,
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(sub: impl Into<String>, role: Role, artist_ids: Vec<i64>) -> Self {
        let exp = (Utc::now() + Duration::hours(TOKEN_VALIDITY_HOURS)).timestamp();
        Self { sub: sub.into(), role, artist_ids, exp }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn owns_artist(&self, artist_id: i64) -> bool {
        self.is_admin() || self.artist_ids.contains(&artist_id)
    }

    pub fn require_admin(&self) -> Result<(), ServerError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServerError::InsufficientPermissions("This endpoint is restricted to admins.".to_string()))
        }
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let issuer = req
        .app_data::<actix_web::web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::InitializeError("TokenIssuer is not configured on the app.".to_string()))?;
    let header = req.headers().get("Authorization").ok_or(AuthError::MissingToken)?;
    let value = header
        .to_str()
        .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a Bearer token.".to_string()))?;
    issuer.decode_token(token)
}

/// Signs and verifies dashboard access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        Self { encoding_key: EncodingKey::from_secret(secret), decoding_key: DecodingKey::from_secret(secret) }
    }

    pub fn issue_token(&self, claims: &JwtClaims) -> Result<String, ServerError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| ServerError::Unspecified(format!("Could not serialize access token. {e}")))
    }

    pub fn decode_token(&self, token: &str) -> Result<JwtClaims, ServerError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &Validation::default()).map_err(|e| {
            debug!("💻️ Token validation failed. {e}");
            AuthError::ValidationError(e.to_string())
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod test {
    use gallery_common::Secret;

    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AuthConfig { jwt_secret: Secret::new("roundtrip-test-secret".to_string()) })
    }

    #[test]
    fn token_roundtrip_preserves_claims() {
        let issuer = issuer();
        let claims = JwtClaims::new("acct_7", Role::Author, vec![2, 5]);
        let token = issuer.issue_token(&claims).unwrap();
        let decoded = issuer.decode_token(&token).unwrap();
        assert_eq!(decoded.sub, "acct_7");
        assert_eq!(decoded.role, Role::Author);
        assert_eq!(decoded.artist_ids, vec![2, 5]);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let issuer = issuer();
        let mut token = issuer.issue_token(&JwtClaims::new("acct_7", Role::Author, vec![])).unwrap();
        token.replace_range(token.len() - 4.., "0000");
        assert!(issuer.decode_token(&token).is_err());
    }

    #[test]
    fn author_scope_checks() {
        let author = JwtClaims::new("acct_1", Role::Author, vec![3]);
        assert!(author.owns_artist(3));
        assert!(!author.owns_artist(4));
        assert!(author.require_admin().is_err());
        let admin = JwtClaims::new("acct_0", Role::Admin, vec![]);
        assert!(admin.owns_artist(4));
        assert!(admin.require_admin().is_ok());
    }
}
