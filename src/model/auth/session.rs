use chrono::{serde::ts_seconds, DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

use super::Role;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::identity::{PrincipalId, SharedStore};

/// An authenticated principal, as derived from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: PrincipalId,
    pub role: Role,
}

/// Session token claims.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "sub")]
    principal: PrincipalId,
    #[serde(rename = "rgt")]
    role: Role,
    #[serde(rename = "iat", with = "ts_seconds")]
    issued_at: DateTime<Utc>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Issues and verifies stateless session tokens.
///
/// Verification depends only on the signature and expiry of the token,
/// except in strict mode, where the principal must also hold a credential in
/// the identity store. That lookup is the only I/O verification performs.
#[derive(Clone)]
pub struct SessionAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    strict: bool,
    store: SharedStore,
}

impl SessionAuthenticator {
    pub fn new(secret: &[u8], ttl: Duration, strict: bool, store: SharedStore) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            strict,
            store,
        }
    }

    pub fn from_config(config: &Config, store: SharedStore) -> Self {
        Self::new(
            config.jwt_secret(),
            config.auth_ttl(),
            config.strict_auth(),
            store,
        )
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Mint a token for `principal` acting as `role`, valid from now.
    pub fn issue(&self, principal: &PrincipalId, role: Role) -> Result<String> {
        self.issue_at(principal, role, Utc::now())
    }

    /// Mint a token as if it had been issued at `issued_at`.
    pub fn issue_at(
        &self,
        principal: &PrincipalId,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        let claims = Claims {
            principal: principal.clone(),
            role,
            issued_at,
            expire_at: issued_at + self.ttl,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Check the signature and expiry of `token` and decode its claims.
    pub fn verify(&self, token: &str) -> Result<AuthContext> {
        let mut validation = Validation::new(Algorithm::HS256);
        // A token is dead the second it expires.
        validation.leeway = 0;
        let claims = jsonwebtoken::decode(token, &self.decoding, &validation)
            .map(|data: TokenData<Claims>| data.claims)
            .map_err(|e| Error::Unauthenticated(format!("Invalid session token: {e}")))?;
        Ok(AuthContext {
            principal: claims.principal,
            role: claims.role,
        })
    }

    /// Verify `token` and, in strict mode, that its principal was actually
    /// enrolled.
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext> {
        let context = self.verify(token)?;
        if self.strict && !self.store.contains(&context.principal).await? {
            return Err(Error::Unauthenticated(format!(
                "Principal {} has no enrolled identity",
                context.principal
            )));
        }
        Ok(context)
    }

    /// Authenticate the value of an `Authorization` header.
    pub async fn authenticate_bearer(&self, header: Option<&str>) -> Result<AuthContext> {
        let token = header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Unauthenticated("Bearer token required".to_string()))?;
        self.authenticate(token).await
    }
}
