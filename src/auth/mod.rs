/*!
 * Bearer token authentication.
 *
 * Tokens are issued elsewhere; this module only validates HS256 JWTs and
 * turns their claims into an [`AuthUser`] for handlers. Token generation is
 * kept for the seed binary and tests.
 */

use crate::config::AppConfig;
use crate::entities::Role;
use crate::errors::ServiceError;
use crate::services::Actor;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// JWT settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Lifetime of tokens minted by [`AuthService::generate_token`]
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            issuer: None,
            audience: None,
            token_ttl: Duration::hours(1),
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            issuer: cfg.jwt_issuer.clone(),
            audience: cfg.jwt_audience.clone(),
            token_ttl: Duration::hours(1),
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,               // Subject (user ID)
    pub name: Option<String>,      // User's name
    pub email: Option<String>,     // User's email
    pub roles: Vec<String>,        // User's roles
    pub jti: String,               // JWT ID
    pub iat: i64,                  // Issued at time
    pub exp: i64,                  // Expiration time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin.as_str())
    }

    pub fn user_uuid(&self) -> Result<Uuid, ServiceError> {
        Uuid::parse_str(&self.user_id)
            .map_err(|_| ServiceError::Unauthorized("Token subject is not a user id".to_string()))
    }

    /// Most privileged recognised role carried by the token
    pub fn primary_role(&self) -> Option<Role> {
        let known: Vec<Role> = self
            .roles
            .iter()
            .filter_map(|r| Role::from_str(&r.to_ascii_lowercase()).ok())
            .collect();
        [Role::Admin, Role::Manager, Role::Customer]
            .into_iter()
            .find(|role| known.contains(role))
    }

    /// The identity services act on behalf of
    pub fn actor(&self) -> Result<Actor, ServiceError> {
        let user_id = self.user_uuid()?;
        let role = self.primary_role().ok_or_else(|| {
            ServiceError::Forbidden("Token carries no recognised role".to_string())
        })?;
        Ok(Actor::new(user_id, role))
    }
}

/// Validates (and for tooling, mints) bearer tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // A pinned claim must also be present, not merely correct when sent
        let mut required = vec!["exp"];
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }
        if let Some(audience) = &self.config.audience {
            validation.set_audience(&[audience]);
            required.push("aud");
        }
        validation.set_required_spec_claims(&required);
        validation
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &self.validation(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => {
                debug!(error = %e, "rejected bearer token");
                AuthError::InvalidToken
            }
        })
    }

    /// Issues a signed token for a user
    pub fn generate_token(
        &self,
        user_id: Uuid,
        name: Option<String>,
        email: Option<String>,
        roles: &[Role],
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            name,
            email,
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.token_ttl).timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = Arc::<AuthService>::from_ref(state);
        let token = bearer_token(parts).ok_or(AuthError::MissingAuth)?;
        let claims = auth_service.validate_token(token)?;

        Ok(AuthUser {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            roles: claims.roles,
            token_id: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "unit-test-secret-with-enough-entropy-0192";

    #[test]
    fn minted_token_validates() {
        let service = AuthService::new(AuthConfig::new(SECRET));
        let user_id = Uuid::new_v4();
        let token = service
            .generate_token(user_id, Some("Mina".into()), None, &[Role::Manager])
            .unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.roles, vec!["manager".to_string()]);
    }

    #[test]
    fn wrong_secret_and_expired_tokens_are_rejected() {
        let issuer = AuthService::new(AuthConfig::new(SECRET));
        let other = AuthService::new(AuthConfig::new("another-secret-entirely-different-7781"));
        let token = issuer
            .generate_token(Uuid::new_v4(), None, None, &[Role::Customer])
            .unwrap();
        assert_matches!(other.validate_token(&token), Err(AuthError::InvalidToken));

        let mut expired_cfg = AuthConfig::new(SECRET);
        expired_cfg.token_ttl = Duration::hours(-2);
        let expired = AuthService::new(expired_cfg)
            .generate_token(Uuid::new_v4(), None, None, &[Role::Customer])
            .unwrap();
        assert_matches!(issuer.validate_token(&expired), Err(AuthError::TokenExpired));
    }

    #[test]
    fn issuer_is_enforced_when_configured() {
        let mut cfg = AuthConfig::new(SECRET);
        cfg.issuer = Some("bizops".into());
        let strict = AuthService::new(cfg);
        let loose_token = AuthService::new(AuthConfig::new(SECRET))
            .generate_token(Uuid::new_v4(), None, None, &[Role::Admin])
            .unwrap();
        assert_matches!(
            strict.validate_token(&loose_token),
            Err(AuthError::InvalidToken)
        );

        let wrong_issuer = {
            let mut cfg = AuthConfig::new(SECRET);
            cfg.issuer = Some("someone-else".into());
            AuthService::new(cfg)
                .generate_token(Uuid::new_v4(), None, None, &[Role::Admin])
                .unwrap()
        };
        assert_matches!(
            strict.validate_token(&wrong_issuer),
            Err(AuthError::InvalidToken)
        );

        let own_token = strict
            .generate_token(Uuid::new_v4(), None, None, &[Role::Admin])
            .unwrap();
        assert_eq!(
            strict.validate_token(&own_token).unwrap().iss.as_deref(),
            Some("bizops")
        );
    }

    #[test]
    fn audience_is_enforced_when_configured() {
        let mut cfg = AuthConfig::new(SECRET);
        cfg.audience = Some("bizops-web".into());
        let strict = AuthService::new(cfg);

        let without_audience = AuthService::new(AuthConfig::new(SECRET))
            .generate_token(Uuid::new_v4(), None, None, &[Role::Customer])
            .unwrap();
        assert_matches!(
            strict.validate_token(&without_audience),
            Err(AuthError::InvalidToken)
        );

        let with_audience = strict
            .generate_token(Uuid::new_v4(), None, None, &[Role::Customer])
            .unwrap();
        assert!(strict.validate_token(&with_audience).is_ok());
    }

    #[test]
    fn actor_uses_most_privileged_role() {
        let user = AuthUser {
            user_id: Uuid::new_v4().to_string(),
            name: None,
            email: None,
            roles: vec!["customer".into(), "MANAGER".into(), "auditor".into()],
            token_id: "t".into(),
        };
        assert_eq!(user.actor().unwrap().role, Role::Manager);

        let nobody = AuthUser {
            roles: vec!["auditor".into()],
            ..user.clone()
        };
        assert_matches!(nobody.actor(), Err(ServiceError::Forbidden(_)));

        let bad_subject = AuthUser {
            user_id: "not-a-uuid".into(),
            ..user
        };
        assert_matches!(bad_subject.actor(), Err(ServiceError::Unauthorized(_)));
    }
}
