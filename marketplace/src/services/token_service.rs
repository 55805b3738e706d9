// academy/marketplace/src/services/token_service.rs

//! HS256 access tokens and opaque refresh tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::errors::AppError;
use crate::models::{Role, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
  /// User id.
  pub sub: String,
  pub jti: String,
  pub email: String,
  pub name: String,
  pub roles: Vec<Role>,
  pub iat: i64,
  pub exp: i64,
  pub iss: String,
  pub aud: String,
}

impl AccessClaims {
  pub fn user_id(&self) -> Result<i64, AppError> {
    self
      .sub
      .parse()
      .map_err(|_| AppError::Auth("Token subject is not a user id.".to_string()))
  }
}

/// Response body of login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
  pub access_token: String,
  pub refresh_token: String,
  /// Expiry of the refresh token.
  pub expiration: DateTime<Utc>,
}

pub struct TokenService {
  encoding_key: EncodingKey,
  decoding_key: DecodingKey,
  issuer: String,
  audience: String,
  access_ttl: Duration,
  refresh_ttl: Duration,
}

impl TokenService {
  pub fn new(cfg: &JwtConfig) -> Self {
    Self {
      encoding_key: EncodingKey::from_secret(cfg.secret.as_bytes()),
      decoding_key: DecodingKey::from_secret(cfg.secret.as_bytes()),
      issuer: cfg.issuer.clone(),
      audience: cfg.audience.clone(),
      access_ttl: Duration::minutes(cfg.access_token_minutes),
      refresh_ttl: Duration::days(cfg.refresh_token_days),
    }
  }

  #[instrument(name = "token_service::issue_access_token", skip(self, user), fields(user_id = user.id), err(Display))]
  pub fn issue_access_token(&self, user: &User, now: DateTime<Utc>) -> Result<String, AppError> {
    let claims = AccessClaims {
      sub: user.id.to_string(),
      jti: Uuid::new_v4().to_string(),
      email: user.email.clone(),
      name: user.display_name(),
      roles: user.roles.clone(),
      iat: now.timestamp(),
      exp: (now + self.access_ttl).timestamp(),
      iss: self.issuer.clone(),
      aud: self.audience.clone(),
    };
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
  }

  /// A fresh opaque refresh token value.
  pub fn new_refresh_token(&self) -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
  }

  pub fn refresh_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    now + self.refresh_ttl
  }

  fn validation(&self, check_expiry: bool) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[self.issuer.as_str()]);
    validation.set_audience(&[self.audience.as_str()]);
    validation.validate_exp = check_expiry;
    validation.leeway = 0;
    validation
  }

  /// Full validation, expiry included. Every failure is `AppError::Auth`.
  pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
    decode::<AccessClaims>(token, &self.decoding_key, &self.validation(true))
      .map(|data| data.claims)
      .map_err(|e| {
        debug!(error = %e, "Access token rejected.");
        AppError::Auth("Invalid or expired access token.".to_string())
      })
  }

  /// Signature, issuer and audience are checked; expiry is not. Used by the refresh flow.
  pub fn read_expired_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
    decode::<AccessClaims>(token, &self.decoding_key, &self.validation(false))
      .map(|data| data.claims)
      .map_err(|e| {
        debug!(error = %e, "Access token rejected during refresh.");
        AppError::Validation("Invalid access token.".to_string())
      })
  }
}
