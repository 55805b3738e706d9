// academy/marketplace/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
  pub secret: String,
  pub issuer: String,
  pub audience: String,
  pub access_token_minutes: i64,
  pub refresh_token_days: i64,
}

#[derive(Debug, Clone)]
pub struct EventRetryConfig {
  pub limit: u32,
  pub initial: Duration,
  pub increment: Duration,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs on the in-memory stores.
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub apply_schema: bool,
  pub seed_db: bool,
  /// `None` runs on the in-memory cache.
  pub redis_url: Option<String>,
  pub course_cache_ttl: Duration,
  pub jwt: JwtConfig,
  pub order_cancel_delay: Duration,
  pub event_retry: EventRetryConfig,
  pub log_format: LogFormat,
}

// Hand-written so the JWT secret and connection strings never reach the logs.
impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database", &self.database_url.as_ref().map(|_| "[REDACTED]"))
      .field("redis", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
      .field("course_cache_ttl", &self.course_cache_ttl)
      .field("jwt_issuer", &self.jwt.issuer)
      .field("order_cancel_delay", &self.order_cancel_delay)
      .field("event_retry", &self.event_retry)
      .field("log_format", &self.log_format)
      .finish()
  }
}

fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(value) => value
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, value, e))),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
  }

  /// Builds the configuration from any variable source. `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = parse_var("SERVER_PORT", lookup("SERVER_PORT"), 8080u16)?;
    let database_url = lookup("DATABASE_URL");
    let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", lookup("DATABASE_MAX_CONNECTIONS"), 10u32)?;
    let apply_schema = parse_var("APPLY_SCHEMA", lookup("APPLY_SCHEMA"), false)?;
    let seed_db = parse_var("SEED_DB", lookup("SEED_DB"), false)?;
    let redis_url = lookup("REDIS_URL");
    let course_cache_ttl = Duration::from_secs(parse_var("COURSE_CACHE_TTL_SECS", lookup("COURSE_CACHE_TTL_SECS"), 1800u64)?);

    let secret = get_env("JWT_SECRET")?;
    if secret.len() < 32 {
      return Err(AppError::Config("JWT_SECRET must be at least 32 bytes long".to_string()));
    }
    let jwt = JwtConfig {
      secret,
      issuer: get_env("JWT_ISSUER").unwrap_or_else(|_| "academy-market".to_string()),
      audience: get_env("JWT_AUDIENCE").unwrap_or_else(|_| "academy-market-clients".to_string()),
      access_token_minutes: parse_var(
        "JWT_ACCESS_TOKEN_EXPIRATION_MINUTES",
        lookup("JWT_ACCESS_TOKEN_EXPIRATION_MINUTES"),
        15i64,
      )?,
      refresh_token_days: parse_var(
        "JWT_REFRESH_TOKEN_EXPIRATION_DAYS",
        lookup("JWT_REFRESH_TOKEN_EXPIRATION_DAYS"),
        7i64,
      )?,
    };
    if jwt.access_token_minutes <= 0 || jwt.refresh_token_days <= 0 {
      return Err(AppError::Config("Token lifetimes must be positive".to_string()));
    }

    let order_cancel_delay = Duration::from_secs(parse_var(
      "ORDER_CANCEL_DELAY_SECS",
      lookup("ORDER_CANCEL_DELAY_SECS"),
      300u64,
    )?);

    let event_retry = EventRetryConfig {
      limit: parse_var("EVENT_RETRY_LIMIT", lookup("EVENT_RETRY_LIMIT"), 3u32)?,
      initial: Duration::from_millis(parse_var("EVENT_RETRY_INITIAL_MS", lookup("EVENT_RETRY_INITIAL_MS"), 1000u64)?),
      increment: Duration::from_millis(parse_var(
        "EVENT_RETRY_INCREMENT_MS",
        lookup("EVENT_RETRY_INCREMENT_MS"),
        2000u64,
      )?),
    };
    if event_retry.limit == 0 {
      return Err(AppError::Config("EVENT_RETRY_LIMIT must be at least 1".to_string()));
    }

    let log_format = match lookup("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
      None | Some("text") => LogFormat::Text,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT value '{}'", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      apply_schema,
      seed_db,
      redis_url,
      course_cache_ttl,
      jwt,
      order_cancel_delay,
      event_retry,
      log_format,
    })
  }
}
