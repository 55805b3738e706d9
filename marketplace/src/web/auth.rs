// academy/marketplace/src/web/auth.rs

//! Bearer-token identity for handlers.

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::errors::AppError;
use crate::models::Role;
use crate::state::AppState;

/// The caller, as proven by a valid access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user_id: i64,
  pub email: String,
  pub name: String,
  pub roles: Vec<Role>,
}

impl AuthenticatedUser {
  pub fn has_role(&self, role: Role) -> bool {
    self.roles.contains(&role)
  }

  pub fn require_role(&self, role: Role) -> Result<(), AppError> {
    if self.has_role(role) {
      Ok(())
    } else {
      Err(AppError::Forbidden(format!("The {} role is required.", role.as_str())))
    }
  }

  fn from_request_parts(req: &HttpRequest) -> Result<Self, AppError> {
    let state = req
      .app_data::<web::Data<AppState>>()
      .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;

    let token = req
      .headers()
      .get(header::AUTHORIZATION)
      .and_then(|value| value.to_str().ok())
      .and_then(|value| {
        value
          .strip_prefix("Bearer ")
          .or_else(|| value.strip_prefix("bearer "))
      })
      .map(str::trim)
      .filter(|token| !token.is_empty())
      .ok_or_else(|| AppError::Auth("A bearer token is required.".to_string()))?;

    let claims = state.tokens.validate_access_token(token)?;
    Ok(Self {
      user_id: claims.user_id()?,
      email: claims.email,
      name: claims.name,
      roles: claims.roles,
    })
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(Self::from_request_parts(req))
  }
}
