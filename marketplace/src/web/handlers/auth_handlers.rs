// academy/marketplace/src/web/handlers/auth_handlers.rs

use academy_flow::ContextData;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::expect_completed;
use crate::errors::AppError;
use crate::pipelines::contexts::{LoginCtxData, RefreshCtxData, RegisterCtxData};
use crate::services::auth_service;
use crate::services::validation::{check_new_password, FieldErrors};
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
  pub email: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
}

#[derive(Deserialize)]
pub struct LoginPayload {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
  pub access_token: String,
  pub refresh_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordPayload {
  pub current_password: String,
  pub new_password: String,
}

#[instrument(name = "handler::register", skip(app_state, payload), fields(email = %payload.email))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
  let RegisterPayload {
    email,
    password,
    first_name,
    last_name,
  } = payload.into_inner();
  let ctx = ContextData::new(RegisterCtxData::new(
    app_state.get_ref().clone(),
    email,
    password,
    first_name,
    last_name,
  ));

  let result = app_state.flows.run(ctx.clone()).await?;
  expect_completed(result, "Registration")?;

  let user_id = ctx
    .read()
    .created_user
    .as_ref()
    .map(|u| u.id)
    .ok_or_else(|| AppError::Internal("Registration completed without a user.".to_string()))?;
  Ok(HttpResponse::Created().json(json!({
    "message": "User registered successfully.",
    "userId": user_id,
  })))
}

#[instrument(name = "handler::login", skip(app_state, payload), fields(email = %payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  let LoginPayload { email, password } = payload.into_inner();
  let ctx = ContextData::new(LoginCtxData::new(app_state.get_ref().clone(), email, password));

  let result = app_state.flows.run(ctx.clone()).await?;
  expect_completed(result, "Login")?;

  let tokens = ctx
    .read()
    .tokens
    .clone()
    .ok_or_else(|| AppError::Internal("Login completed without tokens.".to_string()))?;
  Ok(HttpResponse::Ok().json(tokens))
}

#[instrument(name = "handler::refresh_token", skip(app_state, payload))]
pub async fn refresh_token_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RefreshPayload>,
) -> Result<HttpResponse, AppError> {
  let RefreshPayload {
    access_token,
    refresh_token,
  } = payload.into_inner();
  let ctx = ContextData::new(RefreshCtxData::new(app_state.get_ref().clone(), access_token, refresh_token));

  let result = app_state.flows.run(ctx.clone()).await?;
  expect_completed(result, "Token refresh")?;

  let tokens = ctx
    .read()
    .tokens
    .clone()
    .ok_or_else(|| AppError::Internal("Refresh completed without tokens.".to_string()))?;
  Ok(HttpResponse::Ok().json(tokens))
}

#[instrument(name = "handler::update_password", skip(app_state, caller, payload), fields(user_id = caller.user_id))]
pub async fn update_password_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
  payload: web::Json<UpdatePasswordPayload>,
) -> Result<HttpResponse, AppError> {
  let mut errors = FieldErrors::new();
  check_new_password(&mut errors, "newPassword", &payload.new_password);
  errors.into_result()?;

  let users = &app_state.stores.users;
  let user = users
    .find_user(caller.user_id)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;
  if !auth_service::verify_password(&user.password_hash, &payload.current_password)? {
    warn!("Password change with a wrong current password.");
    return Err(AppError::Validation("Current password is incorrect.".to_string()));
  }

  let new_hash = auth_service::hash_password(&payload.new_password)?;
  users.update_password_hash(user.id, &new_hash).await?;
  info!("Password updated.");
  Ok(HttpResponse::NoContent().finish())
}
