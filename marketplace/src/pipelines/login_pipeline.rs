// academy/marketplace/src/pipelines/login_pipeline.rs

use academy_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{event, info, Level};

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::common_steps::{continue_if_valid, issue_token_pair};
use crate::pipelines::contexts::LoginCtxData;
use crate::services::auth_service;
use crate::services::validation::{check_login_password, FieldErrors};

const INVALID_LOGIN: &str = "Invalid login attempt.";

pub fn register_login_pipeline(flows: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<LoginCtxData, AppError>::new(&[
    ("validate_input", false, None),
    ("load_user", false, None),
    ("verify_password", false, None),
    ("issue_tokens", false, None),
  ])
  .labelled("login");

  p.on_step("validate_input", validate_input);
  p.on_step("load_user", load_user);
  p.on_step("verify_password", verify_password);
  p.after_step("verify_password", |ctx: ContextData<LoginCtxData>| {
    Box::pin(async move {
      ctx.write().password.clear();
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });
  p.on_step("issue_tokens", issue_tokens);

  flows.register_pipeline(p);
  info!("Login pipeline registered.");
}

async fn validate_input(ctx: ContextData<LoginCtxData>) -> AppResult<PipelineControl> {
  let mut errors = FieldErrors::new();
  {
    let mut guard = ctx.write();
    guard.email = guard.email.trim().to_lowercase();
    if guard.email.is_empty() {
      errors.add("email", "Email is required.");
    }
    check_login_password(&mut errors, "password", &guard.password);
  }
  continue_if_valid(errors)
}

async fn load_user(ctx: ContextData<LoginCtxData>) -> AppResult<PipelineControl> {
  let (email, users) = {
    let guard = ctx.read();
    (guard.email.clone(), guard.app_state.stores.users.clone())
  };
  let Some(user) = users.find_user_by_email(&email).await? else {
    event!(Level::INFO, %email, "Login for unknown email.");
    return Err(AppError::Auth(INVALID_LOGIN.to_string()));
  };
  ctx.write().user = Some(user);
  Ok(PipelineControl::Continue)
}

async fn verify_password(ctx: ContextData<LoginCtxData>) -> AppResult<PipelineControl> {
  let (stored_hash, password, user_id) = {
    let guard = ctx.read();
    let user = guard
      .user
      .as_ref()
      .ok_or_else(|| AppError::Internal("User not loaded before password check.".to_string()))?;
    (user.password_hash.clone(), guard.password.clone(), user.id)
  };
  if !auth_service::verify_password(&stored_hash, &password)? {
    event!(Level::INFO, user_id, "Login with wrong password.");
    return Err(AppError::Auth(INVALID_LOGIN.to_string()));
  }
  Ok(PipelineControl::Continue)
}

async fn issue_tokens(ctx: ContextData<LoginCtxData>) -> AppResult<PipelineControl> {
  let (app_state, user) = {
    let guard = ctx.read();
    let user = guard
      .user
      .clone()
      .ok_or_else(|| AppError::Internal("User not loaded before token issue.".to_string()))?;
    (guard.app_state.clone(), user)
  };
  let tokens = issue_token_pair(&app_state, &user, None).await?;
  info!(user_id = user.id, "User logged in.");
  ctx.write().tokens = Some(tokens);
  Ok(PipelineControl::Continue)
}
