// academy/marketplace/src/pipelines/refresh_pipeline.rs

//! Token refresh: recover the identity from a possibly expired access token,
//! match it with an active refresh token and rotate that token.

use academy_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use chrono::Utc;
use tracing::{event, info, Level};

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::common_steps::issue_token_pair;
use crate::pipelines::contexts::RefreshCtxData;

pub fn register_refresh_pipeline(flows: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<RefreshCtxData, AppError>::new(&[
    ("read_identity", false, None),
    ("load_active_token", false, None),
    ("rotate_tokens", false, None),
  ])
  .labelled("refresh_token");

  p.on_step("read_identity", read_identity);
  p.on_step("load_active_token", load_active_token);
  p.on_step("rotate_tokens", rotate_tokens);

  flows.register_pipeline(p);
  info!("Refresh pipeline registered.");
}

async fn read_identity(ctx: ContextData<RefreshCtxData>) -> AppResult<PipelineControl> {
  let (access_token, app_state) = {
    let guard = ctx.read();
    (guard.access_token.clone(), guard.app_state.clone())
  };
  let claims = app_state.tokens.read_expired_access_token(&access_token)?;
  let user_id = claims
    .user_id()
    .map_err(|_| AppError::Validation("Invalid access token.".to_string()))?;

  let Some(user) = app_state.stores.users.find_user(user_id).await? else {
    event!(Level::WARN, user_id, "Refresh for a user that no longer exists.");
    return Err(AppError::Validation("Invalid access token.".to_string()));
  };
  ctx.write().user = Some(user);
  Ok(PipelineControl::Continue)
}

async fn load_active_token(ctx: ContextData<RefreshCtxData>) -> AppResult<PipelineControl> {
  let (user_id, refresh_token, users) = {
    let guard = ctx.read();
    let user_id = guard.user.as_ref().map(|u| u.id).unwrap_or_default();
    (user_id, guard.refresh_token.clone(), guard.app_state.stores.users.clone())
  };
  let Some(stored) = users.find_active_refresh_token(user_id, &refresh_token, Utc::now()).await? else {
    event!(Level::INFO, user_id, "Refresh with an unknown, revoked or expired token.");
    return Err(AppError::Validation("Invalid or expired refresh token.".to_string()));
  };
  ctx.write().stored_token = Some(stored);
  Ok(PipelineControl::Continue)
}

async fn rotate_tokens(ctx: ContextData<RefreshCtxData>) -> AppResult<PipelineControl> {
  let (app_state, user, old_token_id) = {
    let guard = ctx.read();
    match (guard.user.clone(), guard.stored_token.as_ref()) {
      (Some(user), Some(stored)) => (guard.app_state.clone(), user, stored.id),
      _ => return Err(AppError::Internal("Refresh state incomplete before rotation.".to_string())),
    }
  };
  let tokens = issue_token_pair(&app_state, &user, Some(old_token_id)).await?;
  ctx.write().tokens = Some(tokens);
  Ok(PipelineControl::Continue)
}
