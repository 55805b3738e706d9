// academy/marketplace/src/pipelines/register_pipeline.rs

use academy_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use chrono::Utc;
use tracing::{event, info, instrument, Level};

use crate::errors::{AppError, Result as AppResult};
use crate::models::{NewUser, Role};
use crate::pipelines::common_steps::continue_if_valid;
use crate::pipelines::contexts::RegisterCtxData;
use crate::services::auth_service;
use crate::services::validation::{check_email, check_name, check_new_password, FieldErrors};

pub const DEFAULT_AVATAR: &str = "default.png";

pub fn register_registration_pipeline(flows: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<RegisterCtxData, AppError>::new(&[
    ("validate_input", false, None),
    ("check_email_available", false, None),
    ("create_user", false, None),
  ])
  .labelled("register");

  p.on_step("validate_input", validate_input);
  p.on_step("check_email_available", check_email_available);

  // The plaintext never outlives this hook.
  p.before_step("create_user", |ctx: ContextData<RegisterCtxData>| {
    Box::pin(async move {
      let password = std::mem::take(&mut ctx.write().password);
      let hash = auth_service::hash_password(&password)?;
      ctx.write().password_hash = Some(hash);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });
  p.on_step("create_user", create_user);

  flows.register_pipeline(p);
  info!("Registration pipeline registered.");
}

async fn validate_input(ctx: ContextData<RegisterCtxData>) -> AppResult<PipelineControl> {
  let mut errors = FieldErrors::new();
  {
    let mut guard = ctx.write();
    guard.email = guard.email.trim().to_lowercase();
    check_email(&mut errors, "email", &guard.email);
    check_new_password(&mut errors, "password", &guard.password);
    check_name(&mut errors, "firstName", &guard.first_name);
    check_name(&mut errors, "lastName", &guard.last_name);
  }
  continue_if_valid(errors)
}

async fn check_email_available(ctx: ContextData<RegisterCtxData>) -> AppResult<PipelineControl> {
  let (email, users) = {
    let guard = ctx.read();
    (guard.email.clone(), guard.app_state.stores.users.clone())
  };
  if users.find_user_by_email(&email).await?.is_some() {
    event!(Level::WARN, %email, "Registration with an existing email.");
    return Err(AppError::Conflict("An account with this email already exists.".to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "register::create_user", skip(ctx), err(Display))]
async fn create_user(ctx: ContextData<RegisterCtxData>) -> AppResult<PipelineControl> {
  let (new_user, users) = {
    let guard = ctx.read();
    let password_hash = guard
      .password_hash
      .clone()
      .ok_or_else(|| AppError::Internal("Password was not hashed before user creation.".to_string()))?;
    (
      NewUser {
        email: guard.email.clone(),
        first_name: guard.first_name.trim().to_string(),
        last_name: guard.last_name.trim().to_string(),
        avatar_path: DEFAULT_AVATAR.to_string(),
        password_hash,
        roles: vec![Role::Student],
      },
      guard.app_state.stores.users.clone(),
    )
  };

  let user = users.insert_user(new_user, Utc::now()).await?;
  info!(user_id = user.id, "User registered.");
  ctx.write().created_user = Some(user);
  Ok(PipelineControl::Continue)
}
