// academy/marketplace/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::{Role, UserProfile};
use crate::services::validation::{check_avatar, check_name, FieldErrors};
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
  pub first_name: String,
  pub last_name: String,
  #[serde(default)]
  pub avatar_path: String,
  pub email: String,
}

#[instrument(name = "handler::get_profile", skip(app_state, caller), fields(user_id = caller.user_id))]
pub async fn get_profile_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = app_state
    .stores
    .users
    .find_user(caller.user_id)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;
  Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

#[instrument(name = "handler::update_profile", skip(app_state, caller, payload), fields(user_id = caller.user_id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
  payload: web::Json<UpdateProfilePayload>,
) -> Result<HttpResponse, AppError> {
  if !payload.email.trim().eq_ignore_ascii_case(&caller.email) {
    return Err(AppError::Forbidden("You can only update your own profile.".to_string()));
  }
  let mut errors = FieldErrors::new();
  check_name(&mut errors, "firstName", &payload.first_name);
  check_name(&mut errors, "lastName", &payload.last_name);
  check_avatar(&mut errors, "avatarPath", &payload.avatar_path);
  errors.into_result()?;

  let updated = app_state
    .stores
    .users
    .update_profile(
      caller.user_id,
      payload.first_name.trim(),
      payload.last_name.trim(),
      payload.avatar_path.trim(),
    )
    .await?;
  if !updated {
    return Err(AppError::NotFound("User not found.".to_string()));
  }
  if caller.has_role(Role::Instructor) {
    app_state.catalog.forget_cached_courses().await;
  }
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::delete_account", skip(app_state, caller), fields(user_id = caller.user_id))]
pub async fn delete_account_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  if !app_state.stores.users.delete_user(caller.user_id).await? {
    return Err(AppError::NotFound("User not found.".to_string()));
  }
  if caller.has_role(Role::Instructor) {
    app_state.catalog.forget_cached_courses().await;
  }
  info!("Account deleted.");
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::my_courses", skip(app_state, caller), fields(user_id = caller.user_id))]
pub async fn my_courses_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let enrollments = app_state.stores.orders.enrollments_for_user(caller.user_id).await?;
  Ok(HttpResponse::Ok().json(enrollments))
}
