// academy/marketplace/src/pipelines/common_steps.rs

//! Pieces shared by several pipelines.

use academy_flow::PipelineControl;
use chrono::Utc;
use tracing::{info, instrument};

use crate::errors::{AppError, Result as AppResult};
use crate::models::User;
use crate::services::validation::FieldErrors;
use crate::services::TokenPair;
use crate::state::AppState;

/// Turns collected rule violations into the step outcome.
pub fn continue_if_valid(errors: FieldErrors) -> AppResult<PipelineControl> {
  errors.into_result().map(|()| PipelineControl::Continue)
}

/// Stores a new refresh token for `user` and signs an access token to go with it.
///
/// With `replacing` set, the given refresh token is revoked in the same unit of
/// work; losing that race to a concurrent refresh is a client error.
#[instrument(name = "common_step::issue_token_pair", skip(app_state, user), fields(user_id = user.id), err(Display))]
pub async fn issue_token_pair(app_state: &AppState, user: &User, replacing: Option<i64>) -> AppResult<TokenPair> {
  let now = Utc::now();
  let refresh_token = app_state.tokens.new_refresh_token();
  let expiration = app_state.tokens.refresh_expiry(now);

  match replacing {
    Some(old_token_id) => {
      let rotated = app_state
        .stores
        .users
        .rotate_refresh_token(old_token_id, user.id, &refresh_token, expiration, now)
        .await?;
      if !rotated {
        return Err(AppError::Validation("Refresh token is no longer valid.".to_string()));
      }
      info!("Refresh token rotated.");
    }
    None => {
      app_state
        .stores
        .users
        .insert_refresh_token(user.id, &refresh_token, expiration, now)
        .await?;
    }
  }

  let access_token = app_state.tokens.issue_access_token(user, now)?;
  Ok(TokenPair {
    access_token,
    refresh_token,
    expiration,
  })
}
