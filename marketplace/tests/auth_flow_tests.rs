// tests/auth_flow_tests.rs
mod common;

use academy_flow::{ContextData, PipelineResult};
use academy_market::errors::AppError;
use academy_market::models::Role;
use academy_market::pipelines::contexts::{LoginCtxData, RefreshCtxData, RegisterCtxData};
use academy_market::services::TokenPair;
use chrono::Utc;
use common::*;
use serial_test::serial;

async fn register(app: &TestApp, email: &str, password: &str) -> Result<i64, AppError> {
  let ctx = ContextData::new(RegisterCtxData::new(
    app.state.clone(),
    email.to_string(),
    password.to_string(),
    "Ada".to_string(),
    "Lovelace".to_string(),
  ));
  assert_eq!(app.state.flows.run(ctx.clone()).await?, PipelineResult::Completed);
  let guard = ctx.read();
  assert!(guard.password.is_empty(), "plaintext password kept after hashing");
  let user_id = guard.created_user.as_ref().map(|u| u.id).expect("user created");
  Ok(user_id)
}

async fn login(app: &TestApp, email: &str, password: &str) -> Result<TokenPair, AppError> {
  let ctx = ContextData::new(LoginCtxData::new(app.state.clone(), email.to_string(), password.to_string()));
  app.state.flows.run(ctx.clone()).await?;
  let tokens = ctx.read().tokens.clone().expect("tokens issued");
  Ok(tokens)
}

async fn refresh(app: &TestApp, pair: &TokenPair) -> Result<TokenPair, AppError> {
  let ctx = ContextData::new(RefreshCtxData::new(
    app.state.clone(),
    pair.access_token.clone(),
    pair.refresh_token.clone(),
  ));
  app.state.flows.run(ctx.clone()).await?;
  let tokens = ctx.read().tokens.clone().expect("tokens rotated");
  Ok(tokens)
}

#[tokio::test]
#[serial]
async fn registered_user_is_a_student_and_can_log_in() {
  setup_tracing();
  let app = TestApp::new();
  let user_id = register(&app, "Ada@Example.com", "Secret123").await.unwrap();

  let user = app.state.stores.users.find_user(user_id).await.unwrap().unwrap();
  assert_eq!(user.email, "ada@example.com");
  assert_eq!(user.roles, vec![Role::Student]);
  assert_eq!(user.avatar_path, "default.png");
  assert_ne!(user.password_hash, "Secret123");

  let pair = login(&app, "ada@example.com", "Secret123").await.unwrap();
  let claims = app.state.tokens.validate_access_token(&pair.access_token).unwrap();
  assert_eq!(claims.user_id().unwrap(), user_id);
  assert_eq!(claims.roles, vec![Role::Student]);
  assert!(pair.expiration > Utc::now());
}

#[tokio::test]
#[serial]
async fn registration_rejects_duplicates_and_weak_input() {
  setup_tracing();
  let app = TestApp::new();
  register(&app, "ada@example.com", "Secret123").await.unwrap();

  let dup = register(&app, "ADA@example.com", "Secret123").await.unwrap_err();
  assert!(matches!(dup, AppError::Conflict(_)), "got {:?}", dup);

  match register(&app, "not-an-email", "short").await.unwrap_err() {
    AppError::Invalid(fields) => {
      assert!(fields.get("email").is_some());
      assert!(fields.get("password").is_some());
    }
    other => panic!("expected field errors, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn login_failures_look_identical() {
  setup_tracing();
  let app = TestApp::new();
  register(&app, "ada@example.com", "Secret123").await.unwrap();

  let wrong_password = login(&app, "ada@example.com", "Wrong1234").await.unwrap_err();
  let unknown_user = login(&app, "nobody@example.com", "Secret123").await.unwrap_err();
  match (wrong_password, unknown_user) {
    (AppError::Auth(a), AppError::Auth(b)) => assert_eq!(a, b),
    other => panic!("expected auth errors, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn refresh_rotates_and_revokes_the_old_token() {
  setup_tracing();
  let app = TestApp::new();
  let user_id = register(&app, "ada@example.com", "Secret123").await.unwrap();
  let first = login(&app, "ada@example.com", "Secret123").await.unwrap();

  let second = refresh(&app, &first).await.unwrap();
  assert_ne!(second.refresh_token, first.refresh_token);
  assert_eq!(
    app.state.stores.users.active_refresh_token_count(user_id, Utc::now()).await.unwrap(),
    1
  );

  let replay = refresh(&app, &first).await.unwrap_err();
  assert!(matches!(replay, AppError::Validation(_)), "got {:?}", replay);

  // The rotated pair keeps working.
  refresh(&app, &second).await.unwrap();
}

#[tokio::test]
#[serial]
async fn refresh_with_garbage_access_token_is_rejected() {
  setup_tracing();
  let app = TestApp::new();
  register(&app, "ada@example.com", "Secret123").await.unwrap();
  let pair = login(&app, "ada@example.com", "Secret123").await.unwrap();

  let forged = TokenPair {
    access_token: "not.a.jwt".to_string(),
    ..pair
  };
  assert!(matches!(refresh(&app, &forged).await, Err(AppError::Validation(_))));
}
