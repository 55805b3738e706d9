// academy/marketplace/src/web/handlers/order_handlers.rs

use academy_flow::ContextData;
use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};

use super::expect_completed;
use crate::errors::AppError;
use crate::models::{OrderStatus, Role};
use crate::pipelines::contexts::{CreateOrderCtxData, RequestedLine};
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLinePayload {
  pub course_id: i64,
  #[serde(default)]
  pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
  #[serde(default)]
  pub user_id: i64,
  #[serde(default)]
  pub courses: Vec<OrderLinePayload>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
  pub status: String,
}

#[instrument(name = "handler::create_order", skip(app_state, caller, payload), fields(user_id = caller.user_id, lines = payload.courses.len()))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
  payload: web::Json<CreateOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let CreateOrderPayload { user_id, courses } = payload.into_inner();
  let requested = courses
    .into_iter()
    .map(|line| RequestedLine {
      course_id: line.course_id,
      price: line.price,
    })
    .collect();
  let ctx = ContextData::new(CreateOrderCtxData::new(
    app_state.get_ref().clone(),
    caller.user_id,
    user_id,
    requested,
  ));

  let result = app_state.flows.run(ctx.clone()).await?;
  expect_completed(result, "Order creation")?;

  let order = ctx
    .read()
    .order
    .clone()
    .ok_or_else(|| AppError::Internal("Order creation completed without an order.".to_string()))?;
  Ok(HttpResponse::Created().json(order))
}

#[instrument(name = "handler::get_order", skip(app_state, caller), fields(user_id = caller.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = app_state
    .stores
    .orders
    .get_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
  if order.user_id != caller.user_id {
    return Err(AppError::Forbidden("This order belongs to another user.".to_string()));
  }
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::user_orders", skip(app_state, caller), fields(user_id = caller.user_id))]
pub async fn user_orders_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.stores.orders.orders_for_user(caller.user_id).await?;
  if orders.is_empty() {
    return Err(AppError::NotFound("No orders found.".to_string()));
  }
  Ok(HttpResponse::Ok().json(orders))
}

/// Administrative override; bypasses the lifecycle guards.
#[instrument(name = "handler::update_order_status", skip(app_state, caller, payload), fields(user_id = caller.user_id))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  caller: AuthenticatedUser,
  path: web::Path<i64>,
  payload: web::Json<UpdateStatusPayload>,
) -> Result<HttpResponse, AppError> {
  caller.require_role(Role::Instructor)?;
  let order_id = path.into_inner();
  let status: OrderStatus = payload.status.trim().parse()?;
  if !app_state.stores.orders.set_status(order_id, status).await? {
    return Err(AppError::NotFound(format!("Order {} not found.", order_id)));
  }
  info!(order_id, %status, "Order status overridden.");
  Ok(HttpResponse::NoContent().finish())
}
