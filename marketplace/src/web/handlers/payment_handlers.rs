// academy/marketplace/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::events::{DomainEvent, PaymentCompletedEvent};
use crate::models::{PaymentMethod, PaymentStatus};
use crate::services::validation::{check_money, FieldErrors};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompletePayload {
  pub order_id: i64,
  pub transaction_id: String,
  pub amount: Decimal,
  pub status: PaymentStatus,
  #[serde(default)]
  pub method: PaymentMethod,
}

/// Payment provider callback. Settlement happens asynchronously on the bus.
#[instrument(name = "handler::payment_complete", skip(app_state, payload), fields(order_id = payload.order_id))]
pub async fn payment_complete_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<PaymentCompletePayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let mut errors = FieldErrors::new();
  check_money(&mut errors, "amount", "Amount", payload.amount);
  if payload.transaction_id.trim().is_empty() {
    errors.add("transactionId", "TransactionId is required.");
  }
  errors.into_result()?;

  if app_state.stores.orders.get_order(payload.order_id).await?.is_none() {
    return Err(AppError::NotFound(format!("Order {} not found.", payload.order_id)));
  }

  let event = PaymentCompletedEvent {
    order_id: payload.order_id,
    transaction_id: payload.transaction_id.trim().to_string(),
    amount: payload.amount,
    payment_date: Utc::now(),
    status: payload.status,
    method: payload.method,
  };
  app_state.bus.publish(DomainEvent::PaymentCompleted(event)).await?;
  info!(status = ?payload.status, "Payment result accepted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Payment received and is being processed." })))
}
