// academy/marketplace/src/pipelines/settlement_pipeline.rs

//! Payment settlement. The payment row is recorded first, whatever the order's
//! state; the `settle` branch then applies the outcome:
//!
//! * success: `Pending -> Completed`, then enrollment in every ordered course.
//!   A redelivery that finds the order already `Completed` re-runs the
//!   enrollment, which inserts nothing new. Any other status means the timer
//!   won, so nothing else happens.
//! * anything else: `Pending -> PaymentFailed`, a no-op once the order moved on.

use academy_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use chrono::Utc;
use std::sync::Arc;
use tracing::{event, info, instrument, warn, Level};

use crate::errors::{AppError, Result as AppResult};
use crate::models::{NewPayment, OrderStatus, PaymentStatus};
use crate::pipelines::contexts::SettlePaymentCtxData;

type SettlePipeline = Pipeline<SettlePaymentCtxData, AppError>;

pub fn register_settlement_pipeline(flows: &FlowRegistry<AppError>) {
  let mut success = SettlePipeline::new(&[("mark_completed", false, None), ("enroll", false, None)])
    .labelled("settle_payment::success");
  success.on_step("mark_completed", mark_completed);
  success.on_step("enroll", enroll);

  let mut failure = SettlePipeline::new(&[("mark_payment_failed", false, None)]).labelled("settle_payment::failure");
  failure.on_step("mark_payment_failed", mark_payment_failed);

  let mut p = SettlePipeline::new(&[
    ("load_order", false, None),
    ("record_payment", false, None),
    ("settle", false, None),
  ])
  .labelled("settle_payment");

  p.on_step("load_order", load_order);
  p.on_step("record_payment", record_payment);
  p.branch_step("settle")
    .when(
      "success",
      |ctx: &ContextData<SettlePaymentCtxData>| ctx.read().event.status == PaymentStatus::Completed,
      Arc::new(success),
    )
    .when("failure", |_ctx: &ContextData<SettlePaymentCtxData>| true, Arc::new(failure))
    .finalize(false);

  flows.register_pipeline(p);
  info!("Payment settlement pipeline registered.");
}

/// A missing order is an error so the event is redelivered.
async fn load_order(ctx: ContextData<SettlePaymentCtxData>) -> AppResult<PipelineControl> {
  let (order_id, orders) = {
    let guard = ctx.read();
    (guard.event.order_id, guard.stores.orders.clone())
  };
  let order = orders
    .get_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
  ctx.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "settle_payment::record_payment", skip(ctx), err(Display))]
async fn record_payment(ctx: ContextData<SettlePaymentCtxData>) -> AppResult<PipelineControl> {
  let (payment, orders) = {
    let guard = ctx.read();
    let event = &guard.event;
    (
      NewPayment {
        order_id: event.order_id,
        amount: event.amount,
        transaction_id: event.transaction_id.clone(),
        method: event.method,
        status: event.status,
        payment_date: event.payment_date,
      },
      guard.stores.orders.clone(),
    )
  };
  let recorded = orders.insert_payment(&payment).await?;
  if recorded {
    info!(order_id = payment.order_id, status = ?payment.status, "Payment recorded.");
  } else {
    event!(Level::DEBUG, order_id = payment.order_id, "Payment already recorded; keeping the first row.");
  }
  ctx.write().payment_recorded = recorded;
  Ok(PipelineControl::Continue)
}

async fn mark_completed(ctx: ContextData<SettlePaymentCtxData>) -> AppResult<PipelineControl> {
  let (order_id, orders) = {
    let guard = ctx.read();
    (guard.event.order_id, guard.stores.orders.clone())
  };
  if orders
    .transition_status(order_id, OrderStatus::Pending, OrderStatus::Completed)
    .await?
  {
    info!(order_id, "Order completed.");
    ctx.write().applied_status = Some(OrderStatus::Completed);
    return Ok(PipelineControl::Continue);
  }

  let current = orders.get_order(order_id).await?.map(|o| o.status);
  match current {
    Some(OrderStatus::Completed) => {
      event!(Level::DEBUG, order_id, "Order already completed; re-checking enrollment.");
      Ok(PipelineControl::Continue)
    }
    other => {
      warn!(order_id, status = ?other, "Successful payment for an order that is no longer pending; not applied.");
      Ok(PipelineControl::Stop)
    }
  }
}

async fn enroll(ctx: ContextData<SettlePaymentCtxData>) -> AppResult<PipelineControl> {
  let (user_id, course_ids, orders) = {
    let guard = ctx.read();
    let order = guard
      .order
      .as_ref()
      .ok_or_else(|| AppError::Internal("Order not loaded before enrollment.".to_string()))?;
    (order.user_id, order.course_ids(), guard.stores.orders.clone())
  };
  let inserted = orders.enroll(user_id, &course_ids, Utc::now()).await?;
  info!(user_id, courses = course_ids.len(), inserted, "Enrollment applied.");
  ctx.write().enrolled = inserted;
  Ok(PipelineControl::Continue)
}

async fn mark_payment_failed(ctx: ContextData<SettlePaymentCtxData>) -> AppResult<PipelineControl> {
  let (order_id, orders) = {
    let guard = ctx.read();
    (guard.event.order_id, guard.stores.orders.clone())
  };
  if orders
    .transition_status(order_id, OrderStatus::Pending, OrderStatus::PaymentFailed)
    .await?
  {
    info!(order_id, "Order payment failed.");
    ctx.write().applied_status = Some(OrderStatus::PaymentFailed);
  } else {
    event!(Level::DEBUG, order_id, "Failed payment for an order that is no longer pending.");
  }
  Ok(PipelineControl::Continue)
}
