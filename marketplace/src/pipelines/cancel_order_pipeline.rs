// academy/marketplace/src/pipelines/cancel_order_pipeline.rs

//! Reaction to the cancellation timer. Only a still-pending order is cancelled,
//! and only through a conditional update, so a payment that commits first wins.

use academy_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{event, info, Level};

use crate::errors::{AppError, Result as AppResult};
use crate::models::OrderStatus;
use crate::pipelines::contexts::CancelOrderCtxData;

pub fn register_cancel_order_pipeline(flows: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<CancelOrderCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("cancel_order", false, None),
  ])
  .labelled("cancel_order");

  p.on_step("load_order", load_order);
  p.on_step("cancel_order", cancel_order);

  flows.register_pipeline(p);
  info!("Cancel-order pipeline registered.");
}

async fn load_order(ctx: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let (order_id, orders) = {
    let guard = ctx.read();
    (guard.order_id, guard.stores.orders.clone())
  };
  match orders.get_order(order_id).await? {
    None => {
      event!(Level::WARN, order_id, "Cancellation timer for an unknown order.");
      Ok(PipelineControl::Stop)
    }
    Some(order) if order.status != OrderStatus::Pending => {
      event!(Level::DEBUG, order_id, status = %order.status, "Order already resolved; timer ignored.");
      Ok(PipelineControl::Stop)
    }
    Some(_) => Ok(PipelineControl::Continue),
  }
}

async fn cancel_order(ctx: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let (order_id, orders) = {
    let guard = ctx.read();
    (guard.order_id, guard.stores.orders.clone())
  };
  let cancelled = orders
    .transition_status(order_id, OrderStatus::Pending, OrderStatus::Cancelled)
    .await?;
  if cancelled {
    info!(order_id, "Unpaid order cancelled.");
  } else {
    event!(Level::DEBUG, order_id, "Order left Pending before the cancellation committed.");
  }
  ctx.write().cancelled = cancelled;
  Ok(PipelineControl::Continue)
}
