// academy/marketplace/src/pipelines/create_order_pipeline.rs

//! Order creation: validate the request against the caller, resolve every
//! course, persist the order with catalog price snapshots, then announce it and
//! arm the cancellation timer.

use academy_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{event, info, instrument, warn, Level};

use crate::errors::{AppError, Result as AppResult};
use crate::events::{CancelOrderEvent, DomainEvent, OrderCreatedEvent};
use crate::models::NewOrderLine;
use crate::pipelines::contexts::CreateOrderCtxData;
use crate::services::validation::MONEY_LIMIT;

pub fn register_create_order_pipeline(flows: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<CreateOrderCtxData, AppError>::new(&[
    ("validate_request", false, None),
    ("load_courses", false, None),
    ("persist_order", false, None),
    ("publish_events", false, None),
  ])
  .labelled("create_order");

  p.on_step("validate_request", validate_request);
  p.on_step("load_courses", load_courses);
  p.before_step("persist_order", price_lines);
  p.on_step("persist_order", persist_order);
  p.on_step("publish_events", publish_events);

  flows.register_pipeline(p);
  info!("Create-order pipeline registered.");
}

async fn validate_request(ctx: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let guard = ctx.read();
  if guard.requested_user_id != 0 && guard.requested_user_id != guard.caller_id {
    event!(Level::WARN, caller_id = guard.caller_id, requested = guard.requested_user_id, "Order placed for another user.");
    return Err(AppError::Forbidden("Orders can only be placed for your own account.".to_string()));
  }
  if guard.requested.is_empty() {
    return Err(AppError::Validation("At least one course is required.".to_string()));
  }
  let mut seen = HashSet::new();
  if let Some(dup) = guard.requested.iter().find(|line| !seen.insert(line.course_id)) {
    return Err(AppError::Validation(format!("Course {} appears more than once.", dup.course_id)));
  }
  Ok(PipelineControl::Continue)
}

async fn load_courses(ctx: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let (ids, catalog) = {
    let guard = ctx.read();
    let ids: Vec<i64> = guard.requested.iter().map(|line| line.course_id).collect();
    (ids, guard.app_state.stores.catalog.clone())
  };
  let courses = catalog.courses_by_ids(&ids).await?;
  let found: HashSet<i64> = courses.iter().map(|c| c.id).collect();
  if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
    return Err(AppError::NotFound(format!("Course {} not found.", missing)));
  }
  ctx.write().courses = courses;
  Ok(PipelineControl::Continue)
}

/// Prices each line from the catalog. Client-sent prices are only compared.
async fn price_lines(ctx: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  ctx.update(|data| {
    let mut lines = Vec::with_capacity(data.requested.len());
    for requested in &data.requested {
      let Some(course) = data.courses.iter().find(|c| c.id == requested.course_id) else {
        return Err(AppError::Internal(format!("Course {} was not loaded.", requested.course_id)));
      };
      if let Some(sent) = requested.price {
        if sent != course.price {
          warn!(course_id = course.id, sent = %sent, catalog = %course.price, "Client price differs from catalog; using catalog price.");
        }
      }
      lines.push(NewOrderLine {
        course_id: course.id,
        price_at_purchase: course.price,
      });
    }
    let total = lines
      .iter()
      .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.price_at_purchase))
      .filter(|total| *total < MONEY_LIMIT)
      .ok_or_else(|| AppError::Validation(format!("Order total must be less than {}.", MONEY_LIMIT)))?;
    data.total_amount = total;
    data.lines = lines;
    Ok(PipelineControl::Continue)
  })
}

#[instrument(name = "create_order::persist_order", skip(ctx), err(Display))]
async fn persist_order(ctx: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let (caller_id, lines, total, orders) = {
    let guard = ctx.read();
    (
      guard.caller_id,
      guard.lines.clone(),
      guard.total_amount,
      guard.app_state.stores.orders.clone(),
    )
  };
  let order = orders.create_order(caller_id, &lines, total, Utc::now()).await?;
  info!(order_id = order.id, total = %order.total_amount, "Order created.");
  ctx.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn publish_events(ctx: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let (created, bus, delay) = {
    let guard = ctx.read();
    let order = guard
      .order
      .as_ref()
      .ok_or_else(|| AppError::Internal("Order not persisted before publishing.".to_string()))?;
    (
      OrderCreatedEvent::from(order),
      guard.app_state.bus.clone(),
      guard.app_state.config.order_cancel_delay,
    )
  };
  let order_id = created.order_id;
  bus.publish(DomainEvent::OrderCreated(created)).await?;
  bus
    .schedule(DomainEvent::CancelOrder(CancelOrderEvent { order_id }), delay)
    .await?;
  event!(Level::DEBUG, order_id, delay_secs = delay.as_secs(), "Cancellation timer armed.");
  Ok(PipelineControl::Continue)
}
