// academy/marketplace/src/events/mod.rs

//! Domain events, the bus they travel on and the consumers that react to them.

pub mod consumers;
pub mod dispatcher;
pub mod in_process;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::errors::AppError;
use crate::models::{OrderStatus, OrderView, PaymentMethod, PaymentStatus};

pub use consumers::OrderLifecycleConsumer;
pub use dispatcher::{EventDispatcher, RetryPolicy};
pub use in_process::{EventReceiver, InProcessBus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedCourse {
  pub course_id: i64,
  pub price_at_purchase: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedEvent {
  pub order_id: i64,
  pub user_id: i64,
  pub total_amount: Decimal,
  pub order_date: DateTime<Utc>,
  pub status: OrderStatus,
  pub courses: Vec<OrderedCourse>,
}

impl From<&OrderView> for OrderCreatedEvent {
  fn from(order: &OrderView) -> Self {
    Self {
      order_id: order.id,
      user_id: order.user_id,
      total_amount: order.total_amount,
      order_date: order.order_date,
      status: order.status,
      courses: order
        .courses
        .iter()
        .map(|c| OrderedCourse {
          course_id: c.id,
          price_at_purchase: c.price_at_purchase,
        })
        .collect(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompletedEvent {
  pub order_id: i64,
  pub transaction_id: String,
  pub amount: Decimal,
  pub payment_date: DateTime<Utc>,
  pub status: PaymentStatus,
  #[serde(default)]
  pub method: PaymentMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderEvent {
  pub order_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
  OrderCreated(OrderCreatedEvent),
  PaymentCompleted(PaymentCompletedEvent),
  CancelOrder(CancelOrderEvent),
}

impl DomainEvent {
  pub fn name(&self) -> &'static str {
    match self {
      DomainEvent::OrderCreated(_) => "OrderCreated",
      DomainEvent::PaymentCompleted(_) => "PaymentCompleted",
      DomainEvent::CancelOrder(_) => "CancelOrder",
    }
  }

  pub fn order_id(&self) -> i64 {
    match self {
      DomainEvent::OrderCreated(e) => e.order_id,
      DomainEvent::PaymentCompleted(e) => e.order_id,
      DomainEvent::CancelOrder(e) => e.order_id,
    }
  }
}

#[derive(Debug, Error)]
pub enum EventBusError {
  #[error("event bus is closed; {event} for order {order_id} was not delivered")]
  Closed { event: &'static str, order_id: i64 },
}

/// Publishing side of the bus.
#[async_trait]
pub trait EventBus: Send + Sync {
  async fn publish(&self, event: DomainEvent) -> Result<(), EventBusError>;

  /// Delivers `event` to consumers once `delay` has elapsed.
  async fn schedule(&self, event: DomainEvent, delay: Duration) -> Result<(), EventBusError>;
}

/// Consuming side. An error makes the dispatcher redeliver the event.
#[async_trait]
pub trait EventHandler: Send + Sync {
  async fn handle(&self, event: &DomainEvent) -> Result<(), AppError>;
}
