// academy/marketplace/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::str::FromStr;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  PaymentProcessing,
  PaymentFailed,
  Completed,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::PaymentProcessing,
    OrderStatus::PaymentFailed,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "Pending",
      OrderStatus::PaymentProcessing => "PaymentProcessing",
      OrderStatus::PaymentFailed => "PaymentFailed",
      OrderStatus::Completed => "Completed",
      OrderStatus::Cancelled => "Cancelled",
    }
  }
}

impl FromStr for OrderStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| AppError::Validation(format!("Invalid order status '{}'", s)))
  }
}

impl std::fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct Order {
  pub id: i64,
  pub user_id: i64,
  pub order_date: DateTime<Utc>,
  pub total_amount: Decimal,
  pub status: OrderStatus,
}

/// A line to persist: the course and the catalog price snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
  pub course_id: i64,
  pub price_at_purchase: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderCourseView {
  pub id: i64,
  pub title: String,
  pub price_at_purchase: Decimal,
  pub image_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
  pub id: i64,
  pub user_id: i64,
  pub total_amount: Decimal,
  pub order_date: DateTime<Utc>,
  pub status: OrderStatus,
  pub courses: Vec<OrderCourseView>,
}

impl OrderView {
  pub fn from_parts(order: Order, courses: Vec<OrderCourseView>) -> Self {
    Self {
      id: order.id,
      user_id: order.user_id,
      total_amount: order.total_amount,
      order_date: order.order_date,
      status: order.status,
      courses,
    }
  }

  pub fn course_ids(&self) -> Vec<i64> {
    self.courses.iter().map(|c| c.id).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_serializes_pascal_case() {
    assert_eq!(serde_json::to_string(&OrderStatus::PaymentFailed).unwrap(), "\"PaymentFailed\"");
    assert_eq!("cancelled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
    assert!("Shipped".parse::<OrderStatus>().is_err());
  }
}
