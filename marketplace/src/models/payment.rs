// academy/marketplace/src/models/payment.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
  #[default]
  CreditCard,
  BankTransfer,
  Wallet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
}

/// A payment result to record. One row per transaction id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
  pub order_id: i64,
  pub amount: Decimal,
  pub transaction_id: String,
  pub method: PaymentMethod,
  pub status: PaymentStatus,
  pub payment_date: DateTime<Utc>,
}

/// A stored payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
  pub id: i64,
  pub order_id: i64,
  pub amount: Decimal,
  pub transaction_id: String,
  pub method: PaymentMethod,
  pub status: PaymentStatus,
  pub payment_date: DateTime<Utc>,
}
