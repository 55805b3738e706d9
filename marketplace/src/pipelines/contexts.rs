// academy/marketplace/src/pipelines/contexts.rs

//! Data carried through each pipeline run, wrapped in `ContextData` by callers.

use rust_decimal::Decimal;

use crate::events::PaymentCompletedEvent;
use crate::models::{CourseView, NewOrderLine, OrderStatus, OrderView, RefreshToken, User};
use crate::services::TokenPair;
use crate::state::AppState;
use crate::store::Stores;

#[derive(Clone)]
pub struct RegisterCtxData {
  pub app_state: AppState,
  pub email: String,
  /// Cleared once hashed.
  pub password: String,
  pub first_name: String,
  pub last_name: String,
  pub password_hash: Option<String>,
  pub created_user: Option<User>,
}

impl RegisterCtxData {
  pub fn new(app_state: AppState, email: String, password: String, first_name: String, last_name: String) -> Self {
    Self {
      app_state,
      email,
      password,
      first_name,
      last_name,
      password_hash: None,
      created_user: None,
    }
  }
}

#[derive(Clone)]
pub struct LoginCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub user: Option<User>,
  pub tokens: Option<TokenPair>,
}

impl LoginCtxData {
  pub fn new(app_state: AppState, email: String, password: String) -> Self {
    Self {
      app_state,
      email,
      password,
      user: None,
      tokens: None,
    }
  }
}

#[derive(Clone)]
pub struct RefreshCtxData {
  pub app_state: AppState,
  pub access_token: String,
  pub refresh_token: String,
  pub user: Option<User>,
  pub stored_token: Option<RefreshToken>,
  pub tokens: Option<TokenPair>,
}

impl RefreshCtxData {
  pub fn new(app_state: AppState, access_token: String, refresh_token: String) -> Self {
    Self {
      app_state,
      access_token,
      refresh_token,
      user: None,
      stored_token: None,
      tokens: None,
    }
  }
}

/// One course line as sent by the client. `price` is informational only.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedLine {
  pub course_id: i64,
  pub price: Option<Decimal>,
}

#[derive(Clone)]
pub struct CreateOrderCtxData {
  pub app_state: AppState,
  pub caller_id: i64,
  /// `userId` from the request body; 0 when omitted.
  pub requested_user_id: i64,
  pub requested: Vec<RequestedLine>,
  pub courses: Vec<CourseView>,
  pub lines: Vec<NewOrderLine>,
  pub total_amount: Decimal,
  pub order: Option<OrderView>,
}

impl CreateOrderCtxData {
  pub fn new(app_state: AppState, caller_id: i64, requested_user_id: i64, requested: Vec<RequestedLine>) -> Self {
    Self {
      app_state,
      caller_id,
      requested_user_id,
      requested,
      courses: Vec::new(),
      lines: Vec::new(),
      total_amount: Decimal::ZERO,
      order: None,
    }
  }
}

#[derive(Clone)]
pub struct CancelOrderCtxData {
  pub stores: Stores,
  pub order_id: i64,
  pub cancelled: bool,
}

impl CancelOrderCtxData {
  pub fn new(stores: Stores, order_id: i64) -> Self {
    Self {
      stores,
      order_id,
      cancelled: false,
    }
  }
}

#[derive(Clone)]
pub struct SettlePaymentCtxData {
  pub stores: Stores,
  pub event: PaymentCompletedEvent,
  pub order: Option<OrderView>,
  pub payment_recorded: bool,
  /// Status this run moved the order to, if any.
  pub applied_status: Option<OrderStatus>,
  pub enrolled: u64,
}

impl SettlePaymentCtxData {
  pub fn new(stores: Stores, event: PaymentCompletedEvent) -> Self {
    Self {
      stores,
      event,
      order: None,
      payment_recorded: false,
      applied_status: None,
      enrolled: 0,
    }
  }
}
