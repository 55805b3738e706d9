// academy/marketplace/src/store/mod.rs

//! Persistence seams. Every store has a Postgres implementation and an
//! in-memory one; both enforce the same keys and conditional updates.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::errors::Result;
use crate::models::{
  Category, CourseDraft, CourseFilter, CourseSort, CourseView, EnrollmentView, NewOrderLine, NewPayment, NewUser,
  OrderStatus, OrderView, PageRequest, Payment, RefreshToken, User,
};

pub use self::memory::MemoryStore;
pub use self::postgres::PgStore;

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn list_categories(&self) -> Result<Vec<Category>>;

  async fn category_exists(&self, category_id: i64) -> Result<bool>;

  async fn insert_category(&self, name: &str) -> Result<Category>;

  /// `Conflict` while courses still reference the category.
  async fn delete_category(&self, category_id: i64) -> Result<bool>;

  /// One page of courses and the total number matching `filter`.
  async fn page_courses(
    &self,
    filter: &CourseFilter,
    sort: CourseSort,
    page: PageRequest,
  ) -> Result<(Vec<CourseView>, i64)>;

  async fn get_course(&self, course_id: i64) -> Result<Option<CourseView>>;

  async fn insert_course(&self, instructor_id: i64, draft: &CourseDraft, now: DateTime<Utc>) -> Result<i64>;

  async fn update_course(&self, course_id: i64, draft: &CourseDraft, now: DateTime<Utc>) -> Result<bool>;

  /// `Conflict` once the course has been ordered.
  async fn delete_course(&self, course_id: i64) -> Result<bool>;

  async fn courses_by_ids(&self, course_ids: &[i64]) -> Result<Vec<CourseView>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
  /// `Conflict` when the email is taken.
  async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User>;

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

  async fn find_user(&self, user_id: i64) -> Result<Option<User>>;

  async fn update_profile(&self, user_id: i64, first_name: &str, last_name: &str, avatar_path: &str) -> Result<bool>;

  async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<bool>;

  /// Removes the user with their tokens, orders and enrollments. `Conflict` while they still teach courses.
  async fn delete_user(&self, user_id: i64) -> Result<bool>;

  async fn insert_refresh_token(
    &self,
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<RefreshToken>;

  async fn find_active_refresh_token(&self, user_id: i64, token: &str, now: DateTime<Utc>)
    -> Result<Option<RefreshToken>>;

  /// Revokes `old_token_id` and stores `new_token` in one unit. Returns `false`
  /// without storing anything when the old token was already revoked.
  async fn rotate_refresh_token(
    &self,
    old_token_id: i64,
    user_id: i64,
    new_token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<bool>;

  async fn active_refresh_token_count(&self, user_id: i64, now: DateTime<Utc>) -> Result<i64>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Persists the order and its lines atomically, status `Pending`.
  async fn create_order(
    &self,
    user_id: i64,
    lines: &[NewOrderLine],
    total_amount: Decimal,
    now: DateTime<Utc>,
  ) -> Result<OrderView>;

  async fn get_order(&self, order_id: i64) -> Result<Option<OrderView>>;

  async fn orders_for_user(&self, user_id: i64) -> Result<Vec<OrderView>>;

  /// Moves the order to `to` only while it is in `from`. Returns whether it moved.
  async fn transition_status(&self, order_id: i64, from: OrderStatus, to: OrderStatus) -> Result<bool>;

  /// Unconditional status write. Returns `false` for an unknown order.
  async fn set_status(&self, order_id: i64, status: OrderStatus) -> Result<bool>;

  /// Returns `false` when the transaction id (or a payment for the order) is already stored.
  async fn insert_payment(&self, payment: &NewPayment) -> Result<bool>;

  async fn payment_for_order(&self, order_id: i64) -> Result<Option<Payment>>;

  /// Inserts the missing `(user, course)` enrollments. Returns how many were new.
  async fn enroll(&self, user_id: i64, course_ids: &[i64], now: DateTime<Utc>) -> Result<u64>;

  async fn enrollments_for_user(&self, user_id: i64) -> Result<Vec<EnrollmentView>>;
}

/// The store handles shared by the application.
#[derive(Clone)]
pub struct Stores {
  pub catalog: Arc<dyn CatalogStore>,
  pub users: Arc<dyn UserStore>,
  pub orders: Arc<dyn OrderStore>,
}

impl Stores {
  pub fn postgres(pool: sqlx::PgPool) -> Self {
    let store = Arc::new(PgStore::new(pool));
    Self {
      catalog: store.clone(),
      users: store.clone(),
      orders: store,
    }
  }

  pub fn in_memory() -> Self {
    Self::from_memory(Arc::new(MemoryStore::new()))
  }

  pub fn from_memory(store: Arc<MemoryStore>) -> Self {
    Self {
      catalog: store.clone(),
      users: store.clone(),
      orders: store,
    }
  }
}
