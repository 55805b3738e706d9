// tests/common/mod.rs
#![allow(dead_code)]

use academy_market::cache::MemoryCache;
use academy_market::config::AppConfig;
use academy_market::events::{DomainEvent, EventBus, EventBusError, EventHandler, OrderLifecycleConsumer};
use academy_market::models::{CourseDraft, CourseView, NewUser, Role, User};
use academy_market::services::auth_service::hash_password;
use academy_market::state::AppState;
use academy_market::store::{MemoryStore, Stores};
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

pub const TEST_PASSWORD: &str = "Secret123";

/// Keeps every event instead of delivering it, so tests decide when consumers run.
#[derive(Default)]
pub struct RecordingBus {
  pub published: Mutex<Vec<DomainEvent>>,
  pub scheduled: Mutex<Vec<(DomainEvent, Duration)>>,
}

#[async_trait]
impl EventBus for RecordingBus {
  async fn publish(&self, event: DomainEvent) -> Result<(), EventBusError> {
    self.published.lock().push(event);
    Ok(())
  }

  async fn schedule(&self, event: DomainEvent, delay: Duration) -> Result<(), EventBusError> {
    self.scheduled.lock().push((event, delay));
    Ok(())
  }
}

pub fn test_config() -> AppConfig {
  let vars: HashMap<&str, &str> = HashMap::from([
    ("JWT_SECRET", "test-secret-that-is-long-enough-for-hs256"),
    ("JWT_ISSUER", "academy-market-tests"),
    ("JWT_AUDIENCE", "academy-market-tests"),
    ("ORDER_CANCEL_DELAY_SECS", "300"),
    ("COURSE_CACHE_TTL_SECS", "60"),
  ]);
  AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).expect("test configuration")
}

pub struct TestApp {
  pub state: AppState,
  pub bus: Arc<RecordingBus>,
  pub cache: Arc<MemoryCache>,
  pub consumer: OrderLifecycleConsumer,
}

impl TestApp {
  pub fn new() -> Self {
    let bus = Arc::new(RecordingBus::default());
    let cache = Arc::new(MemoryCache::new());
    let stores = Stores::from_memory(Arc::new(MemoryStore::new()));
    let state = AppState::new(Arc::new(test_config()), stores, cache.clone(), bus.clone());
    let consumer = OrderLifecycleConsumer::new(state.flows.clone(), state.stores.clone());
    Self {
      state,
      bus,
      cache,
      consumer,
    }
  }

  pub async fn create_user(&self, email: &str, role: Role) -> User {
    let new_user = NewUser {
      email: email.to_string(),
      first_name: "Test".to_string(),
      last_name: "User".to_string(),
      avatar_path: "default.png".to_string(),
      password_hash: hash_password(TEST_PASSWORD).unwrap(),
      roles: vec![role],
    };
    self.state.stores.users.insert_user(new_user, Utc::now()).await.unwrap()
  }

  pub async fn create_category(&self, name: &str) -> i64 {
    self.state.stores.catalog.insert_category(name).await.unwrap().id
  }

  pub async fn create_course(&self, instructor: &User, category_id: i64, title: &str, price: Decimal) -> CourseView {
    self
      .state
      .catalog
      .create_course(instructor.id, draft(title, price, category_id))
      .await
      .unwrap()
  }

  pub fn access_token(&self, user: &User) -> String {
    self.state.tokens.issue_access_token(user, Utc::now()).unwrap()
  }

  /// Hands `event` to the lifecycle consumer as the dispatcher would.
  pub async fn deliver(&self, event: DomainEvent) -> Result<(), academy_market::errors::AppError> {
    self.consumer.handle(&event).await
  }

  pub fn published(&self) -> Vec<DomainEvent> {
    self.bus.published.lock().clone()
  }

  pub fn scheduled(&self) -> Vec<(DomainEvent, Duration)> {
    self.bus.scheduled.lock().clone()
  }
}

pub fn draft(title: &str, price: Decimal, category_id: i64) -> CourseDraft {
  CourseDraft {
    title: title.to_string(),
    description: format!("Everything about {}", title),
    price,
    image_path: "course.png".to_string(),
    category_id,
  }
}

/// `units` whole currency units with two decimal places.
pub fn money(units: i64) -> Decimal {
  Decimal::new(units * 100, 2)
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
