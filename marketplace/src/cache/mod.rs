// academy/marketplace/src/cache/mod.rs

//! Key-value cache with per-entry TTL in front of catalog reads.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("redis: {0}")]
  Redis(#[from] ::redis::RedisError),

  #[error("cached value could not be (de)serialized: {0}")]
  Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

  async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

  async fn remove(&self, key: &str) -> Result<(), CacheError>;

  /// Removes every key starting with `prefix`.
  async fn remove_by_prefix(&self, prefix: &str) -> Result<(), CacheError>;
}

/// Prefix shared by every cached course listing.
pub const COURSE_LIST_PREFIX: &str = "courses:";
/// Prefix of single-course entries. Does not match listing keys.
pub const COURSE_PREFIX: &str = "course:";

pub fn course_list_key(page_number: i64, page_size: i64, sort: &str) -> String {
  format!("{}page={}:size={}:sort={}", COURSE_LIST_PREFIX, page_number, page_size, sort)
}

pub fn course_key(course_id: i64) -> String {
  format!("{}{}", COURSE_PREFIX, course_id)
}
