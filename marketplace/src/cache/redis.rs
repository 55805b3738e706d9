// academy/marketplace/src/cache/redis.rs

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{debug, info};

use super::{CacheError, CacheStore};

const SCAN_BATCH: usize = 200;

#[derive(Clone)]
pub struct RedisCache {
  conn: ConnectionManager,
}

impl RedisCache {
  pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
    let client = Client::open(redis_url)?;
    let conn = ConnectionManager::new(client).await?;
    info!("Connected to Redis cache.");
    Ok(Self { conn })
  }
}

#[async_trait]
impl CacheStore for RedisCache {
  async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
    let mut conn = self.conn.clone();
    let value: Option<String> = conn.get(key).await?;
    debug!(%key, hit = value.is_some(), "redis get");
    Ok(value)
  }

  async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
    let mut conn = self.conn.clone();
    let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
    debug!(%key, ttl_secs = ttl.as_secs(), "redis set");
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), CacheError> {
    let mut conn = self.conn.clone();
    let _: () = conn.del(key).await?;
    Ok(())
  }

  async fn remove_by_prefix(&self, prefix: &str) -> Result<(), CacheError> {
    let mut conn = self.conn.clone();
    let pattern = format!("{}*", prefix);
    let mut cursor: u64 = 0;
    let mut removed = 0usize;
    loop {
      let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
        .arg(cursor)
        .arg("MATCH")
        .arg(&pattern)
        .arg("COUNT")
        .arg(SCAN_BATCH)
        .query_async(&mut conn)
        .await?;
      if !keys.is_empty() {
        removed += keys.len();
        let _: () = conn.del(keys).await?;
      }
      if next == 0 {
        break;
      }
      cursor = next;
    }
    debug!(%prefix, removed, "redis prefix removal");
    Ok(())
  }
}
