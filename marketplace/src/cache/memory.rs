// academy/marketplace/src/cache/memory.rs

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::{CacheError, CacheStore};

/// Process-local cache used when no Redis URL is configured.
#[derive(Default)]
pub struct MemoryCache {
  entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    let now = Instant::now();
    self.entries.lock().values().filter(|(_, expires)| *expires > now).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl CacheStore for MemoryCache {
  async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
    let mut entries = self.entries.lock();
    match entries.get(key) {
      Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
      Some(_) => {
        entries.remove(key);
        Ok(None)
      }
      None => Ok(None),
    }
  }

  async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
    self
      .entries
      .lock()
      .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), CacheError> {
    self.entries.lock().remove(key);
    Ok(())
  }

  async fn remove_by_prefix(&self, prefix: &str) -> Result<(), CacheError> {
    self.entries.lock().retain(|key, _| !key.starts_with(prefix));
    Ok(())
  }
}
