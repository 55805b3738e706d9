// academy/marketplace/src/events/dispatcher.rs

//! Delivers events from the bus to an [`EventHandler`], one task per delivery,
//! retrying failures with incremental backoff.

use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::{DomainEvent, EventHandler, EventReceiver};
use crate::config::EventRetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, the first delivery included.
  pub limit: u32,
  pub initial: Duration,
  pub increment: Duration,
}

impl RetryPolicy {
  /// Wait before the attempt that follows failed attempt `attempt` (1-based).
  pub fn delay_after(&self, attempt: u32) -> Duration {
    self.initial + self.increment * attempt.saturating_sub(1)
  }
}

impl From<&EventRetryConfig> for RetryPolicy {
  fn from(cfg: &EventRetryConfig) -> Self {
    Self {
      limit: cfg.limit,
      initial: cfg.initial,
      increment: cfg.increment,
    }
  }
}

pub struct EventDispatcher {
  handler: Arc<dyn EventHandler>,
  policy: RetryPolicy,
}

impl EventDispatcher {
  pub fn new(handler: Arc<dyn EventHandler>, policy: RetryPolicy) -> Self {
    Self { handler, policy }
  }

  /// Runs until every publisher is dropped, then waits for in-flight deliveries.
  pub fn spawn(self, events: EventReceiver) -> JoinHandle<()> {
    tokio::spawn(self.run(events))
  }

  async fn run(self, events: EventReceiver) {
    let EventReceiver { mut receiver } = events;
    let mut in_flight = FuturesUnordered::new();
    info!(retry_limit = self.policy.limit, "Event dispatcher started.");

    loop {
      tokio::select! {
        next = receiver.recv() => match next {
          Some(event) => {
            let handler = Arc::clone(&self.handler);
            in_flight.push(tokio::spawn(deliver(handler, self.policy, event)));
          }
          None => break,
        },
        Some(joined) = in_flight.next(), if !in_flight.is_empty() => {
          if let Err(join_err) = joined {
            error!(error = %join_err, "Event delivery task panicked.");
          }
        }
      }
    }

    while let Some(joined) = in_flight.next().await {
      if let Err(join_err) = joined {
        error!(error = %join_err, "Event delivery task panicked.");
      }
    }
    info!("Event dispatcher stopped.");
  }
}

async fn deliver(handler: Arc<dyn EventHandler>, policy: RetryPolicy, event: DomainEvent) {
  let span = info_span!("event_delivery", event = event.name(), order_id = event.order_id());
  async move {
    let mut attempt = 1;
    loop {
      match handler.handle(&event).await {
        Ok(()) => {
          debug!(attempt, "Event handled.");
          return;
        }
        Err(err) if attempt >= policy.limit => {
          // Dead-lettering is external; the payload is logged so it can be replayed.
          let payload = serde_json::to_string(&event).unwrap_or_default();
          error!(attempt, error = %err, %payload, "Event handling failed on final attempt; giving up.");
          return;
        }
        Err(err) => {
          let delay = policy.delay_after(attempt);
          warn!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "Event handling failed; will redeliver.");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }
  .instrument(span)
  .await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::AppError;
  use crate::events::{CancelOrderEvent, EventBus, InProcessBus};
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicU32, Ordering};

  struct FlakyHandler {
    calls: AtomicU32,
    succeed_on: u32,
  }

  #[async_trait]
  impl EventHandler for FlakyHandler {
    async fn handle(&self, _event: &DomainEvent) -> Result<(), AppError> {
      let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
      if call >= self.succeed_on {
        Ok(())
      } else {
        Err(AppError::Internal(format!("attempt {} failed", call)))
      }
    }
  }

  fn fast_policy() -> RetryPolicy {
    RetryPolicy {
      limit: 3,
      initial: Duration::from_millis(5),
      increment: Duration::from_millis(5),
    }
  }

  #[test]
  fn backoff_grows_by_increment() {
    let policy = RetryPolicy {
      limit: 3,
      initial: Duration::from_millis(1000),
      increment: Duration::from_millis(2000),
    };
    assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
    assert_eq!(policy.delay_after(2), Duration::from_millis(3000));
    assert_eq!(policy.delay_after(3), Duration::from_millis(5000));
  }

  async fn run_with(succeed_on: u32) -> u32 {
    let handler = Arc::new(FlakyHandler {
      calls: AtomicU32::new(0),
      succeed_on,
    });
    let (bus, receiver) = InProcessBus::new();
    let task = EventDispatcher::new(handler.clone(), fast_policy()).spawn(receiver);

    bus
      .publish(DomainEvent::CancelOrder(CancelOrderEvent { order_id: 1 }))
      .await
      .unwrap();
    drop(bus);

    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    handler.calls.load(Ordering::SeqCst)
  }

  #[tokio::test]
  async fn failing_handler_is_retried_until_success() {
    assert_eq!(run_with(2).await, 2);
  }

  #[tokio::test]
  async fn retries_stop_at_limit() {
    assert_eq!(run_with(u32::MAX).await, 3);
  }
}
