// academy/marketplace/src/events/in_process.rs

//! Tokio-channel bus for a single process.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{DomainEvent, EventBus, EventBusError};

/// Publishing half. Dropping every clone of it closes the channel and lets the
/// dispatcher drain and stop.
#[derive(Clone)]
pub struct InProcessBus {
  sender: mpsc::UnboundedSender<DomainEvent>,
}

/// Consuming half, handed to [`super::EventDispatcher::spawn`].
pub struct EventReceiver {
  pub(crate) receiver: mpsc::UnboundedReceiver<DomainEvent>,
}

impl InProcessBus {
  pub fn new() -> (Self, EventReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, EventReceiver { receiver })
  }
}

fn closed(event: &DomainEvent) -> EventBusError {
  EventBusError::Closed {
    event: event.name(),
    order_id: event.order_id(),
  }
}

#[async_trait]
impl EventBus for InProcessBus {
  async fn publish(&self, event: DomainEvent) -> Result<(), EventBusError> {
    debug!(event = event.name(), order_id = event.order_id(), "Publishing event.");
    self.sender.send(event).map_err(|e| closed(&e.0))
  }

  async fn schedule(&self, event: DomainEvent, delay: Duration) -> Result<(), EventBusError> {
    if self.sender.is_closed() {
      return Err(closed(&event));
    }
    debug!(event = event.name(), order_id = event.order_id(), delay_secs = delay.as_secs(), "Scheduling event.");

    // The timer holds a weak handle so pending timers never keep the bus alive.
    let weak = self.sender.downgrade();
    tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      let delivered = weak.upgrade().map(|sender| sender.send(event.clone()).is_ok()).unwrap_or(false);
      if !delivered {
        warn!(event = event.name(), order_id = event.order_id(), "Bus closed before scheduled event was due.");
      }
    });
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::CancelOrderEvent;

  #[tokio::test]
  async fn scheduled_event_arrives_after_delay() {
    let (bus, mut rx) = InProcessBus::new();
    let event = DomainEvent::CancelOrder(CancelOrderEvent { order_id: 9 });

    bus.schedule(event.clone(), Duration::from_millis(30)).await.unwrap();
    assert!(rx.receiver.try_recv().is_err());

    let received = tokio::time::timeout(Duration::from_secs(2), rx.receiver.recv()).await.unwrap();
    assert_eq!(received, Some(event));
  }

  #[tokio::test]
  async fn publish_fails_once_receiver_is_gone() {
    let (bus, rx) = InProcessBus::new();
    drop(rx);
    let err = bus
      .publish(DomainEvent::CancelOrder(CancelOrderEvent { order_id: 1 }))
      .await
      .unwrap_err();
    assert!(matches!(err, EventBusError::Closed { order_id: 1, .. }));
  }
}
