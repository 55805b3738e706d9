// academy/marketplace/src/events/consumers.rs

use academy_flow::{ContextData, FlowRegistry, PipelineResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{DomainEvent, EventHandler};
use crate::errors::AppError;
use crate::pipelines::contexts::{CancelOrderCtxData, SettlePaymentCtxData};
use crate::store::Stores;

/// Drives orders forward in reaction to bus events.
///
/// Holds the pipeline registry and the stores rather than the whole
/// application state, so the bus publisher is not kept alive by its own consumer.
pub struct OrderLifecycleConsumer {
  flows: Arc<FlowRegistry<AppError>>,
  stores: Stores,
}

impl OrderLifecycleConsumer {
  pub fn new(flows: Arc<FlowRegistry<AppError>>, stores: Stores) -> Self {
    Self { flows, stores }
  }
}

#[async_trait]
impl EventHandler for OrderLifecycleConsumer {
  #[instrument(name = "consumer::order_lifecycle", skip(self, event), fields(event = event.name(), order_id = event.order_id()), err(Display))]
  async fn handle(&self, event: &DomainEvent) -> Result<(), AppError> {
    match event {
      DomainEvent::OrderCreated(created) => {
        info!(
          user_id = created.user_id,
          total = %created.total_amount,
          courses = created.courses.len(),
          "Order created; awaiting payment."
        );
      }
      DomainEvent::CancelOrder(cancel) => {
        let ctx = ContextData::new(CancelOrderCtxData::new(self.stores.clone(), cancel.order_id));
        let result = self.flows.run(ctx.clone()).await?;
        debug!(?result, cancelled = ctx.read().cancelled, "Cancellation timer handled.");
      }
      DomainEvent::PaymentCompleted(payment) => {
        let ctx = ContextData::new(SettlePaymentCtxData::new(self.stores.clone(), payment.clone()));
        let result = self.flows.run(ctx.clone()).await?;
        let (applied, enrolled) = {
          let guard = ctx.read();
          (guard.applied_status, guard.enrolled)
        };
        if result == PipelineResult::Stopped {
          info!("Payment recorded without changing the order.");
        }
        debug!(?result, ?applied, enrolled, "Payment settled.");
      }
    }
    Ok(())
  }
}
