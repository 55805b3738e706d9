// academy/marketplace/src/pipelines/mod.rs

//! Every multi-step workflow of the marketplace, registered once per process.

use crate::errors::AppError;
use academy_flow::FlowRegistry;

pub mod common_steps;
pub mod contexts;

pub mod cancel_order_pipeline;
pub mod create_order_pipeline;
pub mod login_pipeline;
pub mod refresh_pipeline;
pub mod register_pipeline;
pub mod settlement_pipeline;

pub fn register_all_pipelines(flows: &FlowRegistry<AppError>) {
  tracing::info!("Registering pipelines...");

  register_pipeline::register_registration_pipeline(flows);
  login_pipeline::register_login_pipeline(flows);
  refresh_pipeline::register_refresh_pipeline(flows);
  create_order_pipeline::register_create_order_pipeline(flows);
  cancel_order_pipeline::register_cancel_order_pipeline(flows);
  settlement_pipeline::register_settlement_pipeline(flows);

  tracing::info!("All application pipelines registered.");
}
