// academy/marketplace/src/state.rs

use academy_flow::FlowRegistry;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::events::EventBus;
use crate::pipelines;
use crate::services::{CatalogService, TokenService};
use crate::store::Stores;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub stores: Stores,
  pub catalog: Arc<CatalogService>,
  pub tokens: Arc<TokenService>,
  pub bus: Arc<dyn EventBus>,
  pub flows: Arc<FlowRegistry<AppError>>,
}

impl AppState {
  /// Wires the services and registers every pipeline.
  pub fn new(config: Arc<AppConfig>, stores: Stores, cache: Arc<dyn CacheStore>, bus: Arc<dyn EventBus>) -> Self {
    let catalog = Arc::new(CatalogService::new(stores.catalog.clone(), cache, config.course_cache_ttl));
    let tokens = Arc::new(TokenService::new(&config.jwt));

    let flows = Arc::new(FlowRegistry::<AppError>::new());
    pipelines::register_all_pipelines(&flows);

    Self {
      config,
      stores,
      catalog,
      tokens,
      bus,
      flows,
    }
  }
}
