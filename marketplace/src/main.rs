// academy/marketplace/src/main.rs

use academy_market::cache::{CacheStore, MemoryCache, RedisCache};
use academy_market::config::{AppConfig, LogFormat};
use academy_market::events::{EventBus, EventDispatcher, InProcessBus, OrderLifecycleConsumer, RetryPolicy};
use academy_market::seed::seed_database;
use academy_market::state::AppState;
use academy_market::store::Stores;
use academy_market::web::configure_app_routes;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Text => builder.init(),
  }
}

async fn connect_stores(config: &AppConfig) -> anyhow::Result<Stores> {
  let Some(database_url) = config.database_url.as_deref() else {
    tracing::warn!("DATABASE_URL not set; using in-memory stores. Data is lost on exit.");
    return Ok(Stores::in_memory());
  };

  let pool = PgPoolOptions::new()
    .max_connections(config.database_max_connections)
    .connect(database_url)
    .await
    .context("connecting to the database")?;
  tracing::info!("Successfully connected to the database.");

  if config.apply_schema {
    sqlx::raw_sql(include_str!("../schema.sql"))
      .execute(&pool)
      .await
      .context("applying schema.sql")?;
    tracing::info!("Database schema applied.");
  }
  Ok(Stores::postgres(pool))
}

async fn connect_cache(config: &AppConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
  match config.redis_url.as_deref() {
    Some(url) => Ok(Arc::new(RedisCache::connect(url).await.context("connecting to Redis")?)),
    None => {
      tracing::info!("REDIS_URL not set; using the in-process cache.");
      Ok(Arc::new(MemoryCache::new()))
    }
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let config = Arc::new(AppConfig::from_env().context("loading configuration")?);
  init_tracing(config.log_format);
  tracing::info!(?config, "Starting academy marketplace server...");

  let stores = connect_stores(&config).await?;
  if config.seed_db {
    seed_database(&stores).await.context("seeding the database")?;
  }
  let cache = connect_cache(&config).await?;

  let (bus, receiver) = InProcessBus::new();
  let bus: Arc<dyn EventBus> = Arc::new(bus);
  let app_state = AppState::new(config.clone(), stores, cache, bus);

  let consumer = OrderLifecycleConsumer::new(app_state.flows.clone(), app_state.stores.clone());
  let dispatcher = EventDispatcher::new(Arc::new(consumer), RetryPolicy::from(&config.event_retry)).spawn(receiver);

  let server_address = format!("{}:{}", config.server_host, config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  let server_state = app_state.clone();
  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(server_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("binding {}", server_address))?
  .run()
  .await?;

  // The last bus handle goes with the state; the dispatcher then drains and exits.
  drop(app_state);
  if let Err(join_err) = dispatcher.await {
    tracing::error!(error = %join_err, "Event dispatcher ended abnormally.");
  }
  tracing::info!("Server stopped.");
  Ok(())
}
