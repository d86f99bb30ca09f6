pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use std::sync::Arc;
use tokio::task;

pub use error::{Error, Result};

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub seating: services::SeatingService,
}

impl AppState {
    /// Connects to Postgres and Redis, runs migrations and warms the cache in
    /// the background.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        tracing::info!("Database connected");

        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        tracing::info!("Redis connected");

        let cache = cache::CacheService::new(redis.clone(), db.clone(), config.redis.ttl_seconds);
        let importer = services::SheetImporter::new(&config.sheets)?;
        let seating = services::SeatingService::new(
            db.clone(),
            cache.clone(),
            importer,
            config.seating.seats_per_graduate,
        );

        let state = Arc::new(Self {
            db,
            redis,
            cache,
            config,
            seating,
        });

        let state_for_bg = state.clone();
        task::spawn(async move {
            state_for_bg.cache.warmup_cache().await;
        });

        Ok(state)
    }
}
