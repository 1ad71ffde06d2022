use agora_core::{AppConfig, CacheConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use anyhow::Context;
use background_service::{
    install_panic_hook, BackgroundService, EventDispatcher, HotnessRecalculator, InMemoryEventBus,
    WorkerPool,
};
use database::Database;
use feed_cache::{CacheAside, CacheStore, MemoryStore, RedisStore};
use feed_engine::FeedService;
use ranking::{Algorithm, RankingEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Runs the background side of the feed service until Ctrl-C.
///
/// Events arrive on an in-process bus. This binary only subscribes to it and nothing here
/// publishes, so the workers stay idle until a presentation layer in the same process publishes
/// to `bus` or calls `EventDispatcher::dispatch`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config_path, explicit) = config_path();
    let config = AppConfig::load(&config_path, explicit)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    install_panic_hook();

    info!("Starting Agora feed service");

    let algorithm: Algorithm = config
        .ranking
        .algorithm
        .parse()
        .context("selecting ranking algorithm")?;
    info!("Ranking with {}", algorithm);

    let db = Arc::new(
        Database::connect(&config.database.url, config.database.max_connections)
            .await
            .context("connecting to database")?,
    );
    db.run_migrations().await.context("running migrations")?;
    db.health_check().await.context("database health check")?;

    let store = connect_cache(&config.cache).await;
    let cache = CacheAside::new(store);
    let search = search_client::from_config(&config.search).context("building search client")?;

    let feeds = FeedService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        cache.clone(),
        config.feed.clone(),
        config.cache.post_ttl(),
    );
    let recalculator = HotnessRecalculator::new(
        db.clone(),
        RankingEngine::new(algorithm),
        search,
        cache.clone(),
    );

    let bus = Arc::new(InMemoryEventBus::new());
    let dispatcher = EventDispatcher::new(
        bus.clone(),
        WorkerPool::from_config(&config.workers),
        feeds,
        recalculator,
    );
    let service = BackgroundService::new(dispatcher, config.workers.shutdown_timeout());
    service.start().await.context("starting background service")?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutdown requested");

    if !service.stop().await {
        warn!("Some background tasks were abandoned during shutdown");
    }
    bus.close().await;
    info!("Cache metrics at shutdown: {:?}", cache.metrics().snapshot());
    db.close().await;

    Ok(())
}

/// First CLI argument, then the environment, then the default path.
fn config_path() -> (PathBuf, bool) {
    if let Some(arg) = std::env::args().nth(1) {
        return (PathBuf::from(arg), true);
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return (PathBuf::from(path), true);
    }
    (PathBuf::from(DEFAULT_CONFIG_PATH), false)
}

/// The configured cache store. An unreachable cache is not fatal; the service runs degraded on an
/// in-process store.
async fn connect_cache(config: &CacheConfig) -> Arc<dyn CacheStore> {
    let store: Arc<dyn CacheStore> = match config.backend.as_str() {
        "redis" => match RedisStore::connect(&config.redis_url).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(
                    "Redis at {} is unavailable, using in-process cache: {}",
                    config.redis_url, e
                );
                Arc::new(MemoryStore::new())
            }
        },
        _ => Arc::new(MemoryStore::new()),
    };

    if let Err(e) = store.ping().await {
        warn!("Cache health check failed, continuing degraded: {}", e);
    }
    store
}
