use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{anyhow, Context};
use content_service::bus::{ModerationTransport, RedisTransport};
use content_service::cache::{ContentCache, RedisContentCache};
use content_service::config::Config;
use content_service::db::{ensure_schema, ContentRepository, PgContentRepository};
use content_service::handlers::{self, HealthState};
use content_service::models::Content;
use content_service::moderation::{ModerationSubmitter, VerdictConsumer};
use content_service::services::{ContentService, ContentServices};
use redis::aio::ConnectionManager;
use resilience::{with_retry, RetryConfig};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Connect to one dependency with the bootstrap retry policy.
async fn connect<T, E, F, Fut>(name: &str, config: &Config, f: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let retry = RetryConfig::fixed(
        config.bootstrap.connect_attempts,
        Duration::from_secs(config.bootstrap.connect_backoff_secs),
    );

    let connected = with_retry(retry, f)
        .await
        .map_err(|e| anyhow!("failed to connect to {}: {}", name, e))?;

    tracing::info!("Connected to {}", name);
    Ok(connected)
}

fn build_service<T: Content>(
    pool: &PgPool,
    redis: &ConnectionManager,
    config: &Config,
    submitter: &Arc<ModerationSubmitter>,
) -> Arc<ContentService<T>> {
    let repo: Arc<dyn ContentRepository<T>> = Arc::new(PgContentRepository::<T>::new(pool.clone()));
    let cache: Arc<dyn ContentCache<T>> = Arc::new(RedisContentCache::<T>::new(
        redis.clone(),
        config.cache.ttl_secs,
    ));
    let span = tracing::info_span!("content_service", kind = T::KIND.as_str());

    let service = ContentService::new(repo, cache, config.service.operation_timeout(), span);
    let service = if config.moderation.policy.requires_review(T::KIND) {
        service.with_moderation(Arc::clone(submitter))
    } else {
        service
    };

    Arc::new(service)
}

/// Content Service
///
/// Backend for a moderated content platform.
///
/// # Routes
///
/// - `/api/v1/{articles,memes,wallpapers,news}` - Create and list
/// - `/api/v1/{kind}/{key_part_1}/{key_part_2}` - Read, patch, delete
/// - `/api/v1/health`, `/api/v1/health/ready` - Liveness and readiness
/// - `/metrics` - Prometheus metrics
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            return Err(anyhow!("failed to load configuration: {}", e));
        }
    };

    tracing::info!("Starting content-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_pool = connect("PostgreSQL", &config, || {
        PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database.url)
    })
    .await?;

    ensure_schema(&db_pool)
        .await
        .context("failed to ensure content tables")?;

    let redis = connect("Redis cache", &config, || async {
        let client = redis::Client::open(config.cache.url.as_str())?;
        ConnectionManager::new(client).await
    })
    .await?;

    let transport = Arc::new(
        connect("moderation bus", &config, || {
            RedisTransport::connect(&config.moderation.bus_url)
        })
        .await?,
    );
    let transport_dyn: Arc<dyn ModerationTransport> = transport.clone();

    let submitter = Arc::new(ModerationSubmitter::new(
        Arc::clone(&transport_dyn),
        tracing::info_span!("moderation_submitter"),
    ));

    let services = ContentServices {
        articles: build_service(&db_pool, &redis, &config, &submitter),
        memes: build_service(&db_pool, &redis, &config, &submitter),
        wallpapers: build_service(&db_pool, &redis, &config, &submitter),
        news: build_service(&db_pool, &redis, &config, &submitter),
    };

    let consumer = VerdictConsumer::new(
        Arc::clone(&transport_dyn),
        services.clone(),
        config.moderation.policy.clone(),
        tracing::info_span!("verdict_consumer"),
    );
    consumer
        .start()
        .await
        .context("failed to subscribe to verdict channels")?;

    let health_state = web::Data::new(HealthState::new(db_pool.clone(), redis.clone()));
    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let http_services = services.clone();
    let server = HttpServer::new(move || {
        let services = http_services.clone();
        App::new()
            .app_data(health_state.clone())
            .configure(|cfg| handlers::register_services(cfg, &services))
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(
                "/metrics",
                web::get().to(content_service::metrics::serve_metrics),
            )
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let result = tokio::select! {
        joined = server_task => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(anyhow!("HTTP server failed: {}", e)),
            Err(e) => Err(anyhow!("HTTP server task failed: {}", e)),
        },
        _ = &mut shutdown => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
            Ok(())
        }
    };

    transport.shutdown().await;
    db_pool.close().await;
    tracing::info!("Content-service shutting down");

    result
}
