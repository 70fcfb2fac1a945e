use actix_web::{web, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use ga_api::{create_app, middleware::create_cors, AppState};
use ga_core::repositories::{InMemorySessionStore, SessionStore};
use ga_core::services::{
    CodeGenerator, EscalationConfig, EscalationEngine, EscalationScheduler, OtpService,
    SessionCleanupConfig, SessionCleanupService, StrategyTable,
};
use ga_infra::{build_registry, RedisClient, RedisSessionStore};
use ga_shared::{AppConfig, LogFormat, LoggingConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging());

    info!(environment = %config.environment, "Starting GoAuthy API server");

    // Startup fails here on a bad strategy or an unresolvable channel
    let strategy = StrategyTable::from_config(&config.strategy)?;
    let escalation = EscalationConfig::from_config(&config.strategy, &config.delivery)?;
    let generator = CodeGenerator::new(&config.strategy.alphabet, config.strategy.otp_length)?;
    let registry = build_registry(&config.delivery, &config.twilio)?;

    let shutdown = CancellationToken::new();
    let store = build_store(&config, &shutdown).await?;

    let engine = Arc::new(
        EscalationEngine::new(strategy, registry, store, escalation)?.with_generator(generator),
    );

    let (scheduler, scheduler_handle) = EscalationScheduler::new(Arc::clone(&engine));
    let scheduler_task = tokio::spawn(scheduler.run(shutdown.child_token()));

    let otp = Arc::new(OtpService::new(engine).with_scheduler(scheduler_handle));
    let state = web::Data::new(AppState::new(otp, shutdown.clone()));

    let bind_address = config.server.bind_address();
    info!(address = %bind_address, "Server will bind");

    let environment = config.environment;
    let server_config = config.server.clone();
    let mut server = HttpServer::new(move || {
        create_app(state.clone(), create_cors(environment, &server_config))
    })
    .shutdown_timeout(config.server.shutdown_timeout)
    .disable_signals();
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }
    let server = server.bind(&bind_address)?.run();

    let server_handle = server.handle();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        signal_token.cancel();
        server_handle.stop(true).await;
    });

    server.await?;

    shutdown.cancel();
    if tokio::time::timeout(Duration::from_secs(5), scheduler_task).await.is_err() {
        tracing::warn!("Escalation scheduler did not stop in time");
    }

    info!("Server stopped");
    Ok(())
}

/// Session store selected by configuration
///
/// The in-memory store gets a background purge that stops with `shutdown`.
async fn build_store(
    config: &AppConfig,
    shutdown: &CancellationToken,
) -> anyhow::Result<Arc<dyn SessionStore>> {
    if config.redis.enabled {
        let client = RedisClient::new(config.redis.clone())
            .await
            .context("Failed to connect to Redis")?;
        info!("Using Redis session store");
        Ok(Arc::new(RedisSessionStore::new(client)))
    } else {
        info!("Using in-memory session store");
        let store = Arc::new(InMemorySessionStore::new());
        let cleanup = SessionCleanupService::new(
            Arc::clone(&store),
            SessionCleanupConfig {
                interval: Duration::from_secs(config.redis.cleanup_interval.max(1)),
                retention: chrono::Duration::seconds(config.redis.grace_ttl as i64),
            },
        );
        tokio::spawn(cleanup.run(shutdown.child_token()));
        Ok(store)
    }
}

/// Install the global subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_file(logging.source_location)
        .with_line_number(logging.source_location);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}
