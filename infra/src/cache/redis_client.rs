//! Redis client
//!
//! Thin wrapper over a multiplexed connection with connect-time retry,
//! retried reads and single-shot script execution. The session store is the
//! only consumer; it decides which operations are safe to repeat.

use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult, Script};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use ga_shared::config::RedisConfig;

use crate::InfrastructureError;

/// Backoff cap for connection and read retries
const MAX_RETRY_DELAY_MS: u64 = 5_000;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis client with connection retry logic
#[derive(Clone)]
pub struct RedisClient {
    connection: MultiplexedConnection,
    config: RedisConfig,
}

impl RedisClient {
    /// Connect using the retry policy from `config`
    pub async fn new(config: RedisConfig) -> Result<Self, InfrastructureError> {
        info!(url = %mask_url(&config.url), "Creating Redis client");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection =
            Self::connect_with_retry(client, config.max_retries.max(1), config.retry_delay_ms).await?;

        info!("Redis client created successfully");
        Ok(Self { connection, config })
    }

    async fn connect_with_retry(
        client: Client,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            match client.get_multiplexed_async_connection().await {
                Ok(connection) => return Ok(connection),
                Err(e) if attempts < max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
                }
                Err(e) => {
                    error!("Failed to connect to Redis after {} attempts: {}", attempts, e);
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Read one hash field
    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, InfrastructureError> {
        let key = key.to_string();
        let field = field.to_string();
        self.execute_with_retry(move |mut conn| {
            let key = key.clone();
            let field = field.clone();
            Box::pin(async move { conn.hget::<_, _, Option<String>>(key, field).await })
        })
        .await
        .map_err(InfrastructureError::Cache)
    }

    /// Run a Lua script once
    ///
    /// Scripts that write are never retried here: a lost reply does not tell
    /// whether the write landed, and the caller is better placed to decide.
    pub async fn run_script<T>(
        &self,
        script: &Script,
        keys: &[&str],
        args: &[String],
    ) -> Result<T, InfrastructureError>
    where
        T: redis::FromRedisValue,
    {
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(*key);
        }
        for arg in args {
            invocation.arg(arg.as_str());
        }

        let mut conn = self.connection.clone();
        invocation.invoke_async(&mut conn).await.map_err(|e| {
            error!("Redis script failed: {}", e);
            InfrastructureError::Cache(e)
        })
    }

    /// PING the server
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        let result = self
            .execute_with_retry(|mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await;

        match result {
            Ok(response) if response == "PONG" => Ok(true),
            Ok(response) => {
                warn!("Redis health check returned unexpected response: {}", response);
                Ok(false)
            }
            Err(e) => {
                error!("Redis health check failed: {}", e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    async fn execute_with_retry<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let max_retries = self.config.max_retries.max(1);
        let mut attempts = 0;
        let mut delay = self.config.retry_delay_ms;

        loop {
            attempts += 1;
            match operation(self.connection.clone()).await {
                Ok(result) => return Ok(result),
                Err(e) if attempts < max_retries && is_retriable_error(&e) => {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Whether a Redis error is transient
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Hide credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let (Some(at_pos), Some(proto_end)) = (url.rfind('@'), url.find("://")) {
        if at_pos > proto_end {
            return format!("{}****{}", &url[..proto_end + 3], &url[at_pos..]);
        }
    }
    url.to_string()
}
