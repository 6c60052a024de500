use redis::{AsyncCommands, Client};
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppResult;

/// Keys for cached catalog metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    TagVocabulary,
    WarningVocabulary,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::TagVocabulary => write!(f, "vocab:tags"),
            CacheKey::WarningVocabulary => write!(f, "vocab:warnings"),
        }
    }
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Write queued for the background writer task.
struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Redis-backed cache with non-blocking writes.
///
/// Reads go straight to Redis; writes are handed to a background task so a
/// slow Redis never delays a response. Constructed once in the composition
/// root and injected wherever caching is needed.
#[derive(Clone)]
pub struct Cache {
    client: Client,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Handle for gracefully shutting down the cache writer.
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates the cache and spawns its background writer task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer_client = client.clone();
        tokio::spawn(async move {
            Self::writer_task(writer_client, write_rx, shutdown_rx).await;
        });

        (Self { client, write_tx }, CacheWriterHandle { shutdown_tx })
    }

    /// Processes queued writes until shutdown, then drains what is left.
    async fn writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer task started");

        loop {
            tokio::select! {
                Some(write) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, write).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    while let Ok(write) = write_rx.try_recv() {
                        if let Err(e) = Self::write_to_redis(&client, write).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }
                    tracing::debug!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(client: &Client, write: PendingWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(write.key, write.value, write.ttl).await?;
        Ok(())
    }

    /// Retrieves a cached value, `None` on a miss.
    ///
    /// Deserialization failures surface as errors so callers can decide
    /// whether a poisoned entry matters; callers in this crate treat any
    /// cache error as a miss.
    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let value = serde_json::from_str(&json).map_err(|e| {
                    crate::error::AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Queues a value for caching without blocking the caller.
    ///
    /// The write happens on the background task; there is no confirmation.
    pub fn put_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl_secs: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            value: json,
            ttl: ttl_secs,
        };

        if self.write_tx.send(write).is_err() {
            tracing::error!("Cache writer task is gone, dropping write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display() {
        assert_eq!(CacheKey::TagVocabulary.to_string(), "vocab:tags");
        assert_eq!(CacheKey::WarningVocabulary.to_string(), "vocab:warnings");
    }

    #[tokio::test]
    async fn test_get_degrades_to_error_without_redis() {
        // Port 1 is never a redis server; the read must fail, not hang.
        let client = Client::open("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client);

        let result: AppResult<Option<Vec<String>>> = cache.get(&CacheKey::TagVocabulary).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_put_in_background_never_blocks_or_panics() {
        let client = Client::open("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client);

        cache.put_in_background(
            &CacheKey::WarningVocabulary,
            &vec!["cheating".to_string()],
            60,
        );
        handle.shutdown().await;
    }
}
