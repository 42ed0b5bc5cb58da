use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};

use deadpool_postgres::Pool;

use crate::config::Config;
use crate::error::Result;
use crate::mailer::Mailer;
use crate::storage::backend::StorageBackend;

/// The number of concurrent proxy/download streams allowed.
pub const DOWNLOAD_BUFFER_SLOTS: usize = 64;

/// A rate limiter for downloads.
#[derive(Clone)]
pub struct DownloadRateLimiter {
    semaphore: Arc<Semaphore>,
}

impl DownloadRateLimiter {
    /// Creates a new `DownloadRateLimiter`.
    pub fn new(max_buffer_slots: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_buffer_slots)),
        }
    }

    /// Acquires a permit from the semaphore.
    pub async fn acquire(&self) -> tokio::sync::SemaphorePermit<'_> {
        self.semaphore.acquire().await.unwrap()
    }

    /// Returns the number of available permits.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Sliding-window counters for register/login abuse, keyed by IP or email.
#[derive(Clone, Default)]
pub struct AuthThrottle {
    windows: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl AuthThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an attempt and reports the remaining lockout, if any.
    ///
    /// Returns `None` when the attempt is allowed, or the seconds until
    /// the oldest counted attempt leaves the window.
    pub async fn check(&self, key: &str, max_attempts: usize, window: Duration) -> Option<u64> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let attempts = windows.entry(key.to_string()).or_default();
        attempts.retain(|t| now.duration_since(*t) < window);

        if attempts.len() >= max_attempts {
            let oldest = attempts[0];
            let retry_after = window.saturating_sub(now.duration_since(oldest));
            return Some(retry_after.as_secs().max(1));
        }

        attempts.push(now);
        None
    }
}

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The application's configuration.
    pub config: Config,
    /// The configured file storage backend.
    pub storage: Arc<dyn StorageBackend>,
    /// The outgoing-mail collaborator.
    pub mailer: Arc<Mailer>,
    /// The download rate limiter.
    pub download_limiter: DownloadRateLimiter,
    /// Register/login throttle windows.
    pub auth_throttle: AuthThrottle,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized with deadpool-postgres");

        let storage = crate::storage::backend::from_config(config).await?;

        let mailer = Arc::new(Mailer::new(config)?);

        let download_limiter = DownloadRateLimiter::new(DOWNLOAD_BUFFER_SLOTS);
        tracing::info!("✅ Download RateLimiter initialized");

        Ok(AppState {
            db,
            config: config.clone(),
            storage,
            mailer,
            download_limiter,
            auth_throttle: AuthThrottle::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn throttle_opens_after_limit() {
        let throttle = AuthThrottle::new();
        let window = Duration::from_secs(60);

        assert!(throttle.check("ip:1.2.3.4", 2, window).await.is_none());
        assert!(throttle.check("ip:1.2.3.4", 2, window).await.is_none());
        assert!(throttle.check("ip:1.2.3.4", 2, window).await.is_some());
        // A different key is unaffected.
        assert!(throttle.check("ip:5.6.7.8", 2, window).await.is_none());
    }
}
