//! Bounded retry for asset fetches
//!
//! Only asset fetches are retried. Generation, synthesis and transcription
//! failures are fatal on the first attempt.
//!
//! **Backoff Strategy:**
//! - Initial delay: configured (default 100ms)
//! - Multiplier: 2.0
//! - Max delay: 2000ms

use crate::services::asset_store::{AssetError, AssetStore};
use std::time::{Duration, Instant};

const MAX_BACKOFF_MS: u64 = 2000;

/// Fetch `filename`, retrying transient failures up to `max_attempts` total attempts
///
/// Non-transient errors (not found, invalid name, read failure) return
/// immediately. `max_attempts` of 0 is treated as 1.
pub async fn fetch_with_retry(
    store: &dyn AssetStore,
    filename: &str,
    max_attempts: u32,
    initial_backoff: Duration,
) -> Result<Vec<u8>, AssetError> {
    let max_attempts = max_attempts.max(1);
    let start_time = Instant::now();
    let mut backoff_ms = initial_backoff.as_millis() as u64;
    let mut attempt = 0;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(asset = filename, attempt, "Retrying asset fetch");
        }

        match store.fetch(filename).await {
            Ok(bytes) => {
                if attempt > 1 {
                    tracing::info!(
                        asset = filename,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Asset fetch succeeded after retry"
                    );
                }
                return Ok(bytes);
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    asset = filename,
                    attempt,
                    max_attempts,
                    backoff_ms,
                    error = %err,
                    "Transient asset fetch failure, will retry"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
            Err(err) => {
                if err.is_transient() {
                    tracing::error!(
                        asset = filename,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Asset fetch failed: retries exhausted"
                    );
                }
                return Err(err);
            }
        }
    }
}
