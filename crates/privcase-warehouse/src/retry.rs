//! Bounded exponential backoff for warehouse writes
//!
//! Attempt 1 runs immediately; after a failed attempt n the caller waits
//! 2^(n-1) seconds before the next try. Exhausting the attempt budget
//! surfaces as a write failure.

use privcase_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Run `op` with bounded exponential backoff.
pub async fn with_backoff<T, F, Fut>(op_name: &str, max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(op = op_name, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts => {
                let wait = Duration::from_secs(1 << (attempt - 1));
                warn!(
                    op = op_name,
                    attempt,
                    wait_secs = wait.as_secs(),
                    error = %e,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                error!(op = op_name, attempts = max_attempts, error = %e, "all attempts failed");
                return Err(Error::write(format!(
                    "{op_name} failed after {max_attempts} attempts: {e}"
                )));
            }
        }
    }
}
