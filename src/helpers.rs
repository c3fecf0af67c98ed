use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::warn;

use crate::error::Error;

/// Runs `call` up to `attempts` times, sleeping `backoff` between attempts.
/// Only transient errors are retried; once attempts run out they surface as
/// [`Error::UpstreamUnavailable`].
pub async fn retry<T, F, Fut>(attempts: u32, backoff: Duration, mut call: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 1;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() => {
                if attempt >= attempts {
                    return Err(match error {
                        Error::UpstreamUnavailable(_) => error,
                        error => Error::UpstreamUnavailable(format!(
                            "{} after {} attempts",
                            error, attempts
                        )),
                    });
                }

                warn!("attempt {} of {} failed: {}", attempt, attempts, error);
                attempt += 1;
                sleep(backoff).await;
            },
            Err(error) => return Err(error),
        }
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02X}", byte)).collect()
}
