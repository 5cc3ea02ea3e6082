//! Fixed backoff for idempotent GETs (spec §4.1 "Retries").
//!
//! No crate in the stack implements this exact three-step schedule, so it's
//! hand-rolled rather than pulled from `backoff` or similar.

use std::time::Duration;

use tracing::debug;

use crate::error::ClientError;

/// The fixed retry schedule: up to 3 attempts total, waiting 100ms then
/// 400ms then 1.6s between them.
const BACKOFF: [Duration; 2] = [Duration::from_millis(100), Duration::from_millis(400)];
const MAX_ATTEMPTS: usize = 3;

/// Whether an error is worth retrying: transport failure or one of
/// 502/503/504 (spec §4.1).
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    matches!(
        status.as_u16(),
        502 | 503 | 504
    )
}

/// Retry `op` up to [`MAX_ATTEMPTS`] times with the fixed backoff schedule,
/// for idempotent operations only. `op` returns `Ok(Err(_))` for a
/// registry-level error that should not be retried (e.g. 404), and
/// `Err(_)` for a transport/retryable error.
pub async fn retry_idempotent<T, F, Fut>(mut op: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < MAX_ATTEMPTS && is_retryable_error(&err) => {
                let wait = BACKOFF[attempt];
                debug!(attempt, ?wait, "retrying registry request");
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_retryable_error(err: &ClientError) -> bool {
    matches!(
        err,
        ClientError::RegistryUnreachable(_) | ClientError::RegistryTimeout(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn retries_transport_errors_up_to_three_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), ClientError> = retry_idempotent(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ClientError::RegistryUnreachable("boom".into()))
                } else {
                    Ok(())
                }
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), ClientError> = retry_idempotent(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::RegistryUnreachable("still down".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable_errors() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), ClientError> = retry_idempotent(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::SubjectNotFound("orders-value".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn identifies_retryable_gateway_statuses() {
        assert!(is_retryable_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(reqwest::StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_retryable_status(reqwest::StatusCode::NOT_FOUND));
    }
}
