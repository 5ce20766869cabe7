//! Retry policy for Shopify GraphQL calls.
//!
//! Throttling answers carry their own wait: the `Retry-After` header on a
//! 429, or the base backoff for a `THROTTLED` GraphQL error. That hint wins
//! over the exponential schedule when it is longer. Network failures use
//! the exponential schedule alone.

use std::future::Future;
use std::time::Duration;

use crate::error::ShopifyError;

/// Upper bound on a server-supplied wait. A misbehaving proxy must not
/// park a storefront request for minutes.
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Seconds to wait before retry number `attempt + 1`, or `None` when the
/// error would fail the same way again (user errors, bad bodies, non-429
/// statuses).
fn retry_delay_secs(err: &ShopifyError, attempt: u32, backoff_base_secs: u64) -> Option<u64> {
    let exponential = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
    match err {
        ShopifyError::RateLimited {
            retry_after_secs, ..
        } => Some(exponential.max((*retry_after_secs).min(MAX_RETRY_AFTER_SECS))),
        ShopifyError::Http(_) => Some(exponential),
        _ => None,
    }
}

/// Runs `operation`, retrying throttled and network failures up to
/// `max_retries` more times. The last error is returned once retries run
/// out.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ShopifyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ShopifyError>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let delay_secs = match retry_delay_secs(&err, attempt, backoff_base_secs) {
            Some(secs) if attempt < max_retries => secs,
            _ => return Err(err),
        };
        let throttled = matches!(err, ShopifyError::RateLimited { .. });
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            throttled,
            error = %err,
            "transient Shopify error, retrying"
        );
        if delay_secs > 0 {
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn throttled_for(retry_after_secs: u64) -> ShopifyError {
        ShopifyError::RateLimited {
            shop: "acme.myshopify.com".to_owned(),
            retry_after_secs,
        }
    }

    fn throttled() -> ShopifyError {
        ShopifyError::RateLimited {
            shop: "acme.myshopify.com".to_owned(),
            retry_after_secs: 0,
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ShopifyError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_throttling_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(throttled())
                } else {
                    Ok::<u32, ShopifyError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(2, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ShopifyError>(throttled())
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(ShopifyError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn graphql_errors_are_not_retried() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ShopifyError>(ShopifyError::GraphQl {
                    operation: "products".to_owned(),
                    messages: vec!["Field 'x' doesn't exist".to_owned()],
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ShopifyError::GraphQl { .. })));
    }

    #[tokio::test]
    async fn deserialize_errors_are_not_retried() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                let e = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
                Err::<u32, ShopifyError>(ShopifyError::Deserialize {
                    context: "test".to_owned(),
                    source: e,
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ShopifyError::Deserialize { .. })));
    }

    #[test]
    fn throttle_hint_wins_over_shorter_backoff() {
        assert_eq!(retry_delay_secs(&throttled_for(5), 0, 1), Some(5));
        assert_eq!(retry_delay_secs(&throttled_for(5), 3, 1), Some(8));
        assert_eq!(retry_delay_secs(&throttled_for(0), 1, 2), Some(4));
    }

    #[test]
    fn throttle_hint_is_capped() {
        assert_eq!(
            retry_delay_secs(&throttled_for(3_600), 0, 0),
            Some(MAX_RETRY_AFTER_SECS)
        );
    }

    #[test]
    fn only_throttling_and_transport_errors_get_a_delay() {
        let graphql = ShopifyError::GraphQl {
            operation: "products".to_owned(),
            messages: vec![],
        };
        let status = ShopifyError::UnexpectedStatus {
            status: 500,
            url: "https://acme.myshopify.com".to_owned(),
        };
        assert_eq!(retry_delay_secs(&graphql, 0, 1), None);
        assert_eq!(retry_delay_secs(&status, 0, 1), None);
    }
}
