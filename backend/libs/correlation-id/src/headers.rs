//! HTTP header boundary helpers
//!
//! ```text
//! inbound request ── extract / in_request_scope ──> task scope with ID bound
//!                                                     │
//! outbound request <── inject (current ID) ───────────┘
//! ```

use crate::config::PropagationConfig;
use crate::context::CorrelationContext;
use crate::id::CorrelationId;
use crate::propagator;
use http::{HeaderMap, HeaderValue};
use std::future::Future;
use tracing::warn;

/// Read the correlation ID from inbound headers.
///
/// Missing, blank or non-UTF-8 values count as absent; with
/// `generate_if_missing` a fresh ID is minted instead.
pub fn extract(headers: &HeaderMap, config: &PropagationConfig) -> Option<CorrelationId> {
    let raw = headers
        .get(&config.header_name)
        .and_then(|h| h.to_str().ok());

    match CorrelationId::parse(raw) {
        Some(id) => Some(id),
        None if config.generate_if_missing => Some(CorrelationId::generate()),
        None => None,
    }
}

/// Attach the current correlation ID to outbound headers
pub fn inject(headers: &mut HeaderMap, config: &PropagationConfig) {
    let Some(id) = CorrelationContext::get() else {
        return;
    };

    let value = id
        .is_header_safe()
        .then(|| HeaderValue::from_str(id.as_str()).ok())
        .flatten();
    match value {
        Some(value) => {
            headers.insert(config.header_name.clone(), value);
        }
        None => warn!(correlation_id = %id, "Correlation id is not a valid header value, skipping"),
    }
}

/// Handle one inbound request under its correlation ID.
///
/// `handler` runs as a fresh execution context: nothing bound on the serving
/// thread leaks in, and the ID disappears together with the handler.
pub async fn in_request_scope<F>(
    headers: &HeaderMap,
    config: &PropagationConfig,
    handler: F,
) -> F::Output
where
    F: Future,
{
    let id = extract(headers, config);
    CorrelationContext::scope_empty(async move {
        propagator::update(id);
        handler.await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::CORRELATION_ID_HEADER, log_context};
    use tracing_test::traced_test;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CORRELATION_ID_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_existing_header() {
        let id = extract(&headers_with("abc-1"), &PropagationConfig::default());
        assert_eq!(id.unwrap().as_str(), "abc-1");
    }

    #[test]
    fn test_extract_generates_when_missing() {
        let id = extract(&HeaderMap::new(), &PropagationConfig::default()).unwrap();
        assert_eq!(id.as_str().len(), 36);

        let id = extract(&headers_with("   "), &PropagationConfig::default()).unwrap();
        assert_eq!(id.as_str().len(), 36);
    }

    #[test]
    fn test_extract_without_generation() {
        let config = PropagationConfig {
            generate_if_missing: false,
            ..Default::default()
        };
        assert!(extract(&HeaderMap::new(), &config).is_none());
    }

    #[test]
    fn test_inject_current_id() {
        let config = PropagationConfig::default();
        let mut headers = HeaderMap::new();

        inject(&mut headers, &config);
        assert!(headers.is_empty());

        propagator::update("out-1");
        inject(&mut headers, &config);
        assert_eq!(headers.get(CORRELATION_ID_HEADER).unwrap(), "out-1");
    }

    #[traced_test]
    #[test]
    fn test_inject_skips_non_ascii_id() {
        propagator::update("zażółć");
        let mut headers = HeaderMap::new();

        inject(&mut headers, &PropagationConfig::default());
        assert!(headers.is_empty());
        assert!(logs_contain("not a valid header value"));
    }

    #[tokio::test]
    async fn test_in_request_scope_binds_for_handler_only() {
        propagator::update("server-thread");

        let (seen, field) = in_request_scope(
            &headers_with("inbound-7"),
            &PropagationConfig::default(),
            async {
                tokio::task::yield_now().await;
                (
                    CorrelationContext::get(),
                    log_context::get(CORRELATION_ID_HEADER),
                )
            },
        )
        .await;

        assert_eq!(seen.unwrap().as_str(), "inbound-7");
        assert_eq!(field.as_deref(), Some("inbound-7"));
        assert_eq!(CorrelationContext::get().unwrap().as_str(), "server-thread");
    }

    #[tokio::test]
    async fn test_in_request_scope_does_not_inherit_server_id() {
        propagator::update("server-thread");
        let config = PropagationConfig {
            generate_if_missing: false,
            ..Default::default()
        };

        let seen = in_request_scope(&HeaderMap::new(), &config, async {
            CorrelationContext::get()
        })
        .await;

        assert_eq!(seen, None);
    }
}
