//! HTTP status handling shared by the vendor adapters.

use sqlwright_core::ProviderError;

/// Seconds suggested to callers after a 429.
const RATE_LIMIT_BACKOFF_SECS: u64 = 5;

/// Map a non-success status to a provider error.
pub(crate) fn status_error(status: u16, body: String, vendor: &str) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: RATE_LIMIT_BACKOFF_SECS,
        },
        401 | 403 => ProviderError::AuthenticationFailed(format!(
            "{vendor} rejected the API key or its permissions"
        )),
        404 => ProviderError::ModelNotFound(body),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

/// Map a transport failure.
pub(crate) fn send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

pub(crate) fn client(timeout: std::time::Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("failed to create HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlwright_core::ErrorKind;

    #[test]
    fn status_mapping() {
        let rate = status_error(429, String::new(), "OpenAI");
        assert!(matches!(rate, ProviderError::RateLimited { retry_after_secs: 5 }));
        assert_eq!(rate.kind(), ErrorKind::RateLimit);

        let auth = status_error(401, String::new(), "Anthropic");
        assert!(matches!(auth, ProviderError::AuthenticationFailed(_)));
        assert!(matches!(
            status_error(403, String::new(), "Anthropic"),
            ProviderError::AuthenticationFailed(_)
        ));

        let missing = status_error(404, "no such model".into(), "OpenAI");
        assert!(matches!(missing, ProviderError::ModelNotFound(ref m) if m == "no such model"));

        let server = status_error(502, "bad gateway".into(), "OpenAI");
        assert!(matches!(server, ProviderError::ApiError { status_code: 502, .. }));
        assert_eq!(server.kind(), ErrorKind::ProviderError);
    }
}
