//! Shared HTTP client construction and transport error mapping.
//!
//! All three backends (tracker, generator, minter) issue single bounded
//! request-response calls with no internal retry loop; timeouts are enforced
//! here so no pipeline stage can hang indefinitely.

use crate::error::BackendError;
use reqwest::Client;
use std::time::Duration;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the HTTP client used for backend calls.
pub fn build_http_client() -> Result<Client, BackendError> {
    Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| BackendError::RequestFailed(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport-level reqwest error onto the backend error taxonomy.
pub fn map_transport_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        BackendError::RequestFailed(format!("Connection error: {}", error))
    } else {
        BackendError::RequestFailed(format!("HTTP error: {}", error))
    }
}

/// Map a non-success HTTP status plus response body onto the error taxonomy.
pub fn map_status_error(status: reqwest::StatusCode, body: String) -> BackendError {
    match status.as_u16() {
        401 | 403 => BackendError::AuthFailed(body),
        429 => BackendError::RateLimited(body),
        _ => BackendError::RequestFailed(format!("Status {}: {}", status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = map_status_error(reqwest::StatusCode::UNAUTHORIZED, "nope".to_string());
        assert!(matches!(err, BackendError::AuthFailed(_)));

        let err = map_status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow".to_string());
        assert!(matches!(err, BackendError::RateLimited(_)));

        let err = map_status_error(reqwest::StatusCode::BAD_GATEWAY, "boom".to_string());
        assert!(matches!(err, BackendError::RequestFailed(_)));
    }
}
