//! reqwest plumbing shared by the backend and routing clients.

use std::time::Duration;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use crate::models::error::TrackerError;

const USER_AGENT: &str = concat!("vehicle-tracker/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration) -> Result<Client, TrackerError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .tcp_nodelay(true)
        .build()
        .map_err(|e| TrackerError::Transport(format!("Failed to create HTTP client: {}", e)))
}

/// Prefixes `http://` to bare `host:port` addresses and strips trailing slashes.
pub fn normalize_base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

/// Rejects non-2xx responses and decodes the body as JSON.
pub async fn decode_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, TrackerError> {
    let status = response.status();
    debug!(url = url, status = status.as_u16(), "HTTP response received");

    if !status.is_success() {
        warn!(url = url, status = status.as_u16(), "HTTP error status");
        return Err(TrackerError::UpstreamRejection { status: status.as_u16(), url: url.to_string() });
    }

    let body = response.bytes().await.map_err(|e| {
        warn!(url = url, error = %e, "Failed to read response body");
        TrackerError::Transport(format!("Failed to read response: {}", e))
    })?;
    trace!(url = url, bytes = body.len(), "HTTP response body read");

    Ok(serde_json::from_slice(&body)?)
}

pub fn transport_error(url: &str, e: reqwest::Error) -> TrackerError {
    warn!(
        url = url,
        error = %e,
        is_connect = e.is_connect(),
        is_timeout = e.is_timeout(),
        "HTTP request failed"
    );
    TrackerError::Transport(format!("Request to {} failed: {}", url, e))
}
