// ─── Shared HTTP Client ───

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

pub const APP_USER_AGENT: &str = concat!("craftvault/", env!("CARGO_PKG_VERSION"));

/// Hard ceiling for any single request issued during an install attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the shared HTTP client.
///
/// Compression is disabled: Mojang CDN content is already compressed and
/// the SHA-1 checks need the exact bytes on the wire.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(headers)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
}
