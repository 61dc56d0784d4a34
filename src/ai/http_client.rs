//! Shared HTTP Client Module
//!
//! Provides a global, lazy-initialized HTTP client for Gemini calls so repeated
//! organize runs reuse pooled connections and TLS sessions.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Default request timeout; a batch of images can take a while to classify
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Global HTTP client for Gemini API calls
pub static GEMINI_CLIENT: Lazy<Client> = Lazy::new(|| {
    build_client(DEFAULT_TIMEOUT).expect("Failed to create Gemini HTTP client")
});

fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .build()
}

/// Get the global Gemini HTTP client
#[inline]
pub fn gemini_client() -> &'static Client {
    &GEMINI_CLIENT
}

/// The shared client when the default timeout is wanted, a dedicated one otherwise
pub fn client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
    if timeout == DEFAULT_TIMEOUT {
        Ok(gemini_client().clone())
    } else {
        build_client(timeout)
    }
}
