//! Shared HTTP Client Module
//!
//! One lazily built client for all oracle calls, so TLS sessions and pooled
//! connections are reused across sorts in the same process.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Global HTTP client for OpenRouter calls
///
/// 120s timeout: web-search-enabled completions can take a while. This is
/// the oracle timeout; a call that exceeds it surfaces as "no plan".
pub static OPENROUTER_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .expect("Failed to create OpenRouter HTTP client")
});

/// Get the global OpenRouter HTTP client
#[inline]
pub fn openrouter_client() -> &'static Client {
    &OPENROUTER_CLIENT
}
