// src/http.rs
// Shared HTTP client for upstream and mail calls

use std::time::Duration;

/// Default connect timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Idle connections kept per host
const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Create the shared HTTP client.
///
/// No whole-request timeout is set: completion streams can legitimately run
/// for minutes. The relay bounds time-to-first-byte and per-chunk idle time
/// itself.
pub fn create_shared_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .user_agent(concat!("folio-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
