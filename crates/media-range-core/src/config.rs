//! Operational configuration.
//!
//! `PACKET_SIZE` and `NEAR_WINDOW` stay as plain defaults here but are
//! overridable — mainly so tests don't need to push 64KiB bodies through a
//! mock server to exercise multi-packet logic. Plain struct with `Default`
//! plus public-field mutation, same shape as `ChunkedStreamingDiskConfig::new(url, dir)`.

use std::time::Duration;

use crate::packet::{DEFAULT_NEAR_WINDOW, DEFAULT_PACKET_SIZE};

#[derive(Debug, Clone)]
pub struct MediaResourceConfig {
    /// Size of each cache packet, in bytes.
    pub packet_size: usize,
    /// Packets ahead of the worker's write position still worth finishing
    /// before aborting and re-planning around a newer promise.
    pub near_window: usize,
    /// Per-request connect timeout.
    pub connect_timeout: Duration,
    /// Per-request overall timeout.
    pub request_timeout: Duration,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Retry budget for a single byte range before surfacing
    /// `ReadError::Transfer` to waiting promises.
    pub max_retries: u32,
    /// Initial backoff before the first retry.
    pub retry_backoff_base: Duration,
    /// Backoff ceiling; doubles each retry up to this cap.
    pub retry_backoff_max: Duration,
}

impl Default for MediaResourceConfig {
    fn default() -> Self {
        Self {
            packet_size: DEFAULT_PACKET_SIZE,
            near_window: DEFAULT_NEAR_WINDOW,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("media-range-core/", env!("CARGO_PKG_VERSION")).to_string(),
            max_retries: 3,
            retry_backoff_base: Duration::from_millis(250),
            retry_backoff_max: Duration::from_secs(5),
        }
    }
}

impl MediaResourceConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = MediaResourceConfig::default();
        assert_eq!(cfg.packet_size, 65_536);
        assert_eq!(cfg.near_window, 64);
    }
}
