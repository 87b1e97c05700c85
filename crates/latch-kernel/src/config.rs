use latch_types::TokenFormat;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Token format used when a handler does not override one.
    pub default_token_format: TokenFormat,
    /// Applied as `now + ttl` when a deferral carries no explicit expiry.
    /// `None` leaves such records valid forever.
    pub default_ttl: Option<Duration>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            default_token_format: TokenFormat::LONG,
            default_ttl: None,
        }
    }
}
