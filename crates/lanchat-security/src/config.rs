//! Security tuning knobs.

use std::time::Duration;

/// Limits applied to every connection before any message handling.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Inbound frames allowed per peer address within one window.
    pub max_attempts_per_window: usize,

    /// Length of the sliding rate-limit window.
    pub rate_window: Duration,

    /// Largest inbound frame accepted, in bytes. Larger frames are
    /// rejected before JSON parsing.
    pub max_frame_len: usize,

    /// Longest nickname kept after sanitization.
    pub max_nickname_len: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_window: 10,
            rate_window: Duration::from_secs(60),
            max_frame_len: 100_000,
            max_nickname_len: 30,
        }
    }
}
