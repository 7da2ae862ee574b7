//! Fixed-interval reconnect policy

use crate::config::ReconnectConfig;
use std::time::Duration;

/// What the driver should do after a connection attempt or session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then try again
    RetryAfter(Duration),
    /// Attempt budget exhausted; the connection is closed for good
    GiveUp,
}

/// Counts consecutive failures since the last successful handshake
#[derive(Debug, Clone)]
pub struct RetryTracker {
    policy: ReconnectConfig,
    retries: u32,
}

impl RetryTracker {
    pub fn new(policy: ReconnectConfig) -> Self {
        Self { policy, retries: 0 }
    }

    /// Reconnects scheduled since the last successful handshake
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn on_connected(&mut self) {
        self.retries = 0;
    }

    /// Record a failure. Once `max_retries` reconnects have been scheduled
    /// without a handshake, the next failure is the last one.
    pub fn on_failure(&mut self) -> RetryDecision {
        if self.retries >= self.policy.max_retries {
            return RetryDecision::GiveUp;
        }

        self.retries += 1;
        RetryDecision::RetryAfter(self.policy.delay())
    }
}
