//! Polling timing configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing knobs of the polling core
///
/// Durations are stored as milliseconds so the struct reads naturally from
/// JSON or environment-driven CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub poll_interval_ms: u64,
    /// Period of the process-data log tick
    pub log_interval_ms: u64,
    /// Delay before the first process-data log
    pub log_initial_delay_ms: u64,
    pub reconnect_backoff_ms: u64,
    /// An alarm not seen for this long is cleared
    pub alarm_timeout_ms: u64,
    /// How long a new step number must hold before it is confirmed
    pub step_debounce_ms: u64,
    pub shutdown_grace_ms: u64,
    /// Bound on every single device request
    pub device_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            log_interval_ms: 5_000,
            log_initial_delay_ms: 1_000,
            reconnect_backoff_ms: 10_000,
            alarm_timeout_ms: 30_000,
            step_debounce_ms: 2_000,
            shutdown_grace_ms: 3_000,
            device_timeout_ms: 5_000,
        }
    }
}

impl PollingConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = millis(interval);
        self
    }

    pub fn with_log_interval(mut self, interval: Duration) -> Self {
        self.log_interval_ms = millis(interval);
        self
    }

    pub fn with_log_initial_delay(mut self, delay: Duration) -> Self {
        self.log_initial_delay_ms = millis(delay);
        self
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff_ms = millis(backoff);
        self
    }

    pub fn with_alarm_timeout(mut self, timeout: Duration) -> Self {
        self.alarm_timeout_ms = millis(timeout);
        self
    }

    pub fn with_step_debounce(mut self, debounce: Duration) -> Self {
        self.step_debounce_ms = millis(debounce);
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_ms = millis(grace);
        self
    }

    pub fn with_device_timeout(mut self, timeout: Duration) -> Self {
        self.device_timeout_ms = millis(timeout);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }

    pub fn log_initial_delay(&self) -> Duration {
        Duration::from_millis(self.log_initial_delay_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }

    pub fn reconnect_backoff(&self) -> chrono::Duration {
        wall_clock(self.reconnect_backoff_ms)
    }

    pub fn alarm_timeout(&self) -> chrono::Duration {
        wall_clock(self.alarm_timeout_ms)
    }

    pub fn step_debounce(&self) -> chrono::Duration {
        wall_clock(self.step_debounce_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn wall_clock(ms: u64) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}
