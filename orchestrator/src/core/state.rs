//! Per-machine connection state and reconnect pacing

use chrono::{DateTime, Duration, Utc};
use shared::ConnectionState;

/// Connection state machine of one polling worker
///
/// Reconnection uses a fixed window: a machine that never attempted
/// connects at once, afterwards attempts are at least `backoff` apart.
/// A lost connection starts the window at the moment of the loss.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    state: ConnectionState,
    last_attempt: Option<DateTime<Utc>>,
    backoff: Duration,
}

impl ConnectionTracker {
    pub fn new(backoff: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_attempt: None,
            backoff,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn should_attempt(&self, now: DateTime<Utc>) -> bool {
        if self.is_connected() {
            return false;
        }
        match self.last_attempt {
            None => true,
            Some(last) => now - last >= self.backoff,
        }
    }

    pub fn begin_attempt(&mut self, now: DateTime<Utc>) {
        self.state = ConnectionState::Connecting;
        self.last_attempt = Some(now);
    }

    pub fn succeeded(&mut self) {
        self.state = ConnectionState::Connected;
        self.last_attempt = None;
    }

    pub fn failed(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    pub fn lost(&mut self, now: DateTime<Utc>) {
        self.state = ConnectionState::ConnectionLost;
        self.last_attempt.get_or_insert(now);
    }
}
