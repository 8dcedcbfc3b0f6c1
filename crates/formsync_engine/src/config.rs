//! Configuration for a session.

use std::time::Duration;

/// Default quiet period before queued actions are pushed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session ID, as issued by the authority.
    pub session_id: String,
    /// Quiet period after the last local action before the queue is pushed.
    ///
    /// Zero flushes on the next scheduler tick.
    pub debounce: Duration,
}

impl SessionConfig {
    /// Creates a new session configuration.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Sets the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_builder() {
        let config = SessionConfig::new("s-42").with_debounce(Duration::from_millis(50));

        assert_eq!(config.session_id, "s-42");
        assert_eq!(config.debounce, Duration::from_millis(50));
    }

    #[test]
    fn default_debounce() {
        assert_eq!(SessionConfig::new("s").debounce, Duration::from_millis(500));
        assert_eq!(SessionConfig::default().session_id, "");
    }
}
