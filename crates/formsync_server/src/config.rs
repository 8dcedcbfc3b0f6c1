//! Server configuration.

/// Configuration for the reference authority.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of actions accepted in one update request.
    pub max_update_batch: usize,
    /// Answer clients that send an outdated revision with the full state
    /// instead of a delta.
    pub resync_stale_clients: bool,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new() -> Self {
        Self {
            max_update_batch: 100,
            resync_stale_clients: true,
        }
    }

    /// Sets the maximum update batch size.
    pub fn with_max_update_batch(mut self, size: usize) -> Self {
        self.max_update_batch = size;
        self
    }

    /// Enables or disables full-state answers to stale clients.
    pub fn with_resync_stale_clients(mut self, enabled: bool) -> Self {
        self.resync_stale_clients = enabled;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
