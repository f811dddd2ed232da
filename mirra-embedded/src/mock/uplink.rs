use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::gateway::Uplink;

/// Uplink that records publishes and fails on demand.
#[derive(Debug, Default)]
pub struct MockUplink {
    connected: bool,
    pub published: Vec<(String, Vec<u8>)>,
    pub connect_attempts: u32,
    pub refuse_connections: bool,
    /// Publishes to fail before succeeding again
    pub failing_publishes: usize,
}

impl MockUplink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uplink whose broker never accepts a connection.
    pub fn refusing() -> Self {
        Self {
            refuse_connections: true,
            ..Self::default()
        }
    }

    pub fn failing(publishes: usize) -> Self {
        Self {
            failing_publishes: publishes,
            ..Self::default()
        }
    }
}

impl Uplink for MockUplink {
    fn connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self, _client_id: &str) -> bool {
        self.connect_attempts += 1;
        self.connected = !self.refuse_connections;
        self.connected
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        if !self.connected {
            return false;
        }
        if self.failing_publishes > 0 {
            self.failing_publishes -= 1;
            return false;
        }
        self.published.push((topic.to_string(), payload.to_vec()));
        true
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }
}
