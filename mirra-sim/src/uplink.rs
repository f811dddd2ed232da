use mirra_embedded::Uplink;

/// Uplink that logs every publish instead of sending it to a broker.
#[derive(Debug, Default)]
pub struct LogUplink {
    connected: bool,
    pub published: usize,
}

impl Uplink for LogUplink {
    fn connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self, client_id: &str) -> bool {
        tracing::info!("Uplink connected as {}", client_id);
        self.connected = true;
        true
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        tracing::info!("Publish {} ({} bytes)", topic, payload.len());
        self.published += 1;
        true
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }
}
