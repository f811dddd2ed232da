use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use mirra_api::wire::{self, FrameHeader};
use mirra_api::MacAddress;

use super::Gateway;
use crate::board::Platform;
use crate::error::{Error, Result};

/// Upstream message broker connection.
#[allow(async_fn_in_trait)]
pub trait Uplink {
    fn connected(&self) -> bool;

    async fn connect(&mut self, client_id: &str) -> bool;

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> bool;

    async fn disconnect(&mut self) {}
}

/// Topic a node's readouts are published on.
pub fn topic(prefix: &str, gateway: MacAddress, node: MacAddress) -> String {
    format!("{}/{}/{}", prefix, gateway, node)
}

impl<P: Platform, U: Uplink> Gateway<P, U> {
    /// Publishes every pending readout and marks the delivered ones.
    ///
    /// Stops early when the uplink cannot connect or after too many publish
    /// failures; what was published so far stays marked.
    pub async fn upload_period(&mut self) -> Result<usize> {
        log::info!("Starting upload period");
        let gateway = self.mac_address();
        let client_id = gateway.to_string();

        let pending = self.data_log().pending()?;
        let mut published = Vec::new();
        let mut errors = 0;
        let mut outcome = Ok(());

        for (index, message) in pending {
            if !self.uplink.connected() && !self.connect_uplink(&client_id).await {
                log::error!("Uplink unavailable, aborting upload");
                outcome = Err(Error::UplinkFault);
                break;
            }

            let frame = wire::encode(&message);
            let node_topic = topic(&self.config.topic_prefix, gateway, message.source());
            if self.uplink.publish(&node_topic, &frame[FrameHeader::SIZE..]).await {
                published.push(index);
                continue;
            }

            errors += 1;
            log::warn!("Publish to {} failed ({} errors)", node_topic, errors);
            if errors >= self.config.max_upload_errors {
                log::error!("Too many publish errors, aborting upload");
                outcome = Err(Error::UplinkFault);
                break;
            }
        }
        self.uplink.disconnect().await;

        let max_size = self.config.max_data_file_size;
        let mut data_log = self.data_log();
        data_log.mark_uploaded(&published)?;
        data_log.prune(max_size)?;
        self.state.comm_periods = 0;

        log::info!("Upload period done, {} readouts published", published.len());
        outcome.map(|_| published.len())
    }

    async fn connect_uplink(&mut self, client_id: &str) -> bool {
        for attempt in 1..=self.config.uplink_attempts {
            if self.uplink.connect(client_id).await {
                return true;
            }
            log::warn!("Uplink connect attempt {} failed", attempt);
        }
        false
    }
}
