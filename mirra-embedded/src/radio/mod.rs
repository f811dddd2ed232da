mod transport;

pub use transport::*;

use mirra_api::MacAddress;

/// Packet radio driver.
///
/// Mirrors the interrupt-driven flow of a LoRa transceiver: arm receive, wait
/// for the DIO interrupt, then inspect the packet that triggered it.
#[allow(async_fn_in_trait)]
pub trait Radio {
    type Error: core::fmt::Debug;

    /// Factory address of this device
    fn mac_address(&self) -> MacAddress;

    async fn transmit(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    fn start_receive(&mut self) -> Result<(), Self::Error>;

    /// Resolves once a packet has been received.
    async fn wait_for_interrupt(&mut self);

    fn packet_length(&mut self) -> usize;

    fn read_data(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error>;

    fn crc_valid(&mut self) -> bool;

    fn sleep(&mut self) -> Result<(), Self::Error>;
}
