use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};
use mirra_api::wire::MAX_MESSAGE_LENGTH;
use mirra_api::{MacAddress, Message, MessageType, wire};

use super::Radio;
use crate::config::TransportConfig;
use crate::error::{Error, Result};

/// Filter and timing for a single [`RadioTransport::receive`] call.
#[derive(Debug, Clone)]
pub struct ReceiveOptions {
    pub message_type: MessageType,
    pub timeout: Duration,
    /// REPEAT requests sent before giving up
    pub repeat_attempts: u8,
    /// Only accept messages from this address, broadcast accepts anyone
    pub source: MacAddress,
    /// Extra listening time before the first slice
    pub pre_listen: Duration,
    /// Accept messages addressed to anyone
    pub promiscuous: bool,
}

impl ReceiveOptions {
    pub fn new(message_type: MessageType, timeout: Duration) -> Self {
        Self {
            message_type,
            timeout,
            repeat_attempts: 0,
            source: MacAddress::BROADCAST,
            pre_listen: Duration::from_ticks(0),
            promiscuous: false,
        }
    }

    pub fn with_attempts(mut self, repeat_attempts: u8) -> Self {
        self.repeat_attempts = repeat_attempts;
        self
    }

    pub fn from_source(mut self, source: MacAddress) -> Self {
        self.source = source;
        self
    }

    pub fn with_pre_listen(mut self, pre_listen: Duration) -> Self {
        self.pre_listen = pre_listen;
        self
    }

    pub fn promiscuous(mut self) -> Self {
        self.promiscuous = true;
        self
    }
}

/// Message layer over a [`Radio`] with application level retransmission.
///
/// The last non-REPEAT message sent is kept so a peer's REPEAT can be
/// answered while listening for something else.
pub struct RadioTransport<R: Radio> {
    radio: R,
    mac: MacAddress,
    send_delay: Duration,
    last_sent: Option<Message>,
    buffer: [u8; MAX_MESSAGE_LENGTH],
}

impl<R: Radio> RadioTransport<R> {
    pub fn new(radio: R, config: &TransportConfig) -> Self {
        let mac = radio.mac_address();
        Self {
            radio,
            mac,
            send_delay: Duration::from_millis(config.send_delay_ms as u64),
            last_sent: None,
            buffer: [0; MAX_MESSAGE_LENGTH],
        }
    }

    pub fn mac_address(&self) -> MacAddress {
        self.mac
    }

    pub fn last_sent(&self) -> Option<&Message> {
        self.last_sent.as_ref()
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Sends a message and remembers it for REPEAT requests.
    pub async fn send(&mut self, message: &Message) -> Result<()> {
        self.transmit(message).await?;
        if !message.is_type(MessageType::Repeat) {
            self.last_sent = Some(message.clone());
        }
        Ok(())
    }

    /// Waits for a message matching `options`.
    ///
    /// The timeout is split into `repeat_attempts + 1` slices. After each
    /// empty slice but the last a REPEAT is sent to the expected peer.
    pub async fn receive(&mut self, options: &ReceiveOptions) -> Result<Message> {
        let result = self.receive_with_repeats(options).await;
        self.sleep();
        result
    }

    /// Puts the radio to sleep, failures are only logged.
    pub fn sleep(&mut self) {
        if let Err(e) = self.radio.sleep() {
            log::warn!("Radio failed to enter sleep: {:?}", e);
        }
    }

    async fn receive_with_repeats(&mut self, options: &ReceiveOptions) -> Result<Message> {
        let slice = options.timeout / (options.repeat_attempts as u32 + 1);
        let mut deadline = Instant::now() + options.pre_listen;

        for attempt in 0..=options.repeat_attempts {
            deadline += slice;

            while let Some(message) = self.listen_until(deadline).await? {
                if let Some(message) = self.filter(message, options).await? {
                    return Ok(message);
                }
            }

            if attempt < options.repeat_attempts {
                let peer = self.repeat_peer(options);
                log::debug!(
                    "No {} received, requesting repeat from {}",
                    options.message_type,
                    peer
                );
                self.transmit(&Message::repeat(self.mac, peer)).await?;
            }
        }

        log::debug!("Timed out waiting for {}", options.message_type);
        Err(Error::TimeoutError)
    }

    /// Returns the next decodable frame heard before `deadline`.
    async fn listen_until(&mut self, deadline: Instant) -> Result<Option<Message>> {
        loop {
            self.radio.start_receive().map_err(|e| {
                log::error!("Radio failed to enter receive: {:?}", e);
                Error::RadioError
            })?;

            if let Either::Second(()) =
                select(self.radio.wait_for_interrupt(), Timer::at(deadline)).await
            {
                return Ok(None);
            }

            if !self.radio.crc_valid() {
                log::warn!("CRC error, frame dropped");
                continue;
            }

            let length = self.radio.packet_length().min(MAX_MESSAGE_LENGTH);
            self.radio
                .read_data(&mut self.buffer[..length])
                .map_err(|e| {
                    log::error!("Radio read failed: {:?}", e);
                    Error::RadioError
                })?;

            match wire::decode(&self.buffer[..length]) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => log::warn!("Frame dropped: {}", e),
            }
        }
    }

    /// Applies the receive filter. REPEAT requests for our last message are
    /// answered here and swallowed, unless the caller waits for a REPEAT.
    async fn filter(&mut self, message: Message, options: &ReceiveOptions) -> Result<Option<Message>> {
        let dest = message.dest();
        if !options.promiscuous && dest != self.mac && !dest.is_broadcast() {
            return Ok(None);
        }

        if message.is_type(MessageType::Repeat) {
            let pending = self
                .last_sent
                .clone()
                .filter(|last| last.dest() == message.source());
            if let Some(last) = pending {
                log::debug!("Repeating {} to {}", last.message_type(), last.dest());
                self.transmit(&last).await?;
                if options.message_type != MessageType::Repeat {
                    return Ok(None);
                }
            }
        }

        if !options.message_type.accepts(message.message_type()) {
            return Ok(None);
        }

        if !options.source.is_broadcast() && message.source() != options.source {
            return Ok(None);
        }

        Ok(Some(message))
    }

    fn repeat_peer(&self, options: &ReceiveOptions) -> MacAddress {
        if !options.source.is_broadcast() {
            return options.source;
        }
        self.last_sent
            .as_ref()
            .map(|last| last.dest())
            .unwrap_or(MacAddress::BROADCAST)
    }

    async fn transmit(&mut self, message: &Message) -> Result<()> {
        Timer::after(self.send_delay).await;

        let frame = wire::encode(message);
        log::debug!("Sending {} to {}", message.message_type(), message.dest());
        self.radio.transmit(&frame).await.map_err(|e| {
            log::error!("Radio transmit failed: {:?}", e);
            Error::RadioError
        })
    }
}
