use alloc::vec;
use alloc::vec::Vec;

use embassy_time::{Duration, Instant};
use mirra_api::{
    MacAddress, Message, MessagePayload, MessageType, SensorData, TimeConfig, next_scheduled,
};

use super::SensorNode;
use crate::board::Platform;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::radio::ReceiveOptions;

impl<P: Platform> SensorNode<P> {
    /// Listens for a gateway HELLO and completes registration.
    ///
    /// Keeps listening until the discovery window closes; a handshake that
    /// stalls after HELLO_REPLY re-arms the listener.
    pub async fn discovery_listen(&mut self) -> Result<()> {
        let deadline =
            Instant::now() + Duration::from_millis(self.config.discovery_timeout_ms as u64);
        let mac = self.mac_address();

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::TimeoutError);
            }

            log::info!("Awaiting discovery message");
            let hello = self
                .board
                .transport
                .receive(&ReceiveOptions::new(MessageType::Hello, deadline - now))
                .await?;
            let gateway = hello.source();
            log::info!("Discovery message from {}", gateway);

            self.board
                .transport
                .send(&Message::new(mac, gateway, MessagePayload::HelloReply))
                .await?;

            let options = ReceiveOptions::new(
                MessageType::TimeConfig,
                Duration::from_millis(self.config.time_config_timeout_ms as u64),
            )
            .with_attempts(self.config.time_config_attempts)
            .from_source(gateway);

            let config = match self.board.transport.receive(&options).await {
                Ok(reply) => match reply.as_time_config() {
                    Some(config) => *config,
                    None => continue,
                },
                Err(Error::TimeoutError) => {
                    log::warn!("No TIME_CONFIG from {}, listening again", gateway);
                    continue;
                }
                Err(e) => return Err(e),
            };

            self.board
                .transport
                .send(&Message::new(mac, gateway, MessagePayload::AckTime))
                .await?;
            self.apply_time_config(gateway, &config);
            self.drain_repeats(gateway).await;

            log::info!(
                "Registered with {}, next comm at {}",
                gateway,
                self.state.schedule.next_comm_time
            );
            return Ok(());
        }
    }

    /// Uploads buffered readouts to the gateway and renews the schedule.
    ///
    /// Sends at most `max_messages` pending records, the final one flagged
    /// last. With nothing pending a single empty readout keeps the slot
    /// alive. Acknowledged records are marked uploaded even if the period
    /// fails later; on failure the comm time is advanced naively.
    pub async fn comm_period(&mut self) -> Result<usize> {
        let gateway = self.state.gateway;
        let now = self.board.now();
        let deadline = now
            .max(self.state.schedule.next_comm_time)
            .saturating_add(self.state.schedule.comm_duration);
        log::info!("Starting comm period with {}", gateway);

        let mut acknowledged = Vec::new();
        let outcome = match self.next_batch(now) {
            Ok(batch) => self.exchange(gateway, batch, deadline, &mut acknowledged).await,
            Err(e) => {
                log::error!("Failed to read data log: {}", e);
                Err(e)
            }
        };

        if let Err(e) = self.data_log().mark_uploaded(&acknowledged) {
            log::error!("Failed to mark uploaded records: {}", e);
        }

        match outcome {
            Ok(()) => {
                log::info!("Comm period done, {} records delivered", acknowledged.len());
                Ok(acknowledged.len())
            }
            Err(e) => {
                let schedule = &mut self.state.schedule;
                schedule.next_comm_time = next_scheduled(
                    self.board.clock.read_epoch(),
                    schedule.next_comm_time.saturating_add(schedule.comm_interval),
                    schedule.comm_interval,
                );
                log::warn!(
                    "Comm period failed ({}), next attempt at {}",
                    e,
                    schedule.next_comm_time
                );
                Err(e)
            }
        }
    }

    /// Pending records for one period, or a single empty readout that keeps
    /// the slot alive.
    fn next_batch(&mut self, now: u32) -> Result<Vec<(Option<usize>, SensorData)>> {
        let limit = self.state.schedule.max_messages.max(1) as usize;
        let batch: Vec<(Option<usize>, SensorData)> = self
            .data_log()
            .pending()?
            .into_iter()
            .take(limit)
            .filter_map(|(index, message)| {
                message
                    .as_sensor_data()
                    .cloned()
                    .map(|data| (Some(index), data))
            })
            .collect();

        if batch.is_empty() {
            return Ok(vec![(None, SensorData::new(now, Vec::new()))]);
        }
        Ok(batch)
    }

    async fn exchange(
        &mut self,
        gateway: MacAddress,
        batch: Vec<(Option<usize>, SensorData)>,
        deadline: u32,
        acknowledged: &mut Vec<usize>,
    ) -> Result<()> {
        let mac = self.mac_address();
        let ack_options = ReceiveOptions::new(
            MessageType::AckData,
            Duration::from_millis(self.config.sensor_data_timeout_ms as u64),
        )
        .with_attempts(self.config.sensor_data_attempts)
        .from_source(gateway);
        let config_options = ReceiveOptions::new(
            MessageType::TimeConfig,
            Duration::from_millis(self.config.time_config_timeout_ms as u64),
        )
        .with_attempts(self.config.time_config_attempts)
        .from_source(gateway);

        let last_index = batch.len() - 1;
        for (position, (record, data)) in batch.into_iter().enumerate() {
            if self.board.now() > deadline {
                log::warn!("Comm period overran its slot");
                return Err(Error::TimeoutError);
            }

            let last = position == last_index;
            let message =
                Message::new(mac, gateway, MessagePayload::SensorData(data)).with_last(last);
            self.board.transport.send(&message).await?;

            if !last {
                self.board.transport.receive(&ack_options).await?;
                acknowledged.extend(record);
                continue;
            }

            let reply = self.board.transport.receive(&config_options).await?;
            acknowledged.extend(record);

            let config = *reply.as_time_config().ok_or(Error::TimeoutError)?;
            self.board
                .transport
                .send(&Message::new(mac, gateway, MessagePayload::AckTime))
                .await?;
            self.apply_time_config(gateway, &config);
            self.drain_repeats(gateway).await;
        }

        Ok(())
    }

    fn apply_time_config(&mut self, gateway: MacAddress, config: &TimeConfig) {
        self.board.clock.write_epoch(config.cur_time);
        self.state.gateway = gateway;
        let comm_duration = self.comm_duration(config.max_messages);
        self.state.schedule.apply(config, comm_duration);
        log::debug!(
            "Schedule: sample at {} every {}s, comm at {} every {}s",
            self.state.schedule.next_sample_time,
            self.state.schedule.sample_interval,
            self.state.schedule.next_comm_time,
            self.state.schedule.comm_interval
        );
    }

    /// Stays in receive after the final ACK_TIME so a lost acknowledgement
    /// can still be repeated for the gateway. Returns once one REPEAT has
    /// been answered.
    async fn drain_repeats(&mut self, gateway: MacAddress) {
        let options = ReceiveOptions::new(
            MessageType::Repeat,
            Duration::from_millis(self.config.time_config_timeout_ms as u64),
        )
        .from_source(gateway);
        let _ = self.board.transport.receive(&options).await;
    }
}
