use alloc::vec::Vec;

use embassy_time::Duration;
use mirra_api::{
    MacAddress, Message, MessagePayload, MessageType, TimeConfig, comm_period_length,
    first_sample_time, max_messages,
};

use super::{Gateway, NodeRecord, Uplink};
use crate::board::Platform;
use crate::error::{Error, Result};
use crate::radio::ReceiveOptions;

impl<P: Platform, U: Uplink> Gateway<P, U> {
    /// Broadcasts HELLO until nobody answers or the table is full.
    pub async fn discovery_round(&mut self) -> usize {
        let mut registered = 0;
        loop {
            match self.discovery().await {
                Ok(mac) => {
                    log::info!("Node {} registered", mac);
                    registered += 1;
                }
                Err(Error::TimeoutError) => break,
                Err(e) => {
                    log::warn!("Discovery stopped: {}", e);
                    break;
                }
            }
        }
        log::info!("Discovery round done, {} new nodes", registered);
        registered
    }

    /// Registers one node: HELLO, HELLO_REPLY, TIME_CONFIG, ACK_TIME.
    ///
    /// The new node's comm slot follows the last slot in the table, keeping
    /// the table ordered by comm time. A node registering again loses its
    /// old slot and is appended like a new one.
    pub async fn discovery(&mut self) -> Result<MacAddress> {
        if self.nodes.is_full() {
            log::info!("Node table full, skipping discovery");
            return Err(Error::NodeTableFull);
        }

        let mac = self.mac_address();
        log::info!("Sending discovery message");
        self.board.transport.send(&Message::hello(mac)).await?;

        let reply = self
            .board
            .transport
            .receive(&ReceiveOptions::new(
                MessageType::HelloReply,
                Duration::from_millis(self.config.discovery_timeout_ms as u64),
            ))
            .await?;
        let node = reply.source();
        log::info!("Discovery reply from {}", node);

        let now = self.board.now();
        let config = TimeConfig {
            cur_time: now,
            sample_interval: self.config.sample_interval,
            sample_rounding: self.config.sample_rounding,
            sample_offset: self.config.sample_offset,
            comm_interval: self.config.comm_interval,
            comm_time: self.next_free_slot(now),
            max_messages: max_messages(self.config.comm_interval, self.config.sample_interval),
        };
        log::debug!(
            "Node {} samples from {}, first comm at {}",
            node,
            first_sample_time(
                now,
                config.sample_interval,
                config.sample_rounding,
                config.sample_offset
            ),
            config.comm_time
        );

        self.send_time_config(node, &config).await?;

        if let Some(index) = self.nodes.position(node) {
            log::warn!("Node {} registered again, moving it to the last slot", node);
            self.nodes.remove(index);
        }
        self.nodes.push(NodeRecord::new(node, &config))?;
        self.nodes
            .store(&mut self.board.fs, &self.config.nodes_path)?;
        Ok(node)
    }

    /// Comm time for a node registered at `now`.
    fn next_free_slot(&self, now: u32) -> u32 {
        match self.nodes.last() {
            None => now.saturating_add(self.config.comm_interval),
            Some(last) => last
                .next_comm_time
                .saturating_add(self.slot_length(last.max_messages))
                .saturating_add(self.config.comm_period_padding),
        }
    }

    fn slot_length(&self, max_messages: u32) -> u32 {
        comm_period_length(
            max_messages,
            self.config.sensor_data_timeout_ms,
            self.config.time_config_timeout_ms,
        )
    }

    async fn send_time_config(&mut self, node: MacAddress, config: &TimeConfig) -> Result<()> {
        let mac = self.mac_address();
        self.board
            .transport
            .send(&Message::new(mac, node, MessagePayload::TimeConfig(*config)))
            .await?;

        let options = ReceiveOptions::new(
            MessageType::AckTime,
            Duration::from_millis(self.config.time_config_timeout_ms as u64),
        )
        .with_attempts(self.config.time_config_attempts)
        .from_source(node);
        self.board.transport.receive(&options).await?;
        Ok(())
    }

    /// Serves every node's slot in table order and stores what arrived.
    ///
    /// A node whose slot has already passed, or whose exchange fails, is
    /// skipped with its comm time advanced by one interval.
    pub async fn comm_period(&mut self) -> Result<usize> {
        log::info!("Starting comm period for {} nodes", self.nodes.len());
        let mut received = Vec::new();

        for index in 0..self.nodes.len() {
            if let Err(e) = self.node_comm_period(index, &mut received).await {
                let now = self.board.now();
                if let Some(record) = self.nodes.get_mut(index) {
                    log::error!("Comm with {} failed: {}", record.mac, e);
                    record.naive_time_config(now);
                }
            }
        }

        let count = received.len();
        {
            let mut data_log = self.data_log();
            for message in &received {
                data_log.append(message)?;
            }
        }

        self.state.comm_periods += 1;
        self.nodes
            .store(&mut self.board.fs, &self.config.nodes_path)?;
        log::info!("Comm period done, {} readouts stored", count);
        Ok(count)
    }

    async fn node_comm_period(&mut self, index: usize, received: &mut Vec<Message>) -> Result<usize> {
        let record = self.nodes.get(index).cloned().ok_or(Error::ScheduleFault)?;

        if self.board.now() > record.next_comm_time {
            log::error!(
                "Comm time of {} was before this comm period, skipping",
                record.mac
            );
            return Err(Error::ScheduleFault);
        }

        let padding = self.config.comm_period_padding;
        self.board
            .light_sleep_until(record.next_comm_time.saturating_sub(padding))
            .await;
        log::info!("Comm slot of {}", record.mac);

        let mac = self.mac_address();
        let mut options = ReceiveOptions::new(
            MessageType::SensorData,
            Duration::from_millis(self.config.sensor_data_timeout_ms as u64),
        )
        .with_attempts(self.config.sensor_data_attempts)
        .from_source(record.mac)
        .with_pre_listen(Duration::from_secs(2 * padding as u64));

        let limit = record.max_messages.max(1) as usize;
        let mut count = 0;
        loop {
            let message = self.board.transport.receive(&options).await?;
            options.pre_listen = Duration::from_ticks(0);
            count += 1;

            let last = message.is_last() || count >= limit;
            if message.as_sensor_data().is_some_and(|data| !data.is_empty()) {
                received.push(message);
            }
            if last {
                break;
            }

            self.board
                .transport
                .send(&Message::new(mac, record.mac, MessagePayload::AckData))
                .await?;
        }

        let config = TimeConfig {
            cur_time: self.board.now(),
            sample_interval: 0,
            sample_rounding: 0,
            sample_offset: 0,
            comm_interval: record.comm_interval,
            comm_time: record.next_comm_time.saturating_add(record.comm_interval),
            max_messages: record.max_messages,
        };
        self.send_time_config(record.mac, &config).await?;

        if let Some(entry) = self.nodes.get_mut(index) {
            entry.time_config(&config);
        }
        log::info!(
            "Received {} messages from {}, next comm at {}",
            count,
            record.mac,
            config.comm_time
        );
        Ok(count)
    }
}
