mod comm;

use alloc::boxed::Box;
use alloc::vec::Vec;

use mirra_api::{
    MacAddress, Message, MessagePayload, SensorData, SleepPlan, first_sample_time, next_scheduled,
};

use crate::board::{Board, Platform};
use crate::config::NodeConfig;
use crate::error::Result;
use crate::sensor::Sensor;
use crate::state::{NodeState, load_state, store_state};
use crate::storage::SensorDataLog;

/// What a node does with one wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Discovery,
    CommPeriod,
    Sample,
    Idle,
}

/// Battery powered sensor node.
///
/// Every [`SensorNode::wake`] reloads the persisted state, performs one
/// scheduled action, stores the state and returns how long to sleep. Nothing
/// else is assumed to survive between wakes.
pub struct SensorNode<P: Platform> {
    board: Board<P>,
    sensors: Vec<Box<dyn Sensor>>,
    config: NodeConfig,
    state: NodeState,
}

impl<P: Platform> SensorNode<P> {
    pub fn new(board: Board<P>, sensors: Vec<Box<dyn Sensor>>, config: NodeConfig) -> Self {
        Self {
            board,
            sensors,
            config,
            state: NodeState::default(),
        }
    }

    pub fn mac_address(&self) -> MacAddress {
        self.board.transport.mac_address()
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn board(&self) -> &Board<P> {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board<P> {
        &mut self.board
    }

    pub fn data_log(&mut self) -> SensorDataLog<'_, P::FileSystem> {
        SensorDataLog::new(
            &mut self.board.fs,
            &self.config.data_path,
            &self.config.data_temp_path,
        )
    }

    pub async fn wake(&mut self) -> Result<SleepPlan> {
        self.state = load_state(&self.board.retained);
        if !self.state.initialized {
            self.first_boot()?;
        }

        let now = self.board.now();
        match self.next_action(now) {
            NodeAction::Discovery => {
                if let Err(e) = self.discovery_listen().await {
                    log::warn!("Discovery failed: {}", e);
                    self.state.next_discovery_time =
                        self.board.now().saturating_add(self.config.discovery_retry_interval);
                }
            }
            NodeAction::CommPeriod => {
                if let Err(e) = self.comm_period().await {
                    log::error!("Comm period failed: {}", e);
                }
            }
            NodeAction::Sample => {
                if let Err(e) = self.sample() {
                    log::error!("Sampling failed: {}", e);
                }
            }
            NodeAction::Idle => log::debug!("Woke with nothing due"),
        }

        let plan = self.sleep_plan();
        store_state(&mut self.board.retained, &self.state)?;
        Ok(plan)
    }

    /// Runs [`Self::wake`] and deep sleeps according to the result.
    pub async fn wake_and_sleep(&mut self) -> Result<SleepPlan> {
        let plan = self.wake().await?;
        self.board.deep_sleep(&plan).await;
        Ok(plan)
    }

    pub fn next_action(&self, now: u32) -> NodeAction {
        let schedule = &self.state.schedule;

        if !self.state.is_registered() {
            if now >= self.state.next_discovery_time {
                return NodeAction::Discovery;
            }
        } else if now.saturating_add(self.config.wake_before_comm_period) >= schedule.next_comm_time {
            return NodeAction::CommPeriod;
        }

        if self.next_sample_due().is_some_and(|due| due <= now) {
            return NodeAction::Sample;
        }

        NodeAction::Idle
    }

    pub fn sleep_plan(&self) -> SleepPlan {
        let now = self.board.now();
        let schedule = &self.state.schedule;

        let mut wake_times: Vec<u32> = Vec::new();
        if self.state.is_registered() {
            wake_times.push(
                schedule
                    .next_comm_time
                    .saturating_sub(self.config.wake_before_comm_period),
            );
        } else {
            wake_times.push(self.state.next_discovery_time);
        }
        wake_times.extend(self.next_sample_due());

        let plan = self.config.sleep.plan(now, wake_times);
        log::debug!("Next wake at {} ({:?})", plan.wake_at, plan.source);
        plan
    }

    /// Earliest time any sensor wants sampling.
    fn next_sample_due(&self) -> Option<u32> {
        let grid = self.state.schedule.next_sample_time;
        self.sensors
            .iter()
            .map(|sensor| self.state.adaptive_schedule(sensor.id()).unwrap_or(grid))
            .min()
    }

    fn first_boot(&mut self) -> Result<()> {
        log::info!("First boot of node {}", self.mac_address());

        self.board.ensure_files(&[self.config.data_path.as_str()])?;

        let now = self.board.now();
        let schedule = &mut self.state.schedule;
        schedule.sample_interval = self.config.default_sample_interval;
        schedule.sample_rounding = self.config.default_sample_rounding;
        schedule.sample_offset = self.config.default_sample_offset;
        schedule.next_sample_time = first_sample_time(
            now,
            schedule.sample_interval,
            schedule.sample_rounding,
            schedule.sample_offset,
        );

        self.state.gateway = MacAddress::BROADCAST;
        self.state.next_discovery_time = now;
        self.state.initialized = true;
        Ok(())
    }

    /// Samples every due sensor and appends the readout to the data log.
    pub fn sample(&mut self) -> Result<()> {
        let now = self.board.now();
        let grid = self.state.schedule.next_sample_time;
        let grid_due = grid <= now;
        let due: Vec<usize> = self
            .sensors
            .iter()
            .enumerate()
            .filter(|(_, sensor)| {
                self.state
                    .adaptive_schedule(sensor.id())
                    .map_or(grid_due, |next| next <= now)
            })
            .map(|(index, _)| index)
            .collect();

        let mut started = Vec::with_capacity(due.len());
        for index in due {
            let sensor = &mut self.sensors[index];
            match sensor.setup().and_then(|_| sensor.start_measurement()) {
                Ok(()) => started.push(index),
                Err(e) => log::warn!("Sensor {} failed to start: {}", sensor.id(), e),
            }
        }

        let interval = self.state.schedule.sample_interval;
        let mut data = SensorData::new(now, Vec::new());
        for index in started {
            let sensor = &mut self.sensors[index];
            match sensor.get_measurement() {
                Ok(value) => {
                    if !data.push(value) {
                        log::warn!("Readout full, dropping value of sensor {}", sensor.id());
                    }
                }
                Err(e) => log::warn!("Sensor {} failed to measure: {}", sensor.id(), e),
            }

            let id = sensor.id();
            let next = sensor
                .update_next_sample_time(now, interval)
                .map(|delay| now.saturating_add(delay));
            self.state.set_adaptive_schedule(id, next);
        }

        if grid_due {
            self.state.schedule.next_sample_time = next_scheduled(now, grid, interval);
        }

        if data.is_empty() {
            log::debug!("No sensor values at {}", now);
            return Ok(());
        }

        log::info!("Sampled {} values at {}", data.n_values(), now);
        let message = Message::new(
            self.mac_address(),
            self.state.gateway,
            MessagePayload::SensorData(data),
        );
        let max_size = self.config.max_data_file_size;
        let mut data_log = self.data_log();
        data_log.append(&message)?;
        data_log.prune(max_size)
    }

    fn comm_duration(&self, max_messages: u32) -> u32 {
        mirra_api::comm_period_length(
            max_messages,
            self.config.sensor_data_timeout_ms,
            self.config.time_config_timeout_ms,
        )
    }
}
