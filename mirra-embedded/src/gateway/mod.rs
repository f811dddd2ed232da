mod comm;
mod nodes;
mod upload;

pub use nodes::*;
pub use upload::*;

use alloc::vec::Vec;

use mirra_api::{MacAddress, SleepPlan, next_scheduled};

use crate::board::{Board, Platform};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::state::{GatewayState, load_state, store_state};
use crate::storage::{FileSystem, SensorDataLog};

/// Collects readouts from registered nodes and forwards them upstream.
///
/// Like the nodes, every [`Gateway::wake`] starts from persisted state: the
/// node table lives on the filesystem and the counters in retained memory.
pub struct Gateway<P: Platform, U: Uplink> {
    board: Board<P>,
    uplink: U,
    config: GatewayConfig,
    state: GatewayState,
    nodes: NodeTable,
}

impl<P: Platform, U: Uplink> Gateway<P, U> {
    pub fn new(board: Board<P>, uplink: U, config: GatewayConfig) -> Self {
        Self {
            board,
            uplink,
            config,
            state: GatewayState::default(),
            nodes: NodeTable::new(),
        }
    }

    pub fn mac_address(&self) -> MacAddress {
        self.board.transport.mac_address()
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeTable {
        &mut self.nodes
    }

    pub fn uplink(&self) -> &U {
        &self.uplink
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

    /// Restores state from retained memory and the filesystem.
    ///
    /// An unreadable node table is dropped and discovery scheduled right
    /// away, the nodes fall back to rediscovery once they miss their slots.
    pub fn load(&mut self) -> Result<()> {
        self.state = load_state(&self.board.retained);
        if !self.state.initialized {
            self.first_boot()?;
        }
        self.board.ensure_files(&[self.config.data_path.as_str()])?;
        self.nodes = match NodeTable::load(&mut self.board.fs, &self.config.nodes_path) {
            Ok(nodes) => nodes,
            Err(Error::SerializationError) => {
                log::error!("Node table unreadable, starting empty");
                if let Err(e) = self.board.fs.remove(&self.config.nodes_path) {
                    log::warn!("Failed to remove node table: {}", e);
                }
                self.state.next_discovery_time = self.board.now();
                NodeTable::new()
            }
            Err(e) => return Err(e),
        };
        Ok(())
    }

    pub fn save(&mut self) -> Result<()> {
        self.nodes.store(&mut self.board.fs, &self.config.nodes_path)?;
        store_state(&mut self.board.retained, &self.state)
    }

    pub async fn wake(&mut self) -> Result<SleepPlan> {
        self.load()?;
        let now = self.board.now();

        if self.comm_period_due(now) {
            if let Err(e) = self.comm_period().await {
                log::error!("Comm period failed: {}", e);
            }
            if self.state.comm_periods >= self.config.upload_every {
                if let Err(e) = self.upload_period().await {
                    log::error!("Upload period failed: {}", e);
                }
            }
        } else if now >= self.state.next_discovery_time {
            self.discovery_round().await;
            self.state.next_discovery_time = next_scheduled(
                self.board.now(),
                self.state.next_discovery_time,
                self.config.discovery_interval,
            );
        }

        let plan = self.sleep_plan();
        self.save()?;
        Ok(plan)
    }

    /// Runs [`Self::wake`] and deep sleeps according to the result.
    pub async fn wake_and_sleep(&mut self) -> Result<SleepPlan> {
        let plan = self.wake().await?;
        self.board.deep_sleep(&plan).await;
        Ok(plan)
    }

    /// The first node in table order is assumed to be the next one due.
    pub fn comm_period_due(&self, now: u32) -> bool {
        self.nodes.first().is_some_and(|head| {
            now.saturating_add(self.config.wake_before_comm_period) >= head.next_comm_time
        })
    }

    pub fn sleep_plan(&self) -> SleepPlan {
        let now = self.board.now();
        let mut wake_times = Vec::new();

        match self.nodes.first() {
            Some(head) => wake_times.push(
                head.next_comm_time
                    .saturating_sub(self.config.wake_before_comm_period),
            ),
            None => wake_times.push(now.saturating_add(self.config.comm_interval)),
        }
        wake_times.push(self.state.next_discovery_time);

        let plan = self.config.sleep.plan(now, wake_times);
        log::debug!("Next wake at {} ({:?})", plan.wake_at, plan.source);
        plan
    }

    fn first_boot(&mut self) -> Result<()> {
        log::info!("First boot of gateway {}", self.mac_address());

        for path in [&self.config.nodes_path, &self.config.data_path] {
            if self.board.fs.exists(path) {
                self.board.fs.remove(path)?;
            }
        }

        self.state = GatewayState {
            initialized: true,
            comm_periods: 0,
            next_discovery_time: self.board.now(),
        };
        Ok(())
    }
}
