use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use heapless::Vec as BoundedVec;
use mirra_api::{MacAddress, TimeConfig, first_sample_time};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sensors a node can track with their own adaptive schedule
pub const MAX_SENSORS: usize = 8;

/// Memory region that survives deep sleep but not a power cycle.
pub trait RetainedMemory {
    fn load(&self) -> Vec<u8>;

    fn store(&mut self, data: &[u8]);
}

/// Retained memory backed by a shared buffer.
#[derive(Clone, Default)]
pub struct MemoryRetained(Rc<RefCell<Vec<u8>>>);

impl MemoryRetained {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a power cycle.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl RetainedMemory for MemoryRetained {
    fn load(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }

    fn store(&mut self, data: &[u8]) {
        *self.0.borrow_mut() = data.to_vec();
    }
}

/// Reads state from retained memory. An empty or unreadable region yields
/// the default, which reports itself as uninitialized.
pub fn load_state<T, M>(memory: &M) -> T
where
    T: DeserializeOwned + Default,
    M: RetainedMemory,
{
    let data = memory.load();
    if data.is_empty() {
        return T::default();
    }
    postcard::from_bytes(&data).unwrap_or_else(|e| {
        log::warn!("Retained state unreadable ({:?}), starting fresh", e);
        T::default()
    })
}

pub fn store_state<T, M>(memory: &mut M, state: &T) -> Result<()>
where
    T: Serialize,
    M: RetainedMemory,
{
    let data = postcard::to_allocvec(state)?;
    memory.store(&data);
    Ok(())
}

/// Sampling and comm schedule assigned by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub next_sample_time: u32,
    pub sample_interval: u32,
    pub sample_rounding: u32,
    pub sample_offset: u32,
    pub next_comm_time: u32,
    pub comm_interval: u32,
    pub max_messages: u32,
    /// Seconds the node may spend in one comm period
    pub comm_duration: u32,
}

impl Schedule {
    /// Applies a received TIME_CONFIG. Zero sample fields keep the current
    /// values; the next sample slot is only recomputed when they change.
    pub fn apply(&mut self, config: &TimeConfig, comm_duration: u32) {
        if config.sample_interval != 0 {
            self.sample_interval = config.sample_interval;
        }
        if config.sample_rounding != 0 {
            self.sample_rounding = config.sample_rounding;
        }
        if config.sample_offset != 0 {
            self.sample_offset = config.sample_offset;
        }
        if config.changes_sampling() || self.next_sample_time == 0 {
            self.next_sample_time = first_sample_time(
                config.cur_time,
                self.sample_interval,
                self.sample_rounding,
                self.sample_offset,
            );
        }

        self.next_comm_time = config.comm_time;
        self.comm_interval = config.comm_interval;
        self.max_messages = config.max_messages;
        self.comm_duration = comm_duration;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSchedule {
    pub sensor_id: u8,
    pub next_sample_time: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub initialized: bool,
    /// Broadcast until a gateway has registered this node
    pub gateway: MacAddress,
    pub schedule: Schedule,
    /// Sensors sampling off the regular grid
    pub adaptive: BoundedVec<SensorSchedule, MAX_SENSORS>,
    pub next_discovery_time: u32,
}

impl NodeState {
    pub fn is_registered(&self) -> bool {
        !self.gateway.is_broadcast()
    }

    pub fn adaptive_schedule(&self, sensor_id: u8) -> Option<u32> {
        self.adaptive
            .iter()
            .find(|s| s.sensor_id == sensor_id)
            .map(|s| s.next_sample_time)
    }

    /// Records or clears a sensor's own next sample time.
    pub fn set_adaptive_schedule(&mut self, sensor_id: u8, next: Option<u32>) {
        self.adaptive.retain(|s| s.sensor_id != sensor_id);
        if let Some(next_sample_time) = next {
            if self
                .adaptive
                .push(SensorSchedule {
                    sensor_id,
                    next_sample_time,
                })
                .is_err()
            {
                log::warn!("No room to track sensor {} separately", sensor_id);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayState {
    pub initialized: bool,
    /// Comm periods since the last upload period
    pub comm_periods: u32,
    pub next_discovery_time: u32,
}
