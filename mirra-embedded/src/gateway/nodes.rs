use alloc::vec::Vec;

use embedded_io::{Read, Write};
use heapless::Vec as BoundedVec;
use mirra_api::{MacAddress, TimeConfig, next_scheduled};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::{FileSystem, OpenMode};

pub const MAX_SENSOR_NODES: usize = 20;

/// A registered node as seen by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub mac: MacAddress,
    pub sample_interval: u32,
    pub sample_rounding: u32,
    pub sample_offset: u32,
    /// Epoch of the last successful exchange
    pub last_comm_time: u32,
    pub comm_interval: u32,
    pub next_comm_time: u32,
    pub max_messages: u32,
}

impl NodeRecord {
    pub fn new(mac: MacAddress, config: &TimeConfig) -> Self {
        Self {
            mac,
            sample_interval: config.sample_interval,
            sample_rounding: config.sample_rounding,
            sample_offset: config.sample_offset,
            last_comm_time: config.cur_time,
            comm_interval: config.comm_interval,
            next_comm_time: config.comm_time,
            max_messages: config.max_messages,
        }
    }

    /// Records a TIME_CONFIG the node acknowledged. Zero sample fields are
    /// left unchanged.
    pub fn time_config(&mut self, config: &TimeConfig) {
        if config.sample_interval != 0 {
            self.sample_interval = config.sample_interval;
        }
        if config.sample_rounding != 0 {
            self.sample_rounding = config.sample_rounding;
        }
        if config.sample_offset != 0 {
            self.sample_offset = config.sample_offset;
        }
        self.last_comm_time = config.cur_time;
        self.comm_interval = config.comm_interval;
        self.next_comm_time = config.comm_time;
        self.max_messages = config.max_messages;
    }

    /// Advances the comm time by one interval (catching up to `now`) after
    /// a failed exchange, mirroring what the node does on its side.
    pub fn naive_time_config(&mut self, now: u32) {
        self.next_comm_time = next_scheduled(
            now,
            self.next_comm_time.saturating_add(self.comm_interval),
            self.comm_interval,
        );
    }
}

/// Registered nodes in comm order.
///
/// Slots are assigned one after another at registration, so the table is
/// ordered by `next_comm_time`. Nothing re-sorts it later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTable {
    records: BoundedVec<NodeRecord, MAX_SENSOR_NODES>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the table, a missing file is an empty table.
    pub fn load<FS: FileSystem>(fs: &mut FS, path: &str) -> Result<Self> {
        if !fs.exists(path) || fs.size(path) == 0 {
            return Ok(Self::new());
        }

        let mut file = fs.open(path, OpenMode::Read)?;
        let mut data = Vec::new();
        let mut chunk = [0u8; 64];
        loop {
            let count = file.read(&mut chunk).map_err(|_| Error::StorageFault)?;
            if count == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..count]);
        }

        let records = postcard::from_bytes(&data)?;
        Ok(Self { records })
    }

    pub fn store<FS: FileSystem>(&self, fs: &mut FS, path: &str) -> Result<()> {
        let data = postcard::to_allocvec(&self.records)?;
        let mut file = fs.open(path, OpenMode::Write)?;
        file.write_all(&data).map_err(|_| Error::StorageFault)?;
        file.flush().map_err(|_| Error::StorageFault)
    }

    pub fn push(&mut self, record: NodeRecord) -> Result<()> {
        self.records.push(record).map_err(|_| Error::NodeTableFull)
    }

    pub fn remove(&mut self, index: usize) -> Option<NodeRecord> {
        (index < self.records.len()).then(|| self.records.remove(index))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.is_full()
    }

    pub fn first(&self) -> Option<&NodeRecord> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&NodeRecord> {
        self.records.last()
    }

    pub fn get(&self, index: usize) -> Option<&NodeRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut NodeRecord> {
        self.records.get_mut(index)
    }

    pub fn position(&self, mac: MacAddress) -> Option<usize> {
        self.records.iter().position(|record| record.mac == mac)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.iter()
    }

    /// Returns true while comm times are non-decreasing in table order.
    pub fn is_ordered(&self) -> bool {
        self.records
            .windows(2)
            .all(|pair| pair[0].next_comm_time <= pair[1].next_comm_time)
    }
}
