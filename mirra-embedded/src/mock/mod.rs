//! Host doubles for the board peripherals: a shared radio medium, a clock
//! that skips ahead while every device sleeps, and a recording uplink.

mod air;
mod time;
mod uplink;

pub use air::*;
pub use time::*;
pub use uplink::*;

use alloc::rc::Rc;

use mirra_api::MacAddress;

use crate::board::{Board, Platform};
use crate::config::TransportConfig;
use crate::state::MemoryRetained;
use crate::storage::MemoryFileSystem;

pub struct MockPlatform;

impl Platform for MockPlatform {
    type Radio = MockRadio;
    type Clock = MockClock;
    type Power = MockPower;
    type FileSystem = MemoryFileSystem;
    type Retained = MemoryRetained;
}

/// Builds a board on `air` with empty storage.
pub fn mock_board(
    air: &MockAir,
    time: &Rc<VirtualTime>,
    mac: MacAddress,
    transport: &TransportConfig,
) -> Board<MockPlatform> {
    Board::new(
        air.radio(mac),
        MockClock::new(time.clone()),
        MockPower::new(time.clone()),
        MemoryFileSystem::new(),
        MemoryRetained::new(),
        transport,
    )
}
