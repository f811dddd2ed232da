#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod board;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
#[cfg(feature = "mock")]
pub mod mock;
pub mod node;
pub mod radio;
pub mod sensor;
pub mod state;
pub mod storage;

pub use board::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use gateway::*;
pub use node::*;
pub use radio::*;
pub use sensor::*;
pub use state::*;
pub use storage::*;
