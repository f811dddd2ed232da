#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod mac;
pub mod message;
pub mod schedule;
pub mod wire;

pub use mac::*;
pub use message::*;
pub use schedule::*;
pub use wire::{DecodeError, decode, encode};
