//! Provides helpers for creating, sending, and reading neighbor packets

use core::time;

use crate::error::Result;

pub mod arp_packet;
pub mod ndp_packet;
pub mod reply;
pub mod wire;

/// Default timing for throttling packet sends to prevent packet loss
pub const DEFAULT_PACKET_SEND_TIMING: time::Duration =
    time::Duration::from_micros(50);

/// Trait describing a packet reader
pub trait Reader: Send {
    /// Should return the next packet off of the wire. Implementations are
    /// expected to return an error periodically when nothing arrives so
    /// callers can observe their own deadlines.
    fn next_packet(&mut self) -> Result<&[u8]>;
}

/// Trait describing a packet sender
pub trait Sender: Send {
    /// Should send a packet over the wire
    fn send(&mut self, packet: &[u8]) -> Result<()>;
}

#[cfg(test)]
#[doc(hidden)]
pub mod mocks;
