//! Custom Error and Result types for this library

use std::sync::{MutexGuard, PoisonError};
use thiserror::Error;

use crate::{
    packet::{
        Reader, Sender, arp_packet::ArpPacketBuilderError,
        ndp_packet::NdpPacketBuilderError,
    },
    scanners::neighbor_scanner::NeighborScannerBuilderError,
};

/// Custom Error type for this library
#[derive(Error, Debug)]
pub enum NetmonError {
    /// Input to a scan was malformed, i.e. a zero timeout or an unparsable
    /// target. Nothing was sent on the wire.
    #[error("invalid argument: {_0}")]
    InvalidArgument(String),

    /// The scanning mechanism itself could not operate: no usable interface,
    /// no permission to open a raw channel, or no probe could be sent
    #[error("scan unavailable: {_0}")]
    ScanUnavailable(String),

    /// Error coming directly off the wire
    #[error("wire error: {_0}")]
    Wire(String),

    /// Error obtaining lock on packet reader
    #[error("failed to get lock on packet reader: {_0}")]
    PacketReaderLock(String),

    /// Error obtaining lock on packet sender
    #[error("failed to get lock on packet sender: {_0}")]
    PacketSenderLock(String),

    /// Error generated during ARP packet construction
    #[error("failed to build ARP packet: {_0}")]
    ArpPacketBuild(#[from] ArpPacketBuilderError),

    /// Error generated during NDP packet construction
    #[error("failed to build NDP packet: {_0}")]
    NdpPacketBuild(#[from] NdpPacketBuilderError),

    /// Error resulting from failure to build the neighbor scanner
    #[error("failed to build neighbor scanner: {_0}")]
    NeighborScannerBuild(#[from] NeighborScannerBuilderError),

    /// A single probe could not be sent to the given address
    #[error("probe error: {error} - ip: {ip}")]
    Probe {
        /// The error message encountered
        error: String,
        /// The address being probed
        ip: String,
    },
}

impl<'a> From<PoisonError<MutexGuard<'a, dyn Reader + 'static>>>
    for NetmonError
{
    fn from(value: PoisonError<MutexGuard<'a, dyn Reader + 'static>>) -> Self {
        Self::PacketReaderLock(value.to_string())
    }
}

impl<'a> From<PoisonError<MutexGuard<'a, dyn Sender + 'static>>>
    for NetmonError
{
    fn from(value: PoisonError<MutexGuard<'a, dyn Sender + 'static>>) -> Self {
        Self::PacketSenderLock(value.to_string())
    }
}

impl NetmonError {
    /// Converter for std::net::AddrParseError
    pub fn from_net_addr_parse_error(
        target: &str,
        error: std::net::AddrParseError,
    ) -> Self {
        Self::InvalidArgument(format!("{target}: {error}"))
    }

    /// Converter for ipnet::AddrParseError
    pub fn from_ipnet_addr_parse_error(
        target: &str,
        error: ipnet::AddrParseError,
    ) -> Self {
        Self::InvalidArgument(format!("{target}: {error}"))
    }

    /// Wraps a failure to probe a single address
    pub fn probe(ip: std::net::IpAddr, error: impl ToString) -> Self {
        Self::Probe {
            error: error.to_string(),
            ip: ip.to_string(),
        }
    }
}

/// Custom Result type for this library. All Errors exposed by this library
/// will be returned as [`NetmonError`]
pub type Result<T> = std::result::Result<T, NetmonError>;

#[cfg(test)]
#[path = "./error_tests.rs"]
mod tests;
