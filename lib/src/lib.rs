//! Library package for checking which addresses are live on a LAN
//!
//! Given a set of candidate IPv4 / IPv6 addresses and a time budget, every
//! address is probed concurrently (ARP for IPv4, NDP neighbor solicitation for
//! IPv6) and the hardware addresses of those that answered before the budget
//! ran out are returned.
//!
//! # Examples
//!
//! ## Neighbor Scanning
//!
//! <https://github.com/r-netmon/r-netmon/blob/main/lib/examples/neighbor-scanner.rs>
//!
//! ```bash
//! sudo -E cargo run --example neighbor-scanner -p r-netmon-lib -- 192.168.1.1 192.168.1.2
//! ```

#![deny(missing_docs)]
pub mod check_ip;
pub mod error;
pub mod network;
pub mod packet;
pub mod scanners;
pub mod targets;
