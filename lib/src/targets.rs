//! Provides helpers for parsing scan targets

pub mod ips;
