//! Provides data structures and implementations for neighbor scanning
//!
//! This includes:
//! - The [`ScanResult`] address to hardware address mapping
//! - The [`Scanner`] trait
//! - ARP (IPv4) + NDP (IPv6) neighbor scanning

use itertools::Itertools;
#[cfg(test)]
use mockall::automock;

use pnet::util::MacAddr;
use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeMap};
use std::{
    collections::{BTreeMap, HashMap},
    net::IpAddr,
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use crate::{
    error::{NetmonError, Result},
    network::{self, NetworkInterface},
    packet::wire,
};

/// The default maximum number of probes dispatched concurrently
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 64;

/// Immutable mapping from probed address to the hardware address it
/// answered with. Only addresses that responded before the deadline appear;
/// absence means "did not respond within budget", not "down".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult(HashMap<IpAddr, MacAddr>);

impl ScanResult {
    /// Returns the hardware address resolved for `ip`
    pub fn get(&self, ip: &IpAddr) -> Option<&MacAddr> {
        self.0.get(ip)
    }

    /// Returns true if `ip` responded
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains_key(ip)
    }

    /// Returns the number of addresses that responded
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing responded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the entries in address order
    pub fn iter(&self) -> impl Iterator<Item = (&IpAddr, &MacAddr)> {
        self.0.iter().sorted_by_key(|(ip, _)| **ip)
    }

    /// Consumes the result returning the underlying map
    pub fn into_inner(self) -> HashMap<IpAddr, MacAddr> {
        self.0
    }
}

impl From<HashMap<IpAddr, MacAddr>> for ScanResult {
    fn from(value: HashMap<IpAddr, MacAddr>) -> Self {
        Self(value)
    }
}

impl FromIterator<(IpAddr, MacAddr)> for ScanResult {
    fn from_iter<T: IntoIterator<Item = (IpAddr, MacAddr)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for ScanResult {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = s.serialize_map(Some(self.len()))?;
        for (ip, mac) in self.iter() {
            map.serialize_entry(&ip.to_string(), &mac.to_string())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScanResult {
    fn deserialize<D>(d: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let raw = BTreeMap::<String, String>::deserialize(d)?;
        raw.into_iter()
            .map(|(ip, mac)| {
                let ip = IpAddr::from_str(&ip).map_err(D::Error::custom)?;
                let mac = MacAddr::from_str(&mac).map_err(D::Error::custom)?;
                Ok((ip, mac))
            })
            .collect()
    }
}

#[cfg_attr(test, automock)]
/// Trait used by all scanners
pub trait Scanner: Sync + Send {
    /// Probes every address and returns those that responded before
    /// `timeout` elapsed
    fn scan(&self, addresses: &[IpAddr], timeout: Duration) -> Result<ScanResult>;
}

/// Fails with [`NetmonError::InvalidArgument`] unless the timeout is positive
pub fn validate_timeout(timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        return Err(NetmonError::InvalidArgument(
            "scan timeout must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// Scans using the default interface and the default pnet wire
///
/// Example
/// ```no_run
/// # use std::{net::IpAddr, time::Duration};
/// # use r_netmon_lib::scanners;
/// let ips: Vec<IpAddr> = vec!["192.168.1.1".parse().unwrap()];
/// let found = scanners::scan_default(&ips, Duration::from_secs(2)).unwrap();
/// for (ip, mac) in found.iter() {
///     println!("{ip} is at {mac}");
/// }
/// ```
pub fn scan_default(addresses: &[IpAddr], timeout: Duration) -> Result<ScanResult> {
    validate_timeout(timeout)?;
    if addresses.is_empty() {
        return Ok(ScanResult::default());
    }
    let interface = network::get_default_interface()?;
    scan_with_interface(interface, addresses, timeout)
}

/// Scans using the named interface and the default pnet wire
pub fn scan_on_interface(
    name: &str,
    addresses: &[IpAddr],
    timeout: Duration,
) -> Result<ScanResult> {
    validate_timeout(timeout)?;
    if addresses.is_empty() {
        return Ok(ScanResult::default());
    }
    let interface = network::get_interface(name)?;
    scan_with_interface(interface, addresses, timeout)
}

fn scan_with_interface(
    interface: NetworkInterface,
    addresses: &[IpAddr],
    timeout: Duration,
) -> Result<ScanResult> {
    log::debug!("scanning on interface {}", interface.name);
    let wire = wire::default(&interface)?;
    neighbor_scanner::NeighborScanner::builder()
        .interface(Arc::new(interface))
        .wire(wire)
        .build()?
        .scan(addresses, timeout)
}

pub mod neighbor_scanner;

#[cfg(test)]
#[path = "./scanners_tests.rs"]
mod tests;
