//! Provides helpers for selecting a network interface to probe on

use itertools::Itertools;
use pnet::{
    datalink::NetworkInterface as PNetNetworkInterface, ipnetwork::IpNetwork,
    util::MacAddr,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{NetmonError, Result};

/// Represents a network interface on current host
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkInterface {
    /// The name of the interface
    pub name: String,
    /// The description of the interface
    pub description: String,
    /// The IPv4 CIDR block of the interface, if any
    pub cidr: Option<String>,
    /// The IPv4 address used as the sender address in ARP requests
    pub ipv4: Option<Ipv4Addr>,
    /// The IPv6 address used as the source of neighbor solicitations,
    /// link-local when one is configured
    pub ipv6: Option<Ipv6Addr>,
    /// All addresses assigned to the interface
    pub ips: Vec<IpNetwork>,
    /// The MAC address of the interface
    pub mac: MacAddr,
    /// Any flags associated with the interface
    pub flags: u32,
    /// The internal index of the interface
    pub index: u32,
}

impl NetworkInterface {
    /// Returns true if the address is assigned to this interface
    pub fn owns(&self, ip: IpAddr) -> bool {
        self.ips.iter().any(|n| n.ip() == ip)
    }
}

fn is_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}

fn get_interface_ipv4_and_cidr(
    interface: &PNetNetworkInterface,
) -> Option<(Ipv4Addr, String)> {
    interface.ips.iter().find_map(|n| match n {
        IpNetwork::V4(net) => Some((
            net.ip(),
            format!("{}/{}", net.network(), net.prefix()),
        )),
        IpNetwork::V6(_) => None,
    })
}

fn get_interface_ipv6(interface: &PNetNetworkInterface) -> Option<Ipv6Addr> {
    interface
        .ips
        .iter()
        .filter_map(|n| match n {
            IpNetwork::V6(net) => Some(net.ip()),
            IpNetwork::V4(_) => None,
        })
        .sorted_by_key(|ip| !is_link_local(ip))
        .next()
}

impl TryFrom<PNetNetworkInterface> for NetworkInterface {
    type Error = NetmonError;

    fn try_from(value: PNetNetworkInterface) -> Result<Self> {
        let mac = value.mac.ok_or_else(|| {
            NetmonError::ScanUnavailable(format!(
                "failed to get mac address for interface {}",
                value.name
            ))
        })?;

        let ipv4_and_cidr = get_interface_ipv4_and_cidr(&value);
        let ipv6 = get_interface_ipv6(&value);

        if ipv4_and_cidr.is_none() && ipv6.is_none() {
            return Err(NetmonError::ScanUnavailable(format!(
                "interface {} has no ip addresses",
                value.name
            )));
        }

        let (ipv4, cidr) = ipv4_and_cidr.unzip();

        Ok(Self {
            name: value.name,
            description: value.description,
            flags: value.flags,
            index: value.index,
            mac,
            ips: value.ips,
            cidr,
            ipv4,
            ipv6,
        })
    }
}

impl From<&NetworkInterface> for PNetNetworkInterface {
    fn from(value: &NetworkInterface) -> Self {
        Self {
            name: value.name.clone(),
            flags: value.flags,
            description: value.description.clone(),
            index: value.index,
            ips: value.ips.clone(),
            mac: Some(value.mac),
        }
    }
}

/// Finds and returns a NetworkInterface by name for current host
pub fn get_interface(name: &str) -> Result<NetworkInterface> {
    let iface = pnet::datalink::interfaces()
        .into_iter()
        .find(|i| i.name == name)
        .ok_or_else(|| {
            NetmonError::ScanUnavailable(format!(
                "could not find network interface: {name}"
            ))
        })?;
    NetworkInterface::try_from(iface)
}

/// Finds and returns the default NetworkInterface for current host. An up,
/// non-loopback interface with a hardware address is required; interfaces
/// carrying an IPv4 address are preferred.
pub fn get_default_interface() -> Result<NetworkInterface> {
    pnet::datalink::interfaces()
        .into_iter()
        .filter(|e| e.is_up() && !e.is_loopback() && e.mac.is_some())
        .sorted_by_key(|e| !e.ips.iter().any(|i| i.is_ipv4()))
        .find_map(|e| NetworkInterface::try_from(e).ok())
        .ok_or_else(|| {
            NetmonError::ScanUnavailable(
                "could not detect a usable network interface".into(),
            )
        })
}

#[cfg(test)]
#[path = "./network_tests.rs"]
mod tests;
