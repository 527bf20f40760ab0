//! Provides helpers for managing IP target lists

use std::{
    collections::BTreeSet,
    net::{self, IpAddr},
    str::FromStr,
    sync::Arc,
};

use crate::error::{NetmonError, Result};

/// Smallest IPv6 prefix accepted in a CIDR target. Anything wider expands to
/// more addresses than could ever be probed in a single scan.
pub const MIN_IPV6_PREFIX: u8 = 112;

#[derive(Debug)]
/// Represents a list of IP targets
///
/// This wrapper is used to cut down on the memory needed to store entire
/// network IP ranges. Rather than storing all 65536 IPs in a /16 CIDR block, or
/// a range of IPS, this wrapper allows the storage of just CIDR or range in
/// string form and then dynamically loops the IPs in that block when needed.
///
/// # Errors
///
/// Returns [`NetmonError::InvalidArgument`] if an item in the list is not a
/// valid IP, CIDR block, or IPv4 range
///
/// # Examples
///
/// ```
/// # use std::net;
/// # use r_netmon_lib::error::Result;
/// # use r_netmon_lib::targets::ips::IPTargets;
/// let print_ip = |ip: net::IpAddr| -> Result<()> {
///   println!("ip: {}", ip);
///   Ok(())
/// };
/// let ips = IPTargets::new(
///     vec![
///       "192.168.0.1".to_string(),
///       "172.17.0.1-172.17.0.24".to_string(),
///       "192.168.68.1/24".to_string(),
///       "fe80::1".to_string(),
///     ]
/// ).unwrap();
/// ips.lazy_loop(print_ip).unwrap();
/// ```
pub struct IPTargets(Vec<String>, usize);

fn loop_ips<F: FnMut(IpAddr) -> Result<()>>(
    list: &[String],
    mut cb: F,
) -> Result<()> {
    for target in list.iter().map(|t| t.trim()) {
        if target.contains("-") {
            // target is range
            let Some((first, last)) = target.split_once("-") else {
                continue;
            };

            let begin = net::Ipv4Addr::from_str(first).map_err(|e| {
                NetmonError::from_net_addr_parse_error(target, e)
            })?;

            let end = net::Ipv4Addr::from_str(last).map_err(|e| {
                NetmonError::from_net_addr_parse_error(target, e)
            })?;

            let subnet = ipnet::Ipv4Subnets::new(begin, end, 32);

            for ip_net in subnet {
                for ip in ip_net.hosts() {
                    cb(IpAddr::V4(ip))?;
                }
            }
        } else if target.contains("/") {
            // target is cidr block
            let ip_net = ipnet::IpNet::from_str(target).map_err(|e| {
                NetmonError::from_ipnet_addr_parse_error(target, e)
            })?;

            match ip_net {
                ipnet::IpNet::V4(net4) => {
                    for ip in net4.hosts() {
                        cb(IpAddr::V4(ip))?;
                    }
                }
                ipnet::IpNet::V6(net6) => {
                    if net6.prefix_len() < MIN_IPV6_PREFIX {
                        return Err(NetmonError::InvalidArgument(format!(
                            "{target}: ipv6 blocks wider than /{MIN_IPV6_PREFIX} are not supported"
                        )));
                    }
                    for ip in net6.hosts() {
                        cb(IpAddr::V6(ip))?;
                    }
                }
            }
        } else {
            // target is ip
            let ip = IpAddr::from_str(target).map_err(|e| {
                NetmonError::from_net_addr_parse_error(target, e)
            })?;

            cb(ip)?;
        }
    }
    Ok(())
}

impl IPTargets {
    /// Returns a new instance of IPTargets using the provided list
    pub fn new(list: Vec<String>) -> Result<Arc<Self>> {
        let mut len = 0;

        loop_ips(&list, |_| {
            len += 1;
            Ok(())
        })?;

        Ok(Arc::new(Self(list, len)))
    }

    /// Returns the true length of the target list. If the underlying
    /// `Vec<String>` is just `["192.168.0.1/24"]`, then a call to "len" will
    /// return 254. Duplicates are counted.
    pub fn len(&self) -> usize {
        self.1
    }

    /// Returns true if the list is empty
    pub fn is_empty(&self) -> bool {
        self.1 == 0
    }

    /// loops over all targets including those that are not explicitly in the
    /// list but fall within a range or CIDR block defined in the list
    pub fn lazy_loop<F: FnMut(IpAddr) -> Result<()>>(&self, cb: F) -> Result<()> {
        loop_ips(&self.0, cb)
    }

    /// Expands the list into a de-duplicated, ordered set of addresses
    pub fn to_set(&self) -> Result<BTreeSet<IpAddr>> {
        let mut set = BTreeSet::new();
        self.lazy_loop(|ip| {
            set.insert(ip);
            Ok(())
        })?;
        Ok(set)
    }
}

#[cfg(test)]
#[path = "./ips_tests.rs"]
mod tests;
