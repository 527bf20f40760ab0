//! Request and result envelope for checking which addresses are in use
//!
//! Callers that drive scans from a job scheduler or retry loop hand over a
//! [`CheckIpParam`] and persist the returned [`CheckIpResult`]. Each call runs
//! exactly one scan; retrying is left to the caller.

use serde::{Deserialize, Serialize};
use std::{net::IpAddr, time::Duration};

use crate::{
    error::Result,
    scanners::{ScanResult, Scanner},
};

/// Time budget applied to a check when the caller doesn't supply one
pub const DEFAULT_CHECK_IP_TIMEOUT: Duration = Duration::from_secs(10);

/// Addresses to check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIpParam {
    /// Candidate addresses; duplicates are allowed and probed once
    pub ips: Vec<IpAddr>,
}

/// Addresses that answered, with their hardware addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIpResult {
    /// Responding addresses
    pub ips: ScanResult,
}

/// Checks the requested addresses using [`DEFAULT_CHECK_IP_TIMEOUT`]
pub fn check_ip(scanner: &dyn Scanner, param: &CheckIpParam) -> Result<CheckIpResult> {
    check_ip_with_timeout(scanner, param, DEFAULT_CHECK_IP_TIMEOUT)
}

/// Checks the requested addresses within `timeout`
pub fn check_ip_with_timeout(
    scanner: &dyn Scanner,
    param: &CheckIpParam,
    timeout: Duration,
) -> Result<CheckIpResult> {
    let ips = scanner.scan(&param.ips, timeout)?;
    Ok(CheckIpResult { ips })
}

#[cfg(test)]
#[path = "./check_ip_tests.rs"]
mod tests;
