//! CLI for checking which addresses are live on the local network
//!
//! # Examples
//!
//! ```bash
//! # help menu
//! sudo r-netmon --help
//!
//! # check every address on the default interface's subnet
//! sudo r-netmon
//!
//! # check specific addresses with a 3 second budget
//! sudo r-netmon --targets 192.168.1.10,192.168.1.20-192.168.1.30,fe80::1 --timeout 3s
//! ```
use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use log::*;
use r_netmon_lib::{
    check_ip::{self, CheckIpParam, DEFAULT_CHECK_IP_TIMEOUT},
    error::Result as LibResult,
    network::{self, NetworkInterface},
    packet::wire,
    scanners::{
        DEFAULT_MAX_CONCURRENT_PROBES, ScanResult, Scanner,
        neighbor_scanner::NeighborScanner,
    },
    targets::ips::IPTargets,
};
use std::{net::IpAddr, sync::Arc, time::Duration};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// CLI for checking which addresses are live on the local network
struct Args {
    /// Comma separated list of IPs, IPv4 ranges, and CIDR blocks to check
    #[arg(short, long, use_value_delimiter = true)]
    targets: Vec<String>,

    /// Time budget for the whole scan, i.e. "500ms", "3s"
    #[arg(long, default_value = humantime::format_duration(DEFAULT_CHECK_IP_TIMEOUT).to_string(), value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Maximum number of probes in flight at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_PROBES)]
    concurrency: usize,

    /// Output final report in json instead of table text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Only print final output nothing else
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Choose a specific network interface for the scan
    #[arg(short, long)]
    interface: Option<String>,

    /// Prints debug logs including those from r-netmon-lib
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[doc(hidden)]
fn initialize_logger(args: &Args) -> Result<()> {
    let filter = if args.quiet {
        simplelog::LevelFilter::Error
    } else if args.debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    simplelog::TermLogger::init(
        filter,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[doc(hidden)]
fn print_args(args: &Args, interface: &NetworkInterface) {
    info!("configuration:");
    info!("targets:     {:?}", args.targets);
    info!("timeout:     {}", humantime::format_duration(args.timeout));
    info!("concurrency: {}", args.concurrency);
    info!("json:        {}", args.json);
    info!("quiet:       {}", args.quiet);
    info!(
        "interface:   {}",
        args.interface.as_deref().unwrap_or(&interface.name)
    );
    info!("cidr:        {}", interface.cidr.as_deref().unwrap_or("-"));
    info!(
        "user_ipv4:   {}",
        interface.ipv4.map(|ip| ip.to_string()).unwrap_or("-".into())
    );
    info!(
        "user_ipv6:   {}",
        interface.ipv6.map(|ip| ip.to_string()).unwrap_or("-".into())
    );
}

#[doc(hidden)]
fn expand_targets(targets: &[String]) -> LibResult<Vec<IpAddr>> {
    let set = IPTargets::new(targets.to_vec())?.to_set()?;
    Ok(set.into_iter().collect())
}

#[doc(hidden)]
fn process_scan(
    scanner: &dyn Scanner,
    ips: Vec<IpAddr>,
    timeout: Duration,
) -> LibResult<ScanResult> {
    info!("checking {} addresses...", ips.len());

    let result =
        check_ip::check_ip_with_timeout(scanner, &CheckIpParam { ips }, timeout)?;

    debug!("scanning complete");

    Ok(result.ips)
}

#[doc(hidden)]
fn print_results(args: &Args, result: &ScanResult) -> Result<()> {
    info!("scan results:");

    if args.json {
        let j: String = serde_json::to_string(result)?;
        println!("{}", j);
    } else {
        let mut table = prettytable::Table::new();

        table.add_row(prettytable::row!["IP", "MAC"]);

        for (ip, mac) in result.iter() {
            table.add_row(prettytable::row![ip, mac]);
        }

        table.printstd();
    }

    Ok(())
}

#[doc(hidden)]
#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[doc(hidden)]
#[cfg(windows)]
fn is_root() -> bool {
    // On Windows, check if running as Administrator
    // This is a simplified check - raw socket operations require admin privileges
    use std::process::Command;
    Command::new("net")
        .args(["session"])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[doc(hidden)]
fn main() -> Result<()> {
    color_eyre::install()?;

    let mut args = Args::parse();

    initialize_logger(&args)?;

    if !is_root() {
        return Err(eyre!("permission denied: must run with root privileges"));
    }

    let interface = match &args.interface {
        Some(name) => network::get_interface(name)?,
        None => network::get_default_interface()?,
    };

    args.interface = Some(interface.name.clone());

    if args.targets.is_empty() {
        let cidr = interface.cidr.clone().ok_or_else(|| {
            eyre!("no targets given and {} has no ipv4 subnet", interface.name)
        })?;
        args.targets = vec![cidr];
    }

    print_args(&args, &interface);

    let ips = expand_targets(&args.targets)?;

    let wire = wire::default(&interface)?;

    let scanner = NeighborScanner::builder()
        .interface(Arc::new(interface))
        .wire(wire)
        .max_concurrent_probes(args.concurrency)
        .build()?;

    let result = process_scan(&scanner, ips, args.timeout)?;

    print_results(&args, &result)?;

    Ok(())
}

#[cfg(test)]
#[path = "./main_tests.rs"]
mod tests;
