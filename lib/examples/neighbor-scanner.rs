use std::{env, sync::Arc, time::Duration};

use r_netmon_lib::{
    network,
    packet::wire,
    scanners::{Scanner, neighbor_scanner::NeighborScanner},
    targets::ips::IPTargets,
};

fn is_root() -> bool {
    match env::var("USER") {
        Ok(val) => val == "root",
        Err(_e) => false,
    }
}

fn main() {
    if !is_root() {
        panic!("permission denied: must run with root privileges");
    }

    let interface =
        network::get_default_interface().expect("cannot find interface");

    let mut targets: Vec<String> = env::args().skip(1).collect();
    if targets.is_empty() {
        let cidr = interface.cidr.clone().expect("interface has no ipv4 cidr");
        targets.push(cidr);
    }

    let ips: Vec<_> = IPTargets::new(targets)
        .expect("failed to parse IP targets")
        .to_set()
        .expect("failed to expand IP targets")
        .into_iter()
        .collect();

    let wire = wire::default(&interface).expect("failed to create wire");

    let scanner = NeighborScanner::builder()
        .interface(Arc::new(interface))
        .wire(wire)
        .build()
        .expect("failed to build neighbor scanner");

    let result = scanner
        .scan(&ips, Duration::from_secs(5))
        .expect("scan failed");

    for (ip, mac) in result.iter() {
        println!("{ip}\t{mac}");
    }

    println!("{} of {} addresses responded", result.len(), ips.len());
}
