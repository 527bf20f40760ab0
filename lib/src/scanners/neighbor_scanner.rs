//! Provides Scanner implementation for neighbor (ARP + NDP) scanning
//!
//! Every address gets one probe: an ARP request for IPv4 targets or a
//! neighbor solicitation for IPv6 targets. Probes are dispatched onto a
//! bounded thread pool while the wire's shared reader forwards every neighbor
//! reply it sees to a single collector running on the calling thread. The
//! collector owns the result map, enforces the shared deadline, and keeps the
//! first reply it accepts for each address.

use derive_builder::Builder;
use log::*;
use pnet::util::MacAddr;
use std::{
    collections::{HashMap, HashSet, hash_map::Entry},
    net::IpAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::{Duration, Instant},
};
use threadpool::ThreadPool;

use crate::{
    error::{NetmonError, Result},
    network::NetworkInterface,
    packet::{
        self,
        arp_packet::ArpPacketBuilder,
        ndp_packet::NdpPacketBuilder,
        wire::{Listener, NeighborReply, Wire, WireEvent},
    },
};

use super::{
    DEFAULT_MAX_CONCURRENT_PROBES, ScanResult, Scanner, validate_timeout,
};

/// Data structure representing a neighbor scanner
///
/// Clones share the wire, so one scanner can serve concurrent scans.
#[derive(Clone, Builder)]
#[builder(setter(into))]
pub struct NeighborScanner {
    /// Network interface to use for scanning
    interface: Arc<NetworkInterface>,
    /// Wire for reading and sending packets on the wire
    wire: Wire,
    /// Upper bound on the number of probes in flight at once
    #[builder(default = "DEFAULT_MAX_CONCURRENT_PROBES")]
    max_concurrent_probes: usize,
    /// Pause before each send to prevent packet loss. Sends on one wire are
    /// spaced by at least this much.
    #[builder(default = "packet::DEFAULT_PACKET_SEND_TIMING")]
    send_throttle: Duration,
}

/// Messages sent from probes and the packet reader to the collector
#[derive(Debug)]
enum ProbeEvent {
    /// A probe was put on the wire
    Sent(IpAddr),
    /// A probe could not be sent
    Failed(IpAddr, NetmonError),
    /// A neighbor reply was read off the wire
    Reply(NeighborReply),
    /// The packet reader could not be used
    ReaderFailed(NetmonError),
}

impl From<WireEvent> for ProbeEvent {
    fn from(value: WireEvent) -> Self {
        match value {
            WireEvent::Reply(reply) => Self::Reply(reply),
            WireEvent::ReaderFailed(reason) => {
                Self::ReaderFailed(NetmonError::PacketReaderLock(reason))
            }
        }
    }
}

impl NeighborScanner {
    /// Returns builder for NeighborScanner
    pub fn builder() -> NeighborScannerBuilder {
        NeighborScannerBuilder::default()
    }

    fn build_probe(&self, target: IpAddr) -> Result<Vec<u8>> {
        match target {
            IpAddr::V4(dest_ip) => {
                let source_ip = self.interface.ipv4.ok_or_else(|| {
                    NetmonError::probe(target, "interface has no ipv4 address")
                })?;
                let pkt = ArpPacketBuilder::default()
                    .source_ip(source_ip)
                    .source_mac(self.interface.mac)
                    .dest_ip(dest_ip)
                    .build()?;
                Ok(pkt.to_raw().to_vec())
            }
            IpAddr::V6(dest_ip) => {
                let source_ip = self.interface.ipv6.ok_or_else(|| {
                    NetmonError::probe(target, "interface has no ipv6 address")
                })?;
                let pkt = NdpPacketBuilder::default()
                    .source_ip(source_ip)
                    .source_mac(self.interface.mac)
                    .dest_ip(dest_ip)
                    .build()?;
                Ok(pkt.to_raw().to_vec())
            }
        }
    }

    fn process_target(&self, target: IpAddr) -> Result<()> {
        debug!("probing neighbor: {}", target);

        let pkt = self.build_probe(target)?;

        let mut pkt_sender = self.wire.0.lock()?;

        // throttle packet sending to prevent packet loss; holding the sender
        // lock keeps workers from sleeping in parallel
        thread::sleep(self.send_throttle);

        pkt_sender
            .send(&pkt)
            .map_err(|e| NetmonError::probe(target, e))
    }

    // Registers with the wire's shared reader so we can send and receive
    // simultaneously. Replies stop arriving once the listener is dropped.
    fn read_packets(&self, events: mpsc::Sender<ProbeEvent>) -> Result<Listener> {
        self.wire
            .listen(move |event| events.send(ProbeEvent::from(event)).is_ok())
    }

    fn dispatch_probes(
        &self,
        targets: &HashSet<IpAddr>,
        deadline: Instant,
        done: &Arc<AtomicBool>,
        events: &mpsc::Sender<ProbeEvent>,
    ) {
        let pool = ThreadPool::new(
            self.max_concurrent_probes.clamp(1, targets.len()),
        );

        for target in targets.iter().copied() {
            let scanner = self.clone();
            let done = Arc::clone(done);
            let events = events.clone();

            pool.execute(move || {
                // probes that start late get whatever is left of the shared
                // budget, and nothing once it is spent
                if done.load(Ordering::Relaxed) || Instant::now() >= deadline {
                    return;
                }

                // The OS never answers ARP for its own address
                if scanner.interface.owns(target) {
                    let _ = events.send(ProbeEvent::Reply(NeighborReply {
                        ip: target,
                        mac: scanner.interface.mac,
                        received_at: Instant::now(),
                    }));
                    return;
                }

                let event = match scanner.process_target(target) {
                    Ok(()) => ProbeEvent::Sent(target),
                    Err(e) => ProbeEvent::Failed(target, e),
                };

                let _ = events.send(event);
            });
        }
    }

    fn collect(
        &self,
        targets: &HashSet<IpAddr>,
        deadline: Instant,
        events: mpsc::Receiver<ProbeEvent>,
    ) -> Result<ScanResult> {
        let mut found: HashMap<IpAddr, MacAddr> = HashMap::new();
        // addresses still waiting on a reply or a send failure
        let mut pending: HashSet<IpAddr> = targets.clone();
        let mut sent = 0;
        let mut failed = 0;
        let mut last_failure: Option<NetmonError> = None;

        loop {
            if failed == targets.len() {
                let reason = last_failure
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no probes sent".into());
                return Err(NetmonError::ScanUnavailable(format!(
                    "failed to send any probe: {reason}"
                )));
            }

            if pending.is_empty() {
                debug!("every probe completed");
                break;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());

            if remaining.is_zero() {
                break;
            }

            match events.recv_timeout(remaining) {
                Ok(ProbeEvent::Sent(ip)) => {
                    trace!("probe sent to {}", ip);
                    sent += 1;
                }
                Ok(ProbeEvent::Failed(ip, err)) => {
                    warn!("failed to probe {}: {}", ip, err);
                    failed += 1;
                    pending.remove(&ip);
                    last_failure = Some(err);
                }
                Ok(ProbeEvent::Reply(NeighborReply {
                    ip,
                    mac,
                    received_at,
                })) => {
                    if !targets.contains(&ip) {
                        trace!("ignoring reply from unrequested {}", ip);
                        continue;
                    }

                    if received_at >= deadline {
                        debug!("ignoring late reply from {}", ip);
                        continue;
                    }

                    match found.entry(ip) {
                        Entry::Vacant(e) => {
                            debug!("{} is at {}", ip, mac);
                            e.insert(mac);
                            pending.remove(&ip);
                        }
                        Entry::Occupied(e) if *e.get() != mac => {
                            warn!(
                                "ignoring conflicting reply for {}: kept {}, got {}",
                                ip,
                                e.get(),
                                mac
                            );
                        }
                        Entry::Occupied(_) => {}
                    }
                }
                Ok(ProbeEvent::ReaderFailed(err)) => {
                    return Err(NetmonError::ScanUnavailable(format!(
                        "failed to read from wire: {err}"
                    )));
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!(
            "scan complete: {} of {} addresses responded ({} probes sent, {} failed)",
            found.len(),
            targets.len(),
            sent,
            failed
        );

        Ok(ScanResult::from(found))
    }
}

// Implements the Scanner trait for NeighborScanner
impl Scanner for NeighborScanner {
    fn scan(&self, addresses: &[IpAddr], timeout: Duration) -> Result<ScanResult> {
        validate_timeout(timeout)?;

        let deadline = Instant::now() + timeout;
        let targets: HashSet<IpAddr> = addresses.iter().copied().collect();

        if targets.is_empty() {
            debug!("no targets to scan");
            return Ok(ScanResult::default());
        }

        debug!(
            "performing neighbor scan on {} targets with timeout {:?}",
            targets.len(),
            timeout
        );

        let (events_tx, events_rx) = mpsc::channel::<ProbeEvent>();
        let done = Arc::new(AtomicBool::new(false));

        let listener = self.read_packets(events_tx.clone()).map_err(|e| {
            NetmonError::ScanUnavailable(format!("failed to read from wire: {e}"))
        })?;
        self.dispatch_probes(&targets, deadline, &done, &events_tx);
        drop(events_tx);

        let result = self.collect(&targets, deadline, events_rx);

        // stragglers observe this and exit without reporting; anything they
        // do report lands in a channel nobody reads
        done.store(true, Ordering::Relaxed);
        drop(listener);

        result
    }
}

#[cfg(test)]
#[path = "./neighbor_scanner_tests.rs"]
mod tests;
