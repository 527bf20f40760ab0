use mockall::mock;
use pnet::{
    packet::{Packet, arp, ethernet, icmpv6::ndp, ipv6},
    util::MacAddr,
};
use std::{
    collections::HashMap,
    net::IpAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crate::error::{NetmonError, Result};

use super::{
    Reader, Sender, arp_packet::create_arp_reply,
    ndp_packet::create_neighbor_advert, wire::Wire,
};

mock! {
    pub PacketReader {}
    impl Reader for PacketReader {
        fn next_packet(&mut self) -> Result<&'static [u8]>;
    }
}

mock! {
    pub PacketSender {}
    impl Sender for PacketSender {
        fn send(&mut self, packet: &[u8]) -> Result<()>;
    }
}

/// Hardware address the simulated replies are addressed to
pub const SCANNER_MAC: MacAddr = MacAddr(0x00, 0x11, 0x22, 0x33, 0x44, 0x55);

// Longest a simulated read blocks before reporting that nothing arrived
const READ_TICK: Duration = Duration::from_millis(5);

type Queue = Arc<Mutex<Vec<(Instant, Vec<u8>)>>>;

/// Returns the address a neighbor request is asking about
pub fn request_target(pkt: &[u8]) -> Option<IpAddr> {
    let eth = ethernet::EthernetPacket::new(pkt)?;
    match eth.get_ethertype() {
        ethernet::EtherTypes::Arp => {
            let req = arp::ArpPacket::new(eth.payload())?;
            Some(IpAddr::V4(req.get_target_proto_addr()))
        }
        ethernet::EtherTypes::Ipv6 => {
            let ip6 = ipv6::Ipv6Packet::new(eth.payload())?;
            let ns = ndp::NeighborSolicitPacket::new(ip6.payload())?;
            Some(IpAddr::V6(ns.get_target_addr()))
        }
        _ => None,
    }
}

fn build_reply(ip: IpAddr, mac: MacAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(ip4) => create_arp_reply(
            mac,
            ip4,
            SCANNER_MAC,
            std::net::Ipv4Addr::new(10, 0, 0, 250),
        )
        .to_vec(),
        IpAddr::V6(ip6) => create_neighbor_advert(
            mac,
            ip6,
            SCANNER_MAC,
            "fe80::250".parse().expect("valid ipv6"),
        )
        .to_vec(),
    }
}

/// Simulated network segment. Each address may answer any number of times,
/// each answer scheduled at a fixed latency measured from the moment the
/// simulation was created.
#[derive(Default)]
pub struct Simulation {
    replies: HashMap<IpAddr, Vec<(Duration, MacAddr)>>,
    unsolicited: Vec<(Duration, IpAddr, MacAddr)>,
    fail_sends: bool,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a reply from `ip` carrying `mac`, sent once `ip` is probed
    pub fn reply(mut self, ip: IpAddr, latency: Duration, mac: MacAddr) -> Self {
        self.replies.entry(ip).or_default().push((latency, mac));
        self
    }

    /// Schedules a reply that shows up whether or not it was asked for
    pub fn unsolicited(
        mut self,
        ip: IpAddr,
        latency: Duration,
        mac: MacAddr,
    ) -> Self {
        self.unsolicited.push((latency, ip, mac));
        self
    }

    /// Makes every send fail
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Starts the simulation clock and returns the wire plus a handle for
    /// inspecting what was sent
    pub fn start(self) -> (Wire, SimulatedWire) {
        let epoch = Instant::now();
        let queue: Queue = Arc::new(Mutex::new(
            self.unsolicited
                .iter()
                .map(|(latency, ip, mac)| (epoch + *latency, build_reply(*ip, *mac)))
                .collect(),
        ));
        let sent = Arc::new(AtomicUsize::new(0));
        let probed = Arc::new(Mutex::new(Vec::new()));

        let sender = SimulatedSender {
            epoch,
            replies: self.replies,
            fail_sends: self.fail_sends,
            queue: Arc::clone(&queue),
            sent: Arc::clone(&sent),
            probed: Arc::clone(&probed),
        };

        let reader = SimulatedReader {
            queue,
            current: Vec::new(),
        };

        (
            Wire::new(Arc::new(Mutex::new(sender)), Arc::new(Mutex::new(reader))),
            SimulatedWire { sent, probed },
        )
    }
}

/// Handle for inspecting a running simulation
pub struct SimulatedWire {
    sent: Arc<AtomicUsize>,
    probed: Arc<Mutex<Vec<IpAddr>>>,
}

impl SimulatedWire {
    /// Number of packets that were handed to the sender
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    /// Addresses that were probed, in send order
    pub fn probed(&self) -> Vec<IpAddr> {
        self.probed.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

struct SimulatedSender {
    epoch: Instant,
    replies: HashMap<IpAddr, Vec<(Duration, MacAddr)>>,
    fail_sends: bool,
    queue: Queue,
    sent: Arc<AtomicUsize>,
    probed: Arc<Mutex<Vec<IpAddr>>>,
}

impl Sender for SimulatedSender {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        self.sent.fetch_add(1, Ordering::SeqCst);

        if self.fail_sends {
            return Err(NetmonError::Wire("simulated send failure".into()));
        }

        let target = request_target(packet)
            .ok_or_else(|| NetmonError::Wire("not a neighbor request".into()))?;

        if let Ok(mut probed) = self.probed.lock() {
            probed.push(target);
        }

        if let Some(replies) = self.replies.get(&target) {
            let mut queue = self
                .queue
                .lock()
                .map_err(|e| NetmonError::Wire(e.to_string()))?;
            for (latency, mac) in replies {
                queue.push((self.epoch + *latency, build_reply(target, *mac)));
            }
        }

        Ok(())
    }
}

struct SimulatedReader {
    queue: Queue,
    current: Vec<u8>,
}

impl SimulatedReader {
    fn pop_due(&mut self) -> Option<Vec<u8>> {
        let now = Instant::now();
        let mut queue = self.queue.lock().ok()?;
        let (idx, _) = queue
            .iter()
            .enumerate()
            .filter(|(_, (due, _))| *due <= now)
            .min_by_key(|(_, (due, _))| *due)?;
        Some(queue.remove(idx).1)
    }

    fn next_due(&self) -> Option<Instant> {
        let queue = self.queue.lock().ok()?;
        queue.iter().map(|(due, _)| *due).min()
    }
}

impl Reader for SimulatedReader {
    fn next_packet(&mut self) -> Result<&[u8]> {
        if let Some(pkt) = self.pop_due() {
            self.current = pkt;
            return Ok(&self.current);
        }

        let wait = self
            .next_due()
            .map(|due| due.saturating_duration_since(Instant::now()))
            .map_or(READ_TICK, |d| d.min(READ_TICK));

        thread::sleep(wait);

        match self.pop_due() {
            Some(pkt) => {
                self.current = pkt;
                Ok(&self.current)
            }
            None => Err(NetmonError::Wire("read timed out".into())),
        }
    }
}
