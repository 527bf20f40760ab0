//! Implements a default Wire using pnet
//!
//! A wire has a single reader. The first [`Wire::listen`] call starts a
//! reader thread that hands every neighbor reply it parses to all registered
//! listeners, so any number of scans can share one wire. The thread exits
//! once the last [`Listener`] is dropped.

use log::*;
use pnet::{datalink, util::MacAddr};
use std::{
    collections::HashMap,
    net::IpAddr,
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use crate::{
    error::{NetmonError, Result},
    network::NetworkInterface,
    packet::{Reader, Sender, reply},
};

/// How long a single read blocks before the reader gets a chance to check
/// whether anyone is still listening
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

// Pause after a failed read so a broken reader can't spin the cpu
const READ_ERROR_BACKOFF: Duration = Duration::from_micros(50);

/// A neighbor reply read off the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborReply {
    /// Address the reply announced
    pub ip: IpAddr,
    /// Hardware address the reply announced
    pub mac: MacAddr,
    /// When the reply was read
    pub received_at: Instant,
}

/// Events handed to every wire listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// A neighbor reply was read
    Reply(NeighborReply),
    /// The packet reader could not be used; carries the reason
    ReaderFailed(String),
}

// Returns false once the listener is no longer interested
type Callback = Box<dyn FnMut(WireEvent) -> bool + Send>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    callbacks: HashMap<u64, Callback>,
    reading: bool,
}

impl Listeners {
    fn dispatch(&mut self, event: WireEvent) {
        self.callbacks.retain(|_, cb| cb(event.clone()));
    }
}

/// Represents a packet Sender and packet Reader tuple, plus the listeners
/// fed by its reader
#[derive(Clone)]
pub struct Wire(
    pub Arc<Mutex<dyn Sender>>,
    pub Arc<Mutex<dyn Reader>>,
    Arc<Mutex<Listeners>>,
);

/// Registration with a wire's reader. Dropping it unregisters the callback.
pub struct Listener {
    id: u64,
    listeners: Arc<Mutex<Listeners>>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.callbacks.remove(&self.id);
        }
    }
}

impl Wire {
    /// Returns a new Wire using the provided sender and reader
    pub fn new(
        sender: Arc<Mutex<dyn Sender>>,
        reader: Arc<Mutex<dyn Reader>>,
    ) -> Self {
        Self(sender, reader, Arc::new(Mutex::new(Listeners::default())))
    }

    /// Registers `on_event` to receive every event from this wire's reader,
    /// starting the reader if it isn't running. The callback runs on the
    /// reader thread and should return quickly; returning false
    /// unregisters it.
    pub fn listen<F>(&self, on_event: F) -> Result<Listener>
    where
        F: FnMut(WireEvent) -> bool + Send + 'static,
    {
        let mut listeners = self
            .2
            .lock()
            .map_err(|e| NetmonError::PacketReaderLock(e.to_string()))?;

        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.callbacks.insert(id, Box::new(on_event));

        if !listeners.reading {
            listeners.reading = true;
            self.spawn_reader();
        }

        Ok(Listener {
            id,
            listeners: Arc::clone(&self.2),
        })
    }

    fn spawn_reader(&self) {
        let reader = Arc::clone(&self.1);
        let listeners = Arc::clone(&self.2);

        thread::spawn(move || {
            let mut reader = match reader.lock() {
                Ok(r) => r,
                Err(e) => {
                    if let Ok(mut listeners) = listeners.lock() {
                        listeners.dispatch(WireEvent::ReaderFailed(e.to_string()));
                        listeners.reading = false;
                    }
                    return;
                }
            };

            debug!("starting neighbor packet reader");

            loop {
                {
                    let Ok(mut listeners) = listeners.lock() else {
                        break;
                    };
                    // checked under the same lock `listen` registers with,
                    // so a new listener either sees this thread or starts
                    // a fresh one
                    if listeners.callbacks.is_empty() {
                        listeners.reading = false;
                        break;
                    }
                }

                let pkt = match reader.next_packet() {
                    Ok(pkt) => pkt,
                    Err(e) => {
                        trace!("no packet read: {}", e);
                        thread::sleep(READ_ERROR_BACKOFF);
                        continue;
                    }
                };

                let Some((ip, mac)) = reply::parse(pkt) else {
                    continue;
                };

                let event = WireEvent::Reply(NeighborReply {
                    ip,
                    mac,
                    received_at: Instant::now(),
                });

                let Ok(mut listeners) = listeners.lock() else {
                    break;
                };

                listeners.dispatch(event);
            }

            debug!("exiting neighbor packet reader");
        });
    }
}

/// A PNetReader implementation of packet Reader
pub struct PNetReader {
    receiver: Box<dyn datalink::DataLinkReceiver>,
}

// Implements the Reader trait for our PNet implementation
impl Reader for PNetReader {
    fn next_packet(&mut self) -> Result<&[u8]> {
        self.receiver
            .next()
            .map_err(|e| NetmonError::Wire(e.to_string()))
    }
}

/// A PNetSender implementation of packet Sender
pub struct PNetSender {
    sender: Box<dyn datalink::DataLinkSender>,
}

// Implements the Sender trait for our PNet implementation
impl Sender for PNetSender {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        let opt = self.sender.send_to(packet, None);
        match opt {
            Some(res) => {
                Ok(res.map_err(|e| NetmonError::Wire(e.to_string()))?)
            }
            None => Err(NetmonError::Wire("failed to send packet".into())),
        }
    }
}

/// Returns the default wire for the provided interface. Opening a raw
/// datalink channel usually requires root privileges; failures are reported
/// as [`NetmonError::ScanUnavailable`].
///
/// Example
/// ```no_run
/// # use r_netmon_lib::network;
/// # use r_netmon_lib::packet::wire;
/// let interface = network::get_default_interface().unwrap();
/// let packet_wire = wire::default(&interface).unwrap();
/// ```
pub fn default(interface: &NetworkInterface) -> Result<Wire> {
    let cfg = datalink::Config {
        read_timeout: Some(DEFAULT_READ_TIMEOUT),
        ..Default::default()
    };

    let channel = match datalink::channel(&interface.into(), cfg) {
        Ok(datalink::Channel::Ethernet(tx, rx)) => Ok((tx, rx)),
        Ok(_) => Err(NetmonError::ScanUnavailable(format!(
            "unsupported channel type on interface {}",
            interface.name
        ))),
        Err(e) => Err(NetmonError::ScanUnavailable(format!(
            "failed to open channel on interface {}: {}",
            interface.name, e
        ))),
    }?;

    Ok(Wire::new(
        Arc::new(Mutex::new(PNetSender { sender: channel.0 })),
        Arc::new(Mutex::new(PNetReader {
            receiver: channel.1,
        })),
    ))
}

#[cfg(test)]
#[path = "./wire_tests.rs"]
mod tests;
