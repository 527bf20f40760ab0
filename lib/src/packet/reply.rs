//! Extracts neighbor information from ARP replies and NDP neighbor
//! advertisements read off the wire

use pnet::{
    packet::{
        Packet, arp, ethernet,
        icmpv6::{
            Icmpv6Packet, Icmpv6Types,
            ndp::{NdpOptionTypes, NeighborAdvertPacket},
        },
        ip, ipv6,
    },
    util::MacAddr,
};
use std::net::IpAddr;

/// Returns the address and hardware address announced by a neighbor
/// reply, or None if the packet is anything else
pub fn parse(pkt: &[u8]) -> Option<(IpAddr, MacAddr)> {
    let eth = ethernet::EthernetPacket::new(pkt)?;

    match eth.get_ethertype() {
        ethernet::EtherTypes::Arp => parse_arp(&eth),
        ethernet::EtherTypes::Ipv6 => parse_neighbor_advert(&eth),
        _ => None,
    }
}

fn parse_arp(eth: &ethernet::EthernetPacket) -> Option<(IpAddr, MacAddr)> {
    let header = arp::ArpPacket::new(eth.payload())?;

    if header.get_operation() != arp::ArpOperations::Reply {
        return None;
    }

    Some((
        IpAddr::V4(header.get_sender_proto_addr()),
        header.get_sender_hw_addr(),
    ))
}

fn parse_neighbor_advert(
    eth: &ethernet::EthernetPacket,
) -> Option<(IpAddr, MacAddr)> {
    let ip6 = ipv6::Ipv6Packet::new(eth.payload())?;

    if ip6.get_next_header() != ip::IpNextHeaderProtocols::Icmpv6 {
        return None;
    }

    let icmp = Icmpv6Packet::new(ip6.payload())?;

    if icmp.get_icmpv6_type() != Icmpv6Types::NeighborAdvert {
        return None;
    }

    let advert = NeighborAdvertPacket::new(ip6.payload())?;

    // The target link-layer option is authoritative; fall back to the frame
    // source when a neighbor omits it
    let mac = advert
        .get_options()
        .into_iter()
        .find(|o| o.option_type == NdpOptionTypes::TargetLLAddr)
        .and_then(|o| match o.data.as_slice() {
            [a, b, c, d, e, f, ..] => Some(MacAddr::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        })
        .unwrap_or_else(|| eth.get_source());

    Some((IpAddr::V6(advert.get_target_addr()), mac))
}

#[cfg(test)]
#[path = "./reply_tests.rs"]
mod tests;
