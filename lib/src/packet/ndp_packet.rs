//! Provides helpers for creating NDP neighbor solicitation packets
//!
//! IPv6 has no ARP. Hardware addresses are resolved by sending an ICMPv6
//! neighbor solicitation to the target's solicited-node multicast group and
//! waiting for the matching neighbor advertisement.

use derive_builder::Builder;
use pnet::{
    packet::{
        MutablePacket, Packet, ethernet,
        icmpv6::{
            self, Icmpv6Code, Icmpv6Types,
            ndp::{self, NdpOption, NdpOptionTypes},
        },
        ip, ipv6,
    },
    util,
};
use std::net;

const PKT_ETH_SIZE: usize = ethernet::EthernetPacket::minimum_packet_size();
const PKT_IP6_SIZE: usize = ipv6::Ipv6Packet::minimum_packet_size();
const PKT_NS_SIZE: usize = ndp::NeighborSolicitPacket::minimum_packet_size();
// type (1) + length in 8 octet units (1) + hardware address (6)
const PKT_LL_OPTION_SIZE: usize = 8;
const PKT_ICMP_SIZE: usize = PKT_NS_SIZE + PKT_LL_OPTION_SIZE;
/// Total size of an ethernet framed neighbor solicitation packet
pub const PKT_TOTAL_SIZE: usize = PKT_ETH_SIZE + PKT_IP6_SIZE + PKT_ICMP_SIZE;

// NDP packets must be sent and received with the maximum hop limit
const NDP_HOP_LIMIT: u8 = 255;

/// Returns the solicited-node multicast address for the provided target
pub fn solicited_node_address(target: net::Ipv6Addr) -> net::Ipv6Addr {
    let o = target.octets();
    net::Ipv6Addr::new(
        0xff02,
        0,
        0,
        0,
        0,
        1,
        0xff00 | o[13] as u16,
        (o[14] as u16) << 8 | o[15] as u16,
    )
}

/// Returns the ethernet multicast group address that maps to the
/// solicited-node multicast address of the provided target
pub fn solicited_node_mac(target: net::Ipv6Addr) -> util::MacAddr {
    let o = target.octets();
    util::MacAddr::new(0x33, 0x33, 0xff, o[13], o[14], o[15])
}

fn link_layer_option(
    option_type: ndp::NdpOptionType,
    mac: util::MacAddr,
) -> NdpOption {
    let util::MacAddr(a, b, c, d, e, f) = mac;
    NdpOption {
        option_type,
        length: 1,
        data: vec![a, b, c, d, e, f],
    }
}

/// Represents a generator for raw neighbor solicitation packets
#[derive(Debug, Builder)]
#[builder(setter(into))]
pub struct NdpPacket {
    /// IPv6 address of the host machine performing scanning, usually its
    /// link-local address
    source_ip: net::Ipv6Addr,
    /// MAC address of host machine performing scanning
    source_mac: util::MacAddr,
    /// Target IPv6 whose hardware address is being requested
    dest_ip: net::Ipv6Addr,
}

impl NdpPacket {
    /// Builds a new neighbor solicitation addressed to the target's
    /// solicited-node multicast group
    pub fn to_raw(&self) -> [u8; PKT_TOTAL_SIZE] {
        let mut pkt_buf = [0u8; PKT_TOTAL_SIZE];
        let group_ip = solicited_node_address(self.dest_ip);

        let mut eth_header = ethernet::MutableEthernetPacket::new(&mut pkt_buf)
            .expect("failed to generate ethernet header");
        eth_header.set_ethertype(ethernet::EtherTypes::Ipv6);
        eth_header.set_source(self.source_mac);
        eth_header.set_destination(solicited_node_mac(self.dest_ip));

        let mut ip_buffer = [0u8; PKT_IP6_SIZE + PKT_ICMP_SIZE];

        let mut ip_header = ipv6::MutableIpv6Packet::new(&mut ip_buffer)
            .expect("failed to generate ipv6 header");

        ip_header.set_version(6);
        ip_header.set_traffic_class(0);
        ip_header.set_flow_label(0);
        ip_header.set_payload_length(PKT_ICMP_SIZE as u16);
        ip_header.set_next_header(ip::IpNextHeaderProtocols::Icmpv6);
        ip_header.set_hop_limit(NDP_HOP_LIMIT);
        ip_header.set_source(self.source_ip);
        ip_header.set_destination(group_ip);

        let mut icmp_buffer = [0u8; PKT_ICMP_SIZE];

        let mut ns = ndp::MutableNeighborSolicitPacket::new(&mut icmp_buffer)
            .expect("failed to generate neighbor solicitation");

        ns.set_icmpv6_type(Icmpv6Types::NeighborSolicit);
        ns.set_icmpv6_code(Icmpv6Code::new(0));
        ns.set_reserved(0);
        ns.set_target_addr(self.dest_ip);
        ns.set_options(&[link_layer_option(
            NdpOptionTypes::SourceLLAddr,
            self.source_mac,
        )]);

        let checksum = icmpv6::Icmpv6Packet::new(ns.packet())
            .map(|p| icmpv6::checksum(&p, &self.source_ip, &group_ip))
            .unwrap_or_default();
        ns.set_checksum(checksum);

        ip_header.set_payload(ns.packet_mut());
        eth_header.set_payload(ip_header.packet_mut());

        pkt_buf
    }
}

#[cfg(test)]
#[doc(hidden)]
// only used in tests
pub fn create_neighbor_advert(
    from_mac: util::MacAddr,
    from_ip: net::Ipv6Addr,
    to_mac: util::MacAddr,
    to_ip: net::Ipv6Addr,
) -> [u8; PKT_TOTAL_SIZE] {
    let mut pkt_buf = [0u8; PKT_TOTAL_SIZE];

    let mut eth_header = ethernet::MutableEthernetPacket::new(&mut pkt_buf)
        .expect("failed to generate ethernet header");
    eth_header.set_ethertype(ethernet::EtherTypes::Ipv6);
    eth_header.set_source(from_mac);
    eth_header.set_destination(to_mac);

    let mut ip_buffer = [0u8; PKT_IP6_SIZE + PKT_ICMP_SIZE];

    let mut ip_header = ipv6::MutableIpv6Packet::new(&mut ip_buffer)
        .expect("failed to generate ipv6 header");

    ip_header.set_version(6);
    ip_header.set_payload_length(PKT_ICMP_SIZE as u16);
    ip_header.set_next_header(ip::IpNextHeaderProtocols::Icmpv6);
    ip_header.set_hop_limit(NDP_HOP_LIMIT);
    ip_header.set_source(from_ip);
    ip_header.set_destination(to_ip);

    let mut icmp_buffer = [0u8; PKT_ICMP_SIZE];

    let mut na = ndp::MutableNeighborAdvertPacket::new(&mut icmp_buffer)
        .expect("failed to generate neighbor advertisement");

    na.set_icmpv6_type(Icmpv6Types::NeighborAdvert);
    na.set_icmpv6_code(Icmpv6Code::new(0));
    na.set_flags(
        ndp::NeighborAdvertFlags::Solicited | ndp::NeighborAdvertFlags::Override,
    );
    na.set_target_addr(from_ip);
    na.set_options(&[link_layer_option(NdpOptionTypes::TargetLLAddr, from_mac)]);

    ip_header.set_payload(na.packet_mut());
    eth_header.set_payload(ip_header.packet_mut());

    pkt_buf
}

#[cfg(test)]
#[path = "./ndp_packet_tests.rs"]
mod tests;
