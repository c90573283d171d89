//! ICMP echo probe with a per-request TTL.
//!
//! Requests go out on a raw ICMP socket so that time-exceeded and
//! unreachable errors from routers are seen as well as echo replies. Replies
//! are matched by the identifier and sequence number of the request, either
//! directly (echo reply) or as quoted in the error's copy of the original
//! packet.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use pnet_packet::Packet;
use pnet_packet::icmp::echo_reply::EchoReplyPacket;
use pnet_packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet_packet::icmp::{IcmpPacket, IcmpTypes};
use pnet_packet::icmpv6::{self, Icmpv6Packet, Icmpv6Types};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};

use super::hop::HopStatus;
use super::traits::{EchoProbe, EchoReply, ProbeError};

/// Fixed single-byte payload carried by every request.
const PAYLOAD: [u8; 1] = [0];

/// Echo header (type, code, checksum, identifier, sequence).
const ECHO_HEADER_LEN: usize = 8;

/// Unused word between an ICMP error header and the quoted packet.
const ERROR_PREAMBLE_LEN: usize = 4;

const IPV6_HEADER_LEN: usize = 40;

const RECV_BUFFER_LEN: usize = 2048;

/// ICMP echo probe on a raw socket.
///
/// Each request opens its own socket with the hop's TTL, so concurrent traces
/// never share socket options. Raw sockets need `CAP_NET_RAW` or root.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcmpEcho;

impl IcmpEcho {
    /// Create an ICMP echo probe.
    pub fn new() -> Self {
        Self
    }

    fn open_socket(target: IpAddr, ttl: u8) -> std::io::Result<UdpSocket> {
        let socket = match target {
            IpAddr::V4(_) => {
                let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
                socket.set_ttl_v4(u32::from(ttl))?;
                socket
            }
            IpAddr::V6(_) => {
                let socket = Socket::new(Domain::IPV6, Type::RAW, Some(Protocol::ICMPV6))?;
                socket.set_unicast_hops_v6(u32::from(ttl))?;
                socket
            }
        };
        socket.set_nonblocking(true)?;
        UdpSocket::from_std(std::net::UdpSocket::from(socket))
    }
}

/// Encode an echo request for `target`'s address family.
///
/// The ICMPv6 checksum is left at zero; the kernel fills it in on raw
/// ICMPv6 sockets.
fn echo_request(target: IpAddr, ident: u16, seq: u16) -> Result<Vec<u8>, ProbeError> {
    let mut buf = vec![0u8; ECHO_HEADER_LEN + PAYLOAD.len()];
    match target {
        IpAddr::V4(_) => {
            let mut request = MutableEchoRequestPacket::new(&mut buf).ok_or_else(|| {
                ProbeError::InvalidParameter("echo request buffer too short".to_string())
            })?;
            request.set_icmp_type(IcmpTypes::EchoRequest);
            request.set_identifier(ident);
            request.set_sequence_number(seq);
            request.set_payload(&PAYLOAD);
            let checksum = pnet_packet::util::checksum(request.packet(), 1);
            request.set_checksum(checksum);
        }
        IpAddr::V6(_) => {
            let mut request = icmpv6::echo_request::MutableEchoRequestPacket::new(&mut buf)
                .ok_or_else(|| {
                    ProbeError::InvalidParameter("echo request buffer too short".to_string())
                })?;
            request.set_icmpv6_type(Icmpv6Types::EchoRequest);
            request.set_identifier(ident);
            request.set_sequence_number(seq);
            request.set_payload(&PAYLOAD);
        }
    }
    Ok(buf)
}

/// Classify a received datagram against an outstanding request.
///
/// `buf` is what a raw socket delivers: the IPv4 header followed by ICMP for
/// IPv4, the bare ICMPv6 message for IPv6. Returns `None` for traffic that
/// belongs to some other request.
fn match_reply(
    buf: &[u8],
    from: IpAddr,
    target: IpAddr,
    ident: u16,
    seq: u16,
) -> Option<EchoReply> {
    match (target, from) {
        (IpAddr::V4(target), _) => match_v4(buf, target, ident, seq),
        (IpAddr::V6(target), IpAddr::V6(from)) => match_v6(buf, from, target, ident, seq),
        (IpAddr::V6(_), IpAddr::V4(_)) => None,
    }
}

fn match_v4(buf: &[u8], target: Ipv4Addr, ident: u16, seq: u16) -> Option<EchoReply> {
    let ip = Ipv4Packet::new(buf)?;
    let source = IpAddr::V4(ip.get_source());
    let message = buf.get(usize::from(ip.get_header_length()) * 4..)?;
    let icmp = IcmpPacket::new(message)?;

    let status = match icmp.get_icmp_type() {
        IcmpTypes::EchoReply => {
            let reply = EchoReplyPacket::new(message)?;
            if reply.get_identifier() != ident || reply.get_sequence_number() != seq {
                return None;
            }
            HopStatus::Success
        }
        IcmpTypes::TimeExceeded if quotes_v4(icmp.payload(), target, ident, seq) => {
            HopStatus::TtlExpired
        }
        IcmpTypes::DestinationUnreachable if quotes_v4(icmp.payload(), target, ident, seq) => {
            HopStatus::Unreachable
        }
        _ => return None,
    };
    Some(EchoReply::answered(source, status))
}

/// Whether an ICMPv4 error body quotes our request to `target`.
fn quotes_v4(body: &[u8], target: Ipv4Addr, ident: u16, seq: u16) -> bool {
    let Some(original) = body.get(ERROR_PREAMBLE_LEN..).and_then(Ipv4Packet::new) else {
        return false;
    };
    if original.get_next_level_protocol() != IpNextHeaderProtocols::Icmp
        || original.get_destination() != target
    {
        return false;
    }

    let offset = ERROR_PREAMBLE_LEN + usize::from(original.get_header_length()) * 4;
    body.get(offset..)
        .and_then(EchoRequestPacket::new)
        .is_some_and(|request| {
            request.get_icmp_type() == IcmpTypes::EchoRequest
                && request.get_identifier() == ident
                && request.get_sequence_number() == seq
        })
}

fn match_v6(
    buf: &[u8],
    from: Ipv6Addr,
    target: Ipv6Addr,
    ident: u16,
    seq: u16,
) -> Option<EchoReply> {
    let icmp = Icmpv6Packet::new(buf)?;

    let status = match icmp.get_icmpv6_type() {
        Icmpv6Types::EchoReply => {
            let reply = icmpv6::echo_reply::EchoReplyPacket::new(buf)?;
            if reply.get_identifier() != ident || reply.get_sequence_number() != seq {
                return None;
            }
            HopStatus::Success
        }
        Icmpv6Types::TimeExceeded if quotes_v6(icmp.payload(), target, ident, seq) => {
            HopStatus::TtlExpired
        }
        Icmpv6Types::DestinationUnreachable if quotes_v6(icmp.payload(), target, ident, seq) => {
            HopStatus::Unreachable
        }
        _ => return None,
    };
    Some(EchoReply::answered(IpAddr::V6(from), status))
}

/// Whether an ICMPv6 error body quotes our request to `target`.
fn quotes_v6(body: &[u8], target: Ipv6Addr, ident: u16, seq: u16) -> bool {
    let Some(original) = body.get(ERROR_PREAMBLE_LEN..).and_then(Ipv6Packet::new) else {
        return false;
    };
    if original.get_next_header() != IpNextHeaderProtocols::Icmpv6
        || original.get_destination() != target
    {
        return false;
    }

    body.get(ERROR_PREAMBLE_LEN + IPV6_HEADER_LEN..)
        .and_then(icmpv6::echo_request::EchoRequestPacket::new)
        .is_some_and(|request| {
            request.get_icmpv6_type() == Icmpv6Types::EchoRequest
                && request.get_identifier() == ident
                && request.get_sequence_number() == seq
        })
}

#[async_trait::async_trait]
impl EchoProbe for IcmpEcho {
    async fn echo(
        &self,
        target: IpAddr,
        ttl: u8,
        hop_timeout: Duration,
    ) -> Result<EchoReply, ProbeError> {
        let socket = Self::open_socket(target, ttl)?;
        let ident: u16 = rand::random();
        let seq = u16::from(ttl);
        let request = echo_request(target, ident, seq)?;

        let deadline = Instant::now() + hop_timeout;
        if let Err(e) = socket.send_to(&request, SocketAddr::new(target, 0)).await {
            return match e.kind() {
                std::io::ErrorKind::PermissionDenied => Err(ProbeError::Socket(e)),
                std::io::ErrorKind::HostUnreachable | std::io::ErrorKind::NetworkUnreachable => {
                    tracing::debug!(target = %target, ttl, error = %e, "Echo request not sent");
                    Ok(EchoReply::silent(HopStatus::Unreachable))
                }
                _ => {
                    tracing::debug!(target = %target, ttl, error = %e, "Echo request not sent");
                    Ok(EchoReply::silent(HopStatus::OtherError))
                }
            };
        }

        let mut buf = [0u8; RECV_BUFFER_LEN];
        loop {
            match timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Err(_) => return Ok(EchoReply::silent(HopStatus::TimedOut)),
                Ok(Err(e)) => {
                    tracing::debug!(target = %target, ttl, error = %e, "Echo receive failed");
                    return Ok(EchoReply::silent(HopStatus::OtherError));
                }
                Ok(Ok((len, from))) => {
                    if let Some(reply) = match_reply(&buf[..len], from.ip(), target, ident, seq) {
                        return Ok(reply);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENT: u16 = 0x1234;
    const SEQ: u16 = 3;

    /// Router 10.0.0.1 reporting TTL expiry of 192.168.1.10's echo request
    /// (ident 0x1234, seq 3) to 192.0.2.1.
    const TIME_EXCEEDED_V4: [u8; 56] = [
        // outer IPv4 header
        0x45, 0x00, 0x00, 0x38, 0x00, 0x00, 0x00, 0x00, 0xfe, 0x01, 0x00, 0x00, 10, 0, 0, 1, 192,
        168, 1, 10, //
        // ICMP time exceeded, TTL exceeded in transit
        0x0b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
        // quoted IPv4 header
        0x45, 0x00, 0x00, 0x1d, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00, 192, 168, 1, 10,
        192, 0, 2, 1, //
        // quoted echo request
        0x08, 0x00, 0x00, 0x00, 0x12, 0x34, 0x00, 0x03,
    ];

    fn target_v4() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))
    }

    fn router_v4() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
    }

    fn echo_reply_v4(source: [u8; 4], ident: u16, seq: u16) -> Vec<u8> {
        let mut packet = vec![
            0x45, 0x00, 0x00, 0x1d, 0x00, 0x00, 0x00, 0x00, 0x40, 0x01, 0x00, 0x00,
        ];
        packet.extend_from_slice(&source);
        packet.extend_from_slice(&[192, 168, 1, 10]);
        packet.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        packet.extend_from_slice(&ident.to_be_bytes());
        packet.extend_from_slice(&seq.to_be_bytes());
        packet.push(0);
        packet
    }

    fn time_exceeded_v6(target: Ipv6Addr, ident: u16, seq: u16) -> Vec<u8> {
        let mut packet = vec![0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        packet.extend_from_slice(&[0x60, 0x00, 0x00, 0x00, 0x00, 0x09, 58, 1]);
        packet.extend_from_slice(&"2001:db8::10".parse::<Ipv6Addr>().unwrap().octets());
        packet.extend_from_slice(&target.octets());
        packet.extend_from_slice(&[0x80, 0x00, 0x00, 0x00]);
        packet.extend_from_slice(&ident.to_be_bytes());
        packet.extend_from_slice(&seq.to_be_bytes());
        packet
    }

    #[test]
    fn test_time_exceeded_is_attributed_to_router() {
        let reply = match_reply(&TIME_EXCEEDED_V4, router_v4(), target_v4(), IDENT, SEQ).unwrap();
        assert_eq!(reply.status, HopStatus::TtlExpired);
        assert_eq!(reply.responder, Some(router_v4()));
    }

    #[test]
    fn test_time_exceeded_for_other_request_is_ignored() {
        let other_ident = match_reply(&TIME_EXCEEDED_V4, router_v4(), target_v4(), 0x4321, SEQ);
        assert!(other_ident.is_none());

        let other_seq = match_reply(&TIME_EXCEEDED_V4, router_v4(), target_v4(), IDENT, 4);
        assert!(other_seq.is_none());

        let other_target = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 99));
        assert!(match_reply(&TIME_EXCEEDED_V4, router_v4(), other_target, IDENT, SEQ).is_none());
    }

    #[test]
    fn test_destination_unreachable_maps_to_unreachable() {
        let mut packet = TIME_EXCEEDED_V4;
        packet[20] = 0x03; // destination unreachable
        packet[21] = 0x01; // host unreachable

        let reply = match_reply(&packet, router_v4(), target_v4(), IDENT, SEQ).unwrap();
        assert_eq!(reply.status, HopStatus::Unreachable);
        assert_eq!(reply.responder, Some(router_v4()));
    }

    #[test]
    fn test_echo_reply_from_target_is_success() {
        let packet = echo_reply_v4([192, 0, 2, 1], IDENT, SEQ);
        let reply = match_reply(&packet, target_v4(), target_v4(), IDENT, SEQ).unwrap();
        assert_eq!(reply.status, HopStatus::Success);
        assert_eq!(reply.responder, Some(target_v4()));

        let stale = echo_reply_v4([192, 0, 2, 1], IDENT, SEQ - 1);
        assert!(match_reply(&stale, target_v4(), target_v4(), IDENT, SEQ).is_none());
    }

    #[test]
    fn test_own_request_and_truncated_packets_are_ignored() {
        let mut request = echo_reply_v4([192, 168, 1, 10], IDENT, SEQ);
        request[20] = 0x08;
        assert!(match_reply(&request, target_v4(), target_v4(), IDENT, SEQ).is_none());

        let truncated = &TIME_EXCEEDED_V4[..50];
        assert!(match_reply(truncated, router_v4(), target_v4(), IDENT, SEQ).is_none());
        assert!(match_reply(&[], router_v4(), target_v4(), IDENT, SEQ).is_none());
    }

    #[test]
    fn test_ipv6_time_exceeded_and_reply() {
        let target: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let router: Ipv6Addr = "2001:db8:ff::1".parse().unwrap();

        let packet = time_exceeded_v6(target, IDENT, SEQ);
        let reply = match_reply(&packet, IpAddr::V6(router), IpAddr::V6(target), IDENT, SEQ)
            .unwrap();
        assert_eq!(reply.status, HopStatus::TtlExpired);
        assert_eq!(reply.responder, Some(IpAddr::V6(router)));

        let echo = [0x81, 0x00, 0x00, 0x00, 0x12, 0x34, 0x00, 0x03, 0x00];
        let reply = match_reply(&echo, IpAddr::V6(target), IpAddr::V6(target), IDENT, SEQ)
            .unwrap();
        assert_eq!(reply.status, HopStatus::Success);
    }

    #[test]
    fn test_echo_request_encoding() {
        let buf = echo_request(target_v4(), IDENT, SEQ).unwrap();
        let request = EchoRequestPacket::new(&buf).unwrap();
        assert_eq!(request.get_icmp_type(), IcmpTypes::EchoRequest);
        assert_eq!(request.get_identifier(), IDENT);
        assert_eq!(request.get_sequence_number(), SEQ);
        assert_eq!(
            request.get_checksum(),
            pnet_packet::util::checksum(&buf, 1)
        );
    }
}
