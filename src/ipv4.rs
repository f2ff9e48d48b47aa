use crate::error::PacketError;
use crate::icmp::ICMP_HEADER_SIZE;
use std::net::Ipv4Addr;

const MINIMUM_PACKET_SIZE: usize = 20;

#[derive(Debug, PartialEq, Eq)]
pub enum IpV4Protocol {
    Icmp,
}

impl IpV4Protocol {
    fn decode(data: u8) -> Option<Self> {
        match data {
            1 => Some(IpV4Protocol::Icmp),
            _ => None,
        }
    }
}

/// An IPv4 datagram as delivered by a raw socket, header included.
#[derive(Debug)]
pub struct IpV4Packet<'a> {
    pub protocol: IpV4Protocol,
    pub ttl: u8,
    pub source: Ipv4Addr,
    pub header_size: usize,
    pub data: &'a [u8],
}

impl<'a> IpV4Packet<'a> {
    /// Splits off the IP header. The datagram must hold at least a full
    /// ICMP header after the (variable length) IP header.
    pub fn decode(data: &'a [u8]) -> Result<Self, PacketError> {
        if data.len() < MINIMUM_PACKET_SIZE {
            return Err(PacketError::Truncated {
                len: data.len(),
                needed: MINIMUM_PACKET_SIZE + ICMP_HEADER_SIZE,
            });
        }
        let byte0 = data[0];
        let version = (byte0 & 0xf0) >> 4;
        let header_size = 4 * ((byte0 & 0x0f) as usize);

        if version != 4 {
            return Err(PacketError::InvalidVersion(version));
        }

        if header_size < MINIMUM_PACKET_SIZE {
            return Err(PacketError::InvalidHeaderLength(header_size));
        }

        if data.len() < header_size + ICMP_HEADER_SIZE {
            return Err(PacketError::Truncated {
                len: data.len(),
                needed: header_size + ICMP_HEADER_SIZE,
            });
        }

        let protocol = match IpV4Protocol::decode(data[9]) {
            Some(protocol) => protocol,
            None => return Err(PacketError::UnknownProtocol(data[9])),
        };

        Ok(Self {
            protocol,
            ttl: data[8],
            source: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            header_size,
            data: &data[header_size..],
        })
    }
}
