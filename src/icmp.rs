use crate::checksum::{verify, write_checksum};
use crate::error::PacketError;
use std::time::Duration;

pub const ICMP_HEADER_SIZE: usize = 8;
/// Size of every echo request we send, header included.
pub const PACKET_SIZE: usize = 64;
pub const PAYLOAD_SIZE: usize = PACKET_SIZE - ICMP_HEADER_SIZE;

pub const ECHO_REQUEST_TYPE: u8 = 8;
pub const ECHO_REQUEST_CODE: u8 = 0;
pub const ECHO_REPLY_TYPE: u8 = 0;

const CHECKSUM_OFFSET: usize = 2;
const IDENT_OFFSET: usize = 4;
const SEQ_OFFSET: usize = 6;
const TIMESTAMP_SIZE: usize = 8;

pub struct EchoRequest {
    pub ident: u16,
    pub seq_cnt: u16,
    /// Send time relative to the sender's monotonic clock origin.
    pub timestamp: Duration,
}

impl EchoRequest {
    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut buffer = [0; PACKET_SIZE];

        buffer[0] = ECHO_REQUEST_TYPE;
        buffer[1] = ECHO_REQUEST_CODE;
        buffer[IDENT_OFFSET..IDENT_OFFSET + 2].copy_from_slice(&self.ident.to_be_bytes());
        buffer[SEQ_OFFSET..SEQ_OFFSET + 2].copy_from_slice(&self.seq_cnt.to_be_bytes());

        let payload = &mut buffer[ICMP_HEADER_SIZE..];
        let nanos = self.timestamp.as_nanos() as u64;
        payload[..TIMESTAMP_SIZE].copy_from_slice(&nanos.to_be_bytes());
        // Same fill pattern as iputils so captures look familiar.
        for (idx, byte) in payload[TIMESTAMP_SIZE..].iter_mut().enumerate() {
            *byte = (idx + TIMESTAMP_SIZE) as u8;
        }

        write_checksum(&mut buffer, CHECKSUM_OFFSET);
        buffer
    }
}

/// Any ICMP message with an echo-style header (identifier + sequence).
#[derive(Debug)]
pub struct IcmpPacket<'a> {
    pub type_: u8,
    pub code: u8,
    pub ident: u16,
    pub seq_cnt: u16,
    pub payload: &'a [u8],
}

impl<'a> IcmpPacket<'a> {
    pub fn decode(buffer: &'a [u8]) -> Result<Self, PacketError> {
        if buffer.len() < ICMP_HEADER_SIZE {
            return Err(PacketError::Truncated {
                len: buffer.len(),
                needed: ICMP_HEADER_SIZE,
            });
        }
        if !verify(buffer) {
            return Err(PacketError::BadChecksum);
        }

        Ok(IcmpPacket {
            type_: buffer[0],
            code: buffer[1],
            ident: u16::from_be_bytes([buffer[IDENT_OFFSET], buffer[IDENT_OFFSET + 1]]),
            seq_cnt: u16::from_be_bytes([buffer[SEQ_OFFSET], buffer[SEQ_OFFSET + 1]]),
            payload: &buffer[ICMP_HEADER_SIZE..],
        })
    }

    pub fn is_echo_reply(&self) -> bool {
        self.type_ == ECHO_REPLY_TYPE
    }

    /// The send timestamp embedded by [`EchoRequest::encode`], if the payload
    /// has the size we send.
    pub fn timestamp(&self) -> Option<Duration> {
        if self.payload.len() != PAYLOAD_SIZE {
            return None;
        }
        let mut nanos = [0; TIMESTAMP_SIZE];
        nanos.copy_from_slice(&self.payload[..TIMESTAMP_SIZE]);
        Some(Duration::from_nanos(u64::from_be_bytes(nanos)))
    }
}
