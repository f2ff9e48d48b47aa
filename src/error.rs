use std::io;
use thiserror::Error;

/// Reasons a received datagram is dropped instead of reported.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet too short ({len} bytes, need {needed})")]
    Truncated { len: usize, needed: usize },
    #[error("invalid IP version {0}")]
    InvalidVersion(u8),
    #[error("invalid IP header length {0}")]
    InvalidHeaderLength(usize),
    #[error("unknown IP protocol {0}")]
    UnknownProtocol(u8),
    #[error("bad ICMP checksum")]
    BadChecksum,
}

#[derive(Error, Debug)]
pub enum PingError {
    #[error("Unknown host {0}")]
    UnknownHost(String),
    #[error("Invalid or unresolvable hostname {host}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create ICMP socket")]
    Socket(#[source] io::Error),
    #[error("Failed to set socket option {option}")]
    SocketOption {
        option: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("Failed to send echo request")]
    Send(#[source] io::Error),
    #[error("Failed to receive echo reply")]
    Receive(#[source] io::Error),
    #[error("Failed to write report")]
    Output(#[source] io::Error),
    #[error("Failed to install interrupt handler")]
    Signal(#[from] ctrlc::Error),
}
