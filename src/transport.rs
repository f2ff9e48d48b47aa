use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

/// How long a single receive may block before the engine gets control back.
pub const RECV_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// `SOCK_RAW`: datagrams arrive with their IP header.
    Raw,
    /// `SOCK_DGRAM` ping socket: ICMP only, and the kernel owns the identifier.
    Datagram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    pub len: usize,
    pub source: Ipv4Addr,
    /// TTL from ancillary data, when the platform supplies it.
    pub ttl: Option<u8>,
}

/// The engine's view of the network: one peer, one ICMP socket.
pub trait Transport {
    fn kind(&self) -> SocketKind;

    /// Sends one ICMP message to the peer.
    fn send(&mut self, packet: &[u8]) -> io::Result<usize>;

    /// Receives one datagram, blocking for at most [`RECV_SLICE`]. An expired
    /// wait is reported as `WouldBlock` or `TimedOut`, a signal as `Interrupted`.
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Received>;
}
