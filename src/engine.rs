use crate::config::PingOptions;
use crate::error::{PacketError, PingError};
use crate::icmp::{EchoRequest, IcmpPacket, PAYLOAD_SIZE};
use crate::ipv4::IpV4Packet;
use crate::report::{EchoReply, Reporter};
use crate::signal::CancelToken;
use crate::stats::{RunStatistics, Summary};
use crate::target::Target;
use crate::transport::{Received, SocketKind, Transport, RECV_SLICE};
use std::collections::HashMap;
use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

/// Large enough for any IPv4 datagram we could be handed.
const RECV_BUFFER_SIZE: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Draining,
    Terminated,
}

/// Drives one ping run: send, wait for the reply, report, sleep, repeat,
/// until the count is reached or the run is cancelled.
pub struct Engine<T: Transport, W: Write> {
    transport: T,
    target: Target,
    reporter: Reporter<W>,
    stats: RunStatistics,
    cancel: CancelToken,
    state: EngineState,
    ident: u16,
    seq_cnt: u16,
    interval: Duration,
    timeout: Duration,
    count: Option<u64>,
    /// Send times of requests not yet answered, by sequence number.
    outstanding: HashMap<u16, Duration>,
    /// Origin of the timestamps embedded in requests.
    clock: Instant,
}

impl<T: Transport, W: Write> Engine<T, W> {
    pub fn new(
        transport: T,
        target: Target,
        options: &PingOptions,
        cancel: CancelToken,
        out: W,
    ) -> Self {
        Engine {
            transport,
            target,
            reporter: Reporter::new(out),
            stats: RunStatistics::new(),
            cancel,
            state: EngineState::Idle,
            ident: std::process::id() as u16,
            seq_cnt: 0,
            interval: options.interval,
            timeout: options.timeout,
            count: options.count,
            outstanding: HashMap::new(),
            clock: Instant::now(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Runs to completion and prints the summary. The transport is dropped
    /// before returning, on success and on error alike.
    pub fn run(mut self) -> Result<Summary, PingError> {
        self.state = EngineState::Running;
        self.reporter
            .banner(&self.target, PAYLOAD_SIZE)
            .map_err(PingError::Output)?;

        while self.state == EngineState::Running {
            if self.cancel.is_cancelled() || self.count_reached() {
                self.state = EngineState::Draining;
                break;
            }
            self.tick()?;
        }

        // Draining: nothing more is sent.
        self.state = EngineState::Terminated;
        drop(self.transport);

        let summary = self.stats.summary();
        self.reporter
            .summary(&self.target, &summary)
            .map_err(PingError::Output)?;
        Ok(summary)
    }

    fn count_reached(&self) -> bool {
        self.count
            .is_some_and(|count| self.stats.transmitted() >= count)
    }

    /// One request: send it, wait for its reply, then pause until the next
    /// one is due.
    fn tick(&mut self) -> Result<(), PingError> {
        let seq_cnt = self.seq_cnt;
        let started = Instant::now();
        let sent_at = self.clock.elapsed();

        let packet = EchoRequest {
            ident: self.ident,
            seq_cnt,
            timestamp: sent_at,
        }
        .encode();
        self.transport.send(&packet).map_err(|err| {
            log::error!("sendto {}: {}", self.target.addr, err);
            PingError::Send(err)
        })?;
        self.stats.record_transmit();
        self.outstanding.insert(seq_cnt, sent_at);
        self.seq_cnt = seq_cnt.wrapping_add(1);

        self.await_reply(seq_cnt, started + self.timeout)?;

        if self.state == EngineState::Running && !self.count_reached() {
            self.pause_until(started + self.interval);
        }
        Ok(())
    }

    fn await_reply(&mut self, seq_cnt: u16, deadline: Instant) -> Result<(), PingError> {
        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        loop {
            if self.cancel.is_cancelled() {
                self.state = EngineState::Draining;
                return Ok(());
            }
            if Instant::now() >= deadline {
                log::debug!("no reply for icmp_seq={} within {:?}", seq_cnt, self.timeout);
                return Ok(());
            }

            let received = match self.transport.recv(&mut buffer) {
                Ok(received) => received,
                Err(err) => match err.kind() {
                    // Re-checked at the top of the loop.
                    io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut => continue,
                    _ => {
                        log::error!("recvmsg: {}", err);
                        return Err(PingError::Receive(err));
                    }
                },
            };

            let datagram = &buffer[..received.len.min(RECV_BUFFER_SIZE)];
            match self.decode(datagram, &received) {
                Ok(Some(reply)) => {
                    if reply.duplicate {
                        log::debug!("duplicate reply for icmp_seq={}", reply.seq_cnt);
                    } else if let Some(rtt) = reply.rtt_ms() {
                        self.stats.record(rtt);
                    }
                    self.reporter.reply(&reply).map_err(PingError::Output)?;
                    if reply.seq_cnt == seq_cnt && !reply.duplicate {
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("dropping packet from {}: {}", received.source, err);
                }
            }
        }
    }

    /// Returns `Ok(None)` for well-formed ICMP that is not a reply to us. A
    /// reply whose sequence is not outstanding is marked as a duplicate.
    fn decode(
        &mut self,
        datagram: &[u8],
        received: &Received,
    ) -> Result<Option<EchoReply>, PacketError> {
        let (icmp, header_ttl, source) = match self.transport.kind() {
            SocketKind::Raw => {
                let packet = IpV4Packet::decode(datagram)?;
                (packet.data, Some(packet.ttl), packet.source)
            }
            SocketKind::Datagram => (datagram, None, received.source),
        };
        let packet = IcmpPacket::decode(icmp)?;

        if !packet.is_echo_reply() {
            log::debug!(
                "ignoring ICMP type {} code {} from {}",
                packet.type_,
                packet.code,
                source
            );
            return Ok(None);
        }
        // Ping sockets rewrite the identifier, and the kernel already filters.
        if self.transport.kind() == SocketKind::Raw && packet.ident != self.ident {
            log::debug!(
                "ignoring echo reply for identifier {} from {}",
                packet.ident,
                source
            );
            return Ok(None);
        }

        let now = self.clock.elapsed();
        let sent_at = self.outstanding.remove(&packet.seq_cnt);
        let rtt = packet
            .timestamp()
            .or(sent_at)
            .map(|sent_at| now.saturating_sub(sent_at));

        Ok(Some(EchoReply {
            bytes: icmp.len(),
            source,
            ident: packet.ident,
            seq_cnt: packet.seq_cnt,
            ttl: received.ttl.or(header_ttl),
            rtt,
            duplicate: sent_at.is_none(),
        }))
    }

    /// Sleeps in short slices so an interrupt ends the run promptly.
    fn pause_until(&mut self, until: Instant) {
        loop {
            if self.cancel.is_cancelled() {
                self.state = EngineState::Draining;
                return;
            }
            let now = Instant::now();
            if now >= until {
                return;
            }
            thread::sleep((until - now).min(RECV_SLICE));
        }
    }
}
