use crate::stats::Summary;
use crate::target::Target;
use std::io::{self, Write};
use std::net::Ipv4Addr;
use std::time::Duration;

/// One matched echo reply, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoReply {
    /// ICMP bytes received (IP header excluded).
    pub bytes: usize,
    pub source: Ipv4Addr,
    pub ident: u16,
    pub seq_cnt: u16,
    pub ttl: Option<u8>,
    /// Unknown when a duplicate carries no timestamp of ours.
    pub rtt: Option<Duration>,
    /// The sequence was already answered (or never sent).
    pub duplicate: bool,
}

impl EchoReply {
    pub fn rtt_ms(&self) -> Option<f64> {
        self.rtt.map(|rtt| rtt.as_secs_f64() * 1_000f64)
    }
}

pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Reporter { out }
    }

    pub fn banner(&mut self, target: &Target, payload_size: usize) -> io::Result<()> {
        writeln!(
            self.out,
            "PING {} ({}): {} data bytes",
            target, target.addr, payload_size
        )?;
        self.out.flush()
    }

    pub fn reply(&mut self, reply: &EchoReply) -> io::Result<()> {
        write!(
            self.out,
            "{} bytes from {}: icmp_seq={}",
            reply.bytes, reply.source, reply.seq_cnt
        )?;
        if let Some(ttl) = reply.ttl {
            write!(self.out, " ttl={}", ttl)?;
        }
        if let Some(rtt) = reply.rtt_ms() {
            write!(self.out, " time={:.3} ms", rtt)?;
        }
        if reply.duplicate {
            write!(self.out, " (DUP!)")?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn summary(&mut self, target: &Target, summary: &Summary) -> io::Result<()> {
        writeln!(self.out, "--- {} ping statistics ---", target)?;
        writeln!(
            self.out,
            "{} packets transmitted, {} packets received, {}% packet loss",
            summary.transmitted, summary.received, summary.loss_percent
        )?;
        if let Some(rtt) = summary.rtt {
            writeln!(
                self.out,
                "round-trip min/avg/max/stddev = {:.3}/{:.3}/{:.3}/{:.3} ms",
                rtt.min, rtt.avg, rtt.max, rtt.stddev
            )?;
        }
        self.out.flush()
    }
}
