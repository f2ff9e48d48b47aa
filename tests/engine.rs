use assert_matches::assert_matches;
use ntest::timeout;
use rping::checksum::write_checksum;
use rping::{
    CancelToken, Engine, PingError, PingOptions, Received, SocketKind, Target, Transport,
};
use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

const PEER: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 33);

enum Event {
    Datagram(Vec<u8>),
    Error(io::ErrorKind),
    /// A signal arrives during the receive and its handler cancels the run.
    Signal(CancelToken),
}

type Responder = Box<dyn FnMut(&[u8]) -> Vec<Event>>;

/// Scripted peer: every request sent is answered with whatever the
/// responder returns, delivered in order by subsequent receives.
struct Peer {
    kind: SocketKind,
    respond: Responder,
    inbox: VecDeque<Event>,
    fail_send: bool,
    /// TTL reported through control data, as a ping socket would.
    ttl: Option<u8>,
    dropped: Rc<Cell<bool>>,
}

impl Peer {
    fn new(kind: SocketKind, respond: impl FnMut(&[u8]) -> Vec<Event> + 'static) -> Self {
        Peer {
            kind,
            respond: Box::new(respond),
            inbox: VecDeque::new(),
            fail_send: false,
            ttl: None,
            dropped: Rc::new(Cell::new(false)),
        }
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        self.dropped.set(true);
    }
}

impl Transport for Peer {
    fn kind(&self) -> SocketKind {
        self.kind
    }

    fn send(&mut self, packet: &[u8]) -> io::Result<usize> {
        if self.fail_send {
            return Err(io::ErrorKind::NetworkUnreachable.into());
        }
        let events = (self.respond)(packet);
        self.inbox.extend(events);
        Ok(packet.len())
    }

    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Received> {
        match self.inbox.pop_front() {
            Some(Event::Datagram(datagram)) => {
                buffer[..datagram.len()].copy_from_slice(&datagram);
                Ok(Received {
                    len: datagram.len(),
                    source: PEER,
                    ttl: self.ttl,
                })
            }
            Some(Event::Error(kind)) => Err(kind.into()),
            Some(Event::Signal(cancel)) => {
                cancel.cancel();
                Err(io::ErrorKind::Interrupted.into())
            }
            None => {
                thread::sleep(Duration::from_millis(1));
                Err(io::ErrorKind::WouldBlock.into())
            }
        }
    }
}

fn reply_to(request: &[u8]) -> Vec<u8> {
    let mut reply = request.to_vec();
    reply[0] = 0;
    write_checksum(&mut reply, 2);
    reply
}

fn with_ident(mut icmp: Vec<u8>, ident: u16) -> Vec<u8> {
    icmp[4..6].copy_from_slice(&ident.to_be_bytes());
    write_checksum(&mut icmp, 2);
    icmp
}

fn ip_wrap(icmp: &[u8], ttl: u8) -> Vec<u8> {
    let mut datagram = vec![0u8; 20];
    datagram[0] = 0x45;
    datagram[2..4].copy_from_slice(&((20 + icmp.len()) as u16).to_be_bytes());
    datagram[8] = ttl;
    datagram[9] = 1;
    datagram[12..16].copy_from_slice(&PEER.octets());
    datagram[16..20].copy_from_slice(&[192, 0, 2, 1]);
    write_checksum(&mut datagram[..20], 10);
    datagram.extend_from_slice(icmp);
    datagram
}

/// Reply to `request` cut down to `len` ICMP bytes, so it carries no timestamp.
fn short_reply_to(request: &[u8], len: usize) -> Vec<u8> {
    let mut reply = reply_to(request);
    reply.truncate(len);
    write_checksum(&mut reply, 2);
    reply
}

fn time_ms(line: &str) -> f64 {
    let start = line.find("time=").unwrap() + "time=".len();
    let end = line[start..].find(" ms").unwrap() + start;
    line[start..end].parse().unwrap()
}

fn echo(request: &[u8]) -> Vec<Event> {
    vec![Event::Datagram(ip_wrap(&reply_to(request), 64))]
}

fn options(count: Option<u64>) -> PingOptions {
    PingOptions {
        target: "peer.test".to_string(),
        count,
        interval: Duration::from_millis(10),
        timeout: Duration::from_millis(200),
        ..PingOptions::default()
    }
}

fn target() -> Target {
    Target {
        name: "peer.test".to_string(),
        addr: PEER,
    }
}

fn run(
    peer: Peer,
    options: &PingOptions,
    cancel: CancelToken,
) -> (Result<rping::Summary, PingError>, String) {
    let mut out = Vec::new();
    let result = Engine::new(peer, target(), options, cancel, &mut out).run();
    (result, String::from_utf8(out).unwrap())
}

#[test]
#[timeout(10000)]
fn replies_to_every_request() {
    let peer = Peer::new(SocketKind::Raw, echo);
    let dropped = peer.dropped.clone();

    let (result, out) = run(peer, &options(Some(3)), CancelToken::new());
    let summary = result.unwrap();

    assert_eq!(summary.transmitted, 3);
    assert_eq!(summary.received, 3);
    assert_eq!(summary.loss_percent, 0);
    assert!(summary.rtt.is_some());
    assert!(dropped.get());

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "PING peer.test (192.0.2.33): 56 data bytes");
    for (seq, line) in lines[1..4].iter().enumerate() {
        let expected = format!("64 bytes from 192.0.2.33: icmp_seq={seq} ttl=64 time=");
        assert!(line.starts_with(&expected), "{line}");
        assert!(line.ends_with(" ms"), "{line}");
    }
    assert_eq!(lines[4], "--- peer.test ping statistics ---");
    assert_eq!(
        lines[5],
        "3 packets transmitted, 3 packets received, 0% packet loss"
    );
    assert!(lines[6].starts_with("round-trip min/avg/max/stddev = "));
    assert_eq!(lines.len(), 7);
}

#[test]
#[timeout(10000)]
fn silent_host_counts_as_loss() {
    let peer = Peer::new(SocketKind::Raw, |_| Vec::new());
    let mut options = options(Some(2));
    options.timeout = Duration::from_millis(20);

    let (result, out) = run(peer, &options, CancelToken::new());
    let summary = result.unwrap();

    assert_eq!(summary.transmitted, 2);
    assert_eq!(summary.received, 0);
    assert_eq!(summary.loss_percent, 100);
    assert_eq!(summary.rtt, None);
    assert!(out.contains("2 packets transmitted, 0 packets received, 100% packet loss\n"));
    assert!(!out.contains("round-trip"));
}

#[test]
#[timeout(10000)]
fn skips_foreign_and_malformed_packets() {
    let peer = Peer::new(SocketKind::Raw, |request| {
        let ident = u16::from_be_bytes([request[4], request[5]]);
        let foreign = with_ident(reply_to(request), ident.wrapping_add(1));
        vec![
            Event::Datagram(ip_wrap(&foreign, 64)),
            // Our own request, as seen when pinging localhost.
            Event::Datagram(ip_wrap(request, 64)),
            Event::Datagram(vec![0x45, 0, 0, 10]),
            Event::Datagram(ip_wrap(&reply_to(request)[..6], 64)),
            Event::Datagram(ip_wrap(&reply_to(request), 50)),
        ]
    });

    let (result, out) = run(peer, &options(Some(1)), CancelToken::new());
    let summary = result.unwrap();

    assert_eq!(summary.received, 1);
    assert_eq!(out.matches("bytes from").count(), 1);
    assert!(out.contains("icmp_seq=0 ttl=50 time="));
}

#[test]
#[timeout(10000)]
fn datagram_socket_accepts_rewritten_identifier() {
    let peer = Peer::new(SocketKind::Datagram, |request| {
        vec![Event::Datagram(with_ident(reply_to(request), 0xbeef))]
    });

    let (result, out) = run(peer, &options(Some(2)), CancelToken::new());
    let summary = result.unwrap();

    assert_eq!(summary.received, 2);
    assert!(out.contains("64 bytes from 192.0.2.33: icmp_seq=1 time="));
}

#[test]
#[timeout(10000)]
fn interrupt_while_waiting_drains() {
    let cancel = CancelToken::new();
    let handler = cancel.clone();
    let peer = Peer::new(SocketKind::Raw, move |_| vec![Event::Signal(handler.clone())]);
    let dropped = peer.dropped.clone();

    let (result, out) = run(peer, &options(None), cancel);
    let summary = result.unwrap();

    assert_eq!(summary.transmitted, 1);
    assert_eq!(summary.received, 0);
    assert!(dropped.get());
    assert!(out.ends_with(
        "--- peer.test ping statistics ---\n\
         1 packets transmitted, 0 packets received, 100% packet loss\n"
    ));
}

#[test]
#[timeout(10000)]
fn spurious_interrupt_keeps_waiting() {
    let peer = Peer::new(SocketKind::Raw, |request| {
        let mut events = vec![Event::Error(io::ErrorKind::Interrupted)];
        events.extend(echo(request));
        events
    });

    let (result, _) = run(peer, &options(Some(2)), CancelToken::new());
    let summary = result.unwrap();

    assert_eq!(summary.transmitted, 2);
    assert_eq!(summary.received, 2);
}

#[test]
#[timeout(10000)]
fn cancelled_before_start_sends_nothing() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let sent = Rc::new(Cell::new(0));
    let counter = sent.clone();
    let peer = Peer::new(SocketKind::Raw, move |request| {
        counter.set(counter.get() + 1);
        echo(request)
    });

    let (result, out) = run(peer, &options(None), cancel);
    let summary = result.unwrap();

    assert_eq!(sent.get(), 0);
    assert_eq!(summary.transmitted, 0);
    assert!(out.contains("0 packets transmitted, 0 packets received, 0% packet loss\n"));
    assert!(!out.contains("round-trip"));
}

#[test]
#[timeout(10000)]
fn receive_failure_is_fatal() {
    let peer = Peer::new(SocketKind::Raw, |_| {
        vec![Event::Error(io::ErrorKind::ConnectionRefused)]
    });
    let dropped = peer.dropped.clone();

    let (result, _) = run(peer, &options(None), CancelToken::new());

    assert_matches!(result, Err(PingError::Receive(err)) if err.kind() == io::ErrorKind::ConnectionRefused);
    assert!(dropped.get());
}

#[test]
#[timeout(10000)]
fn send_failure_is_fatal() {
    let mut peer = Peer::new(SocketKind::Raw, echo);
    peer.fail_send = true;
    let dropped = peer.dropped.clone();

    let (result, out) = run(peer, &options(None), CancelToken::new());

    assert_matches!(result, Err(PingError::Send(_)));
    assert!(dropped.get());
    assert!(!out.contains("packets transmitted"));
}

#[test]
#[timeout(10000)]
fn duplicate_replies_are_not_counted() {
    let peer = Peer::new(SocketKind::Raw, |request| {
        let mut events = echo(request);
        events.extend(echo(request));
        events
    });

    let (result, out) = run(peer, &options(Some(2)), CancelToken::new());
    let summary = result.unwrap();

    assert_eq!(summary.transmitted, 2);
    assert_eq!(summary.received, 2);
    assert_eq!(out.matches("icmp_seq=0 ").count(), 2);
    let duplicates: Vec<&str> = out.lines().filter(|line| line.ends_with(" (DUP!)")).collect();
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates[0].contains("icmp_seq=0 "), "{}", duplicates[0]);
    assert!(out.contains("2 packets transmitted, 2 packets received, 0% packet loss\n"));
}

#[test]
#[timeout(10000)]
fn late_reply_measured_from_its_own_request() {
    let mut pending: Option<Vec<u8>> = None;
    let peer = Peer::new(SocketKind::Raw, move |request| match pending.take() {
        // Hold back the answer to the first request until the second is sent.
        None => {
            pending = Some(request.to_vec());
            Vec::new()
        }
        Some(first) => vec![
            Event::Datagram(ip_wrap(&short_reply_to(&first, 16), 64)),
            Event::Datagram(ip_wrap(&reply_to(request), 64)),
        ],
    });
    let mut options = options(Some(2));
    options.timeout = Duration::from_millis(30);

    let (result, out) = run(peer, &options, CancelToken::new());
    let summary = result.unwrap();

    assert_eq!(summary.received, 2);
    let late = out
        .lines()
        .find(|line| line.contains("icmp_seq=0 "))
        .unwrap();
    assert!(late.starts_with("16 bytes from"), "{late}");
    assert!(!late.ends_with("(DUP!)"), "{late}");
    assert!(time_ms(late) >= 30.0, "{late}");
}

#[test]
#[timeout(10000)]
fn control_data_ttl_wins_over_header() {
    let mut peer = Peer::new(SocketKind::Raw, |request| {
        vec![Event::Datagram(ip_wrap(&reply_to(request), 50))]
    });
    peer.ttl = Some(117);

    let (result, out) = run(peer, &options(Some(1)), CancelToken::new());
    result.unwrap();

    assert!(out.contains("icmp_seq=0 ttl=117 time="), "{out}");
    assert!(!out.contains("ttl=50"));
}
