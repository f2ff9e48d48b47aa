use crate::config::PingOptions;
use crate::error::PingError;
use crate::transport::{Received, SocketKind, Transport, RECV_SLICE};
#[cfg(target_os = "linux")]
use caps::{CapSet, Capability};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::{
    io, mem,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    os::fd::{AsRawFd, RawFd},
};

/// ICMP socket connected in spirit to a single peer. Closed on drop, so every
/// exit path releases it.
pub struct IcmpSocket {
    socket: Socket,
    kind: SocketKind,
    dest: SockAddr,
}

impl IcmpSocket {
    /// Opens and configures the socket: broadcast allowed, outgoing TTL set,
    /// received TTL reported, optional device binding.
    pub fn open(dest: Ipv4Addr, options: &PingOptions) -> Result<Self, PingError> {
        let (socket, kind) = create_socket()?;

        socket
            .set_broadcast(true)
            .map_err(|source| PingError::SocketOption {
                option: "SO_BROADCAST",
                source,
            })?;
        socket
            .set_ttl(u32::from(options.ttl))
            .map_err(|source| PingError::SocketOption {
                option: "IP_TTL",
                source,
            })?;
        enable_recv_ttl(&socket).map_err(|source| PingError::SocketOption {
            option: "IP_RECVTTL",
            source,
        })?;
        socket
            .set_read_timeout(Some(RECV_SLICE))
            .map_err(|source| PingError::SocketOption {
                option: "SO_RCVTIMEO",
                source,
            })?;

        if let Some(interface) = &options.interface {
            bind_device(&socket, interface).map_err(|source| PingError::SocketOption {
                option: "SO_BINDTODEVICE",
                source,
            })?;
        }

        log::debug!("opened {:?} ICMP socket towards {}", kind, dest);

        Ok(IcmpSocket {
            socket,
            kind,
            dest: SocketAddr::V4(SocketAddrV4::new(dest, 0)).into(),
        })
    }
}

impl Transport for IcmpSocket {
    fn kind(&self) -> SocketKind {
        self.kind
    }

    fn send(&mut self, packet: &[u8]) -> io::Result<usize> {
        self.socket.send_to(packet, &self.dest)
    }

    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Received> {
        recv_with_ttl(self.socket.as_raw_fd(), buffer)
    }
}

/// Raw sockets need CAP_NET_RAW; without it fall back to an unprivileged
/// ping socket.
fn create_socket() -> Result<(Socket, SocketKind), PingError> {
    raise_cap_net_raw_to_effective();
    let raw = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4));
    drop_cap_net_raw_from_effective();

    match raw {
        Ok(socket) => Ok((socket, SocketKind::Raw)),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            log::debug!("raw ICMP socket denied ({}), trying a ping socket", err);
            Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4))
                .map(|socket| (socket, SocketKind::Datagram))
                .map_err(|err| {
                    log::error!("Failed to create ping socket: {}", err);
                    PingError::Socket(err)
                })
        }
        Err(err) => {
            log::error!("Failed to create raw socket: {}", err);
            Err(PingError::Socket(err))
        }
    }
}

#[cfg(target_os = "linux")]
fn raise_cap_net_raw_to_effective() {
    if let Err(err) = caps::raise(None, CapSet::Effective, Capability::CAP_NET_RAW) {
        log::debug!("Failed to raise CAP_NET_RAW to effective: {}", err);
    }
}

#[cfg(target_os = "linux")]
fn drop_cap_net_raw_from_effective() {
    if let Err(err) = caps::drop(None, CapSet::Effective, Capability::CAP_NET_RAW) {
        log::debug!("Failed to drop CAP_NET_RAW from effective: {}", err);
    }
}

#[cfg(not(target_os = "linux"))]
fn raise_cap_net_raw_to_effective() {}

#[cfg(not(target_os = "linux"))]
fn drop_cap_net_raw_from_effective() {}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn enable_recv_ttl(socket: &Socket) -> io::Result<()> {
    let enable: libc::c_int = 1;
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_IP,
            libc::IP_RECVTTL,
            (&enable as *const libc::c_int).cast(),
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// Elsewhere the TTL comes from the IP header of raw replies only.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn enable_recv_ttl(_socket: &Socket) -> io::Result<()> {
    Ok(())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn bind_device(socket: &Socket, interface: &str) -> io::Result<()> {
    socket.bind_device(Some(interface.as_bytes()))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn bind_device(_socket: &Socket, _interface: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "binding to an interface is not supported on this platform",
    ))
}

#[repr(C, align(8))]
struct ControlBuffer([u8; 64]);

/// `recvmsg(2)` into `buffer`, picking the sender address and the IP_TTL
/// control message (if any) out of the header.
fn recv_with_ttl(fd: RawFd, buffer: &mut [u8]) -> io::Result<Received> {
    let mut source: libc::sockaddr_in = unsafe { mem::zeroed() };
    let mut control = ControlBuffer([0; 64]);
    let mut iov = libc::iovec {
        iov_base: buffer.as_mut_ptr().cast(),
        iov_len: buffer.len(),
    };

    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_name = (&mut source as *mut libc::sockaddr_in).cast();
    msg.msg_namelen = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = control.0.as_mut_ptr().cast();
    msg.msg_controllen = mem::size_of::<ControlBuffer>() as _;

    let len = unsafe { libc::recvmsg(fd, &mut msg, 0) };
    if len < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(Received {
        len: len as usize,
        source: Ipv4Addr::from(u32::from_be(source.sin_addr.s_addr)),
        ttl: unsafe { control_ttl(&msg) },
    })
}

/// Finds the IP_TTL control message in `msg`.
///
/// # Safety
///
/// `msg` must have been filled in by a successful `recvmsg(2)`, with
/// `msg_control` still pointing at the control buffer it wrote into.
#[cfg(any(target_os = "linux", target_os = "android"))]
unsafe fn control_ttl(msg: &libc::msghdr) -> Option<u8> {
    let mut cmsg = libc::CMSG_FIRSTHDR(msg);
    while !cmsg.is_null() {
        if (*cmsg).cmsg_level == libc::IPPROTO_IP && (*cmsg).cmsg_type == libc::IP_TTL {
            let ttl = std::ptr::read_unaligned(libc::CMSG_DATA(cmsg) as *const libc::c_int);
            return u8::try_from(ttl).ok();
        }
        cmsg = libc::CMSG_NXTHDR(msg, cmsg);
    }
    None
}

/// # Safety
///
/// Same contract as the Linux version; nothing is read here.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
unsafe fn control_ttl(_msg: &libc::msghdr) -> Option<u8> {
    None
}
