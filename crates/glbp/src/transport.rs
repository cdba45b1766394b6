//! GLBP transport: the send seam and the multicast UDP socket.
//!
//! The state machine only needs "send these bytes to this address"; the
//! [`Transport`] trait keeps it testable against an in-memory double while
//! [`GlbpSocket`] provides the real link-local multicast UDP transport.

use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};

/// Outbound datagram seam used by the state machine.
///
/// Hellos and combined advertisements go to the group multicast address;
/// targeted requests and responses go unicast to a peer.
pub trait Transport {
    fn send(&mut self, dest: SocketAddrV4, payload: &[u8]) -> io::Result<()>;
}

/// Multicast UDP socket for GLBP protocol traffic.
///
/// Bound to the GLBP port with address reuse so multiple groups (and other
/// routers in tests) can share it. TTL is fixed at 1: the protocol never
/// leaves the link.
pub struct GlbpSocket {
    socket: Socket,
}

impl GlbpSocket {
    /// Create a socket on the interface owning `local_ip`, joined to the
    /// group multicast address.
    pub fn new(local_ip: Ipv4Addr, port: u16, multicast_addr: Ipv4Addr) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

        socket.set_nonblocking(true)?;
        socket.set_reuse_address(true)?;
        socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)).into())?;

        socket.join_multicast_v4(&multicast_addr, &local_ip)?;
        socket.set_multicast_if_v4(&local_ip)?;

        // Link-local only.
        socket.set_multicast_ttl_v4(1)?;
        socket.set_ttl_v4(1)?;

        // Don't loop our own multicasts back.
        socket.set_multicast_loop_v4(false)?;

        Ok(Self { socket })
    }

    /// Try to receive a datagram without blocking.
    ///
    /// Returns the payload and the sender's IPv4 address, or `None` when no
    /// datagram is queued.
    pub fn try_recv(&self) -> io::Result<Option<(Vec<u8>, Ipv4Addr)>> {
        use std::mem::MaybeUninit;

        let mut buf = [MaybeUninit::<u8>::uninit(); 1500];

        let (len, src_addr) = match self.socket.recv_from(&mut buf) {
            Ok(result) => result,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
            Err(e) => return Err(e),
        };

        let data: Vec<u8> = buf[..len]
            .iter()
            .map(|b| unsafe { b.assume_init() })
            .collect();

        let src_ip = match src_addr.as_socket() {
            Some(SocketAddr::V4(addr)) => *addr.ip(),
            _ => {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    "invalid source address",
                ));
            }
        };

        Ok(Some((data, src_ip)))
    }
}

impl Transport for GlbpSocket {
    fn send(&mut self, dest: SocketAddrV4, payload: &[u8]) -> io::Result<()> {
        self.socket.send_to(payload, &SocketAddr::V4(dest).into())?;
        Ok(())
    }
}
