//! Trait abstraction for the session's datagram endpoint to enable testing

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

/// Address used to discover the default-route interface; nothing is sent
const ROUTE_PROBE: (&str, u16) = ("8.8.8.8", 80);

/// One received datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Payload bytes
    pub payload: Bytes,
    /// Sender address
    pub from: SocketAddr,
}

/// Non-blocking datagram source
pub trait DatagramSource: Send {
    /// Receive one datagram if one is waiting.
    ///
    /// Returns `Ok(None)` when nothing is queued. Never blocks.
    fn try_recv(&mut self) -> io::Result<Option<Datagram>>;

    /// Address the source is bound to
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// UDP socket bound for a session
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpEndpoint {
    /// Bind a non-blocking UDP socket
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to bind; port 0 lets the OS pick
    /// * `recv_buffer_bytes` - Kernel receive buffer size. Kept tiny so stale
    ///   packets are dropped instead of queued.
    /// * `max_datagram_bytes` - Largest payload read per datagram
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot be created, configured or bound
    pub fn bind(addr: SocketAddr, recv_buffer_bytes: usize, max_datagram_bytes: usize) -> io::Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_recv_buffer_size(recv_buffer_bytes)?;
        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;

        let socket: UdpSocket = socket.into();
        debug!("Bound UDP endpoint at {}", socket.local_addr()?);

        Ok(Self {
            socket,
            buf: vec![0u8; max_datagram_bytes],
        })
    }
}

impl DatagramSource for UdpEndpoint {
    fn try_recv(&mut self) -> io::Result<Option<Datagram>> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((len, from)) => Ok(Some(Datagram {
                payload: Bytes::copy_from_slice(&self.buf[..len]),
                from,
            })),
            Err(e) if is_transient(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

/// Errors that are steady-state conditions of a non-blocking socket
pub fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            // Windows reports ICMP port-unreachable from an earlier send this way
            | io::ErrorKind::ConnectionReset
    )
}

/// Address of the interface holding the default route
pub fn resolve_default_route_ip() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(ROUTE_PROBE)?;
    Ok(socket.local_addr()?.ip())
}
