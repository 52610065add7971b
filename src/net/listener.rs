use crate::net::SocketType;
use crate::reactor::poller::platform::{
    addr_to_sockaddr, sys_bind, sys_close, sys_listen, sys_set_nonblocking,
    sys_set_reuseaddr, sys_set_v6only, sys_socket,
};

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::os::fd::RawFd;
use std::str::FromStr;

/// Binds a listening socket on `port` across all interfaces.
///
/// Candidate addresses are tried in order (dual-stack IPv6 first, then
/// IPv4) and the first successful bind wins, mirroring how a passive
/// name lookup walks its results.
pub(crate) fn bind_port(port: u16, socket_type: SocketType, backlog: i32) -> io::Result<RawFd> {
    let candidates = [
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
    ];

    let mut last = None;
    for addr in candidates {
        match bind_socket(&addr, socket_type, backlog) {
            Ok(fd) => return Ok(fd),
            Err(err) => last = Some(err),
        }
    }

    Err(last.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "no usable address")
    }))
}

/// Binds a listening socket on an explicit address such as
/// `"127.0.0.1:0"` or `"[::1]:9000"`.
pub(crate) fn bind_addr(address: &str, socket_type: SocketType, backlog: i32) -> io::Result<RawFd> {
    let addr = SocketAddr::from_str(address)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid socket address"))?;

    bind_socket(&addr, socket_type, backlog)
}

/// Adopts a pre-opened listening descriptor.
///
/// The descriptor is switched to non-blocking mode; re-listening is
/// harmless on an already listening socket and applies the configured
/// backlog.
pub(crate) fn adopt(fd: RawFd, backlog: i32) -> io::Result<RawFd> {
    sys_set_nonblocking(fd)?;
    sys_listen(fd, backlog)?;

    Ok(fd)
}

fn bind_socket(addr: &SocketAddr, socket_type: SocketType, backlog: i32) -> io::Result<RawFd> {
    if socket_type == SocketType::Datagram {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "datagram endpoints are not supported",
        ));
    }

    let (storage, len) = addr_to_sockaddr(addr);
    let fd = sys_socket(storage.ss_family as i32)?;

    if let Err(err) = configure(fd, addr, &storage, len, backlog) {
        sys_close(fd);
        return Err(err);
    }

    Ok(fd)
}

fn configure(
    fd: RawFd,
    addr: &SocketAddr,
    storage: &libc::sockaddr_storage,
    len: libc::socklen_t,
    backlog: i32,
) -> io::Result<()> {
    // Address reuse lets several workers or a fast restart share the
    // endpoint; the kernel distributes accepted connections.
    sys_set_reuseaddr(fd)?;

    if addr.is_ipv6() {
        sys_set_v6only(fd, false)?;
    }

    sys_bind(fd, storage, len)?;
    sys_listen(fd, backlog)?;

    Ok(())
}
