//! Raw socket syscalls.
//!
//! Everything the library does to a descriptor goes through the thin
//! wrappers in this module. Failures come back as `io::Error` values
//! carrying the thread's errno; retry decisions (would-block, EINTR)
//! belong to the callers.

use libc::{
    AF_INET, AF_INET6, F_GETFL, F_SETFL, IPPROTO_IPV6, IPV6_V6ONLY, O_NONBLOCK, SO_REUSEADDR,
    SOCK_CLOEXEC, SOCK_NONBLOCK, SOCK_STREAM, SOL_SOCKET, c_int, sockaddr, sockaddr_in,
    sockaddr_in6, sockaddr_storage, socklen_t,
};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::fd::RawFd;
use std::{io, mem};

/// Invokes a libc function and converts a negative return into the
/// thread's last OS error.
macro_rules! syscall {
    ($fn:ident ( $($arg:expr),* $(,)? )) => {{
        let rc = unsafe { libc::$fn($($arg,)*) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(rc)
        }
    }};
}

/// Reads from a non-blocking descriptor into `buffer`.
///
/// `Ok(0)` means the peer performed an orderly close.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    let n = syscall!(read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()))?;

    Ok(n as usize)
}

/// Writes `buffer` to a non-blocking descriptor.
///
/// Returns how many bytes the kernel accepted, which may be fewer than
/// requested.
pub(crate) fn sys_write(fd: RawFd, buffer: &[u8]) -> io::Result<usize> {
    let n = syscall!(write(fd, buffer.as_ptr() as *const _, buffer.len()))?;

    Ok(n as usize)
}

/// Closes a descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { libc::close(fd) };
}

/// Switches an inherited descriptor to non-blocking mode.
///
/// Sockets this library creates itself are born non-blocking; this is
/// only needed for adopted listeners.
pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = syscall!(fcntl(fd, F_GETFL))?;
    syscall!(fcntl(fd, F_SETFL, flags | O_NONBLOCK))?;

    Ok(())
}

/// Creates a non-blocking stream socket in the given address family.
pub(crate) fn sys_socket(family: c_int) -> io::Result<RawFd> {
    syscall!(socket(family, SOCK_STREAM | SOCK_NONBLOCK | SOCK_CLOEXEC, 0))
}

/// Binds a socket to an address.
pub(crate) fn sys_bind(fd: RawFd, addr: &sockaddr_storage, len: socklen_t) -> io::Result<()> {
    syscall!(bind(fd, addr as *const _ as *const sockaddr, len))?;

    Ok(())
}

/// Marks a socket as a listening socket.
pub(crate) fn sys_listen(fd: RawFd, backlog: c_int) -> io::Result<()> {
    syscall!(listen(fd, backlog))?;

    Ok(())
}

/// Accepts one pending connection.
///
/// The client descriptor comes back already non-blocking via
/// `accept4`, saving an `fcntl` round trip per connection.
pub(crate) fn sys_accept(fd: RawFd) -> io::Result<(RawFd, SocketAddr)> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let client = syscall!(accept4(
        fd,
        &mut storage as *mut _ as *mut sockaddr,
        &mut len,
        SOCK_NONBLOCK | SOCK_CLOEXEC,
    ))?;

    match sockaddr_to_addr(&storage) {
        Ok(peer) => Ok((client, peer)),
        Err(err) => {
            sys_close(client);
            Err(err)
        }
    }
}

/// Returns the local address a socket is bound to.
pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    syscall!(getsockname(
        fd,
        &mut storage as *mut _ as *mut sockaddr,
        &mut len,
    ))?;

    sockaddr_to_addr(&storage)
}

fn sys_setsockopt(fd: RawFd, level: c_int, name: c_int, value: c_int) -> io::Result<()> {
    syscall!(setsockopt(
        fd,
        level,
        name,
        &value as *const _ as *const _,
        mem::size_of::<c_int>() as socklen_t,
    ))?;

    Ok(())
}

/// Enables `SO_REUSEADDR` so several workers or a fast restart may
/// share the endpoint.
pub(crate) fn sys_set_reuseaddr(fd: RawFd) -> io::Result<()> {
    sys_setsockopt(fd, SOL_SOCKET, SO_REUSEADDR, 1)
}

/// Sets the `IPV6_V6ONLY` socket option; off means dual-stack.
pub(crate) fn sys_set_v6only(fd: RawFd, v6only: bool) -> io::Result<()> {
    sys_setsockopt(fd, IPPROTO_IPV6, IPV6_V6ONLY, v6only as c_int)
}

fn sockaddr_to_addr(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as c_int {
        AF_INET => {
            let v4 = unsafe { &*(storage as *const _ as *const sockaddr_in) };

            Ok(SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::from(u32::from_be(v4.sin_addr.s_addr)),
                u16::from_be(v4.sin_port),
            )))
        }

        AF_INET6 => {
            let v6 = unsafe { &*(storage as *const _ as *const sockaddr_in6) };

            Ok(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(v6.sin6_addr.s6_addr),
                u16::from_be(v6.sin6_port),
                v6.sin6_flowinfo,
                v6.sin6_scope_id,
            )))
        }

        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported address family",
        )),
    }
}

/// Converts a `SocketAddr` into the storage form the syscalls expect.
pub(crate) fn addr_to_sockaddr(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    let len = match addr {
        SocketAddr::V4(v4) => {
            let out = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in) };
            out.sin_family = AF_INET as _;
            out.sin_port = v4.port().to_be();
            out.sin_addr.s_addr = u32::from(*v4.ip()).to_be();

            mem::size_of::<sockaddr_in>()
        }

        SocketAddr::V6(v6) => {
            let out = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in6) };
            out.sin6_family = AF_INET6 as _;
            out.sin6_port = v6.port().to_be();
            out.sin6_addr.s6_addr = v6.ip().octets();
            out.sin6_flowinfo = v6.flowinfo();
            out.sin6_scope_id = v6.scope_id();

            mem::size_of::<sockaddr_in6>()
        }
    };

    (storage, len as socklen_t)
}
