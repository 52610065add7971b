use filament::{Conn, ServerBuilder};

use std::future::Future;
use std::io::{self, Read, Write};
use std::mem;
use std::net::{SocketAddr, TcpStream};
use std::os::fd::AsRawFd;
use std::thread;
use std::time::Duration;

fn echo_handler(conn: Conn) -> impl Future<Output = io::Result<()>> {
    async move {
        let mut buf = [0u8; 4096];
        loop {
            let n = conn.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            conn.write_all(&buf[..n]).await?;
        }
    }
}

fn start_echo() -> SocketAddr {
    let server = ServerBuilder::new()
        .bind("127.0.0.1:0")
        .expect("failed to bind server");
    let addr = server.local_addr().expect("failed to get local address");

    thread::spawn(move || {
        let _ = server.serve(echo_handler);
    });

    addr
}

fn roundtrip(addr: SocketAddr, msg: &[u8]) {
    let mut stream = TcpStream::connect(addr).expect("failed to connect");
    stream.write_all(msg).expect("failed to write");

    let mut buf = vec![0u8; msg.len()];
    stream.read_exact(&mut buf).expect("failed to read echo");
    assert_eq!(buf, msg);
}

/// Closes the stream with linger zero, sending RST instead of FIN.
fn rst_close(stream: TcpStream) {
    let lg = libc::linger {
        l_onoff: 1,
        l_linger: 0,
    };

    let rc = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_LINGER,
            &lg as *const _ as *const _,
            mem::size_of::<libc::linger>() as libc::socklen_t,
        )
    };
    assert_eq!(rc, 0, "failed to set SO_LINGER");

    drop(stream);
}

#[test]
fn connection_dropped_before_any_data_is_evicted() {
    let addr = start_echo();

    let stream = TcpStream::connect(addr).expect("failed to connect");
    drop(stream);

    // The handler observes end-of-stream on its first read and exits;
    // the server keeps serving.
    thread::sleep(Duration::from_millis(50));
    roundtrip(addr, b"still alive");
}

#[test]
fn peer_reset_terminates_only_that_connection() {
    let addr = start_echo();

    let mut stream = TcpStream::connect(addr).expect("failed to connect");
    stream.write_all(b"x").expect("failed to write");
    rst_close(stream);

    // The reset surfaces as an error inside the handler's read or
    // write; the connection is evicted without touching the others.
    thread::sleep(Duration::from_millis(50));
    roundtrip(addr, b"unaffected");
    roundtrip(addr, b"unaffected again");
}

#[test]
fn panicking_handler_does_not_take_down_the_worker() {
    let server = ServerBuilder::new()
        .bind("127.0.0.1:0")
        .expect("failed to bind server");
    let addr = server.local_addr().expect("failed to get local address");

    thread::spawn(move || {
        let _ = server.serve(|conn: Conn| async move {
            let mut buf = [0u8; 16];
            let _ = conn.read(&mut buf).await?;
            panic!("handler exploded");
        });
    });

    let mut stream = TcpStream::connect(addr).expect("failed to connect");
    stream.write_all(b"boom").expect("failed to write");

    // The panic is contained: our connection just closes.
    let mut rest = Vec::new();
    let _ = stream.read_to_end(&mut rest);
    assert!(rest.is_empty());

    // And the worker is still accepting.
    let mut second = TcpStream::connect(addr).expect("failed to reconnect");
    second.write_all(b"boom").expect("failed to write");
    let mut rest = Vec::new();
    let _ = second.read_to_end(&mut rest);
    assert!(rest.is_empty());
}
