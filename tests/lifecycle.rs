use filament::{Conn, ServerBuilder};

use std::future::Future;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

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

fn session(addr: SocketAddr) {
    let mut stream = TcpStream::connect(addr).expect("failed to connect");
    stream.write_all(b"ping").expect("failed to write");

    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).expect("failed to read echo");
    assert_eq!(&buf, b"ping");
}

fn open_fds() -> usize {
    std::fs::read_dir("/proc/self/fd")
        .expect("failed to read /proc/self/fd")
        .count()
}

// One connection descriptor per accept, released on every exit path: a
// long run of sequential sessions must leave the process descriptor
// count where it started.
#[test]
fn descriptors_return_to_baseline_after_many_sessions() {
    let addr = start_echo();

    // Warm up so lazily created descriptors are part of the baseline.
    session(addr);
    thread::sleep(Duration::from_millis(100));
    let baseline = open_fds();

    for _ in 0..10_000 {
        session(addr);
    }

    // Evictions run on the loop thread; wait for them to settle.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let now = open_fds();
        if now <= baseline {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "descriptor leak: {now} open, baseline {baseline}"
        );
        thread::sleep(Duration::from_millis(50));
    }
}
