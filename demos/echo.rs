//! Example: TCP echo server on four workers.
//!
//! Run with `cargo run --example echo`, then try
//! `printf hello | nc 127.0.0.1 9000`.

use filament::ServerBuilder;

fn main() -> std::io::Result<()> {
    env_logger::init();

    let server = ServerBuilder::new().workers(4).bind("0.0.0.0:9000")?;
    println!("echo server listening on {}", server.local_addr()?);

    server.serve(|conn| async move {
        let mut buf = [0u8; 4096];
        loop {
            let n = conn.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            conn.write_all(&buf[..n]).await?;
        }
    })
}
