//! Example: line-oriented server that uppercases every line it receives.
//!
//! Run with `cargo run --example upper_lines`, then
//! `printf 'abc\ndef\n' | nc 127.0.0.1 9001`.

use filament::ServerBuilder;

fn main() -> std::io::Result<()> {
    env_logger::init();

    let server = ServerBuilder::new().bind("0.0.0.0:9001")?;
    println!("listening on {}", server.local_addr()?);

    server.serve(|conn| async move {
        let mut pending = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = conn.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            pending.extend_from_slice(&buf[..n]);

            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = pending.drain(..=pos).collect();
                line.make_ascii_uppercase();
                conn.write_all(&line).await?;
            }
        }
    })
}
