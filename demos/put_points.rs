//! Demo client that feeds a TSDB endpoint.
//!
//! Sends one `testmetric` point per second for 30 seconds, then closes.
//! Start a listener first, e.g. `nc -lk 4242`, then run:
//! cargo run --example put_points -- 127.0.0.1 4242
//!
//! Set `RUST_LOG=simpletsdb=debug` to watch reconnects.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use simpletsdb::{Tags, TsdbClient};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <host> <port>", args[0]);
        std::process::exit(1);
    }
    let port: u16 = args[2].parse()?;

    let client = Arc::new(TsdbClient::new(args[1].as_str(), port)?);
    let worker = {
        let client = Arc::clone(&client);
        thread::spawn(move || client.run())
    };

    let mut tags = Tags::new();
    tags.insert("foo".to_string(), "bar".to_string());
    for i in 0..30 {
        client.add_point("testmetric", f64::from(i), 555, Some(&tags));
        thread::sleep(Duration::from_secs(1));
    }

    client.close();
    let stats = worker.join().map_err(|_| "event loop thread panicked")??;
    println!(
        "sent {} points ({} bytes), dropped {}, {} reconnects",
        stats.messages_sent, stats.bytes_sent, stats.messages_dropped, stats.reconnect_count
    );
    Ok(())
}
