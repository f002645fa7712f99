//! scanfeed: relay port-scan results to a Redis pub/sub channel.
//!
//! Reads list-format scan records from stdin and publishes each open
//! port as a `PUBLISH` command. Commands are pipelined: the relay never
//! waits for a reply round trip, it only drains replies that have
//! already arrived and checks they stay in step with what was sent.

mod config;
mod event;
mod net;
mod resp;
mod sink;

use config::Config;
use event::{Event, PortStatus};
use sink::RedisSink;
use std::io::{self, BufRead};
use std::net::{Ipv4Addr, TcpStream};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        server = %config.server,
        channel = %config.channel,
        "Starting scanfeed"
    );

    if let Err(e) = run(&config) {
        error!(error = %e, "Fatal");
        std::process::exit(1);
    }
}

/// Connect, handshake, relay stdin until EOF, say goodbye.
fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = TcpStream::connect(&config.server)?;
    let mut sink = RedisSink::new(config.channel.clone());
    sink.open(&mut stream)?;

    let stdin = io::stdin();
    let mut published = 0u64;
    for line in stdin.lock().lines() {
        let line = line?;
        let record = line.trim();
        if record.is_empty() || record.starts_with('#') {
            continue;
        }
        match parse_record(record) {
            Some(event) => {
                sink.report(&mut stream, &event)?;
                if event.status == PortStatus::Open {
                    published += 1;
                }
            }
            None => warn!(line = %record, "Unparseable record, skipping"),
        }
    }

    sink.close(&mut stream)?;
    info!(published, "Done");
    Ok(())
}

/// Parse one list-format record: `open tcp 80 1.2.3.4 1700000000`,
/// optionally followed by a TTL and reason flag-bits field. A missing
/// timestamp defaults to now.
fn parse_record(line: &str) -> Option<Event> {
    let mut fields = line.split_whitespace();

    let status = match fields.next()? {
        "open" => PortStatus::Open,
        "closed" => PortStatus::Closed,
        "up" | "arp" => PortStatus::Arp,
        _ => return None,
    };
    let ip_proto = match fields.next()? {
        "arp" => 0,
        "icmp" => 1,
        "tcp" => 6,
        "udp" => 17,
        "sctp" => 132,
        _ => return None,
    };
    let port: u16 = fields.next()?.parse().ok()?;
    let addr: Ipv4Addr = fields.next()?.parse().ok()?;
    let timestamp = match fields.next() {
        Some(ts) => ts.parse().ok()?,
        None => chrono::Utc::now().timestamp(),
    };
    let ttl = fields.next().map_or(Some(0), |v| v.parse().ok())?;
    let reason = fields.next().map_or(Some(0), |v| v.parse().ok())?;

    Some(Event {
        timestamp,
        status,
        addr,
        ip_proto,
        port,
        reason,
        ttl,
    })
}
