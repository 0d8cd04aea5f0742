//! Send command - push beacon lines to a listener by hand
//!
//! Each line is sent in lockstep and its reply printed next to it.
//! Without positional lines, lines are read from stdin.
//!
//! # Usage
//!
//! ```bash
//! tagwatch send "TAG,fa451f0755d8,197,20251003140059.456"
//! cat beacons.log | tagwatch send --server 10.0.0.5:8888
//! ```

use anyhow::{Context, Result, bail};
use clap::Args;
use tagwatch_client::BeaconClient;
use tagwatch_config::Config;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Listener address (default: listener address from config)
    #[arg(short, long)]
    server: Option<String>,

    /// Beacon lines to send (reads stdin when omitted)
    lines: Vec<String>,
}

impl SendArgs {
    fn target(&self, config: &Config) -> String {
        self.server
            .clone()
            .unwrap_or_else(|| connect_address(&config.listener.address, config.listener.port))
    }
}

/// Wildcard binds are reached through loopback
fn connect_address(address: &str, port: u16) -> String {
    match address {
        "" | "0.0.0.0" => format!("127.0.0.1:{}", port),
        "::" | "[::]" => format!("[::1]:{}", port),
        host => format!("{}:{}", host, port),
    }
}

pub async fn run(args: SendArgs, config: &Config) -> Result<()> {
    let target = args.target(config);
    let lines = if args.lines.is_empty() {
        read_stdin_lines().await?
    } else {
        args.lines
    };

    if lines.is_empty() {
        bail!("no beacon lines given");
    }

    let mut client = BeaconClient::connect(&target)
        .await
        .with_context(|| format!("failed to connect to {}", target))?;

    let (mut acks, mut nacks) = (0usize, 0usize);
    for line in &lines {
        let ack = client
            .send(line)
            .await
            .with_context(|| format!("no reply for {:?}", line))?;
        if ack.is_ack() {
            acks += 1;
        } else {
            nacks += 1;
        }
        println!("{} -> {}", line, ack);
    }
    client.close().await?;

    eprintln!("{} sent, {} ACK, {} NACK", lines.len(), acks, nacks);
    Ok(())
}

async fn read_stdin_lines() -> Result<Vec<String>> {
    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    let mut lines = Vec::new();
    while let Some(line) = reader.next_line().await.context("failed to read stdin")? {
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_address() {
        assert_eq!(connect_address("0.0.0.0", 8888), "127.0.0.1:8888");
        assert_eq!(connect_address("::", 8888), "[::1]:8888");
        assert_eq!(connect_address("10.1.2.3", 9000), "10.1.2.3:9000");
    }

    #[test]
    fn test_server_flag_wins() {
        let config = Config::default();
        let args = SendArgs {
            server: Some("10.0.0.5:7777".into()),
            lines: vec![],
        };
        assert_eq!(args.target(&config), "10.0.0.5:7777");

        let args = SendArgs {
            server: None,
            lines: vec![],
        };
        assert_eq!(args.target(&config), "127.0.0.1:8888");
    }
}
