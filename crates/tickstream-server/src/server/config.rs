use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use std::net::SocketAddr;
use tickstream_wire::DEFAULT_SERVER_ADDR;

/// Runtime configuration for the `tickstream-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults matching the demo's original timings.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tickstream-server",
    version,
    about = "An HTTP service streaming a paced integer sequence"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from(DEFAULT_SERVER_ADDR))]
    pub server_addr: String,

    /// Milliseconds between two items of a stream. The first item is sent
    /// immediately.
    ///
    /// Environment variable: `TICK_INTERVAL_MS`
    #[arg(long, env = "TICK_INTERVAL_MS", default_value_t = 1000)]
    pub tick_interval_ms: u64,

    /// Artificial delay of the server-date action, in milliseconds.
    ///
    /// Environment variable: `DATE_DELAY_MS`
    #[arg(long, env = "DATE_DELAY_MS", default_value_t = 1000)]
    pub date_delay_ms: u64,

    /// Artificial delay of the submit-form action, in milliseconds.
    ///
    /// Environment variable: `SUBMIT_DELAY_MS`
    #[arg(long, env = "SUBMIT_DELAY_MS", default_value_t = 3000)]
    pub submit_delay_ms: u64,

    /// Maximum number of concurrent streams. `0` means unlimited.
    ///
    /// Environment variable: `MAX_STREAMS`
    #[arg(long, env = "MAX_STREAMS", default_value_t = 0)]
    pub max_streams: usize,

    /// Seconds to wait for open streams to finish during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 5)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub tick_interval: Duration,
    pub date_delay: Duration,
    pub submit_delay: Duration,
    /// `None` when unlimited.
    pub max_streams: Option<usize>,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.tick_interval_ms == 0 {
            bail!("TICK_INTERVAL_MS must be greater than 0");
        }

        let server_addr = args
            .server_addr
            .parse()
            .with_context(|| format!("invalid SERVER_ADDR `{}`", args.server_addr))?;

        Ok(Self {
            server_addr,
            tick_interval: Duration::from_millis(args.tick_interval_ms),
            date_delay: Duration::from_millis(args.date_delay_ms),
            submit_delay: Duration::from_millis(args.submit_delay_ms),
            max_streams: (args.max_streams > 0).then_some(args.max_streams),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let argv = core::iter::once("tickstream-server").chain(args.iter().copied());
        let args = CliArgs::try_parse_from(argv)?;
        ServerConfig::try_from(args)
    }

    #[test]
    fn explicit_flags() {
        let config = parse(&[
            "--server-addr",
            "127.0.0.1:8080",
            "--tick-interval-ms",
            "250",
            "--max-streams",
            "4",
            "--shutdown-timeout",
            "1",
        ])
        .unwrap();

        assert_eq!(config.server_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.max_streams, Some(4));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn zero_max_streams_means_unlimited() {
        let config = parse(&["--max-streams", "0"]).unwrap();
        assert_eq!(config.max_streams, None);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = parse(&["--tick-interval-ms", "0"]).unwrap_err();
        assert!(err.to_string().contains("TICK_INTERVAL_MS"));
    }

    #[test]
    fn bad_address_is_rejected() {
        let err = parse(&["--server-addr", "not-an-address"]).unwrap_err();
        assert!(err.to_string().contains("SERVER_ADDR"));
    }
}
