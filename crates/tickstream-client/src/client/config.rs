use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use reqwest::Url;
use tickstream_wire::DEFAULT_BASE_URL;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tickstream",
    version,
    about = "Reads a tickstream server's paced integer stream and calls its actions"
)]
pub struct CliArgs {
    /// Base URL of the server.
    ///
    /// Environment variable: `TICKSTREAM_URL`
    #[arg(long, global = true, env = "TICKSTREAM_URL", default_value_t = String::from(DEFAULT_BASE_URL))]
    pub url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the stream as it arrives.
    Stream {
        /// Abort after this many chunks.
        #[arg(long)]
        count: Option<usize>,

        /// Start without waiting for Enter.
        #[arg(long)]
        now: bool,
    },

    /// Poll the server clock once per second.
    Clock {
        /// Stop after this many readings.
        #[arg(long)]
        ticks: Option<usize>,

        /// Start without waiting for Enter.
        #[arg(long)]
        now: bool,
    },

    /// Ask the server to add one to a number.
    Increment {
        #[arg(long, allow_negative_numbers = true)]
        number: i64,
    },

    /// Call the action that always fails.
    Throw,

    /// Submit form fields given as `key=value`.
    Submit {
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub command: Command,
}

impl TryFrom<CliArgs> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let base_url = Url::parse(&args.url)
            .with_context(|| format!("invalid TICKSTREAM_URL `{}`", args.url))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "TICKSTREAM_URL must use http or https, got `{}`",
                base_url.scheme()
            );
        }

        Ok(Self {
            base_url,
            command: args.command,
        })
    }
}

/// Splits `key=value` at the first `=`. The value may be empty.
fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, _)) if key.is_empty() => Err(format!("missing field name in `{raw}`")),
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(format!("expected `key=value`, got `{raw}`")),
    }
}
