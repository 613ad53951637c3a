use crate::client::{
    config::{ClientConfig, Command},
    http::{ActionClient, HttpConnector},
};
use anyhow::Context;
use core::time::Duration;
use futures::StreamExt;
use reqwest::Client;
use std::io::Write;
use tickstream::{Connector, ConsumerState, StreamConsumer};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal,
    time::{MissedTickBehavior, interval},
};
use tokio_stream::wrappers::IntervalStream;

/// Period of the polling clock.
const CLOCK_PERIOD: Duration = Duration::from_secs(1);

pub async fn run(config: ClientConfig) -> anyhow::Result<()> {
    let client = Client::builder()
        .build()
        .context("failed to build HTTP client")?;

    match config.command {
        Command::Stream { count, now } => {
            if !now {
                wait_for_start("stream").await?;
            }
            let connector = HttpConnector::new(client, &config.base_url)?;
            stream(connector, count, std::io::stdout()).await
        }
        Command::Clock { ticks, now } => {
            if !now {
                wait_for_start("clock").await?;
            }
            clock(ActionClient::new(client, config.base_url), ticks, std::io::stdout()).await
        }
        Command::Increment { number } => {
            let result = ActionClient::new(client, config.base_url)
                .increment(number)
                .await?;
            println!("{result}");
            Ok(())
        }
        Command::Throw => {
            ActionClient::new(client, config.base_url)
                .throw_error()
                .await?;
            println!("action unexpectedly succeeded");
            Ok(())
        }
        Command::Submit { fields } => {
            let success = ActionClient::new(client, config.base_url)
                .submit_form(&fields)
                .await?;
            println!("success: {success}");
            Ok(())
        }
    }
}

/// Blocks until the user presses Enter. Nothing touches the network before.
async fn wait_for_start(what: &str) -> anyhow::Result<()> {
    eprintln!("Press Enter to start the {what}...");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read from stdin")?;
    Ok(())
}

/// Lets text through until a number of complete lines has been seen.
#[derive(Debug)]
struct LineLimit {
    remaining: Option<usize>,
}

impl LineLimit {
    const fn new(limit: Option<usize>) -> Self {
        Self { remaining: limit }
    }

    /// Returns the part of `text` within the limit, and whether the limit
    /// was reached. A chunk may carry several lines, so it can be cut short.
    fn take<'a>(&mut self, text: &'a str) -> (&'a str, bool) {
        let Some(remaining) = self.remaining.as_mut() else {
            return (text, false);
        };
        if *remaining == 0 {
            return ("", true);
        }
        for (at, _) in text.match_indices('\n') {
            *remaining -= 1;
            if *remaining == 0 {
                return (&text[..=at], true);
            }
        }
        (text, false)
    }
}

/// Writes every chunk to `out` as soon as it is decoded. Ctrl+C, or reaching
/// `count` lines, aborts the stream.
async fn stream<C, W>(connector: C, count: Option<usize>, mut out: W) -> anyhow::Result<()>
where
    C: Connector,
    W: Write,
{
    let mut consumer = StreamConsumer::new(connector);
    let abort = consumer.abort_handle();

    let on_ctrl_c = {
        let abort = abort.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                abort.abort();
            }
        })
    };

    let mut limit = LineLimit::new(count);
    let mut write_error = None;
    let report = consumer
        .start(|text| {
            if abort.is_aborted() {
                return;
            }
            let (shown, done) = limit.take(text);
            if let Err(e) = out.write_all(shown.as_bytes()).and_then(|()| out.flush()) {
                write_error = Some(e);
                abort.abort();
            }
            if done {
                abort.abort();
            }
        })
        .await;
    on_ctrl_c.abort();
    let report = report?;
    if let Some(e) = write_error {
        return Err(e).context("failed to write the stream");
    }

    match report.state {
        ConsumerState::Aborted => eprintln!("stream aborted"),
        _ => eprintln!("stream ended"),
    }
    tracing::debug!(chunks = report.chunks, bytes = report.bytes, "stream report");
    Ok(())
}

/// Writes the server date to `out` once per `CLOCK_PERIOD` until `ticks`
/// readings were taken or Ctrl+C is pressed. Failed readings are reported and
/// skipped.
async fn clock<W: Write>(
    actions: ActionClient,
    ticks: Option<usize>,
    mut out: W,
) -> anyhow::Result<()> {
    let mut timer = interval(CLOCK_PERIOD);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = IntervalStream::new(timer).take(ticks.unwrap_or(usize::MAX));

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            tick = ticks.next() => {
                if tick.is_none() {
                    break;
                }
                match actions.server_date().await {
                    Ok(date) => writeln!(out, "{date}").context("failed to write the date")?,
                    Err(e) => eprintln!("failed to read server date: {e}"),
                }
            }
        }
    }
    Ok(())
}
