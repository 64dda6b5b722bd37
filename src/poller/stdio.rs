//! Line-oriented bridge between the poller and a display process.
//!
//! Events go to stdout as one JSON object per line. Control commands can be
//! fed on stdin in the same shape.

use std::future::Future;
use std::io::{BufRead, ErrorKind};

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::{PollConfig, Poller, PollerCommand, PollerEvent, SnapshotSource};

/// Parse one control line, e.g. `{"notification":"CONFIG","payload":{"updateInterval":60000}}`.
pub fn parse_command(line: &str) -> Result<PollerCommand> {
    serde_json::from_str(line.trim()).context("Invalid control message")
}

/// Run the poller until Ctrl-C, printing every event as a JSON line.
pub async fn run<S: SnapshotSource>(
    source: S,
    update_interval_ms: u64,
    stdin_control: bool,
) -> Result<()> {
    let poller = Poller::start(source);

    if stdin_control {
        spawn_stdin_reader(poller.command_sender())?;
    }

    serve(
        poller,
        update_interval_ms,
        tokio::io::stdout(),
        tokio::signal::ctrl_c(),
    )
    .await
}

/// Configure the poller and write its events to `out` until `shutdown`
/// resolves, the poller stops, or the reader of `out` goes away.
async fn serve<W, F>(
    mut poller: Poller,
    update_interval_ms: u64,
    mut out: W,
    shutdown: F,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
    F: Future,
{
    tokio::pin!(shutdown);

    poller.send(PollerCommand::Config(PollConfig {
        update_interval: update_interval_ms,
    }));

    loop {
        tokio::select! {
            event = poller.recv() => match event {
                Some(event) => {
                    if !write_event(&mut out, &event).await? {
                        tracing::info!("Event consumer closed the pipe, shutting down");
                        return Ok(());
                    }
                }
                None => {
                    tracing::warn!("Poller stopped");
                    return Ok(());
                }
            },
            _ = &mut shutdown => {
                tracing::info!("Shutting down...");
                return Ok(());
            }
        }
    }
}

/// Write one event line. Returns `false` when the reader has hung up.
async fn write_event<W: AsyncWrite + Unpin>(out: &mut W, event: &PollerEvent) -> Result<bool> {
    let mut line = serde_json::to_vec(event).context("Failed to encode event")?;
    line.push(b'\n');

    let written = match out.write_all(&line).await {
        Ok(()) => out.flush().await,
        Err(e) => Err(e),
    };
    match written {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(false),
        Err(e) => Err(e).context("Failed to write event"),
    }
}

/// Read stdin on a plain OS thread. A blocking read there never holds up
/// runtime shutdown; the thread dies with the process.
fn spawn_stdin_reader(cmd_tx: mpsc::UnboundedSender<PollerCommand>) -> Result<()> {
    std::thread::Builder::new()
        .name("stdin-control".to_string())
        .spawn(move || forward_lines(std::io::stdin().lock(), &cmd_tx))
        .context("Failed to start stdin reader")?;
    Ok(())
}

/// Hand every valid control line to the poller until EOF.
fn forward_lines<R: BufRead>(reader: R, cmd_tx: &mpsc::UnboundedSender<PollerCommand>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("stdin read failed: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(cmd) => {
                if cmd_tx.send(cmd).is_err() {
                    return;
                }
            }
            Err(e) => tracing::warn!("{:#}", e),
        }
    }
    tracing::debug!("stdin closed, no further control messages");
}
