//! Scheduler/notifier: runs fetch cycles on a timer and emits snapshots.
//!
//! Uses an mpsc channel pair like a small actor. The consumer sends
//! `PollerCommand` values, a background tokio task owns the snapshot source
//! and sends `PollerEvent` values back.
//!
//! The task runs each fetch to completion before looking at the timer or the
//! command channel again, so cycles never overlap. Ticks missed during a slow
//! cycle are skipped rather than queued.

pub mod stdio;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};

use crate::api::Fetcher;
use crate::error::FetchError;
use crate::models::Snapshot;

/// Polling configuration received from the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PollConfig {
    /// Milliseconds between fetch cycles.
    #[serde(rename = "updateInterval")]
    pub update_interval: u64,
}

/// Commands sent from the consumer to the poller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(
    tag = "notification",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum PollerCommand {
    /// Start polling, or restart it with a new interval.
    Config(PollConfig),
}

/// Events from the poller to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "notification",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum PollerEvent {
    NewData(Snapshot),
}

/// Anything that can produce one snapshot per call.
pub trait SnapshotSource: Send + 'static {
    fn fetch(&mut self) -> impl Future<Output = Result<Snapshot, FetchError>> + Send;
}

impl SnapshotSource for Fetcher {
    fn fetch(&mut self) -> impl Future<Output = Result<Snapshot, FetchError>> + Send {
        self.fetch_snapshot()
    }
}

/// Handle for driving the poller from the consumer side.
pub struct Poller {
    cmd_tx: mpsc::UnboundedSender<PollerCommand>,
    event_rx: mpsc::UnboundedReceiver<PollerEvent>,
}

impl Poller {
    /// Start the poller task. Nothing is fetched until a `Config` arrives.
    pub fn start<S: SnapshotSource>(source: S) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(poll_loop(source, cmd_rx, event_tx));

        Self { cmd_tx, event_rx }
    }

    /// Send a command to the poller (non-blocking).
    pub fn send(&self, cmd: PollerCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Poller channel closed -- command dropped");
        }
    }

    /// A second sender, for feeding commands from another task.
    pub fn command_sender(&self) -> mpsc::UnboundedSender<PollerCommand> {
        self.cmd_tx.clone()
    }

    /// Receive the next event.
    ///
    /// Returns `None` once the poller task has exited. Designed to be used
    /// inside `tokio::select!`.
    pub async fn recv(&mut self) -> Option<PollerEvent> {
        self.event_rx.recv().await
    }
}

/// Background loop: owns the source and the (at most one) repeating timer.
async fn poll_loop<S: SnapshotSource>(
    mut source: S,
    mut cmd_rx: mpsc::UnboundedReceiver<PollerCommand>,
    event_tx: mpsc::UnboundedSender<PollerEvent>,
) {
    let mut timer: Option<Interval> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(PollerCommand::Config(cfg)) => {
                    if cfg.update_interval == 0 {
                        tracing::warn!("Ignoring CONFIG with zero updateInterval");
                        continue;
                    }
                    if timer.is_some() {
                        tracing::info!("Replacing poll timer ({}ms)", cfg.update_interval);
                    } else {
                        tracing::info!("Polling every {}ms", cfg.update_interval);
                    }
                    // First tick fires immediately, giving the initial fetch.
                    let period = Duration::from_millis(cfg.update_interval);
                    let mut interval = time::interval(period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    timer = Some(interval);
                }
                None => {
                    tracing::debug!("Poller command channel closed, stopping");
                    break;
                }
            },
            _ = next_tick(&mut timer) => {
                run_cycle(&mut source, &event_tx).await;
            }
        }
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run_cycle<S: SnapshotSource>(
    source: &mut S,
    event_tx: &mpsc::UnboundedSender<PollerEvent>,
) {
    match source.fetch().await {
        Ok(snapshot) => {
            tracing::info!("Fetched {} home(s)", snapshot.tado_homes.len());
            if event_tx.send(PollerEvent::NewData(snapshot)).is_err() {
                tracing::debug!("No consumer listening, snapshot dropped");
            }
        }
        Err(e) => {
            tracing::error!("Fetch cycle failed: {}", e);
        }
    }
}
