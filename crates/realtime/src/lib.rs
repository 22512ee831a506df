use std::time::Duration;

use futures::StreamExt;
use shared::{domain::PackageId, protocol::RefreshSet};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Full websocket endpoint, e.g. `ws://host:port/package`.
    pub endpoint: String,
    /// Fixed delay between a drop and the single scheduled reconnect.
    /// No backoff growth, no retry cap.
    pub reconnect_delay: Duration,
}

impl ChannelOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Events fanned out to channel subscribers.
///
/// `Opened` and `Faulted` are one-shot status notices for the user; only
/// `Refresh` carries data, and that data is a hint to re-query authoritative
/// state, never a delta to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Refresh(RefreshSet),
    Faulted(String),
}

/// A single long-lived refresh subscription per view. The owning view shuts
/// it down on teardown; dropping the handle shuts it down too, so no timer
/// outlives its view.
pub struct RefreshChannel {
    events: broadcast::Sender<ChannelEvent>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshChannel {
    /// Spawns the connect/read/reconnect loop and returns the handle plus a
    /// receiver subscribed before the first connect attempt.
    pub fn spawn(options: ChannelOptions) -> (Self, broadcast::Receiver<ChannelEvent>) {
        let (events, receiver) = broadcast::channel(64);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_channel(options, events.clone(), shutdown_rx));
        (
            Self {
                events,
                shutdown,
                task,
            },
            receiver,
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Drop for RefreshChannel {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }
}

async fn run_channel(
    options: ChannelOptions,
    events: broadcast::Sender<ChannelEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        match connect_async(&options.endpoint).await {
            Ok((stream, _)) => {
                info!(endpoint = %options.endpoint, "refresh channel open");
                let _ = events.send(ChannelEvent::Opened);
                let (_, mut reader) = stream.split();
                loop {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                return;
                            }
                        }
                        frame = reader.next() => match frame {
                            Some(Ok(Message::Text(text))) => emit_refresh(&events, &text),
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                let _ = events.send(ChannelEvent::Faulted(format!(
                                    "refresh channel receive failed: {err}"
                                )));
                                break;
                            }
                        }
                    }
                }
                warn!(endpoint = %options.endpoint, "refresh channel closed");
            }
            Err(err) => {
                let _ = events.send(ChannelEvent::Faulted(format!(
                    "refresh channel connect failed: {err}"
                )));
            }
        }

        // Exactly one reconnect attempt per drop, after the fixed delay.
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
            _ = tokio::time::sleep(options.reconnect_delay) => {}
        }
    }
}

/// Each inbound message replaces the previously emitted set; no dedup, no
/// batching. Malformed payloads surface as a notice without dropping the
/// connection.
fn emit_refresh(events: &broadcast::Sender<ChannelEvent>, text: &str) {
    match serde_json::from_str::<Vec<String>>(text) {
        Ok(ids) => {
            let set: RefreshSet = ids.into_iter().map(PackageId::new).collect();
            let _ = events.send(ChannelEvent::Refresh(set));
        }
        Err(err) => {
            let _ = events.send(ChannelEvent::Faulted(format!(
                "invalid refresh payload: {err}"
            )));
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
