//! Public handle for the broker connection.
//!
//! `ConnectionManager` is a cheap, clonable facade over the connection
//! worker task. Connect and disconnect are dispatch-and-return; publish
//! performs a pre-flight check and returns an optimistic acceptance
//! boolean. All real transport work happens on the worker, in command
//! order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use super::config::{ConnectionConfig, ManagerSettings};
use super::connection::ConnectionWorker;
use super::status::StatusEvent;
use crate::channel::PublishSink;

/// Capacity of the command channel into the worker. Commands execute in
/// FIFO order, so a publish dispatched after a disconnect is processed
/// after that disconnect begins.
const COMMAND_CAPACITY: usize = 64;

pub(super) enum Command {
    Connect(ConnectionConfig),
    Disconnect,
    Publish { topic: String, payload: String },
}

/// Handle to a broker connection owned by a background worker task.
///
/// Dropping every clone closes the command channel; the worker then
/// disconnects gracefully before its task finishes. Await the
/// [`JoinHandle`] returned by [`ConnectionManager::spawn`] for a
/// deterministic teardown.
#[derive(Clone)]
pub struct ConnectionManager {
    commands: mpsc::Sender<Command>,
    live: Arc<AtomicBool>,
}

impl ConnectionManager {
    /// Spawns the connection worker. Status tokens (`CONNECTING`,
    /// `CONNECTED`, `DISCONNECTED`, `ERROR`) are delivered through
    /// `status`, one per state transition, from the worker task.
    pub fn spawn(
        settings: ManagerSettings,
        status: mpsc::Sender<StatusEvent>,
    ) -> (Self, JoinHandle<()>) {
        let (commands, receiver) = mpsc::channel(COMMAND_CAPACITY);
        let live = Arc::new(AtomicBool::new(false));
        let worker = ConnectionWorker::new(receiver, status, live.clone(), settings);
        let handle = tokio::spawn(worker.run());
        (Self { commands, live }, handle)
    }

    /// Requests a connection to `url` (`scheme://host:port`). Returns
    /// immediately; progress and failures surface through the status
    /// channel. A connect while already connected tears the previous
    /// transport down first.
    pub fn connect(&self, url: &str, client_id: &str, username: &str, password: &str) {
        let config = ConnectionConfig::new(url, client_id, username, password);
        if self.commands.try_send(Command::Connect(config)).is_err() {
            warn!("connect request dropped, connection worker unavailable");
        }
    }

    /// Requests a graceful disconnect. Idempotent; a no-op without a live
    /// transport.
    pub fn disconnect(&self) {
        if self.commands.try_send(Command::Disconnect).is_err() {
            warn!("disconnect request dropped, connection worker unavailable");
        }
    }

    /// Best-effort publish: QoS 0 (at most once), retained. Returns false
    /// immediately when no transport is live; otherwise hands the message
    /// to the worker and reports whether it was accepted for send. True
    /// is not a delivery acknowledgement.
    pub fn publish(&self, topic: &str, payload: &str) -> bool {
        if !self.live.load(Ordering::Acquire) {
            warn!("publish to {topic} rejected: no live connection");
            return false;
        }
        self.commands
            .try_send(Command::Publish {
                topic: topic.to_string(),
                payload: payload.to_string(),
            })
            .is_ok()
    }
}

impl PublishSink for ConnectionManager {
    fn publish(&self, topic: &str, payload: &str) -> bool {
        ConnectionManager::publish(self, topic, payload)
    }
}
