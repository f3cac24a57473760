//! The connection worker: a single task owning the transport variant,
//! the MQTT event loop, and the connection state machine.
//!
//! Every transport operation runs here, regardless of which thread the
//! public [`super::ConnectionManager`] methods were called from. Commands
//! arrive over an mpsc channel and execute in dispatch order; status
//! tokens leave over another channel, one per state transition. Closing
//! the command channel shuts the worker down gracefully: it requests a
//! broker disconnect and lets the close handshake flush before exiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
    TlsConfiguration, Transport,
};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::config::{BrokerUrl, ConnectError, ConnectionConfig, ManagerSettings, KEEP_ALIVE};
use super::manager::Command;
use super::status::{ConnectionState, StatusEvent};
use crate::diaglog::DiagnosticLog;

/// Pause between automatic reconnect attempts after a transport error.
const RETRY_PAUSE: Duration = Duration::from_secs(1);
/// Upper bound on waiting for the close handshake during teardown.
const CLOSE_FLUSH_LIMIT: Duration = Duration::from_secs(1);
/// Capacity of rumqttc's internal request channel.
const REQUEST_CAPACITY: usize = 100;

/// The live transport slot. At most one variant is live per manager;
/// assigning a new variant drops (and thereby destroys) the previous
/// client and event loop.
enum TransportVariant {
    None,
    Plain {
        client: AsyncClient,
        event_loop: EventLoop,
    },
    Tls {
        client: AsyncClient,
        event_loop: EventLoop,
    },
}

impl TransportVariant {
    fn client(&self) -> Option<&AsyncClient> {
        match self {
            TransportVariant::None => None,
            TransportVariant::Plain { client, .. } | TransportVariant::Tls { client, .. } => {
                Some(client)
            }
        }
    }

    fn event_loop_mut(&mut self) -> Option<&mut EventLoop> {
        match self {
            TransportVariant::None => None,
            TransportVariant::Plain { event_loop, .. }
            | TransportVariant::Tls { event_loop, .. } => Some(event_loop),
        }
    }

    fn is_live(&self) -> bool {
        !matches!(self, TransportVariant::None)
    }
}

/// What a loop iteration produced: a caller command or an event-loop poll
/// result.
enum Step {
    Command(Option<Command>),
    Polled(Result<Event, ConnectionError>),
}

pub(super) struct ConnectionWorker {
    commands: mpsc::Receiver<Command>,
    transport: TransportVariant,
    state: ConnectionState,
    status: mpsc::Sender<StatusEvent>,
    diag: DiagnosticLog,
    live: Arc<AtomicBool>,
    settings: ManagerSettings,
}

impl ConnectionWorker {
    pub(super) fn new(
        commands: mpsc::Receiver<Command>,
        status: mpsc::Sender<StatusEvent>,
        live: Arc<AtomicBool>,
        settings: ManagerSettings,
    ) -> Self {
        let diag = DiagnosticLog::new(settings.log_path.clone());
        Self {
            commands,
            transport: TransportVariant::None,
            state: ConnectionState::Disconnected,
            status,
            diag,
            live,
            settings,
        }
    }

    pub(super) async fn run(mut self) {
        loop {
            let step = match self.transport.event_loop_mut() {
                Some(event_loop) => tokio::select! {
                    command = self.commands.recv() => Step::Command(command),
                    polled = event_loop.poll() => Step::Polled(polled),
                },
                None => Step::Command(self.commands.recv().await),
            };

            match step {
                Step::Command(Some(command)) => self.handle_command(command).await,
                Step::Command(None) => {
                    // All handles dropped: disconnect before the loop stops
                    // so the close handshake can flush.
                    self.close_transport().await;
                    break;
                }
                Step::Polled(polled) => self.handle_poll(polled).await,
            }
        }
        debug!("connection worker stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(config) => self.open_transport(config).await,
            Command::Disconnect => self.request_close(),
            Command::Publish { topic, payload } => self.forward_publish(&topic, payload),
        }
    }

    /// Opens a fresh transport for `config`, tearing down any live one
    /// first. Failures never propagate: they are logged, reported as an
    /// ERROR token, and leave the manager Disconnected with no transport.
    async fn open_transport(&mut self, config: ConnectionConfig) {
        if self.transport.is_live() {
            debug!("connect while a transport is live, replacing it");
            self.close_transport().await;
        }

        self.transition(ConnectionState::Connecting, Some(StatusEvent::Connecting));

        match self.build_transport(&config) {
            Ok(variant) => {
                self.transport = variant;
                self.live.store(true, Ordering::Release);
            }
            Err(err) => {
                warn!("connect to {} rejected: {err}", config.url);
                self.diag.log(&format!("connect rejected: {err}"));
                self.transport = TransportVariant::None;
                self.live.store(false, Ordering::Release);
                self.transition(ConnectionState::Disconnected, Some(StatusEvent::Error));
            }
        }
    }

    fn build_transport(&self, config: &ConnectionConfig) -> Result<TransportVariant, ConnectError> {
        let url = BrokerUrl::parse(&config.url)?;

        let mut options = MqttOptions::new(&config.client_id, &url.host, url.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(config.clean_session);
        if !config.username.is_empty() || !config.password.is_empty() {
            options.set_credentials(config.username.clone(), config.password.clone());
        }

        let secure = url.is_secure();
        if secure {
            options.set_transport(self.tls_transport(&url)?);
        }

        info!(
            "connecting to {}://{}:{} as '{}'",
            url.scheme, url.host, url.port, config.client_id
        );
        self.diag
            .log(&format!("connecting to {}:{}", url.host, url.port));

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        Ok(if secure {
            TransportVariant::Tls { client, event_loop }
        } else {
            TransportVariant::Plain { client, event_loop }
        })
    }

    /// TLS over TCP, verified against the configured CA certificate. The
    /// SNI hostname is taken from the broker URL's host by the client.
    fn tls_transport(&self, url: &BrokerUrl) -> Result<Transport, ConnectError> {
        let ca_path = self
            .settings
            .ca_cert_path
            .as_ref()
            .ok_or_else(|| ConnectError::MissingCaCert(url.scheme.clone()))?;
        let ca = std::fs::read(ca_path)?;
        Ok(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: None,
        }))
    }

    /// Requests a graceful close. Idempotent: without a live transport
    /// this is a no-op. The transition to Disconnected happens once the
    /// transport acknowledges (or drops) the close.
    fn request_close(&mut self) {
        let Some(client) = self.transport.client() else {
            trace!("disconnect requested with no live transport");
            return;
        };
        match client.try_disconnect() {
            Ok(()) => {
                self.state = ConnectionState::Disconnecting;
            }
            Err(err) => {
                warn!("close request not accepted: {err}");
                self.diag.log(&format!("close error: {err}"));
                self.finalize_close();
            }
        }
    }

    /// Hands an accepted publish to the event loop. QoS 0, retained.
    fn forward_publish(&mut self, topic: &str, payload: String) {
        let Some(client) = self.transport.client() else {
            // The transport was torn down after the caller's pre-flight
            // check; accepted best-effort race, the message is dropped.
            debug!("publish to {topic} dropped, transport gone");
            return;
        };
        if let Err(err) = client.try_publish(topic, QoS::AtMostOnce, true, payload) {
            warn!("publish to {topic} not accepted: {err}");
            self.diag.log(&format!("publish error: {err}"));
        }
    }

    async fn handle_poll(&mut self, polled: Result<Event, ConnectionError>) {
        match polled {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    info!(
                        "broker accepted connection (session_present: {})",
                        ack.session_present
                    );
                    self.diag.log(&format!(
                        "connack: success, session_present: {}",
                        ack.session_present
                    ));
                    self.transition(ConnectionState::Connected, Some(StatusEvent::Connected));
                } else {
                    warn!("broker refused connection: {:?}", ack.code);
                    self.diag.log(&format!("connack: refused ({:?})", ack.code));
                    self.transition(ConnectionState::Error, Some(StatusEvent::Error));
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                self.diag.log("disconnect: closed by broker");
                if self.state == ConnectionState::Disconnecting {
                    self.finalize_close();
                } else {
                    warn!("broker closed the session");
                    self.notify(StatusEvent::Disconnected);
                    // The event loop reconnects on the next poll.
                    self.state = ConnectionState::Connecting;
                }
            }
            Ok(event) => trace!(?event, "mqtt event"),
            Err(err) => self.handle_transport_error(err).await,
        }
    }

    async fn handle_transport_error(&mut self, err: ConnectionError) {
        if self.state == ConnectionState::Disconnecting {
            // The close we requested took the transport down.
            self.diag.log("disconnect: transport closed");
            self.finalize_close();
            return;
        }

        self.diag.log(&format!("transport error: {err}"));
        match self.state {
            ConnectionState::Connected => {
                warn!("connection lost: {err}");
                self.notify(StatusEvent::Disconnected);
                self.state = ConnectionState::Connecting;
            }
            ConnectionState::Connecting => {
                warn!("connect attempt failed: {err}");
                self.transition(ConnectionState::Error, Some(StatusEvent::Error));
            }
            _ => debug!("transport error while {:?}: {err}", self.state),
        }
        // Pace the automatic retries; polling again reconnects.
        tokio::time::sleep(RETRY_PAUSE).await;
    }

    /// Drops the transport and reports the Disconnected state. Used when
    /// a requested close completes.
    fn finalize_close(&mut self) {
        self.transport = TransportVariant::None;
        self.live.store(false, Ordering::Release);
        self.transition(
            ConnectionState::Disconnected,
            Some(StatusEvent::Disconnected),
        );
    }

    /// Silent teardown for replacement and shutdown: best-effort close
    /// request, bounded drain of the close handshake, then drop the slot.
    async fn close_transport(&mut self) {
        let close_requested = match self.transport.client() {
            Some(client) => match client.try_disconnect() {
                Ok(()) => true,
                Err(err) => {
                    debug!("close request during teardown failed: {err}");
                    self.diag.log(&format!("close error: {err}"));
                    false
                }
            },
            None => false,
        };
        if close_requested {
            if let Some(event_loop) = self.transport.event_loop_mut() {
                let drained = tokio::time::timeout(CLOSE_FLUSH_LIMIT, async {
                    while event_loop.poll().await.is_ok() {}
                })
                .await;
                if drained.is_err() {
                    debug!("close handshake did not flush in time");
                }
            }
        }
        self.transport = TransportVariant::None;
        self.live.store(false, Ordering::Release);
        self.state = ConnectionState::Disconnected;
    }

    fn transition(&mut self, state: ConnectionState, notify: Option<StatusEvent>) {
        debug!(from = ?self.state, to = ?state, "connection state change");
        self.state = state;
        if let Some(event) = notify {
            self.notify(event);
        }
    }

    fn notify(&self, event: StatusEvent) {
        if self.status.try_send(event).is_err() {
            debug!("status observer unavailable, {event} dropped");
        }
    }
}
