//! # MQTT Connection Module
//!
//! Publish-only MQTT client for the sensor bridge: an asynchronous,
//! reconnecting, TLS-or-plain connection with an observable state machine
//! and best-effort publish.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── config.rs      - Connection parameters and broker URL parsing
//! ├── status.rs      - Connection state and host-facing status tokens
//! ├── manager.rs     - Clonable public handle (connect/disconnect/publish)
//! └── connection.rs  - Worker task: transport variant, event loop, state machine
//! ```
//!
//! ## Design
//!
//! - **Single worker task**: all transport operations and every state
//!   transition execute on one task; public methods dispatch commands to
//!   it and return immediately. Command order is FIFO, so a publish
//!   issued after a disconnect is processed after that disconnect begins.
//! - **One live transport**: the worker owns a tagged transport slot
//!   (none, plain TCP, or TLS); constructing a new variant destroys the
//!   previous one, so two connect attempts are never in flight at once.
//! - **Best-effort delivery**: publishes are QoS 0 and retained; the
//!   boolean a caller gets back means "accepted for send". Failures are
//!   logged and reported through status tokens, never raised across the
//!   public boundary.
//! - **Diagnostics**: transport-level events (connacks, disconnects,
//!   errors) are appended to the size-bounded [`crate::diaglog`] file.

pub mod config;
mod connection;
pub mod manager;
pub mod status;

pub use config::{BrokerUrl, ConnectError, ConnectionConfig, ManagerSettings, UrlError};
pub use manager::ConnectionManager;
pub use status::{ConnectionState, StatusEvent};
