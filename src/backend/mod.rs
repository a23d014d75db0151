//! Backend module for the live telemetry link
//!
//! The link runs in a separate thread so the UI never blocks on the
//! network. Decoded events reach the tick loop through a bounded crossbeam
//! channel in arrival order; requests travel back through a tokio channel
//! to the worker.
//!
//! # Architecture
//!
//! - [`LinkEvent`] - Messages delivered to the tick loop (status, config, state, sessions)
//! - [`LinkRequest`] - Requests sent to the server (stance, calibrate, session storage)
//! - [`LinkHandle`] - UI-side handle for polling events and sending requests
//! - [`LiveBackend`] - Entry point that owns the worker and spawns its thread
//! - [`LocalSource`] - Offline source answering session requests from a local store
//!
//! Both handles implement [`TelemetrySource`], the seam the controller is
//! written against.
//!
//! # Example
//!
//! ```ignore
//! use ridevis_rs::backend::{LiveBackend, TelemetrySource};
//! use ridevis_rs::config::LinkConfig;
//!
//! let (backend, mut link) = LiveBackend::new(LinkConfig::default());
//! let _thread = backend.spawn()?;
//!
//! while let Some(event) = link.poll_event() {
//!     // hand to the controller
//! }
//! ```

pub mod wire;
pub mod worker;

pub use wire::{ConfigMessage, InboundMessage, LinkRequest, RangesUpdate, StateMessage};
pub use worker::LinkWorker;

use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::VecDeque;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

use crate::config::LinkConfig;
use crate::error::{RideVisError, Result};
use crate::session::{Session, SessionStore, SessionSummary};
use crate::types::ConnectionStatus;

/// Capacity of the request channel into the worker
const COMMAND_CAPACITY: usize = 256;

/// Event delivered to the tick loop
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// Connection status changed
    Status(ConnectionStatus),
    /// Partial rider configuration update
    Config(ConfigMessage),
    /// Live telemetry reading
    State(StateMessage),
    /// A save request completed
    SessionSaved { id: Option<String> },
    /// Stored sessions, newest first
    SessionList(Vec<SessionSummary>),
    /// Full session in response to a load request
    SessionData {
        session: Box<Session>,
        id: Option<String>,
    },
    /// A delete request completed
    SessionDeleted { id: Option<String> },
    /// A request failed on the source side
    Error(String),
}

impl From<InboundMessage> for LinkEvent {
    fn from(message: InboundMessage) -> Self {
        match message {
            InboundMessage::Config(config) => LinkEvent::Config(config),
            InboundMessage::State(state) => LinkEvent::State(state),
            InboundMessage::SessionSaved { id } => LinkEvent::SessionSaved { id },
            InboundMessage::SessionList { sessions } => LinkEvent::SessionList(sessions),
            InboundMessage::SessionData { session, id } => LinkEvent::SessionData { session, id },
            InboundMessage::SessionDeleted { id } => LinkEvent::SessionDeleted { id },
        }
    }
}

/// Control messages for the worker
#[derive(Debug, Clone)]
pub enum LinkCommand {
    /// Forward a request to the server
    Request(LinkRequest),
    /// Connect, or no-op while connected
    Connect,
    /// Close the connection and stop reconnecting
    Disconnect,
    /// Stop the worker
    Shutdown,
}

/// Anything that delivers telemetry events and accepts requests
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySource {
    /// Next pending event without blocking
    fn poll_event(&mut self) -> Option<LinkEvent>;

    /// Queue a request; false if the source can no longer accept it
    fn send(&mut self, request: LinkRequest) -> bool;

    /// Turn the live connection on or off; false if the source has no live link
    fn set_live(&mut self, enabled: bool) -> bool;
}

// ==================== Live Link ====================

/// UI-side handle to the link worker
pub struct LinkHandle {
    /// Receiver for link events
    pub receiver: Receiver<LinkEvent>,
    /// Sender for commands to the worker
    pub command_sender: mpsc::Sender<LinkCommand>,
}

impl LinkHandle {
    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<LinkEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending events
    pub fn drain(&self) -> Vec<LinkEvent> {
        self.receiver.try_iter().collect()
    }

    /// Send a command to the worker
    pub fn send_command(&self, command: LinkCommand) -> bool {
        match self.command_sender.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Link command not delivered: {}", e);
                false
            }
        }
    }

    /// Queue a request for the server
    pub fn send_request(&self, request: LinkRequest) -> bool {
        self.send_command(LinkCommand::Request(request))
    }

    /// Request a connection (no-op while connected)
    pub fn connect(&self) -> bool {
        self.send_command(LinkCommand::Connect)
    }

    /// Close the connection and stop reconnecting
    pub fn disconnect(&self) -> bool {
        self.send_command(LinkCommand::Disconnect)
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        self.send_command(LinkCommand::Shutdown);
    }
}

impl TelemetrySource for LinkHandle {
    fn poll_event(&mut self) -> Option<LinkEvent> {
        self.try_recv()
    }

    fn send(&mut self, request: LinkRequest) -> bool {
        self.send_request(request)
    }

    fn set_live(&mut self, enabled: bool) -> bool {
        if enabled {
            self.connect()
        } else {
            self.disconnect()
        }
    }
}

/// The live link that runs in a separate thread
pub struct LiveBackend {
    config: LinkConfig,
    command_receiver: mpsc::Receiver<LinkCommand>,
    event_sender: Sender<LinkEvent>,
}

impl LiveBackend {
    /// Create the backend with its communication channels
    pub fn new(config: LinkConfig) -> (Self, LinkHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
        // Bounded for backpressure; the worker drops state samples rather than block
        let (event_tx, event_rx) = bounded(config.channel_capacity.max(1));

        let backend = Self {
            config,
            command_receiver: cmd_rx,
            event_sender: event_tx,
        };

        let handle = LinkHandle {
            receiver: event_rx,
            command_sender: cmd_tx,
        };

        (backend, handle)
    }

    /// Run the worker on the current thread until shutdown
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RideVisError::Link(format!("Failed to start link runtime: {}", e)))?;
        let worker = LinkWorker::new(self.config, self.command_receiver, self.event_sender);
        runtime.block_on(worker.run());
        Ok(())
    }

    /// Run the worker on a dedicated thread
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        let handle = std::thread::Builder::new()
            .name("ridevis-link".to_string())
            .spawn(move || {
                if let Err(e) = self.run() {
                    tracing::error!("Link worker failed: {}", e);
                }
            })?;
        Ok(handle)
    }
}

// ==================== Local Source ====================

/// Offline source backed by a session store.
///
/// Never produces live samples; answers session requests immediately.
pub struct LocalSource {
    store: Box<dyn SessionStore>,
    pending: VecDeque<LinkEvent>,
}

impl LocalSource {
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self {
            store,
            pending: VecDeque::new(),
        }
    }

    fn respond(&mut self, request: LinkRequest) -> LinkEvent {
        let result = match request {
            LinkRequest::ListSessions => self.store.list().map(LinkEvent::SessionList),
            LinkRequest::SaveSession { session } => self
                .store
                .save(&session)
                .map(|id| LinkEvent::SessionSaved { id: Some(id) }),
            LinkRequest::LoadSession { id } => self.store.load(&id).map(|session| {
                LinkEvent::SessionData {
                    session: Box::new(session),
                    id: Some(id),
                }
            }),
            LinkRequest::DeleteSession { id } => self
                .store
                .delete(&id)
                .map(|()| LinkEvent::SessionDeleted { id: Some(id) }),
            LinkRequest::SetStance { is_goofy } => Ok(LinkEvent::Config(ConfigMessage {
                is_goofy: Some(is_goofy),
                ..Default::default()
            })),
            LinkRequest::Calibrate => {
                return LinkEvent::Error("calibration needs a live source".to_string())
            }
        };
        result.unwrap_or_else(|e| {
            tracing::warn!("Local session request failed: {}", e);
            LinkEvent::Error(e.to_string())
        })
    }
}

impl TelemetrySource for LocalSource {
    fn poll_event(&mut self) -> Option<LinkEvent> {
        self.pending.pop_front()
    }

    fn send(&mut self, request: LinkRequest) -> bool {
        let event = self.respond(request);
        self.pending.push_back(event);
        true
    }

    fn set_live(&mut self, enabled: bool) -> bool {
        if enabled {
            tracing::info!("No live link configured, staying offline");
        }
        !enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;

    #[test]
    fn test_backend_creation() {
        let (_backend, handle) = LiveBackend::new(LinkConfig::default());
        assert!(handle.send_request(LinkRequest::ListSessions));
        assert!(handle.try_recv().is_none());
        assert!(handle.drain().is_empty());
    }

    #[test]
    fn test_handle_reports_closed_worker() {
        let (backend, handle) = LiveBackend::new(LinkConfig::default());
        drop(backend);
        assert!(!handle.send_request(LinkRequest::Calibrate));
    }

    #[test]
    fn test_local_source_round_trip() {
        let mut source = LocalSource::new(Box::new(MemorySessionStore::new()));
        assert!(source.poll_event().is_none());

        source.send(LinkRequest::ListSessions);
        assert_eq!(source.poll_event(), Some(LinkEvent::SessionList(Vec::new())));

        source.send(LinkRequest::LoadSession { id: "nope".into() });
        assert!(matches!(source.poll_event(), Some(LinkEvent::Error(_))));

        source.send(LinkRequest::SetStance { is_goofy: false });
        let Some(LinkEvent::Config(config)) = source.poll_event() else {
            panic!("expected config echo");
        };
        assert_eq!(config.is_goofy, Some(false));

        // Offline stays offline
        assert!(!source.set_live(true));
        assert!(source.set_live(false));
    }

    #[test]
    fn test_live_toggle_commands() {
        let (mut backend, mut handle) = LiveBackend::new(LinkConfig::default());
        assert!(handle.set_live(false));
        assert!(handle.set_live(true));
        assert!(matches!(backend.command_receiver.try_recv(), Ok(LinkCommand::Disconnect)));
        assert!(matches!(backend.command_receiver.try_recv(), Ok(LinkCommand::Connect)));
    }

    #[test]
    fn test_inbound_to_event() {
        let event = LinkEvent::from(InboundMessage::SessionDeleted {
            id: Some("a".into()),
        });
        assert_eq!(event, LinkEvent::SessionDeleted { id: Some("a".into()) });
    }
}
