//! Link worker
//!
//! Runs on its own thread inside a current-thread tokio runtime. The loop
//! connects, streams decoded lines into the event channel, writes queued
//! requests, and on any disconnect waits a fixed delay before trying
//! again.
//!
//! Requests are not queued across connections: anything still pending
//! when the connection drops is discarded.

use crossbeam_channel::{Sender, TrySendError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::config::LinkConfig;
use crate::types::ConnectionStatus;

use super::wire::{self, LinkRequest};
use super::{LinkCommand, LinkEvent};

/// Why a connected session ended
#[derive(Debug)]
enum SessionEnd {
    /// Server closed or the socket failed
    Lost(String),
    /// Explicit disconnect from the viewer
    Disconnected,
    /// Shutdown requested or every handle dropped
    Shutdown,
}

/// What to do after the reconnect delay
enum Wait {
    Reconnect,
    Idle,
    Shutdown,
}

/// Worker state owned by the link thread
pub struct LinkWorker {
    config: LinkConfig,
    commands: mpsc::Receiver<LinkCommand>,
    events: Sender<LinkEvent>,
    /// Cleared by an explicit disconnect; set again by connect
    enabled: bool,
    status: ConnectionStatus,
    dropped_events: u64,
}

impl LinkWorker {
    pub fn new(
        config: LinkConfig,
        commands: mpsc::Receiver<LinkCommand>,
        events: Sender<LinkEvent>,
    ) -> Self {
        let enabled = config.enabled;
        Self {
            config,
            commands,
            events,
            enabled,
            status: ConnectionStatus::Disconnected,
            dropped_events: 0,
        }
    }

    /// Deliver an event to the tick loop.
    ///
    /// Only live samples may be dropped when the channel is full; status,
    /// config and session replies wait for room.
    fn emit(&mut self, event: LinkEvent) {
        if !matches!(event, LinkEvent::State(_)) {
            let _ = self.events.send(event);
            return;
        }
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped_events += 1;
                if self.dropped_events.is_power_of_two() {
                    tracing::warn!(
                        "Link event channel full, {} state sample(s) dropped so far",
                        self.dropped_events
                    );
                }
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            self.status = status;
            self.emit(LinkEvent::Status(status));
        }
    }

    /// Main loop; returns on shutdown
    pub async fn run(mut self) {
        tracing::info!("Link worker started for {}", self.config.address());
        loop {
            if !self.enabled {
                match self.wait_for_connect().await {
                    Wait::Shutdown => break,
                    Wait::Reconnect | Wait::Idle => {}
                }
            }

            self.set_status(ConnectionStatus::Connecting);
            let address = self.config.address();
            let end = match TcpStream::connect(&address).await {
                Ok(stream) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!("set_nodelay failed: {}", e);
                    }
                    tracing::info!("Link connected to {}", address);
                    self.set_status(ConnectionStatus::Connected);
                    self.stream(stream).await
                }
                Err(e) => SessionEnd::Lost(format!("connect to {} failed: {}", address, e)),
            };

            self.set_status(ConnectionStatus::Disconnected);
            let dropped = self.discard_pending();
            if dropped > 0 {
                tracing::debug!("Dropped {} pending request(s) after disconnect", dropped);
            }

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Disconnected => {
                    tracing::info!("Link disconnected by request");
                    self.enabled = false;
                }
                SessionEnd::Lost(reason) => {
                    tracing::warn!(
                        "Link lost ({}), retrying in {:?}",
                        reason,
                        self.config.reconnect_delay()
                    );
                    match self.wait_reconnect().await {
                        Wait::Shutdown => break,
                        Wait::Idle => self.enabled = false,
                        Wait::Reconnect => {}
                    }
                }
            }
        }
        tracing::info!("Link worker stopped");
    }

    /// Pump one connection until it ends
    async fn stream(&mut self, stream: TcpStream) -> SessionEnd {
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.handle_line(&line),
                    Ok(None) => return SessionEnd::Lost("server closed the connection".to_string()),
                    Err(e) => return SessionEnd::Lost(e.to_string()),
                },
                command = self.commands.recv() => match command {
                    Some(LinkCommand::Request(request)) => {
                        if let Err(reason) = write_request(&mut write_half, &request).await {
                            return SessionEnd::Lost(reason);
                        }
                    }
                    Some(LinkCommand::Connect) => {
                        tracing::debug!("Connect requested while connected, ignoring");
                    }
                    Some(LinkCommand::Disconnect) => return SessionEnd::Disconnected,
                    Some(LinkCommand::Shutdown) | None => return SessionEnd::Shutdown,
                },
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        match wire::decode_inbound(line) {
            Ok(message) => self.emit(LinkEvent::from(message)),
            Err(e) => tracing::warn!("Skipping malformed link message: {}", e),
        }
    }

    /// Drop queued requests; control commands still take effect
    fn discard_pending(&mut self) -> usize {
        let mut dropped = 0;
        loop {
            match self.commands.try_recv() {
                Ok(LinkCommand::Request(_)) => dropped += 1,
                Ok(LinkCommand::Disconnect) => self.enabled = false,
                Ok(LinkCommand::Connect) => self.enabled = true,
                Ok(LinkCommand::Shutdown) => {
                    // The next wait sees the closed channel and exits
                    self.enabled = false;
                    self.commands.close();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        dropped
    }

    /// Fixed reconnect delay, still honouring control commands
    async fn wait_reconnect(&mut self) -> Wait {
        let sleep = tokio::time::sleep(self.config.reconnect_delay());
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Wait::Reconnect,
                command = self.commands.recv() => match command {
                    Some(LinkCommand::Connect) => return Wait::Reconnect,
                    Some(LinkCommand::Disconnect) => return Wait::Idle,
                    Some(LinkCommand::Request(request)) => {
                        tracing::debug!("Not connected, dropping '{}' request", request.action());
                    }
                    Some(LinkCommand::Shutdown) | None => return Wait::Shutdown,
                },
            }
        }
    }

    /// Block until a connect (or shutdown) arrives
    async fn wait_for_connect(&mut self) -> Wait {
        loop {
            match self.commands.recv().await {
                Some(LinkCommand::Connect) => {
                    self.enabled = true;
                    return Wait::Reconnect;
                }
                Some(LinkCommand::Disconnect) => {}
                Some(LinkCommand::Request(request)) => {
                    tracing::debug!("Link disabled, dropping '{}' request", request.action());
                }
                Some(LinkCommand::Shutdown) | None => return Wait::Shutdown,
            }
        }
    }
}

async fn write_request(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    request: &LinkRequest,
) -> Result<(), String> {
    let line = match wire::encode_line(request) {
        Ok(line) => line,
        Err(e) => {
            tracing::error!("Failed to encode '{}' request: {}", request.action(), e);
            return Ok(());
        }
    };
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| format!("write failed: {}", e))?;
    tracing::debug!("Sent '{}' request", request.action());
    Ok(())
}
