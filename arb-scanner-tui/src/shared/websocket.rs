/// WebSocket Connection Manager for the scanner feed
///
/// Owns the transport socket, decodes inbound frames into typed events and
/// applies the exponential reconnect policy. Every `connect()` starts a new
/// connection generation; a superseded loop notices the generation change and
/// exits without touching status or forwarding events.
use crate::shared::config::{BackoffPolicy, ConnectionConfig};
use crate::shared::error::ScannerError;
use crate::shared::types::{parse_event, InboundEvent};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

/// Connection status updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Error => "Error",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// Attempt counter driving the [`BackoffPolicy`]
#[derive(Debug, Clone)]
pub struct ReconnectState {
    policy: BackoffPolicy,
    attempts: u32,
}

impl ReconnectState {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Register a failed/closed connection and return the delay before the
    /// next attempt, or `None` once the attempt ceiling has been reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.policy.delay_for(self.attempts))
    }

    /// Successful open: a transient outage must not escalate future delays
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }
}

/// Shared generation counter used to retire superseded connection loops
#[derive(Debug, Clone, Default)]
struct Generation(Arc<AtomicU64>);

impl Generation {
    fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.0.load(Ordering::SeqCst) == generation
    }
}

/// Connection Manager for the scanner feed
pub struct ConnectionManager {
    config: ConnectionConfig,
    generation: Generation,
    task: Option<JoinHandle<()>>,
    event_tx: mpsc::Sender<InboundEvent>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl ConnectionManager {
    /// Create a manager; returns the receivers for decoded events and status updates.
    /// Nothing is opened until [`Self::connect`] is called.
    pub fn new(
        config: ConnectionConfig,
    ) -> (
        Self,
        mpsc::Receiver<InboundEvent>,
        watch::Receiver<ConnectionStatus>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(config.channel_buffer_size.max(1));
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);

        let manager = Self {
            config,
            generation: Generation::default(),
            task: None,
            event_tx,
            status_tx,
        };

        (manager, event_rx, status_rx)
    }

    /// Open a fresh connection, superseding any running loop and any pending
    /// reconnect timer. Must be called from within a tokio runtime.
    pub fn connect(&mut self) {
        let generation = self.generation.advance();
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let link = LoopLink {
            generation,
            current: self.generation.clone(),
            event_tx: self.event_tx.clone(),
            status_tx: self.status_tx.clone(),
        };
        let config = self.config.clone();

        self.task = Some(tokio::spawn(async move {
            run_connection_loop(config, link).await;
        }));
    }

    /// Stop the running loop (if any) and report `Disconnected`
    pub fn shutdown(&mut self) {
        self.generation.advance();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.status_tx.send_replace(ConnectionStatus::Disconnected);
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Everything a connection loop needs to talk back to its manager
struct LoopLink {
    generation: u64,
    current: Generation,
    event_tx: mpsc::Sender<InboundEvent>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl LoopLink {
    fn is_current(&self) -> bool {
        self.current.is_current(self.generation)
    }

    fn set_status(&self, status: ConnectionStatus) -> bool {
        if !self.is_current() {
            return false;
        }
        self.status_tx.send_replace(status);
        true
    }
}

/// How a single socket session ended
enum SessionEnd {
    Closed,
    Failed(ScannerError),
    /// Event receiver dropped or generation superseded: stop for good
    Abandoned,
}

/// Main connection loop with exponential reconnect
async fn run_connection_loop(config: ConnectionConfig, link: LoopLink) {
    info!(url = %config.url, generation = link.generation, "Starting connection manager");
    let mut reconnect = ReconnectState::new(config.backoff.clone());

    loop {
        if !link.set_status(ConnectionStatus::Connecting) {
            return;
        }

        let end = match open_stream(&config.url).await {
            Ok(ws_stream) => {
                if !link.set_status(ConnectionStatus::Connected) {
                    return;
                }
                info!(url = %config.url, "Connected to scanner feed");
                reconnect.reset();
                run_session(ws_stream, &config, &link).await
            }
            Err(e) => SessionEnd::Failed(e),
        };

        match end {
            SessionEnd::Abandoned => return,
            SessionEnd::Closed => {
                if !link.set_status(ConnectionStatus::Disconnected) {
                    return;
                }
            }
            SessionEnd::Failed(e) => {
                error!(url = %config.url, error = %e, "Connection failed");
                if !link.set_status(ConnectionStatus::Error) {
                    return;
                }
            }
        }

        match reconnect.next_delay() {
            Some(delay) => {
                info!(
                    attempt = reconnect.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnect"
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                warn!(
                    attempts = reconnect.attempts(),
                    "Reconnect attempts exhausted, waiting for manual reconnect"
                );
                link.set_status(ConnectionStatus::Disconnected);
                return;
            }
        }
    }
}

async fn open_stream(url: &str) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>, ScannerError> {
    let (ws_stream, _) = connect_async(url).await?;
    Ok(ws_stream)
}

async fn run_session<S>(
    ws_stream: WebSocketStream<S>,
    config: &ConnectionConfig,
    link: &LoopLink,
) -> SessionEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (mut write, mut read) = ws_stream.split();

    // Spawn ping task to keep connection alive
    let ping_interval = config.ping_interval;
    let (ping_shutdown_tx, mut ping_shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ping_interval);
        // first tick completes immediately
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if write.send(Message::Ping(vec![].into())).await.is_err() {
                        debug!("Failed to send ping, connection likely dead");
                        break;
                    }
                }
                _ = ping_shutdown_rx.recv() => {
                    let _ = write.close().await;
                    break;
                }
            }
        }
    });

    let end = loop {
        let Some(msg) = read.next().await else {
            break SessionEnd::Closed;
        };
        if !link.is_current() {
            break SessionEnd::Abandoned;
        }

        match msg {
            Ok(Message::Text(text)) => match parse_event(&text) {
                Ok(event) => {
                    let inbound = InboundEvent::new(event, Utc::now().timestamp_millis());
                    if link.event_tx.send(inbound).await.is_err() {
                        warn!("Event receiver dropped, stopping connection manager");
                        break SessionEnd::Abandoned;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Dropping malformed message");
                    debug!("Raw message: {}", text.as_str());
                }
            },
            Ok(Message::Close(_)) => {
                info!("Server closed connection");
                break SessionEnd::Closed;
            }
            Ok(_) => {
                // Ping/Pong/Binary frames carry no events
            }
            Err(e) => break SessionEnd::Failed(e.into()),
        }
    };

    let _ = ping_shutdown_tx.send(()).await;
    end
}
