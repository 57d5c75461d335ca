use thiserror::Error;

/// All errors generated in `arb-scanner-tui`.
///
/// None of these are fatal to the dashboard. Transport errors end the current
/// session and feed the reconnect policy; malformed payloads are dropped and
/// persistence failures are logged by whoever triggered the write.
#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("failed to decode stream event: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("preferences error: {0}")]
    Preferences(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ScannerError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(value))
    }
}
