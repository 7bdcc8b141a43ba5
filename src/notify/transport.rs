use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection to the chat server is gone
    #[error("Connection closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server sent an ERROR line
    #[error("Server error: {0}")]
    Server(String),
}

/// Outbound side of a chat connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Channels notices should currently go to.
    ///
    /// The set may change while the service runs, so callers ask again for
    /// every notification instead of caching it.
    async fn channels(&self) -> Vec<String>;

    /// Sends one notice to one channel.
    async fn send_notice(&self, channel: &str, text: &str) -> Result<(), TransportError>;
}
