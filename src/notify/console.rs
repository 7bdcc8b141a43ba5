use crate::notify::transport::{Transport, TransportError};
use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

/// Writes notices to stdout instead of a chat server (`--dry-run`).
pub struct ConsoleTransport {
    channels: Vec<String>,
    out: Mutex<Stdout>,
}

impl ConsoleTransport {
    pub fn new(channels: Vec<String>) -> Self {
        Self {
            channels,
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn channels(&self) -> Vec<String> {
        self.channels.clone()
    }

    async fn send_notice(&self, channel: &str, text: &str) -> Result<(), TransportError> {
        let line = format!("[{channel}] {text}\n");
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }
}
