use crate::feed::DeliveryItem;
use crate::notify::transport::Transport;
use crate::util::decode_entities;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Tag identifying feed notices among other bot output.
pub const NOTICE_TAG: &str = "FEED";

/// Renders the notice text for one delivered entry.
///
/// Feed and entry titles are HTML-entity-decoded; the link is passed through
/// unchanged.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use feedbell::feed::{DeliveryItem, Entry};
/// use feedbell::notify::format_notice;
///
/// let item = DeliveryItem {
///     feed_title: "Q&amp;A Weekly".to_string(),
///     entry: Entry::new("Tips &amp; tricks", "https://example.com/42", Utc::now()),
/// };
/// assert_eq!(
///     format_notice(&item),
///     "FEED -- Q&A Weekly new entry Tips & tricks: https://example.com/42"
/// );
/// ```
pub fn format_notice(item: &DeliveryItem) -> String {
    format!(
        "{} -- {} new entry {}: {}",
        NOTICE_TAG,
        decode_entities(&item.feed_title),
        decode_entities(&item.entry.title),
        item.entry.link
    )
}

/// Single consumer of discovered entries.
///
/// Every item becomes one notice per channel the transport currently reports.
pub struct DeliverySink {
    transport: Arc<dyn Transport>,
}

impl DeliverySink {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Sends one notice per current channel and returns how many succeeded.
    ///
    /// A failed send is logged and does not prevent the remaining channels
    /// from being notified.
    pub async fn deliver(&self, item: &DeliveryItem) -> usize {
        let text = format_notice(item);
        let channels = self.transport.channels().await;
        if channels.is_empty() {
            tracing::debug!(title = %item.entry.title, "No channels joined, notice dropped");
            return 0;
        }

        let mut sent = 0;
        for channel in &channels {
            match self.transport.send_notice(channel, &text).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::warn!(channel = %channel, error = %e, "Failed to send notice");
                }
            }
        }
        sent
    }

    /// Consumes items until the channel closes or `shutdown` fires.
    ///
    /// Returns the number of items consumed.
    pub async fn run(
        &self,
        mut rx: mpsc::Receiver<DeliveryItem>,
        shutdown: CancellationToken,
    ) -> usize {
        let mut consumed = 0;
        loop {
            let item = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                item = rx.recv() => item,
            };
            let Some(item) = item else {
                tracing::debug!("Delivery channel closed");
                break;
            };

            self.deliver(&item).await;
            consumed += 1;
        }
        consumed
    }
}
