use chrono::{DateTime, Utc};

/// A single entry from a fetched feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry title as it appears in the document (entities not yet decoded).
    pub title: String,
    /// Link to the entry; empty when the document carries none.
    pub link: String,
    /// Publication timestamp (falls back to the updated timestamp).
    pub published: DateTime<Utc>,
}

impl Entry {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        published: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published,
        }
    }
}

/// The result of one fetch: a feed title plus its entries, newest first.
///
/// Transient; a snapshot is diffed against the watermark and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedSnapshot {
    pub title: String,
    pub entries: Vec<Entry>,
}

impl FeedSnapshot {
    pub fn new(title: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            title: title.into(),
            entries,
        }
    }

    /// Timestamp of the first (most recent) entry, if any.
    pub fn newest(&self) -> Option<DateTime<Utc>> {
        self.entries.first().map(|e| e.published)
    }
}

/// A newly discovered entry on its way to the delivery sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryItem {
    /// Title of the feed the entry came from.
    pub feed_title: String,
    pub entry: Entry,
}
