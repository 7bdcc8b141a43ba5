use crate::feed::{DeliveryItem, Entry, Fetcher};
use crate::poll::watermark::WatermarkStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Summary of one polling round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Number of configured sources polled
    pub sources: usize,
    /// Sources whose fetch failed, was cancelled, or whose task panicked
    pub failed: usize,
    /// Entries handed to the delivery sink
    pub delivered: usize,
}

/// What happened to a single source during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceOutcome {
    Polled { delivered: usize },
    Failed,
    Cancelled,
}

/// Returns the leading run of `entries` published strictly after `latest`.
///
/// `entries` is expected newest first, so the walk stops at the first entry
/// that is not newer than the watermark. If a feed lists entries out of
/// order, newer entries after that point are not returned.
pub fn new_entries(entries: &[Entry], latest: DateTime<Utc>) -> &[Entry] {
    let fresh = entries
        .iter()
        .take_while(|entry| entry.published > latest)
        .count();
    &entries[..fresh]
}

/// Runs polling rounds over a fixed set of feeds.
///
/// Each round fetches every feed concurrently, forwards entries newer than the
/// feed's watermark to the delivery channel, then moves the watermark to the
/// newest entry of the snapshot.
pub struct Poller {
    sources: Arc<[String]>,
    fetcher: Arc<dyn Fetcher>,
    watermarks: Arc<WatermarkStore>,
    delivery_tx: mpsc::Sender<DeliveryItem>,
}

impl Poller {
    /// Creates a poller whose watermarks all start at the current time.
    pub fn new(
        sources: Vec<String>,
        fetcher: Arc<dyn Fetcher>,
        delivery_tx: mpsc::Sender<DeliveryItem>,
    ) -> Self {
        let watermarks = Arc::new(WatermarkStore::new(sources.iter().cloned(), Utc::now()));
        Self::with_watermarks(sources, fetcher, watermarks, delivery_tx)
    }

    /// Creates a poller over an existing watermark store.
    pub fn with_watermarks(
        sources: Vec<String>,
        fetcher: Arc<dyn Fetcher>,
        watermarks: Arc<WatermarkStore>,
        delivery_tx: mpsc::Sender<DeliveryItem>,
    ) -> Self {
        Self {
            sources: sources.into(),
            fetcher,
            watermarks,
            delivery_tx,
        }
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn watermarks(&self) -> &Arc<WatermarkStore> {
        &self.watermarks
    }

    /// Polls every source once and waits for all of them to finish.
    ///
    /// One task is spawned per source. The round completes only when every
    /// task has finished, whether it delivered entries, found nothing new,
    /// failed, or was cancelled. A failure in one source never affects the
    /// others.
    pub async fn run_round(&self, shutdown: &CancellationToken) -> RoundReport {
        let mut tasks = JoinSet::new();

        for source in self.sources.iter() {
            let source = source.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let watermarks = Arc::clone(&self.watermarks);
            let delivery_tx = self.delivery_tx.clone();
            let shutdown = shutdown.clone();

            tasks.spawn(async move {
                diff_source(
                    &source,
                    fetcher.as_ref(),
                    &watermarks,
                    &delivery_tx,
                    &shutdown,
                )
                .await
            });
        }

        let mut report = RoundReport {
            sources: self.sources.len(),
            ..RoundReport::default()
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(SourceOutcome::Polled { delivered }) => report.delivered += delivered,
                Ok(SourceOutcome::Failed) | Ok(SourceOutcome::Cancelled) => report.failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "Feed poll task panicked");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

/// Fetches one source, forwards its new entries, and advances its watermark.
async fn diff_source(
    source: &str,
    fetcher: &dyn Fetcher,
    watermarks: &WatermarkStore,
    delivery_tx: &mpsc::Sender<DeliveryItem>,
    shutdown: &CancellationToken,
) -> SourceOutcome {
    let fetched = tokio::select! {
        biased;
        _ = shutdown.cancelled() => return SourceOutcome::Cancelled,
        result = fetcher.fetch(source) => result,
    };

    let snapshot = match fetched {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(feed = %source, error = %e, "Feed fetch failed");
            return SourceOutcome::Failed;
        }
    };

    let Some(latest) = watermarks.get(source).await else {
        tracing::warn!(feed = %source, "No watermark for feed, skipping");
        return SourceOutcome::Failed;
    };

    let mut delivered = 0;
    for entry in new_entries(&snapshot.entries, latest) {
        tracing::debug!(
            feed = %source,
            title = %entry.title,
            published = %entry.published,
            "New feed entry"
        );
        let item = DeliveryItem {
            feed_title: snapshot.title.clone(),
            entry: entry.clone(),
        };
        if delivery_tx.send(item).await.is_err() {
            tracing::warn!(feed = %source, "Delivery channel closed, dropping remaining entries");
            break;
        }
        delivered += 1;
    }

    // Refresh to the newest entry even when nothing was new
    if let Some(newest) = snapshot.newest() {
        watermarks.set(source, newest).await;
    }

    SourceOutcome::Polled { delivered }
}
