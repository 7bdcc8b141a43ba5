use crate::poll::poller::Poller;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default interval between polling rounds (15 minutes).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Drives polling rounds at a fixed interval until shutdown.
///
/// The loop sleeps first and polls second, so the first round happens one
/// full interval after startup. Rounds never overlap: the next sleep only
/// begins once every task of the previous round has finished.
pub struct Scheduler {
    poller: Poller,
    interval: Duration,
}

impl Scheduler {
    pub fn new(poller: Poller, interval: Duration) -> Self {
        Self { poller, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Runs rounds until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            feeds = self.poller.sources().len(),
            "Feed poller started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            let report = self.poller.run_round(&shutdown).await;
            tracing::info!(
                feeds = report.sources,
                failed = report.failed,
                delivered = report.delivered,
                "Polling round complete"
            );
        }

        tracing::info!("Feed poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{DeliveryItem, Entry, FeedSnapshot, FetchError, Fetcher};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    const FEED: &str = "https://example.com/feed.xml";

    /// Records how many fetches are in flight at once and how many started.
    struct SlowFetcher {
        delay: Duration,
        started: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl SlowFetcher {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                started: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(&self, _url: &str) -> Result<FeedSnapshot, FetchError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(FeedSnapshot::new(
                "Slow",
                vec![Entry::new(
                    "fresh",
                    "https://example.com/1",
                    Utc::now() + chrono::Duration::seconds(1),
                )],
            ))
        }
    }

    fn scheduler(
        fetcher: Arc<SlowFetcher>,
        sources: &[&str],
        interval: Duration,
    ) -> (Scheduler, mpsc::Receiver<DeliveryItem>) {
        let (tx, rx) = mpsc::channel(64);
        let poller = Poller::new(sources.iter().map(|s| s.to_string()).collect(), fetcher, tx);
        (Scheduler::new(poller, interval), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_round_waits_one_interval() {
        let fetcher = Arc::new(SlowFetcher::new(Duration::ZERO));
        let (scheduler, _rx) = scheduler(fetcher.clone(), &[FEED], Duration::from_secs(60));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { scheduler.run(shutdown).await }
        });

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 2);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rounds_never_overlap() {
        // Each fetch outlasts the interval
        let fetcher = Arc::new(SlowFetcher::new(Duration::from_secs(25)));
        let (scheduler, _rx) = scheduler(fetcher.clone(), &[FEED], Duration::from_secs(10));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { scheduler.run(shutdown).await }
        });

        // Rounds start at t=10, t=45 and t=80
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 3);
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sources_in_a_round_run_concurrently() {
        let fetcher = Arc::new(SlowFetcher::new(Duration::from_secs(30)));
        let sources = ["https://a.example/rss", "https://b.example/rss", "https://c.example/rss"];
        let (scheduler, mut rx) = scheduler(fetcher.clone(), &sources, Duration::from_secs(10));

        let started = tokio::time::Instant::now();
        let report = scheduler
            .poller()
            .run_round(&CancellationToken::new())
            .await;

        assert_eq!(report.delivered, 3);
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 3);
        // Concurrent: one fetch delay, not three
        assert!(started.elapsed() < Duration::from_secs(60));
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_sleep_stops_promptly() {
        let fetcher = Arc::new(SlowFetcher::new(Duration::ZERO));
        let (scheduler, _rx) = scheduler(fetcher.clone(), &[FEED], Duration::from_secs(3600));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        scheduler.run(shutdown).await;
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_round_ends_loop() {
        let fetcher = Arc::new(SlowFetcher::new(Duration::from_secs(600)));
        let (scheduler, _rx) = scheduler(fetcher.clone(), &[FEED], Duration::from_secs(10));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { scheduler.run(shutdown).await }
        });

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[test]
    fn test_default_interval_is_fifteen_minutes() {
        assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_secs(900));
    }
}
