//! Wires the poller, scheduler and delivery sink together.
//!
//! The scheduler and the sink each run on their own task and share one
//! cancellation token. Cancelling it stops the scheduler between rounds (or
//! aborts the in-flight round) and stops the sink without draining the queue.
use crate::feed::{DeliveryItem, Fetcher};
use crate::notify::{DeliverySink, Transport};
use crate::poll::{Poller, Scheduler, WatermarkStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Runtime parameters for [`spawn`].
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub feeds: Vec<String>,
    pub interval: Duration,
    pub queue_capacity: usize,
}

/// Handles to the running service tasks.
pub struct ServiceHandle {
    watermarks: Arc<WatermarkStore>,
    scheduler: JoinHandle<()>,
    sink: JoinHandle<usize>,
}

impl ServiceHandle {
    pub fn watermarks(&self) -> &Arc<WatermarkStore> {
        &self.watermarks
    }

    /// Waits for both tasks to finish and returns the number of items the
    /// sink consumed.
    pub async fn join(self) -> usize {
        if let Err(e) = self.scheduler.await {
            tracing::error!(error = %e, "Scheduler task failed");
        }
        match self.sink.await {
            Ok(consumed) => consumed,
            Err(e) => {
                tracing::error!(error = %e, "Delivery task failed");
                0
            }
        }
    }
}

/// Starts the scheduler and delivery sink on the current runtime.
///
/// Every feed's watermark starts at the time of this call, so entries already
/// published are never announced.
pub fn spawn(
    options: ServiceOptions,
    fetcher: Arc<dyn Fetcher>,
    transport: Arc<dyn Transport>,
    shutdown: CancellationToken,
) -> ServiceHandle {
    let (tx, rx) = mpsc::channel::<DeliveryItem>(options.queue_capacity.max(1));

    let poller = Poller::new(options.feeds, fetcher, tx);
    let watermarks = Arc::clone(poller.watermarks());
    let scheduler = Scheduler::new(poller, options.interval);

    tracing::info!(
        feeds = scheduler.poller().sources().len(),
        interval = ?options.interval,
        queue_capacity = options.queue_capacity,
        "Starting feed service"
    );

    let scheduler_shutdown = shutdown.clone();
    let scheduler = tokio::spawn(async move { scheduler.run(scheduler_shutdown).await });

    let sink = DeliverySink::new(transport);
    let sink = tokio::spawn(async move { sink.run(rx, shutdown).await });

    ServiceHandle {
        watermarks,
        scheduler,
        sink,
    }
}
