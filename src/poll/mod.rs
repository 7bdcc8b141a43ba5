//! The polling engine: watermarks, rounds, and the interval loop.
//!
//! - [`watermark`] - per-feed timestamp of the newest delivered entry
//! - [`poller`] - one round: concurrent fetch-and-diff over every feed
//! - [`scheduler`] - sleep-then-poll loop with a shutdown token
//!
//! New entries leave the engine through a `tokio::sync::mpsc` channel of
//! [`DeliveryItem`](crate::feed::DeliveryItem)s; the consumer lives in
//! [`crate::notify`].

mod poller;
mod scheduler;
mod watermark;

pub use poller::{new_entries, Poller, RoundReport};
pub use scheduler::{Scheduler, DEFAULT_POLL_INTERVAL};
pub use watermark::WatermarkStore;
