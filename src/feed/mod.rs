//! Feed retrieval: fetching documents and decoding them into snapshots.
//!
//! - [`types`] - `Entry`, `FeedSnapshot` and `DeliveryItem`
//! - [`parser`] - RSS/Atom decoding using the `feed-rs` crate
//! - [`fetcher`] - the [`Fetcher`] seam and its HTTP implementation
//!
//! # Example
//!
//! ```ignore
//! use feedbell::feed::{Fetcher, HttpFetcher, DEFAULT_USER_AGENT};
//!
//! let fetcher = HttpFetcher::build(DEFAULT_USER_AGENT, None)?;
//! let snapshot = fetcher.fetch("https://example.com/feed.xml").await?;
//! println!("{} has {} entries", snapshot.title, snapshot.entries.len());
//! ```

mod fetcher;
mod parser;
mod types;

pub use fetcher::{FetchError, Fetcher, HttpFetcher, DEFAULT_USER_AGENT};
pub use parser::{parse_feed, ParseError, ParseResult};
pub use types::{DeliveryItem, Entry, FeedSnapshot};
