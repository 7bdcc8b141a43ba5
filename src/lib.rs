//! feedbell polls RSS and Atom feeds and announces new entries as chat
//! notices.
//!
//! A [`poll::Scheduler`] runs a polling round every interval. Each round
//! fetches all feeds concurrently and forwards entries newer than the feed's
//! watermark to a [`notify::DeliverySink`], which sends one notice per joined
//! channel.

pub mod config;
pub mod feed;
pub mod notify;
pub mod poll;
pub mod service;
pub mod util;
