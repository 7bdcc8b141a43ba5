//! Delivery of discovered entries to chat channels.
//!
//! - [`DeliverySink`] drains the poller's channel and fans each entry out to
//!   every channel the [`Transport`] currently reports
//! - [`IrcTransport`] speaks to an IRC server; [`ConsoleTransport`] prints to
//!   stdout for dry runs

mod console;
mod irc;
mod sink;
mod transport;

pub use console::ConsoleTransport;
pub use irc::{connect as connect_irc, IrcSession, IrcSettings, IrcTransport};
pub use sink::{format_notice, DeliverySink, NOTICE_TAG};
pub use transport::{Transport, TransportError};
