//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **Duration parsing**: interval strings such as `"0h15m"` from the config file
//! - **HTML entities**: decoding character references in feed titles
//!
//! # Examples
//!
//! ```
//! use feedbell::util::{decode_entities, parse_duration};
//!
//! let interval = parse_duration("0h15m").unwrap();
//! assert_eq!(interval.as_secs(), 900);
//!
//! assert_eq!(decode_entities("Q&amp;A"), "Q&A");
//! ```

mod duration;
mod html;

pub use duration::{parse_duration, DurationError};
pub use html::decode_entities;
