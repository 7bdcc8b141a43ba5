use crate::feed::types::{Entry, FeedSnapshot};
use feed_rs::parser;
use thiserror::Error;

/// Title used for entries that carry none.
const UNTITLED: &str = "Untitled";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid feed document: {0}")]
    Invalid(#[from] parser::ParseFeedError),
}

/// Parsed feed plus the number of entries that had to be dropped.
#[derive(Debug)]
pub struct ParseResult {
    pub snapshot: FeedSnapshot,
    /// Entries without any publication or update timestamp.
    pub skipped: usize,
}

/// Parses an RSS or Atom document into a [`FeedSnapshot`].
///
/// Entry order is kept as written in the document, which for well-behaved
/// feeds is newest first. Entries with neither a published nor an updated
/// timestamp cannot be compared against a watermark and are skipped.
pub fn parse_feed(bytes: &[u8]) -> Result<ParseResult, ParseError> {
    let feed = parser::parse(bytes)?;

    let title = feed.title.map(|t| t.content).unwrap_or_default();

    let mut skipped = 0;
    let entries: Vec<Entry> = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let Some(published) = entry.published.or(entry.updated) else {
                skipped += 1;
                return None;
            };
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| UNTITLED.to_string());

            Some(Entry {
                title,
                link,
                published,
            })
        })
        .collect();

    Ok(ParseResult {
        snapshot: FeedSnapshot { title, entries },
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example &amp; Co</title>
    <item>
        <title>Second post</title>
        <link>https://example.com/2</link>
        <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
        <title>First post</title>
        <link>https://example.com/1</link>
        <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    </item>
</channel></rss>"#;

    #[test]
    fn test_parse_rss_keeps_document_order() {
        let result = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(result.skipped, 0);
        assert_eq!(result.snapshot.title, "Example & Co");
        assert_eq!(
            result.snapshot.entries,
            vec![
                Entry::new(
                    "Second post",
                    "https://example.com/2",
                    Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()
                ),
                Entry::new(
                    "First post",
                    "https://example.com/1",
                    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
                ),
            ]
        );
    }

    #[test]
    fn test_parse_atom_uses_updated_when_no_published() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Atom Feed</title>
    <id>urn:example</id>
    <updated>2024-03-01T12:00:00Z</updated>
    <entry>
        <title>Atom entry</title>
        <id>urn:example:1</id>
        <link href="https://example.com/atom/1"/>
        <updated>2024-03-01T12:00:00Z</updated>
    </entry>
</feed>"#;
        let result = parse_feed(atom.as_bytes()).unwrap();
        assert_eq!(result.snapshot.title, "Atom Feed");
        assert_eq!(result.snapshot.entries.len(), 1);
        let entry = &result.snapshot.entries[0];
        assert_eq!(entry.link, "https://example.com/atom/1");
        assert_eq!(
            entry.published,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_dateless_entries_are_skipped() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Mixed</title>
    <item><title>No date</title><link>https://example.com/x</link></item>
    <item>
        <title>Dated</title>
        <link>https://example.com/y</link>
        <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    </item>
</channel></rss>"#;
        let result = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.snapshot.entries.len(), 1);
        assert_eq!(result.snapshot.entries[0].title, "Dated");
    }

    #[test]
    fn test_missing_title_and_link_defaults() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Sparse</title>
    <item><pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate><description>x</description></item>
</channel></rss>"#;
        let result = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(result.snapshot.entries[0].title, UNTITLED);
        assert_eq!(result.snapshot.entries[0].link, "");
    }

    #[test]
    fn test_empty_channel() {
        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
        let result = parse_feed(rss.as_bytes()).unwrap();
        assert!(result.snapshot.entries.is_empty());
        assert_eq!(result.snapshot.newest(), None);
    }

    #[test]
    fn test_malformed_document_is_error() {
        let result = parse_feed(b"<not valid xml");
        assert!(matches!(result, Err(ParseError::Invalid(_))));
    }
}
