use std::borrow::Cow;

/// Decodes HTML character references in feed-supplied text.
///
/// Uses the full HTML5 entity table, including the legacy names that may
/// appear without a trailing semicolon (`&amp`, `&lt`). Numeric references in
/// the C1 range map to their Windows-1252 characters; references that name no
/// valid scalar value decode to U+FFFD. Unknown names are left as written.
///
/// Returns `Cow::Borrowed` when the input contains no `&`.
///
/// # Examples
///
/// ```
/// use feedbell::util::decode_entities;
///
/// assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
/// assert_eq!(decode_entities("It&#8217;s"), "It\u{2019}s");
/// assert_eq!(decode_entities("&bogus;"), "&bogus;");
/// ```
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    htmlize::unescape(s)
}
