//! Path helpers shared by [`Url`](crate::Url) and the file sources.

/// Separator between the scheme and the path in the textual URL form.
pub const SCHEME_SEPARATOR: &str = "://";

/// Join two path fragments with exactly one `/` between them.
///
/// - Trailing slashes on `lhs` and leading slashes on `rhs` are collapsed
/// - Backslashes in `rhs` are treated as separators
/// - An empty side yields the other side unchanged
pub fn combine(lhs: &str, rhs: &str) -> String {
    let rhs = rhs.replace('\\', "/");
    if lhs.is_empty() {
        return rhs;
    }
    if rhs.is_empty() {
        return lhs.to_owned();
    }
    format!(
        "{}/{}",
        lhs.trim_end_matches(['/', '\\']),
        rhs.trim_start_matches('/')
    )
}

/// Split a textual URL into scheme and path.
///
/// Returns `None` if the text does not contain [`SCHEME_SEPARATOR`].
pub(crate) fn split_scheme(text: &str) -> Option<(&str, &str)> {
    text.find(SCHEME_SEPARATOR)
        .map(|pos| (&text[..pos], &text[pos + SCHEME_SEPARATOR.len()..]))
}
