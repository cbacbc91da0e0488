//! Line-limit truncation of snapshot text.

use dp_config::OutputLimit;

/// Keep everything up to and including the `n`-th `'\n'`.
///
/// Text with fewer than `n` newlines is returned whole; content after the
/// last newline is only kept in that case.
pub fn truncate(text: &str, limit: OutputLimit) -> &str {
    let OutputLimit::Lines(n) = limit else {
        return text;
    };
    if n == 0 {
        return "";
    }
    match text.match_indices('\n').nth(n - 1) {
        Some((pos, _)) => &text[..=pos],
        None => text,
    }
}
