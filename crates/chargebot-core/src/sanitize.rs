//! Markup sanitization for the platform's MarkdownV2 dialect.

/// Characters that must be escaped before the platform will parse a
/// message as MarkdownV2. Superset including structural punctuation.
const ESCAPED_CHARS: &str = "\\`*_{}[]()#+-.!|";

/// Characters removed entirely when a message has to be degraded to plain
/// text. Reduced set: only the emphasis/code markers.
const STRIPPED_CHARS: &str = "\\`*_|";

/// Insert an escape backslash before every reserved markup character.
///
/// Total over any input. Not idempotent: re-escaping doubles backslashes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if ESCAPED_CHARS.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Remove every reserved markup character from the input.
///
/// Used on the fallback path, where the goal is "make it render", not
/// "make it format". Idempotent.
pub fn strip(input: &str) -> String {
    input.chars().filter(|c| !STRIPPED_CHARS.contains(*c)).collect()
}
