//! Response sanitizer.
//!
//! The room's chat transport only renders printable ASCII and a handful of
//! currency symbols, so model output is narrowed to that set before sending.

const EURO: char = '\u{20AC}';
const POUND: char = '\u{00A3}';
const YEN: char = '\u{00A5}';

/// Whether `c` survives [`clean`]
pub fn is_allowed(c: char) -> bool {
    matches!(c, ' '..='~') || c == EURO || c == POUND || c == YEN
}

/// Drop every character the chat transport cannot carry
pub fn clean(text: &str) -> String {
    text.chars().filter(|c| is_allowed(*c)).collect()
}
