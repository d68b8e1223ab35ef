//! Splitting replies into transport-sized chunks

/// Per-message character budget of the room chat
pub const DEFAULT_CHUNK_SIZE: usize = 95;

/// Split `text` into consecutive pieces of at most `max_chars` code points.
///
/// Order is preserved and the last piece may be shorter. Empty text, or a
/// zero budget, yields no chunks.
#[must_use]
pub fn split(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(text.len() / max_chars + 1);
    let mut current = String::new();
    let mut count = 0;

    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
