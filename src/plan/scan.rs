//! Brace-balanced object scanning over free text.
//!
//! Balance is tracked by counting nested braces while skipping over quoted
//! strings (double or single quoted), so braces inside item names never
//! close an object early.

use std::ops::Range;

/// Byte span of the balanced object starting at the `{` at `open`.
///
/// Returns `None` if `open` is not a `{` or the object never closes
/// (truncated text).
pub fn balanced_object_at(text: &str, open: usize) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open..i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index just past the closing quote of the string opening at `start`.
///
/// A single quote that is not followed by a matching close before the end of
/// the line is treated as a literal apostrophe.
fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i + 1),
            b'\n' if quote == b'\'' => return Some(start + 1),
            _ => i += 1,
        }
    }
    if quote == b'\'' {
        Some(start + 1)
    } else {
        None
    }
}

/// Quoted keys directly inside the object `object` (which must start with `{`).
///
/// A key is a quoted string followed, after optional whitespace, by a colon
/// at nesting depth one.
pub fn top_level_keys(object: &str) -> Vec<String> {
    let bytes = object.as_bytes();
    let mut keys = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let end = match skip_string(bytes, i) {
                    Some(end) => end,
                    None => break,
                };
                if depth == 1 && end > i + 1 && followed_by_colon(bytes, end) {
                    keys.push(object[i + 1..end - 1].to_string());
                }
                i = end;
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    keys
}

fn followed_by_colon(bytes: &[u8], mut i: usize) -> bool {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    bytes.get(i) == Some(&b':')
}

/// Every balanced object in `text`, in order of opening brace.
///
/// Each `{` is scanned independently, so a brace inside a string still opens
/// its own candidate. Quadratic in the worst case (a long truncated reply full
/// of unclosed braces), which is fine at model-reply sizes.
pub fn balanced_objects(text: &str) -> Vec<Range<usize>> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(|(i, _)| balanced_object_at(text, i))
        .collect()
}

/// Targeted extraction.
///
/// Picks the smallest balanced object whose own keys include both `files` and
/// `folders`. Without one, falls back to the first (outermost) balanced
/// object holding at least two quoted key/value pairs.
pub fn find_plan_object(text: &str) -> Option<&str> {
    let candidates: Vec<(Range<usize>, Vec<String>)> = balanced_objects(text)
        .into_iter()
        .map(|span| {
            let keys = top_level_keys(&text[span.clone()]);
            (span, keys)
        })
        .filter(|(_, keys)| keys.len() >= 2)
        .collect();

    let preferred = candidates
        .iter()
        .filter(|(_, keys)| {
            keys.iter().any(|k| k == "files") && keys.iter().any(|k| k == "folders")
        })
        .min_by_key(|(span, _)| span.len());

    preferred
        .or_else(|| candidates.first())
        .map(|(span, _)| &text[span.clone()])
}

/// Generic extraction: from the first `{` to the last `}`.
pub fn first_to_last_brace(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// The balanced object value of the first `"key": { ... }` occurrence that closes.
pub fn find_keyed_object<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("\"{}\"", key);
    let bytes = text.as_bytes();

    for (pos, _) in text.match_indices(&needle) {
        let mut i = pos + needle.len();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b':') {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if let Some(span) = balanced_object_at(text, i) {
            return Some(&text[span]);
        }
    }
    None
}
