//! Regex-driven syntax repair for almost-JSON.

use once_cell::sync::Lazy;
use regex::Regex;

static SINGLE_QUOTED_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'([^'\n]*)'(\s*):"#).expect("Invalid regex"));

static SINGLE_QUOTED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([:\[,]\s*)'([^'\n]*)'"#).expect("Invalid regex"));

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#",(\s*[\]}])"#).expect("Invalid regex"));

static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_\-]*)(\s*):"#).expect("Invalid regex"));

/// Apply every repair pass in order.
pub fn repair_syntax(text: &str) -> String {
    let text = normalize_single_quotes(text);
    let text = collapse_escaped_quotes(&text);
    let text = remove_trailing_commas(&text);
    quote_bare_keys(&text)
}

/// `'key':` and `'value'` become double quoted.
pub fn normalize_single_quotes(text: &str) -> String {
    let keys = SINGLE_QUOTED_KEY.replace_all(text, "\"$1\"$2:");
    // Array items sit next to each other, so run until nothing changes
    let mut current = keys.into_owned();
    loop {
        let next = SINGLE_QUOTED_VALUE
            .replace_all(&current, "$1\"$2\"")
            .into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Undo double encoding: `\"` becomes `"` and `\\` becomes `\`.
pub fn collapse_escaped_quotes(text: &str) -> String {
    text.replace("\\\"", "\"").replace("\\\\", "\\")
}

pub fn remove_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

/// `{files: ...}` becomes `{"files": ...}`.
pub fn quote_bare_keys(text: &str) -> String {
    BARE_KEY.replace_all(text, "$1\"$2\"$3:").into_owned()
}
