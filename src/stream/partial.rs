//! Best-effort parsing of incomplete JSON, for progress display only.

use serde_json::Value;

/// Parse a JSON prefix by closing whatever is still open.
///
/// Open strings are terminated, a trailing comma is dropped, a key left
/// without a value gets `null`, and open objects and arrays are closed in
/// order. Returns `None` when the repaired text still does not parse.
pub fn parse_partial_json(buffer: &str) -> Option<Value> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for ch in trimmed.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.pop() != Some(ch) {
                    return None;
                }
            }
            _ => {}
        }
    }

    let mut repaired = trimmed.to_string();
    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }

    let tail = repaired.trim_end();
    if tail.ends_with(',') {
        let cut = tail.len() - 1;
        repaired.truncate(cut);
    } else if tail.ends_with(':') {
        repaired.push_str("null");
    }

    while let Some(closer) = closers.pop() {
        repaired.push(closer);
    }
    serde_json::from_str(&repaired).ok()
}
