//! Opportunistic detection of structured payloads in accepted answers.
//!
//! Models sometimes return JSON or XML when asked for structured output.
//! The pipe handler sniffs accepted candidates so the log records whether a
//! machine-readable payload came back; a failed parse is reported, not
//! fatal.

use serde_json::Value;

/// A structured payload found inside an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredPayload {
    Json(Value),
    /// The answer is a well-formed XML fragment (tags balanced).
    Xml(String),
}

/// Inspect `text` for an embedded JSON or XML payload.
///
/// JSON wins over XML when both could apply. Returns `None` for plain text
/// or malformed payloads.
pub fn sniff_structured(text: &str) -> Option<StructuredPayload> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return Some(StructuredPayload::Json(value));
        }
    }

    if trimmed.starts_with('<') && xml_is_balanced(trimmed) {
        return Some(StructuredPayload::Xml(trimmed.to_string()));
    }

    None
}

/// Minimal well-formedness scan: every open tag has a matching close tag in
/// the right order. Handles self-closing tags, comments, and declarations;
/// does not validate attributes.
fn xml_is_balanced(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut stack: Vec<&str> = Vec::new();
    let mut i = 0;
    let mut saw_element = false;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }

        let rest = &text[i..];
        if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(end) => {
                    i += end + 3;
                    continue;
                }
                None => return false,
            }
        }
        if rest.starts_with("<?") || rest.starts_with("<!") {
            match rest.find('>') {
                Some(end) => {
                    i += end + 1;
                    continue;
                }
                None => return false,
            }
        }

        let close = match rest.find('>') {
            Some(pos) => pos,
            None => return false,
        };
        let inner = &rest[1..close];

        if let Some(name) = inner.strip_prefix('/') {
            let name = name.trim();
            match stack.pop() {
                Some(open) if open == name => {}
                _ => return false,
            }
        } else if inner.ends_with('/') {
            saw_element = true;
        } else {
            let name = inner.split_whitespace().next().unwrap_or("");
            if name.is_empty() {
                return false;
            }
            stack.push(name);
            saw_element = true;
        }

        i += close + 1;
    }

    saw_element && stack.is_empty()
}
