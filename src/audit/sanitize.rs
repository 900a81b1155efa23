//! Input Sanitization for Teacher Prompts
//!
//! TigerStyle: Pure functions, explicit size caps.
//!
//! Everything the audit loop forwards to the teacher came out of an agent
//! transcript, which means it may carry terminal escape sequences or
//! instruction-injection phrasing. Sanitization treats all of it as data:
//! control sequences are stripped, known injection markers are redacted,
//! and the result is capped.

use crate::constants::AUDIT_SANITIZED_TEXT_BYTES_MAX;

/// Injection phrases neutralized before text reaches the teacher.
const INJECTION_MARKERS: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous instructions",
    "disregard the above",
    "you are now",
    "system prompt",
];

/// Replacement for redacted injection markers.
const REDACTED: &str = "[redacted]";

/// Sanitize transcript text before forwarding it to the teacher.
///
/// Strips ANSI escape sequences and control characters (newline and tab
/// survive), redacts instruction-injection markers, and caps the result at
/// `AUDIT_SANITIZED_TEXT_BYTES_MAX` on a char boundary.
#[must_use]
pub fn sanitize(text: &str) -> String {
    let stripped = strip_control_sequences(text);
    let redacted = redact_markers(&stripped);
    truncate_bytes(&redacted, AUDIT_SANITIZED_TEXT_BYTES_MAX)
}

/// Remove ANSI escape sequences and control characters.
///
/// An ESC byte starts a skip that runs through the sequence terminator
/// (the first ASCII alphabetic after `[`, or the single following char
/// otherwise).
fn strip_control_sequences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            match chars.peek() {
                Some('[') => {
                    chars.next();
                    // CSI sequence: parameters then an alphabetic final byte
                    while let Some(&n) = chars.peek() {
                        chars.next();
                        if n.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
                Some(_) => {
                    chars.next();
                }
                None => {}
            }
            continue;
        }
        if c.is_control() && c != '\n' && c != '\t' {
            continue;
        }
        out.push(c);
    }

    out
}

/// Redact known injection markers, case-insensitively.
fn redact_markers(text: &str) -> String {
    let mut out = text.to_string();
    for marker in INJECTION_MARKERS {
        out = replace_ignore_case(&out, marker, REDACTED);
    }
    out
}

/// Case-insensitive literal replacement.
fn replace_ignore_case(haystack: &str, needle: &str, replacement: &str) -> String {
    assert!(!needle.is_empty(), "needle must not be empty");

    let lower_haystack = haystack.to_lowercase();
    let lower_needle = needle.to_lowercase();

    // Lowercasing can change byte lengths for non-ASCII text; fall back to
    // the untouched input rather than splice at wrong offsets.
    if lower_haystack.len() != haystack.len() {
        return haystack.to_string();
    }

    let mut out = String::with_capacity(haystack.len());
    let mut rest = 0;
    while let Some(pos) = lower_haystack[rest..].find(&lower_needle) {
        let start = rest + pos;
        out.push_str(&haystack[rest..start]);
        out.push_str(replacement);
        rest = start + lower_needle.len();
    }
    out.push_str(&haystack[rest..]);
    out
}

/// Truncate to at most `max_bytes`, respecting char boundaries.
fn truncate_bytes(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

// =============================================================================
// Tests
// =============================================================================
