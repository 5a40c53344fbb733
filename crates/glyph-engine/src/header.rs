//! Helpers for strategies that inspect a resource's opening bytes.

/// Returns the first newline-delimited segment of `bytes`, tolerating CRLF
/// and lone CR line endings.
pub(crate) fn first_line(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .position(|b| *b == b'\n' || *b == b'\r')
        .unwrap_or(bytes.len());
    &bytes[..end]
}

/// Binary sniff used by header strategies that only apply to text.
pub(crate) fn contains_null(bytes: &[u8]) -> bool {
    bytes.contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_stops_at_any_line_ending() {
        assert_eq!(first_line(b"#!/bin/sh\necho"), b"#!/bin/sh");
        assert_eq!(first_line(b"#!/bin/sh\r\necho"), b"#!/bin/sh");
        assert_eq!(first_line(b"no newline"), b"no newline");
        assert_eq!(first_line(b""), b"");
    }

    #[test]
    fn null_sniff() {
        assert!(contains_null(b"ab\0cd"));
        assert!(!contains_null(b"abcd"));
    }
}
