//! Lossy text decoding for captured lines

use clap::ValueEnum;

/// What to do with byte sequences that are not valid UTF-8
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DecodePolicy {
    /// Remove invalid sequences (`OK\xFFDONE` -> `OKDONE`)
    #[default]
    Drop,
    /// Substitute U+FFFD for each invalid sequence
    Replace,
}

impl std::fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodePolicy::Drop => write!(f, "drop"),
            DecodePolicy::Replace => write!(f, "replace"),
        }
    }
}

/// Decode raw bytes as UTF-8 without ever failing
pub fn decode_lossy(bytes: &[u8], policy: DecodePolicy) -> String {
    match policy {
        DecodePolicy::Replace => String::from_utf8_lossy(bytes).into_owned(),
        DecodePolicy::Drop => {
            let mut text = String::with_capacity(bytes.len());
            for chunk in bytes.utf8_chunks() {
                text.push_str(chunk.valid());
            }
            text
        }
    }
}

/// Decode one chunk and strip surrounding whitespace.
///
/// Returns `None` when nothing printable is left, so blank lines and bare
/// terminators never reach the console.
pub fn decode_line(bytes: &[u8], policy: DecodePolicy) -> Option<String> {
    let text = decode_lossy(bytes, policy);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_policy_removes_invalid_bytes() {
        assert_eq!(
            decode_line(b"OK\xFFDONE\r\n", DecodePolicy::Drop).as_deref(),
            Some("OKDONE")
        );
    }

    #[test]
    fn test_replace_policy_substitutes_marker() {
        assert_eq!(
            decode_line(b"OK\xFFDONE\r\n", DecodePolicy::Replace).as_deref(),
            Some("OK\u{FFFD}DONE")
        );
    }

    #[test]
    fn test_truncated_multibyte_sequence() {
        // 0xE2 0x82 is the start of a three byte sequence cut short
        assert_eq!(decode_lossy(b"A\xE2\x82", DecodePolicy::Drop), "A");
        assert_eq!(decode_lossy(b"A\xE2\x82", DecodePolicy::Replace), "A\u{FFFD}");
    }

    #[test]
    fn test_valid_utf8_untouched() {
        let line = "temp 21.5\u{00B0}C";
        assert_eq!(
            decode_line(line.as_bytes(), DecodePolicy::Drop).as_deref(),
            Some(line)
        );
    }

    #[test]
    fn test_blank_lines_are_suppressed() {
        assert_eq!(decode_line(b"\r\n", DecodePolicy::Drop), None);
        assert_eq!(decode_line(b"   \r\n", DecodePolicy::Drop), None);
        assert_eq!(decode_line(b"", DecodePolicy::Replace), None);
        // Only invalid bytes: nothing survives the drop policy
        assert_eq!(decode_line(b"\xFF\xFE\n", DecodePolicy::Drop), None);
    }

    #[test]
    fn test_inner_whitespace_preserved() {
        assert_eq!(
            decode_line(b"\t RX  code=0x1A2B \r\n", DecodePolicy::Drop).as_deref(),
            Some("RX  code=0x1A2B")
        );
    }
}
