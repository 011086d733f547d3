//! RFC 3986 character classes and the percent re-encoder.
//!
//! The path, query and fragment filters all share the same two-step
//! treatment: check the component against its character class, then
//! percent-encode every byte that falls outside of it. A `%` that is not
//! followed by two hex digits counts as outside the class, so re-encoding
//! an already-encoded component is byte-identical while a stray `%`
//! becomes `%25`.

/// `unreserved = ALPHA / DIGIT / "-" / "." / "_" / "~"`
pub(crate) fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// `sub-delims = "!" / "$" / "&" / "'" / "(" / ")" / "*" / "+" / "," / ";" / "="`
pub(crate) fn is_sub_delim(byte: u8) -> bool {
    matches!(byte, b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'=')
}

/// `pchar = unreserved / pct-encoded / sub-delims / ":" / "@"`, minus the
/// pct-encoded alternative which is handled separately by the re-encoder.
pub(crate) fn is_pchar(byte: u8) -> bool {
    is_unreserved(byte) || is_sub_delim(byte) || matches!(byte, b':' | b'@')
}

/// Path bytes: pchar plus the segment separator.
pub(crate) fn is_path_byte(byte: u8) -> bool {
    is_pchar(byte) || byte == b'/'
}

/// Query and fragment bytes: `pchar / "/" / "?"`.
pub(crate) fn is_query_byte(byte: u8) -> bool {
    is_path_byte(byte) || byte == b'?'
}

/// Checks a component against its character class, where any `%` passes
/// (well-formed escapes are valid, malformed ones are repaired by
/// [`encode_invalid_runs`] instead of rejected).
pub(crate) fn is_valid_component(text: &str, allowed: fn(u8) -> bool) -> bool {
    text.bytes().all(|byte| byte == b'%' || allowed(byte))
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Percent-encodes every run of bytes not covered by `allowed`.
///
/// A `%` followed by two hex digits is kept as-is; any other `%` is
/// treated as an invalid byte and becomes `%25`. The function is therefore
/// idempotent on components that are already correctly encoded.
pub(crate) fn encode_invalid_runs(text: &str, allowed: fn(u8) -> bool) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte == b'%' {
            let escaped = i + 2 < bytes.len() && bytes[i + 1].is_ascii_hexdigit() && bytes[i + 2].is_ascii_hexdigit();
            if escaped {
                out.push('%');
            } else {
                out.push_str("%25");
            }
        } else if allowed(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX_DIGITS[usize::from(byte >> 4)] as char);
            out.push(HEX_DIGITS[usize::from(byte & 0x0f)] as char);
        }
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_component_is_untouched() {
        let path = "/path/to/resource-1.2_~";
        assert_eq!(encode_invalid_runs(path, is_path_byte), path);
    }

    #[test]
    fn encoding_is_idempotent() {
        let once = encode_invalid_runs("/a path/with spaces", is_path_byte);
        assert_eq!(once, "/a%20path/with%20spaces");
        assert_eq!(encode_invalid_runs(&once, is_path_byte), once);
    }

    #[test]
    fn well_formed_escapes_are_preserved() {
        assert_eq!(encode_invalid_runs("/a%20b", is_path_byte), "/a%20b");
        assert_eq!(encode_invalid_runs("k=%C3%A9", is_query_byte), "k=%C3%A9");
    }

    #[test]
    fn stray_percent_is_repaired() {
        assert_eq!(encode_invalid_runs("/100%", is_path_byte), "/100%25");
        assert_eq!(encode_invalid_runs("/50%x50", is_path_byte), "/50%25x50");
    }

    #[test]
    fn multibyte_chars_encode_per_byte() {
        assert_eq!(encode_invalid_runs("/é", is_path_byte), "/%C3%A9");
    }

    #[test]
    fn question_mark_allowed_in_query_but_not_path() {
        assert_eq!(encode_invalid_runs("a?b", is_query_byte), "a?b");
        assert_eq!(encode_invalid_runs("a?b", is_path_byte), "a%3Fb");
    }
}
