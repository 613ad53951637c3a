//! Text codec for the sequence stream.
//!
//! Encoding is a pure function of the item value. Decoding is incremental: a
//! [`Utf8StreamDecoder`] belongs to exactly one read loop and carries the
//! bytes of a code point split across chunk boundaries until the rest of it
//! arrives. Nothing here is shared between connections.

use core::char::REPLACEMENT_CHARACTER;
use std::borrow::Cow;

use bytes::Bytes;

/// Longest prefix of a UTF-8 sequence that can still be incomplete.
const MAX_PENDING: usize = 3;

/// Encodes `value` as its decimal representation terminated by `\n`.
pub fn encode_item(value: u64) -> Bytes {
    Bytes::from(format!("{value}\n"))
}

/// Incremental UTF-8 decoder.
///
/// Each call to [`decode`](Self::decode) returns all text that is complete so
/// far. A trailing partial code point is held back and prepended to the next
/// chunk. Malformed bytes are replaced with U+FFFD rather than failing the
/// read loop.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a partial code point is waiting for its continuation bytes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Decodes `chunk`, returning the text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let input: Cow<'_, [u8]> = if self.pending.is_empty() {
            Cow::Borrowed(chunk)
        } else {
            let mut joined = core::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            Cow::Owned(joined)
        };

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;

        loop {
            match core::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // Already validated, so this borrows without replacing.
                    out.push_str(&String::from_utf8_lossy(valid));

                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            debug_assert!(after.len() <= MAX_PENDING);
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Ends the stream. A dangling partial code point becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT_CHARACTER.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_decimal_line() {
        assert_eq!(&encode_item(1)[..], b"1\n");
        assert_eq!(&encode_item(1234)[..], b"1234\n");
        assert_eq!(&encode_item(u64::MAX)[..], b"18446744073709551615\n");
    }

    #[test]
    fn ascii_passes_through() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"1\n"), "1\n");
        assert_eq!(decoder.decode(b"2\n"), "2\n");
        assert!(!decoder.has_pending());
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        // "€" is E2 82 AC.
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"7 \xE2"), "7 ");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(b"\x82"), "");
        assert_eq!(decoder.decode(b"\xAC\n"), "€\n");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn four_byte_char_split_one_byte_at_a_time() {
        let text = "a😀b";
        let mut decoder = Utf8StreamDecoder::new();
        let mut out = String::new();
        for byte in text.as_bytes() {
            out.push_str(&decoder.decode(core::slice::from_ref(byte)));
        }
        out.push_str(&decoder.finish());
        assert_eq!(out, text);
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"1\xFF2\n"), "1\u{FFFD}2\n");
        assert_eq!(decoder.decode(b"\xC3\x28"), "\u{FFFD}(");
    }

    #[test]
    fn pending_prefix_followed_by_garbage_is_replaced() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"\xE2\x82"), "");
        assert_eq!(decoder.decode(b"x"), "\u{FFFD}x");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn finish_flushes_dangling_prefix() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"9\n\xF0\x9F"), "9\n");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert!(!decoder.has_pending());
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn decoders_do_not_share_state() {
        let mut a = Utf8StreamDecoder::new();
        let mut b = Utf8StreamDecoder::new();
        assert_eq!(a.decode(b"\xE2\x82"), "");
        assert_eq!(b.decode(b"\xAC"), "\u{FFFD}");
        assert_eq!(a.decode(b"\xAC"), "€");
    }
}
