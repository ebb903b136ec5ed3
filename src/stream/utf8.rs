//! Incremental UTF-8 decoding for chunked byte streams.
//!
//! Network reads split the body at arbitrary byte offsets, so a multi-byte
//! character can straddle two chunks. [`Utf8Decoder`] holds the incomplete
//! tail of one chunk and completes it with the head of the next.

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `chunk`, keeping an unfinished trailing sequence for the next call.
    /// Invalid sequences are replaced with U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    if let Ok(prefix) = std::str::from_utf8(valid) {
                        out.push_str(prefix);
                    }

                    match e.error_len() {
                        Some(bad) => {
                            out.push(REPLACEMENT);
                            rest = &after[bad..];
                        }
                        None => {
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flushes the decoder at end of stream. A dangling partial sequence
    /// decodes to a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_ascii_through() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(b"hello"), "hello");
        assert_eq!(dec.finish(), "");
    }

    #[test]
    fn joins_character_split_across_chunks() {
        let bytes = "héllo ✓".as_bytes();
        let mut dec = Utf8Decoder::new();
        let mut out = String::new();
        for b in bytes {
            out.push_str(&dec.decode(std::slice::from_ref(b)));
        }
        out.push_str(&dec.finish());
        assert_eq!(out, "héllo ✓");
    }

    #[test]
    fn four_byte_sequence_split_in_the_middle() {
        let bytes = "a😀b".as_bytes();
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(&bytes[..3]), "a");
        assert_eq!(dec.decode(&bytes[3..]), "😀b");
    }

    #[test]
    fn invalid_bytes_become_replacement() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn valid_prefix_survives_invalid_byte_and_split_tail() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(&[b'o', b'k', 0xFF, 0xE2, 0x9C]), "ok\u{FFFD}");
        assert_eq!(dec.decode(&[0x93, b'!']), "\u{2713}!");
    }

    #[test]
    fn finish_reports_truncated_sequence() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(&[0xE2, 0x9C]), "");
        assert_eq!(dec.finish(), "\u{FFFD}");
        assert_eq!(dec.finish(), "");
    }
}
